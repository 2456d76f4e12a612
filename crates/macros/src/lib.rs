//! Derive macros used throughout Scriptorium.
//!
//! - `ApiError` implements `scriptorium::error::ApiError` from
//!   `#[api(code = "...", status = "...")]` or `#[api(internal)]`
//!   annotations on each variant. Variants without an annotation delegate to
//!   their `#[cause]`.
//! - `From` implements `From<T>` for every variant with a single `#[from]`
//!   field.

extern crate proc_macro;

use synstructure::decl_derive;

mod api;
mod from;

decl_derive!([ApiError, attributes(api)] => api::derive_error);
decl_derive!([From, attributes(from)] => from::derive_from);
