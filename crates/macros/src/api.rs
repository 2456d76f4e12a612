use proc_macro2::{Span, TokenStream};
use quote::{quote, quote_spanned};
use syn::{Attribute, Ident, Lit, Meta, NestedMeta, spanned::Spanned};
use synstructure::{BindingInfo, Structure, VariantInfo};

#[derive(Debug)]
struct Error(TokenStream);

impl Error {
    fn new(span: Span, message: &str) -> Error {
        Error(quote_spanned! { span =>
            compile_error!(#message);
        })
    }
}

/// Parsed contents of a variant's `#[api(...)]` attribute.
#[derive(Default)]
struct Api {
    internal: Option<Span>,
    code: Option<Lit>,
    status: Option<Ident>,
}

pub fn derive_error(s: Structure) -> TokenStream {
    let statuses = s.each_variant(|v| match variant_status(v) {
        Ok(v) => v,
        Err(e) => e.0,
    });

    let codes = s.each_variant(|v| match variant_code(v) {
        Ok(v) => v,
        Err(e) => e.0,
    });

    s.gen_impl(quote! {
        use std::borrow::Cow;

        gen impl ApiError for @Self {
            fn status(&self) -> ::http::StatusCode {
                match *self { #statuses }
            }

            fn code(&self) -> Option<Cow<str>> {
                match *self { #codes }
            }
        }
    })
}

/// Find value of `ApiError::status()` for a variant.
fn variant_status(v: &VariantInfo) -> Result<TokenStream, Error> {
    let api = match parse_api(v.ast().attrs)? {
        Some(api) => api,
        None => return delegate(v, quote!(status)),
    };

    match (api.status, api.internal) {
        (Some(_), Some(span)) =>
            Err(Error::new(span, "internal errors can't have statuses")),
        (Some(status), None) => Ok(quote!(::http::StatusCode::#status)),
        (None, _) => Ok(quote!(::http::StatusCode::INTERNAL_SERVER_ERROR)),
    }
}

/// Find value of `ApiError::code()` for a variant.
fn variant_code(v: &VariantInfo) -> Result<TokenStream, Error> {
    let api = match parse_api(v.ast().attrs)? {
        Some(api) => api,
        None => return delegate(v, quote!(code)),
    };

    match (api.code, api.internal) {
        (Some(_), Some(span)) =>
            Err(Error::new(span, "internal errors can't have codes")),
        (Some(code), None) => Ok(quote!(Some(Cow::Borrowed(#code)))),
        (None, _) => Ok(quote!(None)),
    }
}

/// Variants without `#[api]` forward to their `#[cause]`.
fn delegate(v: &VariantInfo, method: TokenStream) -> Result<TokenStream, Error> {
    v.bindings()
        .iter()
        .find(is_cause)
        .map(|cause| quote!(#cause.#method()))
        .ok_or_else(|| Error::new(
            v.ast().ident.span(),
            "each variant must be #[api]-annotated or have a #[cause]",
        ))
}

/// Given a list of attributes find `#[api(...)]`, ensure there is only one
/// of them, and parse its arguments.
fn parse_api(attrs: &[Attribute]) -> Result<Option<Api>, Error> {
    let mut metas = attrs.iter()
        .filter(|attr| attr.path.is_ident("api"))
        .map(|attr| attr.parse_meta().map_err(|e| Error(e.to_compile_error())));

    let meta = match metas.next() {
        Some(meta) => meta?,
        None => return Ok(None),
    };

    if let Some(extra) = metas.next() {
        let span = match extra {
            Ok(meta) => meta.span(),
            Err(_) => Span::call_site(),
        };
        return Err(Error::new(span, "api attribute must be used exactly once"));
    }

    let list = match meta {
        Meta::List(list) => list,
        meta => return Err(Error::new(
            meta.span(),
            "api attribute must take a list in parentheses",
        )),
    };

    if list.nested.is_empty() {
        return Err(Error::new(
            list.span(),
            "api attribute requires at least one argument",
        ));
    }

    let mut api = Api::default();

    for item in list.nested.iter() {
        match item {
            NestedMeta::Meta(Meta::Path(path)) if path.is_ident("internal") =>
                api.internal = Some(item.span()),
            NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("code") =>
                api.code = Some(nv.lit.clone()),
            NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("status") =>
                api.status = Some(match nv.lit {
                    Lit::Str(ref s) => Ident::new(&s.value(), s.span()),
                    _ => return Err(Error::new(
                        nv.lit.span(),
                        "expected a string",
                    )),
                }),
            _ => return Err(Error::new(
                item.span(),
                "expected one of: internal, code, status",
            )),
        }
    }

    Ok(Some(api))
}

fn is_cause(bi: &&BindingInfo) -> bool {
    bi.ast()
        .attrs
        .iter()
        .any(|attr| attr.path.is_ident("cause"))
}
