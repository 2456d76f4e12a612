use proc_macro2::TokenStream;
use quote::{quote, quote_spanned, ToTokens};
use synstructure::{BindingInfo, Structure, VariantInfo};

/// Derive `From<T>` for every variant whose only field is marked `#[from]`.
///
/// Error enums in this crate commonly wrap several errors; two variants
/// wrapping the same type would produce conflicting impls, so that case is
/// reported on the second variant instead.
pub fn derive_from(s: Structure) -> TokenStream {
    let mut impls = TokenStream::new();
    let mut seen: Vec<String> = Vec::new();

    for variant in s.variants() {
        let from = match source_field(variant) {
            Ok(Some(from)) => from,
            Ok(None) => continue,
            Err(err) => {
                impls.extend(err);
                continue;
            }
        };

        let ty = &from.ast().ty;
        let key = ty.to_token_stream().to_string();

        if seen.contains(&key) {
            impls.extend(quote_spanned! {variant.ast().ident.span()=>
                compile_error!(concat!(
                    "another variant already converts from ", #key));
            });
            continue;
        }
        seen.push(key);

        let constructor = variant.construct(|_, _| quote!(from));

        impls.extend(s.gen_impl(quote! {
            gen impl From<#ty> for @Self {
                fn from(from: #ty) -> Self {
                    #constructor
                }
            }
        }));
    }

    impls
}

/// Field of `variant` marked `#[from]`, if any.
fn source_field<'a, 'b>(variant: &'b VariantInfo<'a>)
-> Result<Option<&'b BindingInfo<'a>>, TokenStream> {
    let from = match variant.bindings().iter().find(is_from) {
        Some(from) => from,
        None => return Ok(None),
    };

    if variant.bindings().len() > 1 {
        return Err(quote_spanned! {variant.ast().ident.span()=>
            compile_error!(
                "From can only be derived for variants with a single field");
        });
    }

    Ok(Some(from))
}

fn is_from(bi: &&BindingInfo) -> bool {
    bi.ast()
        .attrs
        .iter()
        .any(|attr| attr.path.is_ident("from"))
}
