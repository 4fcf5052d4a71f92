//! Macros for constructing implementations from resolved dependencies

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Field};

/// Expands a derive-macro for Construct
pub(super) fn expand_construct(input: &syn::DeriveInput) -> syn::Result<TokenStream> {
    super::ensure_not_generic(input)?;
    let name = &input.ident;

    let syn::Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(name, "`Construct` can only be derived for structs"));
    };

    let body = match &data.fields {
        syn::Fields::Named(fields) => {
            let values = fields
                .named
                .iter()
                .map(|field| {
                    let ident = &field.ident;
                    let value = field_value(field)?;
                    Ok(quote! { #ident: #value })
                })
                .collect::<syn::Result<Vec<_>>>()?;
            quote! { Self { #(#values),* } }
        }
        syn::Fields::Unnamed(fields) => {
            let values = fields
                .unnamed
                .iter()
                .map(field_value)
                .collect::<syn::Result<Vec<_>>>()?;
            quote! { Self(#(#values),*) }
        }
        syn::Fields::Unit => quote! { Self },
    };

    Ok(quote! {
        impl ::dem_container::Construct for #name {
            #[inline]
            fn construct(resolver: &::dem_container::Resolver) -> ::std::result::Result<Self, ::dem_container::error::Error> {
                ::std::result::Result::Ok(#body)
            }
        }
    })
}

/// Generates the expression producing one field
fn field_value(field: &Field) -> syn::Result<TokenStream> {
    let ty = &field.ty;
    if is_default(&field.attrs)? {
        Ok(quote! { <#ty as ::std::default::Default>::default() })
    } else {
        Ok(quote! { <#ty as ::dem_container::FromResolver>::from_resolver(resolver)? })
    }
}

/// Whether the field is marked `#[construct(default)]`
fn is_default(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut default = false;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("construct")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                default = true;
                Ok(())
            } else {
                Err(meta.error("expected `default`"))
            }
        })?;
    }
    Ok(default)
}
