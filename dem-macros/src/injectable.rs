//! Macros for member injection

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Attribute, Ident, Token, Type, parse::Parse};

/// Methods take their arguments as one resolved tuple, which has at most five elements
const MAX_METHOD_PARAMS: usize = 5;

/// How a field takes part in the injection
#[derive(Debug, PartialEq)]
enum FieldInjection {
    Assign,
    Setter(Ident),
    Base,
}

/// A struct-level `#[inject(method = name(T1, T2))]` declaration
struct InjectedMethod {
    name: Ident,
    params: Vec<Type>,
}

/// Expands a derive-macro for Injectable
pub(super) fn expand_injectable(input: &syn::DeriveInput) -> syn::Result<TokenStream> {
    super::ensure_not_generic(input)?;
    let name = &input.ident;

    let syn::Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(name, "`Injectable` can only be derived for structs"));
    };
    let syn::Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &data.fields,
            "`Injectable` requires a struct with named fields",
        ));
    };

    let mut base = None;
    let mut points = Vec::new();
    for field in &fields.named {
        let Some(ident) = &field.ident else { continue };
        let member = ident.to_string();
        for injection in field_injections(&field.attrs)? {
            match injection {
                FieldInjection::Assign => points.push(assign_point(ident, &member, &field.ty)),
                FieldInjection::Setter(setter) => points.push(quote! {
                    points.property(#member, Self::#setter);
                }),
                FieldInjection::Base => {
                    if base.is_some() {
                        return Err(syn::Error::new_spanned(ident, "only one field can hold the base type"));
                    }
                    base = Some(quote! {
                        points.base(|this: &mut Self| &mut this.#ident);
                    });
                }
            }
        }
    }

    for method in struct_methods(&input.attrs)? {
        points.push(method_point(&method));
    }

    Ok(quote! {
        impl ::dem_container::Injectable for #name {
            #[allow(unused_variables)]
            fn injection_points(points: &mut ::dem_container::InjectionPoints<Self>) {
                #base
                #(#points)*
            }
        }
    })
}

/// Generates a field point, wrapping the value into `Some` for `Option` fields
fn assign_point(ident: &Ident, member: &str, ty: &Type) -> TokenStream {
    match option_inner(ty) {
        Some(inner) => quote! {
            points.field(#member, |this: &mut Self, value: #inner| this.#ident = ::std::option::Option::Some(value));
        },
        None => quote! {
            points.field(#member, |this: &mut Self, value: #ty| this.#ident = value);
        },
    }
}

/// Generates a method point resolving the parameters as one tuple
fn method_point(method: &InjectedMethod) -> TokenStream {
    let name = &method.name;
    let member = name.to_string();
    let params = &method.params;
    let args = (0..params.len())
        .map(|index| format_ident!("arg{index}"))
        .collect::<Vec<_>>();
    quote! {
        points.method(#member, |this: &mut Self, (#(#args,)*): (#(#params,)*)| this.#name(#(#args),*));
    }
}

/// Collects the `#[inject(...)]` attributes of a field
fn field_injections(attrs: &[Attribute]) -> syn::Result<Vec<FieldInjection>> {
    let mut injections = Vec::new();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("inject")) {
        if let syn::Meta::Path(_) = attr.meta {
            injections.push(FieldInjection::Assign);
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("base") {
                injections.push(FieldInjection::Base);
                Ok(())
            } else if meta.path.is_ident("setter") {
                injections.push(FieldInjection::Setter(meta.value()?.parse()?));
                Ok(())
            } else {
                Err(meta.error("expected `base` or `setter = method`"))
            }
        })?;
    }
    Ok(injections)
}

/// Collects the methods named by `#[inject(method = ...)]` on the struct.
///
/// A method without a parameter list takes no arguments.
fn struct_methods(attrs: &[Attribute]) -> syn::Result<Vec<InjectedMethod>> {
    let mut methods = Vec::new();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("inject")) {
        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident("method") {
                return Err(meta.error("expected `method = name` or `method = name(T1, T2)`"));
            }
            let input = meta.value()?;
            let name: Ident = input.parse()?;
            let mut params = Vec::new();
            if input.peek(syn::token::Paren) {
                let content;
                syn::parenthesized!(content in input);
                params.extend(content.parse_terminated(Type::parse, Token![,])?);
            }
            if params.len() > MAX_METHOD_PARAMS {
                return Err(syn::Error::new_spanned(
                    &name,
                    format!("an injected method takes at most {MAX_METHOD_PARAMS} parameters"),
                ));
            }
            methods.push(InjectedMethod { name, params });
            Ok(())
        })?;
    }
    Ok(methods)
}

/// Returns `T` if the type is `Option<T>`
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}
