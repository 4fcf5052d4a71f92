//! Derive macros generating injection tables and constructors for dem-container
//!

use proc_macro::TokenStream;
use syn::parse_macro_input;

mod construct;
mod injectable;

/// Implements the `Injectable` trait, declaring injection points from field
/// and struct attributes.
///
/// Field attributes:
/// - `#[inject]` assigns the resolved field type, an `Option<T>` field receives `Some(T)`
/// - `#[inject(setter = method)]` passes a resolved value to `method`
/// - `#[inject(base)]` marks the field holding the base type, injected after `Self`
///
/// Struct attribute:
/// - `#[inject(method = init)]` invokes `init` without arguments
/// - `#[inject(method = init(Rc<A>, Rc<B>))]` invokes `init` with up to five resolved arguments
///
/// # Example
/// ```ignore
/// use std::rc::Rc;
/// use dem_container::Injectable;
///
/// #[derive(Default, Injectable)]
/// #[inject(method = started, method = attach(Rc<dyn Clock>))]
/// struct Screen {
///     #[inject(base)]
///     base: View,
///     #[inject]
///     theme: Option<Rc<dyn Theme>>,
///     #[inject(setter = set_clock)]
///     clock: Option<Rc<dyn Clock>>,
/// }
/// ```
///
/// # Errors
/// This macro will fail to compile if:
/// - The input is not a struct with named fields
/// - The struct has generic parameters
/// - More than one field is marked as `base`
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as syn::DeriveInput);
    injectable::expand_injectable(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implements the `Construct` trait, resolving every field from the resolver.
///
/// A field marked `#[construct(default)]` is set to its `Default` value instead.
/// Types that implement `Default` are already `Construct` and must not derive it.
///
/// # Example
/// ```ignore
/// use std::rc::Rc;
/// use dem_container::Construct;
///
/// #[derive(Construct)]
/// struct Scheduler {
///     clock: Rc<dyn Clock>,
///     jobs: Vec<Rc<dyn Job>>,
///     #[construct(default)]
///     ticks: u64,
/// }
/// ```
///
/// # Errors
/// This macro will fail to compile if:
/// - The input is not a struct
/// - The struct has generic parameters
#[proc_macro_derive(Construct, attributes(construct))]
pub fn derive_construct(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as syn::DeriveInput);
    construct::expand_construct(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Rejects inputs that carry generic parameters
fn ensure_not_generic(input: &syn::DeriveInput) -> syn::Result<()> {
    if input.generics.params.is_empty() {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            &input.generics,
            "generic types are not supported by the container",
        ))
    }
}
