//! Extractors for fetching data from the resolver

use super::{Error, Resolver};
use std::rc::Rc;

/// A trait that defines how to extract the `Self` from the resolver.
///
/// Used for factory arguments, constructor parameters and injected members.
pub trait FromResolver: Sized {
    /// Extracts `Self` from the resolver
    fn from_resolver(resolver: &Resolver) -> Result<Self, Error>;
}

impl FromResolver for Resolver {
    #[inline]
    fn from_resolver(resolver: &Resolver) -> Result<Self, Error> {
        Ok(resolver.clone())
    }
}

impl FromResolver for () {
    #[inline]
    fn from_resolver(_: &Resolver) -> Result<Self, Error> {
        Ok(())
    }
}

/// Resolves the singleton registered for capability `T`
impl<T: ?Sized + 'static> FromResolver for Rc<T> {
    #[inline]
    fn from_resolver(resolver: &Resolver) -> Result<Self, Error> {
        resolver.resolve::<T>()
    }
}

/// Resolves every registration assignable to `T`
impl<T: ?Sized + 'static> FromResolver for Vec<Rc<T>> {
    #[inline]
    fn from_resolver(resolver: &Resolver) -> Result<Self, Error> {
        resolver.resolve_all_assignable::<T>()
    }
}

macro_rules! define_generic_from_resolver {
    ($($T: ident),*) => {
        impl<$($T: FromResolver),+> FromResolver for ($($T,)+) {
            #[inline]
            #[allow(non_snake_case)]
            fn from_resolver(resolver: &Resolver) -> Result<Self, Error> {
                let tuple = (
                    $(
                    $T::from_resolver(resolver)?,
                    )*
                );
                Ok(tuple)
            }
        }
    }
}

define_generic_from_resolver! { T1 }
define_generic_from_resolver! { T1, T2 }
define_generic_from_resolver! { T1, T2, T3 }
define_generic_from_resolver! { T1, T2, T3, T4 }
define_generic_from_resolver! { T1, T2, T3, T4, T5 }
