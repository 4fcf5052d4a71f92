//! Factories producing implementations from resolved arguments

use super::{Error, FromResolver, Resolver};
use crate::registry::{FactoryFn, Instance};
use std::rc::Rc;

/// A function building an implementation from arguments taken out of the container.
///
/// Implemented for closures with up to five [`FromResolver`] parameters,
/// none included, that return `Result<Output, Error>`.
pub trait GenericFactory<Args>: 'static {
    /// A type of object that will be produced
    type Output;

    /// Extracts the arguments from `resolver`, left to right, and calls the factory.
    ///
    /// The first argument that fails to resolve aborts the call.
    fn produce(&self, resolver: &Resolver) -> Result<Self::Output, Error>;
}

/// Erases `factory` into the form kept by a registration record
pub(crate) fn erase<F, Args>(factory: F) -> FactoryFn
where
    F: GenericFactory<Args>,
    F::Output: 'static,
{
    Box::new(move |resolver: &Resolver| {
        factory
            .produce(resolver)
            .map(|instance| Rc::new(instance) as Instance)
    })
}

macro_rules! define_generic_factory ({ $($param:ident)* } => {
    impl<F, R, $($param,)*> GenericFactory<($($param,)*)> for F
    where
        F: Fn($($param),*) -> Result<R, Error> + 'static,
        $($param: FromResolver,)*
    {
        type Output = R;

        #[inline]
        #[allow(unused_variables)]
        fn produce(&self, resolver: &Resolver) -> Result<R, Error> {
            (self)($($param::from_resolver(resolver)?,)*)
        }
    }
});

define_generic_factory! {}
define_generic_factory! { T1 }
define_generic_factory! { T1 T2 }
define_generic_factory! { T1 T2 T3 }
define_generic_factory! { T1 T2 T3 T4 }
define_generic_factory! { T1 T2 T3 T4 T5 }
