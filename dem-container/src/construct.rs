//! Utilities to construct implementations from resolved dependencies

use crate::{Resolver, error::Error};

/// A trait that describes how an implementation is built when it is
/// registered without an explicit factory, see [`Registry::register_type`](crate::Registry::register_type).
///
/// Types implementing [`Default`] are constructed with it. Other types either
/// implement the trait manually, resolving what they need:
///
/// ```
/// use std::rc::Rc;
/// use dem_container::{Construct, Resolver, error::Error};
///
/// trait Clock {}
///
/// struct Scheduler {
///     clock: Rc<dyn Clock>,
/// }
///
/// impl Construct for Scheduler {
///     fn construct(resolver: &Resolver) -> Result<Self, Error> {
///         let clock = resolver.resolve::<dyn Clock>()?;
///         Ok(Self { clock })
///     }
/// }
/// ```
///
/// or derive it with the `macros` feature, which resolves every field.
pub trait Construct: Sized {
    /// Builds `Self`, resolving its dependencies
    fn construct(resolver: &Resolver) -> Result<Self, Error>;
}

impl<T: Default> Construct for T {
    #[inline]
    fn construct(_: &Resolver) -> Result<Self, Error> {
        Ok(Self::default())
    }
}
