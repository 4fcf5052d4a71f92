//! Capabilities an implementation type satisfies

use crate::{error::Error, key::TypeKey};
use smallvec::SmallVec;
use std::{
    any::{Any, type_name},
    marker::PhantomData,
    rc::Rc,
};

/// A produced instance, always an `Rc<I>` of its implementation type
pub(crate) type Instance = Rc<dyn Any>;

/// Converts an implementation instance into a boxed `Rc<Q>`
type Caster = Box<dyn Fn(Instance) -> Result<Box<dyn Any>, Error>>;

/// A conversion from a shared implementation into a shared capability.
///
/// Every sized type converts into itself. Implement it for each trait object
/// an implementation should be resolvable as:
///
/// ```
/// use std::rc::Rc;
/// use dem_container::Upcast;
///
/// trait Clock {}
/// struct SystemClock;
/// impl Clock for SystemClock {}
///
/// impl Upcast<dyn Clock> for SystemClock {
///     fn upcast(self: Rc<Self>) -> Rc<dyn Clock> {
///         self
///     }
/// }
/// ```
///
/// The [`component!`](crate::component) macro writes these impls.
pub trait Upcast<C: ?Sized>: 'static {
    /// Converts `Rc<Self>` into `Rc<C>`
    fn upcast(self: Rc<Self>) -> Rc<C>;
}

impl<T: 'static> Upcast<T> for T {
    #[inline]
    fn upcast(self: Rc<Self>) -> Rc<T> {
        self
    }
}

/// A type that can be registered as an implementation.
///
/// Declares the supertype and interfaces the type satisfies, beside the
/// capability it is registered under and the implementation type itself.
/// Those are what subscriptions and [`Resolver::resolve_all_assignable`](crate::Resolver::resolve_all_assignable)
/// match against.
pub trait Component: Sized + 'static {
    /// Declares the supertype and interfaces of `Self`
    #[inline]
    fn capabilities(capabilities: &mut Capabilities<Self>) {
        let _ = capabilities;
    }
}

/// Kind of a capability entry, in matching priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CapabilityKind {
    /// The type the record is registered under
    Capability,
    /// The concrete type the factory produces
    Implementation,
    /// The declared supertype of the implementation
    Supertype,
    /// One of the declared interfaces of the implementation
    Interface,
}

/// One type a registration satisfies, together with the conversion into it
pub(crate) struct Capability {
    kind: CapabilityKind,
    key: TypeKey,
    cast: Caster,
}

impl Capability {
    pub(crate) fn new<I, Q>(kind: CapabilityKind) -> Self
    where
        I: Upcast<Q>,
        Q: ?Sized + 'static,
    {
        let cast: Caster = Box::new(|instance: Instance| {
            let implementation = instance
                .downcast::<I>()
                .map_err(|_| Error::ResolveFailed(type_name::<I>()))?;
            let capability: Rc<Q> = <I as Upcast<Q>>::upcast(implementation);
            Ok(Box::new(capability) as Box<dyn Any>)
        });
        Self {
            kind,
            key: TypeKey::of::<Q>(),
            cast,
        }
    }

    #[inline]
    pub(crate) fn kind(&self) -> CapabilityKind {
        self.kind
    }

    #[inline]
    pub(crate) fn key(&self) -> TypeKey {
        self.key
    }

    /// Converts the instance into a boxed `Rc<Q>` where `Q` is the keyed type
    #[inline]
    pub(crate) fn cast(&self, instance: Instance) -> Result<Box<dyn Any>, Error> {
        (self.cast)(instance)
    }
}

/// Collects the supertype and interfaces declared by [`Component::capabilities`]
pub struct Capabilities<I> {
    supertype: Option<Capability>,
    interfaces: SmallVec<[Capability; 2]>,
    _marker: PhantomData<fn() -> I>,
}

impl<I: 'static> Capabilities<I> {
    pub(crate) fn new() -> Self {
        Self {
            supertype: None,
            interfaces: SmallVec::new(),
            _marker: PhantomData,
        }
    }

    /// Declares the supertype of `I`, replacing a previous declaration
    pub fn supertype<S>(&mut self) -> &mut Self
    where
        S: ?Sized + 'static,
        I: Upcast<S>,
    {
        self.supertype = Some(Capability::new::<I, S>(CapabilityKind::Supertype));
        self
    }

    /// Declares an interface of `I`
    pub fn interface<Q>(&mut self) -> &mut Self
    where
        Q: ?Sized + 'static,
        I: Upcast<Q>,
    {
        self.interfaces.push(Capability::new::<I, Q>(CapabilityKind::Interface));
        self
    }

    /// Supertype first, then interfaces in declaration order
    pub(crate) fn into_entries(self) -> impl Iterator<Item = Capability> {
        self.supertype.into_iter().chain(self.interfaces)
    }
}

/// Implements [`Upcast`] and [`Component`] for an implementation type.
///
/// # Macro Syntax
/// ```ignore
/// component!(Type);
/// component!(Type => dyn InterfaceA, dyn InterfaceB);
/// component!(Type: dyn Supertype => dyn InterfaceA);
/// ```
///
/// # Example
/// ```
/// use dem_container::component;
///
/// trait Animal {}
/// trait Pet {}
///
/// struct Dog;
/// impl Animal for Dog {}
/// impl Pet for Dog {}
///
/// component!(Dog: dyn Animal => dyn Pet);
/// ```
///
/// The listed types must differ from the implementation type itself,
/// which already converts into itself.
#[macro_export]
macro_rules! component {
    ($name:ty $(: $supertype:ty)? $(=> $($interface:ty),+ $(,)?)?) => {
        $(
        impl $crate::Upcast<$supertype> for $name {
            #[inline]
            fn upcast(self: ::std::rc::Rc<Self>) -> ::std::rc::Rc<$supertype> {
                self
            }
        }
        )?
        $($(
        impl $crate::Upcast<$interface> for $name {
            #[inline]
            fn upcast(self: ::std::rc::Rc<Self>) -> ::std::rc::Rc<$interface> {
                self
            }
        }
        )+)?
        impl $crate::Component for $name {
            #[allow(unused_variables)]
            fn capabilities(capabilities: &mut $crate::Capabilities<Self>) {
                $(capabilities.supertype::<$supertype>();)?
                $($(capabilities.interface::<$interface>();)+)?
            }
        }
    };
}
