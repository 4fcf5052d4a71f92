//! Registration record and the handle returned when registering

use super::capability::{Capabilities, Capability, CapabilityKind, Component, Instance, Upcast};
use crate::{Resolver, error::Error, key::TypeKey};
use smallvec::SmallVec;
use std::{
    any::{TypeId, type_name},
    cell::Cell,
    fmt::{Debug, Formatter},
    rc::Rc,
};

/// Produces a fresh implementation instance
pub(crate) type FactoryFn = Box<dyn Fn(&Resolver) -> Result<Instance, Error>>;

/// Identifies one producer of a capability.
///
/// Immutable once registered, except for the lazy flag which is set
/// through [`RegistrationHandle::lazy`].
pub struct RegistrationRecord {
    capability: TypeKey,
    implementation: TypeKey,
    factory: FactoryFn,
    satisfies: SmallVec<[Capability; 4]>,
    lazy: Cell<bool>,
}

impl RegistrationRecord {
    pub(crate) fn new<C, I>(factory: FactoryFn) -> Self
    where
        C: ?Sized + 'static,
        I: Component + Upcast<C>,
    {
        let mut satisfies = SmallVec::new();
        satisfies.push(Capability::new::<I, C>(CapabilityKind::Capability));
        satisfies.push(Capability::new::<I, I>(CapabilityKind::Implementation));

        let mut declared = Capabilities::<I>::new();
        I::capabilities(&mut declared);
        satisfies.extend(declared.into_entries());

        Self {
            capability: TypeKey::of::<C>(),
            implementation: TypeKey::of::<I>(),
            factory,
            satisfies,
            lazy: Cell::new(false),
        }
    }

    /// The type callers resolve by
    #[inline]
    pub fn capability_type(&self) -> TypeKey {
        self.capability
    }

    /// The concrete type the factory produces
    #[inline]
    pub fn implementation_type(&self) -> TypeKey {
        self.implementation
    }

    /// Whether the record is skipped by [`Resolver::resolve_non_lazy`]
    #[inline]
    pub fn is_lazy(&self) -> bool {
        self.lazy.get()
    }

    /// Every type this record satisfies, in matching priority order:
    /// capability, implementation, supertype, then interfaces
    pub fn capabilities(&self) -> impl Iterator<Item = (CapabilityKind, TypeKey)> + '_ {
        self.satisfies.iter().map(|c| (c.kind(), c.key()))
    }

    /// Whether an instance of this record can be handed out as `id`
    #[inline]
    pub fn satisfies(&self, id: TypeId) -> bool {
        self.satisfying(id).is_some()
    }

    #[inline]
    pub(crate) fn satisfying(&self, id: TypeId) -> Option<&Capability> {
        self.satisfies.iter().find(|c| c.key().id() == id)
    }

    #[inline]
    pub(crate) fn entries(&self) -> impl Iterator<Item = &Capability> {
        self.satisfies.iter()
    }

    /// Runs the factory
    #[inline]
    pub(crate) fn produce(&self, resolver: &Resolver) -> Result<Instance, Error> {
        (self.factory)(resolver)
    }

    /// Converts an instance produced by this record into `Rc<Q>`
    pub(crate) fn cast<Q: ?Sized + 'static>(&self, instance: Instance) -> Result<Rc<Q>, Error> {
        let capability = self
            .satisfying(TypeId::of::<Q>())
            .ok_or(Error::ResolveFailed(type_name::<Q>()))?;
        capability
            .cast(instance)?
            .downcast::<Rc<Q>>()
            .map(|instance| *instance)
            .map_err(|_| Error::ResolveFailed(type_name::<Q>()))
    }
}

impl Debug for RegistrationRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRecord")
            .field("capability", &self.capability)
            .field("implementation", &self.implementation)
            .field("lazy", &self.lazy.get())
            .finish_non_exhaustive()
    }
}

/// Returned by a successful registration, allows to tune the new record
#[derive(Debug, Clone)]
pub struct RegistrationHandle {
    record: Rc<RegistrationRecord>,
}

impl RegistrationHandle {
    #[inline]
    pub(crate) fn new(record: Rc<RegistrationRecord>) -> Self {
        Self { record }
    }

    /// Excludes the record from the eager [`Resolver::resolve_non_lazy`] sweep,
    /// so the instance is only built on the first explicit resolution
    #[inline]
    pub fn lazy(self) -> Self {
        self.record.lazy.set(true);
        self
    }

    /// The registered record
    #[inline]
    pub fn record(&self) -> &RegistrationRecord {
        &self.record
    }
}
