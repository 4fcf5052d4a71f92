//! Type-keyed table of registration records

use crate::{
    Construct, Resolver,
    error::Error,
    key::{OrderedTypeMap, TypeKey},
    resolver::{GenericFactory, factory::erase},
};
use indexmap::map::Entry;
use std::{
    any::TypeId,
    cell::{Cell, RefCell},
    fmt::{Debug, Formatter},
    rc::Rc,
};

pub use self::{
    capability::{Capabilities, CapabilityKind, Component, Upcast},
    record::{RegistrationHandle, RegistrationRecord},
};

pub(crate) use self::{capability::Instance, record::FactoryFn};

pub mod capability;
pub mod record;

/// Invoked with every record added by [`Registry::register`] and friends
type Listener = Rc<dyn Fn(&RegistrationRecord) -> Result<(), Error>>;

/// Identifies a listener attached with [`Registry::on_registered`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct RegistryInner {
    records: RefCell<OrderedTypeMap<Rc<RegistrationRecord>>>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    next_listener: Cell<u64>,
}

/// Maps capability types to their producers.
///
/// A cheap handle: clones share the same table.
/// Records keep registration order, and at most one record exists per capability type.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Rc<RegistryInner>,
}

impl Debug for Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("records", &self.inner.records.borrow().len())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

impl Registry {
    /// Creates an empty registry
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `I` as the producer of capability `C`, built by `factory`.
    ///
    /// The factory arguments are extracted from the resolver, see [`FromResolver`](crate::FromResolver).
    ///
    /// # Example
    /// ```
    /// use dem_container::{Registry, Resolver, component};
    ///
    /// trait Greeter { fn greet(&self) -> String; }
    ///
    /// struct English;
    /// impl Greeter for English { fn greet(&self) -> String { "hello".into() } }
    /// component!(English => dyn Greeter);
    ///
    /// let registry = Registry::new();
    /// registry.register::<dyn Greeter, English, _, _>(|| Ok(English)).unwrap();
    ///
    /// let resolver = Resolver::new(registry);
    /// let greeter = resolver.resolve::<dyn Greeter>().unwrap();
    /// assert_eq!(greeter.greet(), "hello");
    /// ```
    pub fn register<C, I, F, Args>(&self, factory: F) -> Result<RegistrationHandle, Error>
    where
        C: ?Sized + 'static,
        I: Component + Upcast<C>,
        F: GenericFactory<Args, Output = I>,
    {
        self.add(RegistrationRecord::new::<C, I>(erase(factory)))
    }

    /// Registers `I` as the producer of capability `C`, built by its [`Construct`] impl
    pub fn register_type<C, I>(&self) -> Result<RegistrationHandle, Error>
    where
        C: ?Sized + 'static,
        I: Component + Construct + Upcast<C>,
    {
        self.register::<C, I, _, _>(|resolver: Resolver| I::construct(&resolver))
    }

    /// Registers an already built instance as the producer of capability `C`
    pub fn register_instance<C, I>(&self, instance: I) -> Result<RegistrationHandle, Error>
    where
        C: ?Sized + 'static,
        I: Component + Upcast<C>,
    {
        let instance = Rc::new(instance);
        let factory: FactoryFn = Box::new(move |_: &Resolver| Ok(instance.clone() as Instance));
        self.add(RegistrationRecord::new::<C, I>(factory))
    }

    /// Same as [`Registry::register`], but returns `Ok(None)` if `C` is already registered
    pub fn try_register<C, I, F, Args>(&self, factory: F) -> Result<Option<RegistrationHandle>, Error>
    where
        C: ?Sized + 'static,
        I: Component + Upcast<C>,
        F: GenericFactory<Args, Output = I>,
    {
        if self.contains::<C>() {
            return Ok(None);
        }
        self.register::<C, I, F, Args>(factory).map(Some)
    }

    /// Same as [`Registry::register_type`], but returns `Ok(None)` if `C` is already registered
    pub fn try_register_type<C, I>(&self) -> Result<Option<RegistrationHandle>, Error>
    where
        C: ?Sized + 'static,
        I: Component + Construct + Upcast<C>,
    {
        if self.contains::<C>() {
            return Ok(None);
        }
        self.register_type::<C, I>().map(Some)
    }

    /// Whether capability `C` has a record
    #[inline]
    pub fn contains<C: ?Sized + 'static>(&self) -> bool {
        self.inner.records.borrow().contains_key(&TypeId::of::<C>())
    }

    /// Returns the record of the capability type `id`
    #[inline]
    pub fn get(&self, id: TypeId) -> Option<Rc<RegistrationRecord>> {
        self.inner.records.borrow().get(&id).cloned()
    }

    /// Snapshot of all records in registration order
    #[inline]
    pub fn records(&self) -> Vec<Rc<RegistrationRecord>> {
        self.inner.records.borrow().values().cloned().collect()
    }

    /// Number of registered capability types
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.records.borrow().len()
    }

    /// Whether nothing is registered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.records.borrow().is_empty()
    }

    /// Overlays all records of `other` onto this registry.
    ///
    /// Records of capability types present in both are replaced silently
    /// and no registration event is raised.
    pub fn copy_registrations_from(&self, other: &Registry) {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            return;
        }
        let copied = other.inner.records.borrow().clone();
        let count = copied.len();
        self.inner.records.borrow_mut().extend(copied);
        tracing::debug!(count, "copied registrations");
    }

    /// Attaches a listener invoked synchronously with every newly added record.
    ///
    /// A listener error is returned from the registering call, the record stays registered.
    pub fn on_registered<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&RegistrationRecord) -> Result<(), Error> + 'static,
    {
        let id = ListenerId(self.inner.next_listener.get());
        self.inner.next_listener.set(id.0 + 1);
        self.inner.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Detaches a listener, returns `false` if it was not attached
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        before != listeners.len()
    }

    fn add(&self, record: RegistrationRecord) -> Result<RegistrationHandle, Error> {
        let capability = record.capability_type();
        if capability.is_generic() {
            return Err(Error::GenericTypeUnsupported(capability.name()));
        }

        let record = Rc::new(record);
        match self.inner.records.borrow_mut().entry(capability.id()) {
            Entry::Occupied(_) => {
                tracing::error!(capability = capability.name(), "duplicate registration");
                return Err(Error::DuplicateRegistration(capability.name()));
            }
            Entry::Vacant(entry) => {
                entry.insert(record.clone());
            }
        }

        tracing::debug!(
            capability = capability.name(),
            implementation = record.implementation_type().name(),
            "registered"
        );

        self.notify(&record)?;
        Ok(RegistrationHandle::new(record))
    }

    fn notify(&self, record: &RegistrationRecord) -> Result<(), Error> {
        let listeners = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect::<Vec<_>>();
        listeners.iter().try_for_each(|listener| listener(record))
    }
}
