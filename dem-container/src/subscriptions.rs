//! Callbacks notified of every current and future producer of a capability

use crate::{
    Resolver,
    error::Error,
    key::{TypeKey, TypeMap},
    registry::{ListenerId, RegistrationRecord},
};
use std::{
    any::{Any, TypeId},
    cell::RefCell,
    fmt::{Debug, Formatter},
    rc::{Rc, Weak},
};

/// Receives a `&Rc<Q>` erased to `&dyn Any`
type Callback = Rc<dyn Fn(&dyn Any)>;

struct SubscriptionRecord {
    callback: Callback,
}

struct BusInner {
    resolver: Resolver,
    subscriptions: RefCell<TypeMap<Vec<SubscriptionRecord>>>,
    listener: RefCell<Option<ListenerId>>,
}

impl Drop for BusInner {
    fn drop(&mut self) {
        if let Some(id) = self.listener.get_mut().take() {
            self.resolver.registry().remove_listener(id);
        }
    }
}

/// Delivers the instances of matching producers to subscribers.
///
/// Listens to the registry for as long as any handle to the bus is alive.
#[derive(Clone)]
pub struct SubscriptionBus {
    inner: Rc<BusInner>,
}

impl Debug for SubscriptionBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionBus")
            .field("subscriptions", &self.inner.subscriptions.borrow().len())
            .finish_non_exhaustive()
    }
}

impl SubscriptionBus {
    /// Creates a bus delivering instances built by `resolver` and attaches it
    /// to the resolver's registry
    pub fn new(resolver: Resolver) -> Self {
        let inner = Rc::new(BusInner {
            resolver,
            subscriptions: RefCell::default(),
            listener: RefCell::default(),
        });

        let weak = Rc::downgrade(&inner);
        let id = inner
            .resolver
            .registry()
            .on_registered(move |record: &RegistrationRecord| notify(&weak, record));
        *inner.listener.borrow_mut() = Some(id);

        Self { inner }
    }

    /// Invokes `callback` with every registered producer assignable to `Q`,
    /// in registration order, and keeps it for producers registered later
    pub fn subscribe<Q, F>(&self, callback: F) -> Result<(), Error>
    where
        Q: ?Sized + 'static,
        F: Fn(Rc<Q>) + 'static,
    {
        let key = TypeKey::of::<Q>();
        let callback = Rc::new(callback);

        let current = self.inner.resolver.resolve_all_assignable::<Q>()?;
        tracing::debug!(capability = key.name(), current = current.len(), "subscribed");
        for instance in current {
            callback(instance);
        }

        let callback: Callback = Rc::new(move |value: &dyn Any| {
            if let Some(instance) = value.downcast_ref::<Rc<Q>>() {
                callback(instance.clone());
            }
        });
        self.inner
            .subscriptions
            .borrow_mut()
            .entry(key.id())
            .or_default()
            .push(SubscriptionRecord { callback });
        Ok(())
    }

    /// Number of callbacks subscribed to `Q`
    #[inline]
    pub fn subscription_len<Q: ?Sized + 'static>(&self) -> usize {
        self.inner
            .subscriptions
            .borrow()
            .get(&TypeId::of::<Q>())
            .map_or(0, Vec::len)
    }

    /// The resolver producer instances are taken from
    #[inline]
    pub fn resolver(&self) -> &Resolver {
        &self.inner.resolver
    }
}

/// Hands a new record to the subscribers of the first type it satisfies,
/// checking the capability, the implementation, the supertype and then the interfaces
fn notify(bus: &Weak<BusInner>, record: &RegistrationRecord) -> Result<(), Error> {
    let Some(bus) = bus.upgrade() else {
        return Ok(());
    };

    let matched = {
        let subscriptions = bus.subscriptions.borrow();
        record.entries().find_map(|entry| {
            subscriptions.get(&entry.key().id()).map(|subscribers| {
                let callbacks = subscribers
                    .iter()
                    .map(|subscriber| subscriber.callback.clone())
                    .collect::<Vec<_>>();
                (entry, callbacks)
            })
        })
    };
    let Some((entry, callbacks)) = matched else {
        return Ok(());
    };

    let instance = bus.resolver.resolve_record(record)?;
    let value = entry.cast(instance)?;
    tracing::debug!(
        capability = record.capability_type().name(),
        matched = entry.key().name(),
        kind = ?entry.kind(),
        subscribers = callbacks.len(),
        "notifying subscribers"
    );
    for callback in callbacks {
        callback(&*value);
    }
    Ok(())
}
