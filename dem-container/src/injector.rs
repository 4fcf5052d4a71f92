//! Member injection into already constructed instances

use crate::{
    Resolver,
    error::Error,
    instrument::{Operation, OperationHook, OperationKind},
    metadata::{Injectable, InjectionMetadataMap},
};
use std::{
    any::{Any, type_name},
    cell::{Cell, RefCell},
    collections::{HashMap, hash_map::Entry},
    fmt::{Debug, Formatter},
    rc::{Rc, Weak},
    time::Instant,
};

/// Tracked instances are swept of dropped entries once their count reaches this
const MIN_SWEEP_AT: usize = 64;

/// Instances injected so far, keyed by the address of their allocation.
///
/// Each entry holds a `Weak` to its instance, which keeps the allocation
/// reserved, so an address cannot be handed to another instance while tracked.
struct InjectedSet {
    instances: HashMap<usize, Weak<dyn Any>>,
    sweep_at: usize,
}

impl InjectedSet {
    fn new() -> Self {
        Self {
            instances: HashMap::new(),
            sweep_at: MIN_SWEEP_AT,
        }
    }

    /// Starts tracking `instance`, returns `false` if it is tracked already
    fn insert<T: 'static>(&mut self, instance: &Rc<RefCell<T>>) -> bool {
        if self.instances.len() >= self.sweep_at {
            self.sweep();
        }
        match self.instances.entry(address(instance)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                let weak: Weak<dyn Any> = Rc::<RefCell<T>>::downgrade(instance);
                entry.insert(weak);
                true
            }
        }
    }

    fn contains<T: 'static>(&self, instance: &Rc<RefCell<T>>) -> bool {
        self.instances.contains_key(&address(instance))
    }

    fn remove<T: 'static>(&mut self, instance: &Rc<RefCell<T>>) -> bool {
        self.instances.remove(&address(instance)).is_some()
    }

    /// Number of tracked instances that are still alive
    fn live(&self) -> usize {
        self.instances
            .values()
            .filter(|instance| instance.strong_count() > 0)
            .count()
    }

    fn sweep(&mut self) {
        let before = self.instances.len();
        self.instances.retain(|_, instance| instance.strong_count() > 0);
        self.sweep_at = (self.instances.len() * 2).max(MIN_SWEEP_AT);
        tracing::trace!(
            dropped = before - self.instances.len(),
            live = self.instances.len(),
            "swept injected instances"
        );
    }
}

#[inline]
fn address<T>(instance: &Rc<T>) -> usize {
    Rc::as_ptr(instance).addr()
}

struct InjectorInner {
    resolver: Resolver,
    metadata: InjectionMetadataMap,
    injected: RefCell<InjectedSet>,
    injections: Cell<usize>,
    hook: Option<OperationHook>,
}

/// Fills the injection points of existing instances with resolved dependencies.
///
/// Instances are shared as `Rc<RefCell<T>>`, and each allocation is injected
/// at most once. Moving or cloning the `Rc` keeps the identity; a newly
/// allocated instance is always a new one.
#[derive(Clone)]
pub struct Injector {
    inner: Rc<InjectorInner>,
}

impl Debug for Injector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("metadata", &self.inner.metadata)
            .field("injected", &self.injected_len())
            .field("injections", &self.inner.injections.get())
            .finish_non_exhaustive()
    }
}

impl Injector {
    /// Creates an injector resolving dependencies through `resolver`
    #[inline]
    pub fn new(resolver: Resolver) -> Self {
        Self::with_hook(resolver, None)
    }

    /// Creates an injector that reports every injected hierarchy level to `hook`
    pub fn with_hook(resolver: Resolver, hook: Option<OperationHook>) -> Self {
        Self {
            inner: Rc::new(InjectorInner {
                resolver,
                metadata: InjectionMetadataMap::new(),
                injected: RefCell::new(InjectedSet::new()),
                injections: Cell::new(0),
                hook,
            }),
        }
    }

    /// The resolver dependencies are taken from
    #[inline]
    pub fn resolver(&self) -> &Resolver {
        &self.inner.resolver
    }

    /// The hierarchy metadata collected so far
    #[inline]
    pub fn metadata(&self) -> &InjectionMetadataMap {
        &self.inner.metadata
    }

    /// Injects `instance`, then its base levels, most derived first.
    ///
    /// Does nothing if the instance was injected before. A failed resolution
    /// is returned as is; members set before the failure keep their values.
    /// The instance stays borrowed mutably while its members are set.
    pub fn inject<T: Injectable>(&self, instance: &Rc<RefCell<T>>) -> Result<InjectionBuilder<'_>, Error> {
        let injected = self.inject_instance(instance)?;
        Ok(InjectionBuilder {
            injector: self,
            injected,
        })
    }

    /// Same as [`inject`](Self::inject), but a missing instance is logged and skipped
    pub fn inject_optional<T: Injectable>(
        &self,
        instance: Option<&Rc<RefCell<T>>>,
    ) -> Result<InjectionBuilder<'_>, Error> {
        match instance {
            Some(instance) => self.inject(instance),
            None => {
                self.missing::<T>();
                Ok(InjectionBuilder {
                    injector: self,
                    injected: false,
                })
            }
        }
    }

    /// Whether `instance` was already injected
    #[inline]
    pub fn is_injected<T: 'static>(&self, instance: &Rc<RefCell<T>>) -> bool {
        self.inner.injected.borrow().contains(instance)
    }

    /// Forgets `instance`, so the next [`inject`](Self::inject) runs again.
    ///
    /// Returns `false` if it was not injected.
    pub fn forget<T: 'static>(&self, instance: &Rc<RefCell<T>>) -> bool {
        self.inner.injected.borrow_mut().remove(instance)
    }

    /// Number of injected instances that are still alive
    #[inline]
    pub fn injected_len(&self) -> usize {
        self.inner.injected.borrow().live()
    }

    /// Number of injections performed, including those of dropped instances
    #[inline]
    pub fn injections(&self) -> usize {
        self.inner.injections.get()
    }

    fn inject_instance<T: Injectable>(&self, instance: &Rc<RefCell<T>>) -> Result<bool, Error> {
        if self.is_injected(instance) {
            tracing::trace!(type_name = type_name::<T>(), "already injected");
            return Ok(false);
        }
        let mut instance_ref = instance.try_borrow_mut().map_err(|_| {
            let err = Error::InstanceBorrowed(type_name::<T>());
            tracing::error!(%err, "injection failed");
            err
        })?;
        self.inner.injected.borrow_mut().insert(instance);
        self.inner.injections.set(self.inner.injections.get() + 1);

        let Some(mut level) = self.inner.metadata.check::<T>() else {
            return Ok(true);
        };
        let mut target: &mut dyn Any = &mut *instance_ref;
        loop {
            let started = Instant::now();
            let members = level.members();
            for member in members.members() {
                member
                    .inject(target, &self.inner.resolver)
                    .inspect_err(|err| {
                        tracing::error!(
                            type_name = members.key().name(),
                            member = member.name(),
                            %err,
                            "injection failed"
                        )
                    })?;
            }
            if members.has_members() {
                tracing::trace!(type_name = members.key().name(), "injected");
                self.report(members.key().name(), started);
            }

            let Some(base) = level.base().filter(|base| !base.is_empty_chain()).cloned() else {
                break;
            };
            let link = members.base().ok_or(Error::ResolveFailed(base.key().name()))?;
            target = link
                .upcast(target)
                .ok_or(Error::ResolveFailed(link.key().name()))?;
            level = base;
        }
        Ok(true)
    }

    #[inline]
    fn missing<T>(&self) {
        tracing::warn!(error = %Error::NullInstance(type_name::<T>()), "injection skipped");
    }

    #[inline]
    fn report(&self, type_name: &'static str, started: Instant) {
        if let Some(hook) = &self.inner.hook {
            hook(&Operation::new(OperationKind::Inject, type_name, started.elapsed()));
        }
    }
}

/// Returned by [`Injector::inject`] to continue injecting related objects
#[derive(Debug)]
pub struct InjectionBuilder<'a> {
    injector: &'a Injector,
    injected: bool,
}

impl InjectionBuilder<'_> {
    /// Whether the call injected the instance, `false` if it was injected before or missing
    #[inline]
    pub fn was_injected(&self) -> bool {
        self.injected
    }

    /// Injects each child object, skipping the missing ones
    pub fn children<'c, U, I>(self, children: I) -> Result<Self, Error>
    where
        U: Injectable,
        I: IntoIterator<Item = Option<&'c Rc<RefCell<U>>>>,
    {
        for child in children {
            match child {
                Some(child) => {
                    self.injector.inject_instance(child)?;
                }
                None => self.injector.missing::<U>(),
            }
        }
        Ok(self)
    }
}
