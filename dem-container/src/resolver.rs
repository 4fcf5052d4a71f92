//! Lazy singleton resolution over the registry

use crate::{
    error::Error,
    instrument::{Operation, OperationHook, OperationKind},
    key::{TypeKey, TypeMap},
    registry::{Instance, Registry, RegistrationRecord},
};
use std::{
    any::TypeId,
    cell::RefCell,
    fmt::{Debug, Formatter},
    rc::Rc,
    time::Instant,
};

pub use self::{factory::GenericFactory, from_resolver::FromResolver};

pub mod factory;
pub mod from_resolver;

struct ResolverInner {
    registry: Registry,
    resolved: RefCell<TypeMap<Instance>>,
    pending: RefCell<Vec<TypeKey>>,
    hook: Option<OperationHook>,
}

/// Resolves capabilities registered in a [`Registry`] and caches one instance per capability.
///
/// A cheap handle: clones share the same cache.
#[derive(Clone)]
pub struct Resolver {
    inner: Rc<ResolverInner>,
}

impl Debug for Resolver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("registry", &self.inner.registry)
            .field("resolved", &self.inner.resolved.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Keeps a capability on the pending stack for the duration of its factory call
struct PendingGuard<'a> {
    pending: &'a RefCell<Vec<TypeKey>>,
}

impl<'a> PendingGuard<'a> {
    fn enter(pending: &'a RefCell<Vec<TypeKey>>, key: TypeKey) -> Result<Self, Error> {
        let mut stack = pending.borrow_mut();
        if stack.contains(&key) {
            tracing::error!(
                capability = key.name(),
                chain = ?stack.as_slice(),
                "cyclic dependency"
            );
            return Err(Error::CyclicDependency(key.name()));
        }
        stack.push(key);
        Ok(Self { pending })
    }
}

impl Drop for PendingGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.pending.borrow_mut().pop();
    }
}

impl Resolver {
    /// Creates a resolver over `registry` with an empty cache
    #[inline]
    pub fn new(registry: Registry) -> Self {
        Self::with_hook(registry, None)
    }

    /// Creates a resolver that reports every resolution to `hook`
    pub fn with_hook(registry: Registry, hook: Option<OperationHook>) -> Self {
        Self {
            inner: Rc::new(ResolverInner {
                registry,
                resolved: RefCell::default(),
                pending: RefCell::default(),
                hook,
            }),
        }
    }

    /// The registry this resolver reads from
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Resolves the singleton of capability `C`, building it on first use.
    ///
    /// Every call for the same capability returns the same instance.
    pub fn resolve<C: ?Sized + 'static>(&self) -> Result<Rc<C>, Error> {
        let key = TypeKey::of::<C>();
        let record = self
            .inner
            .registry
            .get(key.id())
            .ok_or(Error::UnregisteredType(key.name()))?;
        let instance = self.resolve_record(&record)?;
        record.cast::<C>(instance)
    }

    /// Resolves every registration whose capability, implementation, supertype
    /// or one of its interfaces is `Q`, in registration order
    pub fn resolve_all_assignable<Q: ?Sized + 'static>(&self) -> Result<Vec<Rc<Q>>, Error> {
        let query = TypeId::of::<Q>();
        self.inner
            .registry
            .records()
            .iter()
            .filter(|record| record.satisfies(query))
            .map(|record| {
                let instance = self.resolve_record(record)?;
                record.cast::<Q>(instance)
            })
            .collect()
    }

    /// Resolves every non-lazy registration that is not cached yet.
    ///
    /// Returns the number of instances built by the sweep.
    pub fn resolve_non_lazy(&self) -> Result<usize, Error> {
        let mut built = 0;
        for record in self.inner.registry.records() {
            if record.is_lazy() || self.is_cached(record.capability_type().id()) {
                continue;
            }
            self.resolve_record(&record)?;
            built += 1;
        }
        tracing::debug!(built, "resolved non-lazy registrations");
        Ok(built)
    }

    /// Whether the singleton of capability `C` is already cached
    #[inline]
    pub fn is_resolved<C: ?Sized + 'static>(&self) -> bool {
        self.is_cached(TypeId::of::<C>())
    }

    /// Number of cached singletons
    #[inline]
    pub fn resolved_len(&self) -> usize {
        self.inner.resolved.borrow().len()
    }

    /// Overlays the cached instances of `other` onto this resolver.
    ///
    /// Registrations are not copied.
    pub fn copy_resolvings_from(&self, other: &Resolver) {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            return;
        }
        let copied = other.inner.resolved.borrow().clone();
        let count = copied.len();
        self.inner.resolved.borrow_mut().extend(copied);
        tracing::debug!(count, "copied resolvings");
    }

    /// Returns the cached instance of the record or runs its factory
    pub(crate) fn resolve_record(&self, record: &RegistrationRecord) -> Result<Instance, Error> {
        let key = record.capability_type();
        if let Some(instance) = self.inner.resolved.borrow().get(&key.id()) {
            return Ok(instance.clone());
        }

        let started = Instant::now();
        let instance = {
            let _pending = PendingGuard::enter(&self.inner.pending, key)?;
            record.produce(self)?
        };

        let instance = self
            .inner
            .resolved
            .borrow_mut()
            .entry(key.id())
            .or_insert(instance)
            .clone();

        tracing::trace!(
            capability = key.name(),
            implementation = record.implementation_type().name(),
            "resolved"
        );
        self.report(OperationKind::Resolve, key, started);
        Ok(instance)
    }

    #[inline]
    fn is_cached(&self, id: TypeId) -> bool {
        self.inner.resolved.borrow().contains_key(&id)
    }

    #[inline]
    fn report(&self, kind: OperationKind, key: TypeKey, started: Instant) {
        if let Some(hook) = &self.inner.hook {
            hook(&Operation::new(kind, key.name(), started.elapsed()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, component, error::Error};
    use std::cell::{Cell, RefCell};

    trait Service {
        fn id(&self) -> u32;
    }

    trait Marker {}

    #[derive(Default)]
    struct ServiceImpl;

    impl Service for ServiceImpl {
        fn id(&self) -> u32 {
            7
        }
    }

    impl Marker for ServiceImpl {}

    component!(ServiceImpl => dyn Service, dyn Marker);

    struct Consumer {
        service: Rc<dyn Service>,
    }

    impl Component for Consumer {}

    #[derive(Debug, Default)]
    struct A;

    #[derive(Default)]
    struct B;

    #[derive(Default)]
    struct C;

    impl Component for A {}
    impl Component for B {}
    impl Component for C {}

    #[test]
    fn it_resolves_same_instance() {
        let registry = Registry::new();
        registry.register_type::<dyn Service, ServiceImpl>().unwrap();
        let resolver = Resolver::new(registry);

        let first = resolver.resolve::<dyn Service>().unwrap();
        let second = resolver.resolve::<dyn Service>().unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.id(), 7);
    }

    #[test]
    fn it_builds_lazily() {
        let calls = Rc::new(Cell::new(0));
        let registry = Registry::new();
        let counter = calls.clone();
        registry
            .register::<dyn Service, ServiceImpl, _, _>(move || {
                counter.set(counter.get() + 1);
                Ok(ServiceImpl)
            })
            .unwrap();

        let resolver = Resolver::new(registry);
        assert_eq!(calls.get(), 0);

        resolver.resolve::<dyn Service>().unwrap();
        resolver.resolve::<dyn Service>().unwrap();

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn it_fails_on_unregistered_without_caching() {
        let resolver = Resolver::new(Registry::new());

        let result = resolver.resolve::<dyn Service>();

        assert!(matches!(result, Err(Error::UnregisteredType(_))));
        assert_eq!(resolver.resolved_len(), 0);
    }

    #[test]
    fn it_resolves_inner_dependencies() {
        let registry = Registry::new();
        registry.register_type::<dyn Service, ServiceImpl>().unwrap();
        registry
            .register::<Consumer, Consumer, _, _>(|service: Rc<dyn Service>| Ok(Consumer { service }))
            .unwrap();
        let resolver = Resolver::new(registry);

        let consumer = resolver.resolve::<Consumer>().unwrap();
        let service = resolver.resolve::<dyn Service>().unwrap();

        assert!(Rc::ptr_eq(&consumer.service, &service));
    }

    #[test]
    fn it_detects_two_way_dependency() {
        let registry = Registry::new();
        registry.register::<A, A, _, _>(|_: Rc<B>| Ok(A)).unwrap();
        registry.register::<B, B, _, _>(|_: Rc<A>| Ok(B)).unwrap();
        let resolver = Resolver::new(registry);

        let result = resolver.resolve::<A>();

        assert!(matches!(result, Err(Error::CyclicDependency(_))));
        assert!(!resolver.is_resolved::<A>());
        assert!(!resolver.is_resolved::<B>());
        assert!(resolver.inner.pending.borrow().is_empty());
    }

    #[test]
    fn it_detects_self_dependency() {
        let registry = Registry::new();
        registry.register::<A, A, _, _>(|_: Rc<A>| Ok(A)).unwrap();
        let resolver = Resolver::new(registry);

        assert_eq!(
            resolver.resolve::<A>().unwrap_err(),
            Error::CyclicDependency(std::any::type_name::<A>())
        );
    }

    #[test]
    fn it_detects_longer_dependency_cycle() {
        let registry = Registry::new();
        registry.register::<A, A, _, _>(|_: Rc<B>| Ok(A)).unwrap();
        registry.register::<B, B, _, _>(|_: Rc<C>| Ok(B)).unwrap();
        registry.register::<C, C, _, _>(|_: Rc<A>| Ok(C)).unwrap();
        let resolver = Resolver::new(registry);

        let result = resolver.resolve::<B>();

        assert_eq!(result.err(), Some(Error::CyclicDependency(std::any::type_name::<B>())));
        assert_eq!(resolver.resolved_len(), 0);
        assert!(resolver.inner.pending.borrow().is_empty());
    }

    #[test]
    fn it_pops_pending_after_failed_factory() {
        let built = Rc::new(Cell::new(0));
        let counter = built.clone();
        let registry = Registry::new();
        registry
            .register::<A, A, _, _>(move |_: Rc<B>| {
                counter.set(counter.get() + 1);
                Ok(A)
            })
            .unwrap();
        registry
            .register::<B, B, _, _>(|| Err(Error::Other("b is not ready")))
            .unwrap();
        let resolver = Resolver::new(registry);

        assert_eq!(resolver.resolve::<A>().err(), Some(Error::Other("b is not ready")));
        assert!(resolver.inner.pending.borrow().is_empty());
        assert_eq!(resolver.resolve::<A>().err(), Some(Error::Other("b is not ready")));
        assert_eq!(built.get(), 0);
        assert_eq!(resolver.resolved_len(), 0);
    }

    #[test]
    fn it_resolves_once_missing_dependency_is_registered() {
        let registry = Registry::new();
        registry.register::<A, A, _, _>(|_: Rc<B>| Ok(A)).unwrap();
        let resolver = Resolver::new(registry.clone());

        assert!(matches!(resolver.resolve::<A>(), Err(Error::UnregisteredType(_))));
        assert!(resolver.inner.pending.borrow().is_empty());

        registry.register_type::<B, B>().unwrap();

        assert!(resolver.resolve::<A>().is_ok());
        assert!(resolver.is_resolved::<A>());
        assert!(resolver.is_resolved::<B>());
    }

    #[test]
    fn it_resolves_all_assignable_in_registration_order() {
        let registry = Registry::new();
        registry.register_type::<dyn Service, ServiceImpl>().unwrap();
        registry.register_type::<A, A>().unwrap();
        registry.register_type::<ServiceImpl, ServiceImpl>().unwrap();
        let resolver = Resolver::new(registry);

        let direct = resolver.resolve::<dyn Service>().unwrap();
        let markers = resolver.resolve_all_assignable::<dyn Marker>().unwrap();
        let services = resolver.resolve_all_assignable::<dyn Service>().unwrap();

        assert_eq!(markers.len(), 2);
        assert_eq!(services.len(), 2);
        assert!(Rc::ptr_eq(&services[0], &direct));
        assert!(!Rc::ptr_eq(&services[0], &services[1]));
        assert_eq!(resolver.resolved_len(), 2);
    }

    #[test]
    fn it_resolves_non_lazy_only() {
        let registry = Registry::new();
        registry.register_type::<dyn Service, ServiceImpl>().unwrap();
        registry.register_type::<ServiceImpl, ServiceImpl>().unwrap().lazy();
        let resolver = Resolver::new(registry);

        assert_eq!(resolver.resolve_non_lazy().unwrap(), 1);
        assert!(resolver.is_resolved::<dyn Service>());
        assert!(!resolver.is_resolved::<ServiceImpl>());
        assert_eq!(resolver.resolve_non_lazy().unwrap(), 0);
    }

    #[test]
    fn it_copies_resolvings() {
        let registry = Registry::new();
        registry.register_type::<dyn Service, ServiceImpl>().unwrap();

        let scoped = Resolver::new(registry.clone());
        let parent = Resolver::new(registry);
        let instance = scoped.resolve::<dyn Service>().unwrap();

        parent.copy_resolvings_from(&scoped);

        assert!(Rc::ptr_eq(&parent.resolve::<dyn Service>().unwrap(), &instance));
    }

    #[test]
    fn it_reports_resolutions_to_hook() {
        let reported = Rc::new(RefCell::new(Vec::new()));
        let sink = reported.clone();
        let hook: OperationHook = Rc::new(move |op: &Operation| sink.borrow_mut().push((op.kind, op.type_name)));

        let registry = Registry::new();
        registry.register_type::<dyn Service, ServiceImpl>().unwrap();
        let resolver = Resolver::with_hook(registry, Some(hook));

        resolver.resolve::<dyn Service>().unwrap();
        resolver.resolve::<dyn Service>().unwrap();

        assert_eq!(
            *reported.borrow(),
            [(OperationKind::Resolve, std::any::type_name::<dyn Service>())]
        );
    }
}
