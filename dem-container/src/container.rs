//! Composition root tying the registry, resolver, injector and subscription bus together

use crate::{
    Construct,
    config::ContainerConfig,
    error::Error,
    injector::{InjectionBuilder, Injector},
    metadata::Injectable,
    registry::{Component, Registry, RegistrationHandle, Upcast},
    resolver::{GenericFactory, Resolver},
    subscriptions::SubscriptionBus,
};
use std::{
    cell::{OnceCell, RefCell},
    rc::Rc,
};

thread_local! {
    static GLOBAL: OnceCell<Container> = const { OnceCell::new() };
}

/// Represents a container: one [`Registry`] with the [`Resolver`],
/// [`Injector`] and [`SubscriptionBus`] working on it.
///
/// Cloning is cheap, clones share all state.
///
/// # Example
/// ```
/// use std::rc::Rc;
/// use dem_container::{Container, component};
///
/// trait Service {
///     fn name(&self) -> &'static str;
/// }
///
/// #[derive(Default)]
/// struct ServiceImpl;
///
/// impl Service for ServiceImpl {
///     fn name(&self) -> &'static str {
///         "service"
///     }
/// }
///
/// component!(ServiceImpl => dyn Service);
///
/// let container = Container::new();
/// container.register_type::<dyn Service, ServiceImpl>().unwrap();
///
/// let service = container.resolve::<dyn Service>().unwrap();
/// assert_eq!(service.name(), "service");
/// assert!(Rc::ptr_eq(&service, &container.resolve::<dyn Service>().unwrap()));
/// ```
#[derive(Debug, Clone)]
pub struct Container {
    registry: Registry,
    resolver: Resolver,
    injector: Injector,
    subscriptions: SubscriptionBus,
    config: Rc<ContainerConfig>,
}

impl Default for Container {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Creates a container with the default configuration
    ///
    /// Defaults:
    /// - slow_operation_ms: `100`
    /// - instrument: `true`
    #[inline]
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// Creates a container with a specific configuration
    pub fn with_config(config: ContainerConfig) -> Self {
        let hook = config.hook();
        let registry = Registry::new();
        let resolver = Resolver::with_hook(registry.clone(), hook.clone());
        let injector = Injector::with_hook(resolver.clone(), hook);
        let subscriptions = SubscriptionBus::new(resolver.clone());
        tracing::debug!(?config, "container created");
        Self {
            registry,
            resolver,
            injector,
            subscriptions,
            config: Rc::new(config),
        }
    }

    /// Runs `f` with the container of the current thread, creating it with
    /// the default configuration on first use
    pub fn global<R>(f: impl FnOnce(&Container) -> R) -> R {
        GLOBAL.with(|global| f(global.get_or_init(Container::new)))
    }

    /// Creates the container of the current thread with a specific configuration.
    ///
    /// Returns `false` if it already exists.
    pub fn init_global(config: ContainerConfig) -> bool {
        GLOBAL.with(|global| {
            let created = global.set(Container::with_config(config)).is_ok();
            if !created {
                tracing::warn!("global container is already initialized");
            }
            created
        })
    }

    /// The configuration the container was created with
    #[inline]
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// The registration table
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The singleton resolver
    #[inline]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// The member injector
    #[inline]
    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    /// The subscription bus
    #[inline]
    pub fn subscriptions(&self) -> &SubscriptionBus {
        &self.subscriptions
    }

    /// Registers a factory producing `I` for capability `C`, see [`Registry::register`]
    #[inline]
    pub fn register<C, I, F, Args>(&self, factory: F) -> Result<RegistrationHandle, Error>
    where
        C: ?Sized + 'static,
        I: Component + Upcast<C>,
        F: GenericFactory<Args, Output = I>,
    {
        self.registry.register::<C, I, F, Args>(factory)
    }

    /// Registers `I` built by its [`Construct`] impl for capability `C`
    #[inline]
    pub fn register_type<C, I>(&self) -> Result<RegistrationHandle, Error>
    where
        C: ?Sized + 'static,
        I: Component + Construct + Upcast<C>,
    {
        self.registry.register_type::<C, I>()
    }

    /// Registers an already built instance for capability `C`
    #[inline]
    pub fn register_instance<C, I>(&self, instance: I) -> Result<RegistrationHandle, Error>
    where
        C: ?Sized + 'static,
        I: Component + Upcast<C>,
    {
        self.registry.register_instance::<C, I>(instance)
    }

    /// Resolves the singleton of capability `C`
    #[inline]
    pub fn resolve<C: ?Sized + 'static>(&self) -> Result<Rc<C>, Error> {
        self.resolver.resolve::<C>()
    }

    /// Resolves every producer assignable to `Q`, in registration order
    #[inline]
    pub fn resolve_all_assignable<Q: ?Sized + 'static>(&self) -> Result<Vec<Rc<Q>>, Error> {
        self.resolver.resolve_all_assignable::<Q>()
    }

    /// Builds every non-lazy registration, see [`Resolver::resolve_non_lazy`]
    #[inline]
    pub fn resolve_non_lazy(&self) -> Result<usize, Error> {
        self.resolver.resolve_non_lazy()
    }

    /// Injects the members of `instance` and of its base levels
    #[inline]
    pub fn inject<T: Injectable>(&self, instance: &Rc<RefCell<T>>) -> Result<InjectionBuilder<'_>, Error> {
        self.injector.inject(instance)
    }

    /// Subscribes `callback` to every current and future producer of `Q`
    #[inline]
    pub fn subscribe<Q, F>(&self, callback: F) -> Result<(), Error>
    where
        Q: ?Sized + 'static,
        F: Fn(Rc<Q>) + 'static,
    {
        self.subscriptions.subscribe::<Q, F>(callback)
    }
}
