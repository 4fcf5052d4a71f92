//! Injection points declared by an injectable type

use super::map::{InjectionMetadataMap, TypeInjectionMetadata};
use crate::{Resolver, error::Error, key::TypeKey, resolver::FromResolver};
use std::{
    any::{Any, TypeId, type_name},
    marker::PhantomData,
    rc::Rc,
};

/// Resolves a dependency and hands it to one member of the target
type MemberFn = Box<dyn Fn(&mut dyn Any, &Resolver) -> Result<(), Error>>;

/// Projects a type onto the value of its base type
type Upcaster = Box<dyn Fn(&mut dyn Any) -> Option<&mut dyn Any>>;

/// Builds the metadata of the base type
type BaseMetadataFn = fn(&InjectionMetadataMap) -> Rc<TypeInjectionMetadata>;

/// A type with members that receive resolved dependencies after construction.
///
/// The implementation declares the injection points of its own level and,
/// optionally, the field holding its base type, which is walked afterwards.
///
/// ```
/// use std::rc::Rc;
/// use dem_container::{Injectable, InjectionPoints};
///
/// trait Logger {}
///
/// #[derive(Default)]
/// struct Widget {
///     logger: Option<Rc<dyn Logger>>,
/// }
///
/// impl Injectable for Widget {
///     fn injection_points(points: &mut InjectionPoints<Self>) {
///         points.field("logger", |this: &mut Self, logger: Rc<dyn Logger>| {
///             this.logger = Some(logger);
///         });
///     }
/// }
/// ```
pub trait Injectable: 'static {
    /// Declares the injection points of `Self`
    fn injection_points(points: &mut InjectionPoints<Self>)
    where
        Self: Sized;
}

/// Kind of an injection point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// A field assigned directly
    Field,
    /// A value passed to a setter
    Property,
    /// A method invoked with resolved arguments
    Method,
}

/// One injectable member with its type-erased setter
pub struct InjectionMember {
    kind: MemberKind,
    name: &'static str,
    inject: MemberFn,
}

impl InjectionMember {
    fn new<T, D, F>(kind: MemberKind, name: &'static str, apply: F) -> Self
    where
        T: 'static,
        D: FromResolver,
        F: Fn(&mut T, D) + 'static,
    {
        let inject: MemberFn = Box::new(move |target: &mut dyn Any, resolver: &Resolver| {
            let value = D::from_resolver(resolver)?;
            let this = target
                .downcast_mut::<T>()
                .ok_or(Error::ResolveFailed(type_name::<T>()))?;
            apply(this, value);
            Ok(())
        });
        Self { kind, name, inject }
    }

    /// Kind of the member
    #[inline]
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Name of the member, used in diagnostics
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub(crate) fn inject(&self, target: &mut dyn Any, resolver: &Resolver) -> Result<(), Error> {
        (self.inject)(target, resolver)
    }
}

/// Link from a type to the field holding its base type
pub(crate) struct BaseLink {
    key: TypeKey,
    upcast: Upcaster,
    metadata: BaseMetadataFn,
}

impl BaseLink {
    #[inline]
    pub(crate) fn key(&self) -> TypeKey {
        self.key
    }

    #[inline]
    pub(crate) fn metadata(&self, map: &InjectionMetadataMap) -> Rc<TypeInjectionMetadata> {
        (self.metadata)(map)
    }

    #[inline]
    pub(crate) fn upcast<'a>(&self, target: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        (self.upcast)(target)
    }
}

/// Pins the signature of a projection closure to be higher-ranked
#[inline]
fn upcaster<F>(f: F) -> F
where
    F: Fn(&mut dyn Any) -> Option<&mut dyn Any>,
{
    f
}

/// Collects the injection points declared by [`Injectable::injection_points`]
pub struct InjectionPoints<T> {
    pub(crate) fields: Vec<InjectionMember>,
    pub(crate) properties: Vec<InjectionMember>,
    pub(crate) methods: Vec<InjectionMember>,
    pub(crate) base: Option<BaseLink>,
    _marker: PhantomData<fn(&mut T)>,
}

impl<T: 'static> InjectionPoints<T> {
    pub(crate) fn new() -> Self {
        Self {
            fields: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            base: None,
            _marker: PhantomData,
        }
    }

    /// Declares a field receiving a resolved `D`
    pub fn field<D, F>(&mut self, name: &'static str, set: F) -> &mut Self
    where
        D: FromResolver,
        F: Fn(&mut T, D) + 'static,
    {
        self.fields.push(InjectionMember::new(MemberKind::Field, name, set));
        self
    }

    /// Declares a property whose setter receives a resolved `D`
    pub fn property<D, F>(&mut self, name: &'static str, set: F) -> &mut Self
    where
        D: FromResolver,
        F: Fn(&mut T, D) + 'static,
    {
        self.properties.push(InjectionMember::new(MemberKind::Property, name, set));
        self
    }

    /// Declares a method invoked with resolved arguments, usually a tuple
    pub fn method<Args, F>(&mut self, name: &'static str, invoke: F) -> &mut Self
    where
        Args: FromResolver,
        F: Fn(&mut T, Args) + 'static,
    {
        self.methods.push(InjectionMember::new(MemberKind::Method, name, invoke));
        self
    }

    /// Declares the field holding the base type, injected after `T` itself
    pub fn base<B, F>(&mut self, project: F) -> &mut Self
    where
        B: Injectable,
        F: Fn(&mut T) -> &mut B + 'static,
    {
        if TypeId::of::<B>() == TypeId::of::<T>() {
            tracing::warn!(type_name = type_name::<T>(), "a type cannot be its own base, ignored");
            return self;
        }
        let upcast = upcaster(move |target| {
            target
                .downcast_mut::<T>()
                .map(|this| project(this) as &mut dyn Any)
        });
        self.base = Some(BaseLink {
            key: TypeKey::of::<B>(),
            upcast: Box::new(upcast),
            metadata: InjectionMetadataMap::metadata::<B>,
        });
        self
    }

    /// Whether no member is declared on this level
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.properties.is_empty() && self.methods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, Registry, Resolver};

    struct Counter(u32);
    struct Name(&'static str);

    impl Component for Counter {}
    impl Component for Name {}

    #[derive(Default)]
    struct Base {
        counter: Option<Rc<Counter>>,
    }

    #[derive(Default)]
    struct Derived {
        base: Base,
        name: Option<Rc<Name>>,
        calls: u32,
    }

    impl Injectable for Base {
        fn injection_points(points: &mut InjectionPoints<Self>) {
            points.field("counter", |this: &mut Self, counter: Rc<Counter>| this.counter = Some(counter));
        }
    }

    impl Injectable for Derived {
        fn injection_points(points: &mut InjectionPoints<Self>) {
            points
                .base(|this: &mut Self| &mut this.base)
                .property("name", |this: &mut Self, name: Rc<Name>| this.name = Some(name))
                .method("init", |this: &mut Self, (): ()| this.calls += 1);
        }
    }

    fn points<T: Injectable>() -> InjectionPoints<T> {
        let mut points = InjectionPoints::new();
        T::injection_points(&mut points);
        points
    }

    #[test]
    fn it_collects_members_by_kind() {
        let points = points::<Derived>();

        assert!(points.fields.is_empty());
        assert_eq!(points.properties[0].kind(), MemberKind::Property);
        assert_eq!(points.properties[0].name(), "name");
        assert_eq!(points.methods[0].kind(), MemberKind::Method);
        assert_eq!(points.base.as_ref().map(|b| b.key()), Some(TypeKey::of::<Base>()));
    }

    #[test]
    fn it_injects_member_into_erased_target() {
        let registry = Registry::new();
        registry.register_instance::<Name, Name>(Name("widget")).unwrap();
        let resolver = Resolver::new(registry);
        let points = points::<Derived>();
        let mut derived = Derived::default();

        points.properties[0].inject(&mut derived, &resolver).unwrap();
        points.methods[0].inject(&mut derived, &resolver).unwrap();

        assert_eq!(derived.name.as_ref().map(|name| name.0), Some("widget"));
        assert_eq!(derived.calls, 1);
    }

    #[test]
    fn it_projects_onto_base() {
        let registry = Registry::new();
        registry.register_instance::<Counter, Counter>(Counter(3)).unwrap();
        let resolver = Resolver::new(registry);
        let points = points::<Derived>();
        let base_points = self::points::<Base>();
        let mut derived = Derived::default();

        let base = points.base.as_ref().unwrap().upcast(&mut derived).unwrap();
        base_points.fields[0].inject(base, &resolver).unwrap();

        assert_eq!(derived.base.counter.map(|counter| counter.0), Some(3));
    }

    #[test]
    fn it_rejects_foreign_target() {
        let resolver = Resolver::new(Registry::new());
        let points = points::<Derived>();
        let mut other = 5_u8;

        let result = points.methods[0].inject(&mut other, &resolver);

        assert!(matches!(result, Err(Error::ResolveFailed(_))));
    }
}
