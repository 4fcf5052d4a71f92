//! Memoized injection points per type

use super::points::{BaseLink, Injectable, InjectionMember, InjectionPoints};
use crate::key::{TypeKey, TypeMap};
use std::{any::TypeId, cell::RefCell, rc::Rc};

/// Injectable members of one type level, collected once
pub struct InjectableMembers {
    key: TypeKey,
    fields: Vec<InjectionMember>,
    properties: Vec<InjectionMember>,
    methods: Vec<InjectionMember>,
    base: Option<BaseLink>,
}

impl InjectableMembers {
    fn collect<T: Injectable>() -> Self {
        let mut points = InjectionPoints::<T>::new();
        T::injection_points(&mut points);
        Self {
            key: TypeKey::of::<T>(),
            fields: points.fields,
            properties: points.properties,
            methods: points.methods,
            base: points.base,
        }
    }

    /// The type these members belong to
    #[inline]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Injectable fields in declaration order
    #[inline]
    pub fn fields(&self) -> &[InjectionMember] {
        &self.fields
    }

    /// Injectable properties in declaration order
    #[inline]
    pub fn properties(&self) -> &[InjectionMember] {
        &self.properties
    }

    /// Injectable methods in declaration order
    #[inline]
    pub fn methods(&self) -> &[InjectionMember] {
        &self.methods
    }

    /// Whether this level declares any member
    #[inline]
    pub fn has_members(&self) -> bool {
        !(self.fields.is_empty() && self.properties.is_empty() && self.methods.is_empty())
    }

    /// Fields, then properties, then methods
    #[inline]
    pub(crate) fn members(&self) -> impl Iterator<Item = &InjectionMember> {
        self.fields.iter().chain(&self.properties).chain(&self.methods)
    }

    #[inline]
    pub(crate) fn base(&self) -> Option<&BaseLink> {
        self.base.as_ref()
    }
}

/// Collects the injection points of a type on first request and keeps them
/// for the lifetime of the cache
#[derive(Default)]
pub struct TypeMetadataCache {
    members: RefCell<TypeMap<Rc<InjectableMembers>>>,
}

impl TypeMetadataCache {
    /// Creates an empty cache
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the injectable members declared by `T` itself
    pub fn members<T: Injectable>(&self) -> Rc<InjectableMembers> {
        let id = TypeId::of::<T>();
        if let Some(members) = self.members.borrow().get(&id) {
            return members.clone();
        }

        let members = Rc::new(InjectableMembers::collect::<T>());
        tracing::trace!(
            type_name = members.key().name(),
            fields = members.fields.len(),
            properties = members.properties.len(),
            methods = members.methods.len(),
            "collected injection points"
        );
        self.members.borrow_mut().insert(id, members.clone());
        members
    }

    /// Number of cached types
    #[inline]
    pub fn len(&self) -> usize {
        self.members.borrow().len()
    }

    /// Whether no type is cached
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    thread_local! {
        static COLLECTED: Cell<u32> = const { Cell::new(0) };
    }

    struct Plain;

    struct Tracked;

    impl Injectable for Plain {
        fn injection_points(_: &mut InjectionPoints<Self>) {}
    }

    impl Injectable for Tracked {
        fn injection_points(points: &mut InjectionPoints<Self>) {
            COLLECTED.with(|c| c.set(c.get() + 1));
            points.method("start", |_: &mut Self, (): ()| {});
        }
    }

    #[test]
    fn it_collects_once_per_type() {
        let cache = TypeMetadataCache::new();

        let first = cache.members::<Tracked>();
        let second = cache.members::<Tracked>();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(COLLECTED.with(Cell::get), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn it_reports_levels_without_members() {
        let cache = TypeMetadataCache::new();

        assert!(!cache.members::<Plain>().has_members());
        assert!(cache.members::<Tracked>().has_members());
        assert_eq!(cache.members::<Tracked>().methods().len(), 1);
        assert_eq!(cache.members::<Tracked>().key(), TypeKey::of::<Tracked>());
    }
}
