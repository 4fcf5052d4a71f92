//! Per-type injection metadata linked along the base chain

use super::{
    cache::{InjectableMembers, TypeMetadataCache},
    points::Injectable,
};
use crate::key::{TypeKey, TypeMap, TypeSet};
use std::{
    any::TypeId,
    cell::RefCell,
    fmt::{Debug, Formatter},
    rc::Rc,
};

/// Injection metadata of one type and, through [`base`](Self::base), of all its ancestors
pub struct TypeInjectionMetadata {
    members: Rc<InjectableMembers>,
    base: Option<Rc<TypeInjectionMetadata>>,
    empty_chain: bool,
}

impl TypeInjectionMetadata {
    /// Members declared by this level
    #[inline]
    pub fn members(&self) -> &InjectableMembers {
        &self.members
    }

    /// Metadata of the base type, if one is declared
    #[inline]
    pub fn base(&self) -> Option<&Rc<TypeInjectionMetadata>> {
        self.base.as_ref()
    }

    /// The type described by this level
    #[inline]
    pub fn key(&self) -> TypeKey {
        self.members.key()
    }

    /// Whether neither this type nor any ancestor declares a member
    #[inline]
    pub fn is_empty_chain(&self) -> bool {
        self.empty_chain
    }

    /// Number of levels from this type to the root of its chain
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut level = self.base.as_ref();
        while let Some(base) = level {
            depth += 1;
            level = base.base.as_ref();
        }
        depth
    }
}

impl Debug for TypeInjectionMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInjectionMetadata")
            .field("type", &self.key())
            .field("base", &self.base.as_ref().map(|base| base.key()))
            .field("empty_chain", &self.empty_chain)
            .finish()
    }
}

/// Walks type hierarchies and keeps the resulting metadata.
///
/// Types whose whole chain declares nothing to inject are remembered in a
/// skip set, so later checks exit without touching the chain again.
#[derive(Default)]
pub struct InjectionMetadataMap {
    cache: TypeMetadataCache,
    checked: RefCell<TypeMap<Rc<TypeInjectionMetadata>>>,
    skip: RefCell<TypeSet>,
}

impl Debug for InjectionMetadataMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectionMetadataMap")
            .field("checked", &self.checked.borrow().len())
            .field("skipped", &self.skip.borrow().len())
            .finish()
    }
}

impl InjectionMetadataMap {
    /// Creates an empty map
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the metadata of `T`, walking its base chain on first request
    pub fn metadata<T: Injectable>(&self) -> Rc<TypeInjectionMetadata> {
        let id = TypeId::of::<T>();
        if let Some(metadata) = self.checked.borrow().get(&id) {
            return metadata.clone();
        }

        let members = self.cache.members::<T>();
        let base = members.base().map(|link| link.metadata(self));
        let empty_chain = !members.has_members() && base.as_ref().is_none_or(|base| base.is_empty_chain());
        if empty_chain {
            tracing::trace!(type_name = members.key().name(), "nothing to inject in the chain");
            self.skip.borrow_mut().insert(id);
        }

        let metadata = Rc::new(TypeInjectionMetadata {
            members,
            base,
            empty_chain,
        });
        self.checked
            .borrow_mut()
            .entry(id)
            .or_insert(metadata)
            .clone()
    }

    /// Returns the metadata of `T`, or `None` if nothing in its chain is injectable
    pub fn check<T: Injectable>(&self) -> Option<Rc<TypeInjectionMetadata>> {
        if self.is_skipped(TypeId::of::<T>()) {
            return None;
        }
        let metadata = self.metadata::<T>();
        (!metadata.is_empty_chain()).then_some(metadata)
    }

    /// Whether the type is known to have nothing to inject
    #[inline]
    pub fn is_skipped(&self, id: TypeId) -> bool {
        self.skip.borrow().contains(&id)
    }

    /// The per-type member cache
    #[inline]
    pub fn cache(&self) -> &TypeMetadataCache {
        &self.cache
    }

    /// Number of types walked so far
    #[inline]
    pub fn len(&self) -> usize {
        self.checked.borrow().len()
    }

    /// Whether no type was walked yet
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.checked.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::InjectionPoints;

    #[derive(Default)]
    struct Root {
        value: u32,
    }

    #[derive(Default)]
    struct Middle {
        root: Root,
    }

    #[derive(Default)]
    struct Leaf {
        middle: Middle,
    }

    #[derive(Default)]
    struct Bare;

    #[derive(Default)]
    struct OverBare {
        bare: Bare,
    }

    impl Injectable for Root {
        fn injection_points(points: &mut InjectionPoints<Self>) {
            points.method("init", |this: &mut Self, (): ()| this.value += 1);
        }
    }

    impl Injectable for Middle {
        fn injection_points(points: &mut InjectionPoints<Self>) {
            points.base(|this: &mut Self| &mut this.root);
        }
    }

    impl Injectable for Leaf {
        fn injection_points(points: &mut InjectionPoints<Self>) {
            points.base(|this: &mut Self| &mut this.middle);
        }
    }

    impl Injectable for Bare {
        fn injection_points(_: &mut InjectionPoints<Self>) {}
    }

    impl Injectable for OverBare {
        fn injection_points(points: &mut InjectionPoints<Self>) {
            points.base(|this: &mut Self| &mut this.bare);
        }
    }

    #[test]
    fn it_links_whole_chain() {
        let map = InjectionMetadataMap::new();

        let leaf = map.metadata::<Leaf>();

        assert_eq!(leaf.depth(), 3);
        assert!(!leaf.is_empty_chain());
        assert_eq!(leaf.base().map(|base| base.key()), Some(TypeKey::of::<Middle>()));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn it_shares_ancestor_metadata() {
        let map = InjectionMetadataMap::new();

        let leaf = map.metadata::<Leaf>();
        let middle = map.metadata::<Middle>();

        assert!(Rc::ptr_eq(leaf.base().unwrap(), &middle));
        assert!(Rc::ptr_eq(&map.metadata::<Leaf>(), &leaf));
    }

    #[test]
    fn it_skips_chains_without_members() {
        let map = InjectionMetadataMap::new();

        assert!(map.check::<OverBare>().is_none());
        assert!(map.is_skipped(TypeId::of::<OverBare>()));
        assert!(map.is_skipped(TypeId::of::<Bare>()));
        assert!(map.check::<OverBare>().is_none());
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn it_keeps_chains_with_inherited_members() {
        let map = InjectionMetadataMap::new();

        let middle = map.check::<Middle>();

        assert!(middle.is_some());
        assert!(!map.is_skipped(TypeId::of::<Middle>()));
        assert!(!map.cache().members::<Middle>().has_members());
    }
}
