//! Type identity used as the lookup key of every container table

use indexmap::IndexMap;
use std::{
    any::{TypeId, type_name},
    collections::{HashMap, HashSet},
    fmt::{Debug, Formatter},
    hash::{BuildHasherDefault, Hash, Hasher},
};

/// Identifies a capability, implementation or injectable type.
///
/// Equality and hashing consider the [`TypeId`] only, the name is kept for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Creates a key for `T`, which may be unsized (e.g. `dyn Trait`)
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Returns the [`TypeId`] of the keyed type
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the fully qualified name of the keyed type
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the type carries type arguments, e.g. `Repository<User>`
    #[inline]
    pub(crate) fn is_generic(&self) -> bool {
        self.name.contains('<')
    }
}

impl PartialEq for TypeKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Debug for TypeKey {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// [`TypeId`] is already a hash, so it is passed through as is
#[derive(Default)]
pub(crate) struct TypeIdHasher(u64);

impl Hasher for TypeIdHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }

    #[cold]
    fn write(&mut self, _: &[u8]) {
        unreachable!("TypeId calls write_u64");
    }

    #[inline]
    fn write_u64(&mut self, id: u64) {
        self.0 = id;
    }
}

type TypeIdBuildHasher = BuildHasherDefault<TypeIdHasher>;

/// Unordered map keyed by [`TypeId`]
pub(crate) type TypeMap<V> = HashMap<TypeId, V, TypeIdBuildHasher>;

/// Map keyed by [`TypeId`] that keeps insertion order
pub(crate) type OrderedTypeMap<V> = IndexMap<TypeId, V, TypeIdBuildHasher>;

/// Set of [`TypeId`]
pub(crate) type TypeSet = HashSet<TypeId, TypeIdBuildHasher>;
