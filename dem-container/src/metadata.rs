//! Injection metadata: injection points declared per type, cached once and
//! linked along the base type chain

pub use self::{
    cache::{InjectableMembers, TypeMetadataCache},
    map::{InjectionMetadataMap, TypeInjectionMetadata},
    points::{Injectable, InjectionMember, InjectionPoints, MemberKind},
};

pub mod cache;
pub mod map;
pub mod points;
