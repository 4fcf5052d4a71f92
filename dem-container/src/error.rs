//! Describes container errors

use std::fmt::{Display, Formatter};

/// Errors raised while registering, resolving or injecting dependencies.
///
/// Payloads are type names, so the error stays `Copy` and can be cached or
/// re-raised without allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The capability type already has a registration record
    DuplicateRegistration(&'static str),
    /// No registration record exists for the requested capability type
    UnregisteredType(&'static str),
    /// The capability type was requested again while it was still being resolved
    CyclicDependency(&'static str),
    /// The capability type carries type arguments
    GenericTypeUnsupported(&'static str),
    /// Injection was attempted on a missing instance
    NullInstance(&'static str),
    /// The instance to inject is borrowed elsewhere
    InstanceBorrowed(&'static str),
    /// A produced instance could not be converted into the requested type
    ResolveFailed(&'static str),
    /// Any other failure, typically raised by a user factory
    Other(&'static str),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::DuplicateRegistration(type_name) => write!(f, "Container Error: type already registered: {type_name}"),
            Error::UnregisteredType(type_name) => write!(f, "Container Error: type not registered: {type_name}"),
            Error::CyclicDependency(type_name) => write!(f, "Container Error: type {type_name} is resolved twice, possible two-way injection"),
            Error::GenericTypeUnsupported(type_name) => write!(f, "Container Error: generic types are not supported: {type_name}"),
            Error::NullInstance(type_name) => write!(f, "Container Error: instance of {type_name} is missing"),
            Error::InstanceBorrowed(type_name) => write!(f, "Container Error: instance of {type_name} is already borrowed"),
            Error::ResolveFailed(type_name) => write!(f, "Container Error: unable to resolve the type: {type_name}"),
            Error::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}
