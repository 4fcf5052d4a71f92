//! A single-threaded inversion of control container.
//!
//! Producers are registered per capability type in a [`Registry`], built
//! lazily and cached by a [`Resolver`], injected into existing objects by an
//! [`Injector`] and announced to interested parties by a [`SubscriptionBus`].
//! [`Container`] wires the four together.

pub use crate::{
    config::ContainerConfig,
    construct::Construct,
    container::Container,
    injector::{InjectionBuilder, Injector},
    key::TypeKey,
    metadata::{Injectable, InjectionPoints},
    registry::{Capabilities, Component, Registry, RegistrationHandle, RegistrationRecord, Upcast},
    resolver::{FromResolver, Resolver},
    subscriptions::SubscriptionBus,
};

#[cfg(feature = "macros")]
pub use dem_macros::{Construct, Injectable};

pub mod config;
pub mod construct;
pub mod container;
pub mod error;
pub mod injector;
pub mod instrument;
pub mod key;
pub mod metadata;
pub mod registry;
pub mod resolver;
pub mod subscriptions;
