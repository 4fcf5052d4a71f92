//! Container configuration

use crate::instrument::{DEFAULT_SLOW_OPERATION, Operation, OperationHook, slow_operation_logger};
use serde::Deserialize;
use std::{
    fmt::{Debug, Formatter},
    rc::Rc,
    time::Duration,
};

const DEFAULT_SLOW_OPERATION_MS: u64 = DEFAULT_SLOW_OPERATION.as_millis() as u64;

/// Represents a container configuration.
///
/// Can be built in code or deserialized, e.g. from a section of an
/// application settings file:
/// ```json
/// { "slow_operation_ms": 250, "instrument": true }
/// ```
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Operations taking at least this many milliseconds are logged as warnings
    ///
    /// Default: `100`
    slow_operation_ms: u64,

    /// Specifies whether resolutions and injections are timed
    ///
    /// Default: `true`
    instrument: bool,

    /// Replaces the slow operation logger
    #[serde(skip)]
    hook: Option<OperationHook>,
}

impl Default for ContainerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            slow_operation_ms: DEFAULT_SLOW_OPERATION_MS,
            instrument: true,
            hook: None,
        }
    }
}

impl Debug for ContainerConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerConfig")
            .field("slow_operation_ms", &self.slow_operation_ms)
            .field("instrument", &self.instrument)
            .field("custom_hook", &self.hook.is_some())
            .finish()
    }
}

impl ContainerConfig {
    /// Creates a default container configuration
    ///
    /// Defaults:
    /// - slow_operation_ms: `100`
    /// - instrument: `true`
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the duration at which an operation is logged as slow
    ///
    /// Default: `100 ms`
    pub fn with_slow_operation(mut self, threshold: Duration) -> Self {
        self.slow_operation_ms = u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sends every measured operation to `hook` instead of the slow operation logger
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Operation) + 'static,
    {
        self.hook = Some(Rc::new(hook));
        self.instrument = true;
        self
    }

    /// Disables timing of resolutions and injections
    pub fn without_instrumentation(mut self) -> Self {
        self.instrument = false;
        self
    }

    /// The duration at which an operation is logged as slow
    #[inline]
    pub fn slow_operation(&self) -> Duration {
        Duration::from_millis(self.slow_operation_ms)
    }

    /// Whether resolutions and injections are timed
    #[inline]
    pub fn is_instrumented(&self) -> bool {
        self.instrument
    }

    /// The hook the container components report to
    pub(crate) fn hook(&self) -> Option<OperationHook> {
        if !self.instrument {
            return None;
        }
        let hook = self
            .hook
            .clone()
            .unwrap_or_else(|| slow_operation_logger(self.slow_operation()));
        Some(hook)
    }
}
