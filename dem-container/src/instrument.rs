//! Timing hook invoked around resolutions and injections

use std::{rc::Rc, time::Duration};

/// Default threshold above which an operation is considered slow
pub const DEFAULT_SLOW_OPERATION: Duration = Duration::from_millis(100);

/// What was measured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// A factory run, including the resolutions it triggered
    Resolve,
    /// The injection of one level of an instance type hierarchy
    Inject,
}

/// One measured operation
#[derive(Debug, Clone, Copy)]
pub struct Operation {
    /// What was measured
    pub kind: OperationKind,
    /// The resolved capability or the injected type
    pub type_name: &'static str,
    /// Wall time of the operation
    pub elapsed: Duration,
}

impl Operation {
    #[inline]
    pub(crate) fn new(kind: OperationKind, type_name: &'static str, elapsed: Duration) -> Self {
        Self { kind, type_name, elapsed }
    }
}

/// Receives every measured [`Operation`]
pub type OperationHook = Rc<dyn Fn(&Operation)>;

/// Creates a hook that logs operations taking at least `threshold` as warnings
/// and all others at trace level
pub fn slow_operation_logger(threshold: Duration) -> OperationHook {
    Rc::new(move |op: &Operation| {
        if op.elapsed >= threshold {
            tracing::warn!(
                kind = ?op.kind,
                type_name = op.type_name,
                elapsed = ?op.elapsed,
                "slow container operation"
            );
        } else {
            tracing::trace!(
                kind = ?op.kind,
                type_name = op.type_name,
                elapsed = ?op.elapsed,
                "container operation"
            );
        }
    })
}
