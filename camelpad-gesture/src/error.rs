//! Gesture engine error types

use thiserror::Error;

/// Errors raised at the engine boundary.
///
/// Event processing never fails; these only come from construction and
/// configuration checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GestureError {
    #[error("No tokio runtime available to schedule gesture timers")]
    NoRuntime,

    #[error("Invalid timing: {field} must be positive, got {value}")]
    InvalidTiming { field: &'static str, value: u64 },
}
