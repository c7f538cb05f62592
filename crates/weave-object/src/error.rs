//! Error types for dynamic property access and calls

use crate::value::Value;

/// Errors surfaced by dynamic calls.
///
/// Failures are synchronous and propagate to the immediate caller;
/// nothing in this crate retries, logs, or swallows them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CallError {
    /// The named slot is missing or does not hold a function
    #[error("{0} is not a function")]
    NotCallable(String),

    /// A value had an unexpected type
    #[error("type error: {0}")]
    TypeError(String),

    /// Failure raised by user code (a native function or advice)
    #[error("runtime error: {0}")]
    RuntimeError(String),
}

/// Result type for dynamic calls
pub type CallResult<T = Value> = Result<T, CallError>;
