//! # wfpool-error — structured errors for the pool
//!
//! A small, zero-dependency error type covering the three outcomes a
//! caller of the pool can observe: a task raised an error, a blocking
//! `apply` timed out, or the pool was dropped out from under a handle.
//!
//! Modeled on the structured-error style used elsewhere in this
//! workspace (manual `Display`/`Debug`/`std::error::Error`, no external
//! error-handling crate), scaled down to the handful of variants this
//! crate actually needs.

mod config;
mod task_payload;

pub use config::ConfigError;
pub use task_payload::TaskPayload;

use std::fmt;

/// Everything that can go wrong from the caller's point of view.
pub enum PoolError {
    /// The task invoked via `apply` returned or panicked with an error.
    Task(TaskPayload),
    /// `apply` did not complete within its timeout. The task itself is
    /// still running (or queued) and is not cancelled.
    Timeout,
    /// The pool backing this handle was dropped.
    PoolShutDown,
}

impl PoolError {
    pub fn task(payload: TaskPayload) -> Self {
        PoolError::Task(payload)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PoolError::Timeout)
    }

    pub fn is_task(&self) -> bool {
        matches!(self, PoolError::Task(_))
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Task(payload) => write!(f, "task failed: {payload}"),
            PoolError::Timeout => write!(f, "apply timed out before the task completed"),
            PoolError::PoolShutDown => write!(f, "pool was dropped"),
        }
    }
}

impl fmt::Debug for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Task(payload) => f.debug_tuple("Task").field(payload).finish(),
            PoolError::Timeout => write!(f, "Timeout"),
            PoolError::PoolShutDown => write!(f, "PoolShutDown"),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::Task(payload) => payload.source(),
            _ => None,
        }
    }
}

pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display() {
        let e = PoolError::Timeout;
        assert!(e.is_timeout());
        assert!(format!("{e}").contains("timed out"));
    }

    #[test]
    fn task_display_from_string_payload() {
        let e = PoolError::task(TaskPayload::from_message("boom"));
        assert!(e.is_task());
        assert!(format!("{e}").contains("boom"));
    }

    #[test]
    fn send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PoolError>();
    }
}
