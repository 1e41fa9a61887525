//! Error types used by the tickvisor runtime and by plugin callbacks.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`]: structural errors surfaced synchronously to the caller
//!   (bad task descriptors, duplicate registrations, misuse of the context).
//! - [`HandlerError`]: errors returned by event handlers.
//! - [`TaskError`]: errors returned by scheduled runnables.
//!
//! Handler and task errors never propagate past the bus or the scheduler; they are
//! converted to [`Diagnostic`](crate::Diagnostic) reports. All three types provide
//! `as_label` for logs/metrics.

use thiserror::Error;

/// # Errors produced by the tickvisor runtime.
///
/// These are raised as soon as they are detected and abort the offending call.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A task descriptor was built with a negative delay.
    #[error("invalid task delay {delay}: must be >= 0 ticks")]
    InvalidDelay {
        /// The rejected delay in ticks.
        delay: i64,
    },

    /// A task descriptor was built with a negative repeat interval.
    #[error("invalid task interval {interval}: must be >= 0 ticks")]
    InvalidInterval {
        /// The rejected interval in ticks.
        interval: i64,
    },

    /// A task descriptor was built without an owning plugin.
    #[error("task has no owning plugin")]
    MissingOwner,

    /// A dispatch order outside `-100..=100` was requested.
    #[error("dispatch order {value} out of range -100..=100")]
    OrderOutOfRange {
        /// The rejected value.
        value: i32,
    },

    /// The same item was registered twice.
    #[error("{kind} '{name}' is already registered")]
    DuplicateRegistration {
        /// What was registered (e.g. `"listener"`).
        kind: &'static str,
        /// Name of the duplicate.
        name: String,
    },

    /// An operation was attempted on a component in the wrong state.
    #[error("invalid state: {reason}")]
    State {
        /// Human-readable description of the violated precondition.
        reason: String,
    },

    /// Configuration could not be read or parsed.
    #[error("config error: {reason}")]
    Config {
        /// Underlying cause.
        reason: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tickvisor::RuntimeError;
    ///
    /// let err = RuntimeError::InvalidDelay { delay: -1 };
    /// assert_eq!(err.as_label(), "invalid_delay");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::InvalidDelay { .. } => "invalid_delay",
            RuntimeError::InvalidInterval { .. } => "invalid_interval",
            RuntimeError::MissingOwner => "missing_owner",
            RuntimeError::OrderOutOfRange { .. } => "order_out_of_range",
            RuntimeError::DuplicateRegistration { .. } => "duplicate_registration",
            RuntimeError::State { .. } => "invalid_state",
            RuntimeError::Config { .. } => "config",
        }
    }

    /// True for errors caused by a malformed task descriptor.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RuntimeError::InvalidDelay { .. }
                | RuntimeError::InvalidInterval { .. }
                | RuntimeError::MissingOwner
        )
    }

    pub(crate) fn state(reason: impl Into<String>) -> Self {
        RuntimeError::State {
            reason: reason.into(),
        }
    }
}

/// # Errors returned by event handlers.
///
/// The bus reports them as `HandlerFaulted` and keeps dispatching.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Handler failed while processing the occurrence.
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        HandlerError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
        }
    }

    /// Returns a compact message (used as the diagnostic reason).
    pub fn as_message(&self) -> String {
        match self {
            HandlerError::Fail { error } => format!("error: {error}"),
        }
    }
}

/// # Errors returned by scheduled runnables.
///
/// Any error cancels the owning task; neither variant is retried.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable error.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tickvisor::TaskError;
    ///
    /// let err = TaskError::Fatal { error: "disk gone".into() };
    /// assert_eq!(err.as_label(), "task_fatal");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Fatal { .. } => "task_fatal",
        }
    }

    /// Returns a compact message (used as the diagnostic reason).
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Fatal { error } => format!("fatal: {error}"),
        }
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
