//! # Diagnostic reports emitted by the bus, the scheduler and the context.
//!
//! The [`DiagnosticKind`] enum classifies reports in two groups:
//! - **Faults**: plugin code failed (handler or task error/panic)
//! - **Lifecycle**: tasks finished or were cancelled, listeners came and went,
//!   plugins were unloaded, the ticker started or stopped
//!
//! The [`Diagnostic`] struct carries the metadata: timestamp, source name,
//! owning plugin, task id and reason.
//!
//! ## Ordering guarantees
//! Each report has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use tickvisor::{Diagnostic, DiagnosticKind};
//!
//! let d = Diagnostic::new(DiagnosticKind::HandlerFaulted)
//!     .with_source("chat-filter")
//!     .with_reason("boom");
//!
//! assert_eq!(d.kind, DiagnosticKind::HandlerFaulted);
//! assert_eq!(d.source.as_deref(), Some("chat-filter"));
//! assert!(d.is_fault());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::plugin::PluginId;
use crate::tasks::TaskId;

/// Global sequence counter for report ordering.
static DIAGNOSTIC_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    // === Faults ===
    /// An event handler returned an error or panicked.
    ///
    /// Sets:
    /// - `source`: subscriber name
    /// - `owner`: owning plugin
    /// - `reason`: error or panic message
    HandlerFaulted,

    /// A scheduled runnable returned an error or panicked; the task was cancelled.
    ///
    /// Sets:
    /// - `source`: runnable name
    /// - `owner`: owning plugin
    /// - `task`: task id
    /// - `reason`: error or panic message
    TaskFaulted,

    // === Task lifecycle ===
    /// Task was cancelled (explicitly, in bulk, or after a fault).
    TaskCancelled,

    /// One-shot task finished its single run.
    TaskCompleted,

    // === Registration lifecycle ===
    /// Listener bindings were added to the registry.
    ///
    /// Sets:
    /// - `source`: listener name
    /// - `owner`: owning plugin
    /// - `reason`: number of bindings
    ListenerRegistered,

    /// Listener bindings were removed from the registry.
    ListenerUnregistered,

    /// All listeners and tasks of a plugin were released.
    PluginUnloaded,

    // === Heartbeat driver ===
    /// Ticker loop started.
    TickerStarted,

    /// Ticker loop stopped (token cancelled or shutdown signal).
    TickerStopped,
}

impl DiagnosticKind {
    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            DiagnosticKind::HandlerFaulted => "handler_faulted",
            DiagnosticKind::TaskFaulted => "task_faulted",
            DiagnosticKind::TaskCancelled => "task_cancelled",
            DiagnosticKind::TaskCompleted => "task_completed",
            DiagnosticKind::ListenerRegistered => "listener_registered",
            DiagnosticKind::ListenerUnregistered => "listener_unregistered",
            DiagnosticKind::PluginUnloaded => "plugin_unloaded",
            DiagnosticKind::TickerStarted => "ticker_started",
            DiagnosticKind::TickerStopped => "ticker_stopped",
        }
    }
}

/// Diagnostic report with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`DiagnosticKind`]
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Report classification.
    pub kind: DiagnosticKind,
    /// Name of the subscriber, runnable or listener involved.
    pub source: Option<Arc<str>>,
    /// Owning plugin, if applicable.
    pub owner: Option<PluginId>,
    /// Task id, if applicable.
    pub task: Option<TaskId>,
    /// Human-readable reason (error message, panic payload, counts).
    pub reason: Option<Arc<str>>,
    /// Heartbeat tick at which the report was produced, if known.
    pub tick: Option<u64>,
}

impl Diagnostic {
    /// Creates a new report of the given kind with current timestamp and next sequence number.
    pub fn new(kind: DiagnosticKind) -> Self {
        Self {
            seq: DIAGNOSTIC_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            source: None,
            owner: None,
            task: None,
            reason: None,
            tick: None,
        }
    }

    /// Attaches the name of the component involved.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches the owning plugin.
    #[inline]
    pub fn with_owner(mut self, owner: PluginId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task(mut self, task: TaskId) -> Self {
        self.task = Some(task);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the heartbeat tick.
    #[inline]
    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }

    /// True for reports caused by failing plugin code.
    #[inline]
    pub fn is_fault(&self) -> bool {
        matches!(
            self.kind,
            DiagnosticKind::HandlerFaulted | DiagnosticKind::TaskFaulted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Diagnostic::new(DiagnosticKind::TaskCompleted);
        let b = Diagnostic::new(DiagnosticKind::TaskCompleted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn lifecycle_reports_are_not_faults() {
        let d = Diagnostic::new(DiagnosticKind::PluginUnloaded).with_reason("2 listeners");
        assert!(!d.is_fault());
        assert_eq!(d.kind.as_label(), "plugin_unloaded");
    }
}
