//! # Diagnostic sink for faults and lifecycle reports.
//!
//! [`DiagnosticBus`] is a thin wrapper around [`tokio::sync::broadcast`] that lets the
//! event bus, the scheduler and asynchronous workers report without blocking.
//! Every report is also written to `tracing` before it is broadcast, so faults are
//! visible even when nobody subscribes.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                    Receivers (any number):
//!   EventBus   ──┐
//!   Scheduler  ──┼──► DiagnosticBus ──► broadcast::Receiver<Diagnostic>
//!   Workers    ──┤        │
//!   Context    ──┘        └──► tracing (warn! for faults, debug! otherwise)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent reports for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: reports are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::report::Diagnostic;

/// Broadcast channel for diagnostic reports.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct DiagnosticBus {
    tx: broadcast::Sender<Diagnostic>,
}

impl DiagnosticBus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Diagnostic>(capacity);
        Self { tx }
    }

    /// Logs the report and broadcasts it to all active receivers.
    pub fn publish(&self, report: Diagnostic) {
        log(&report);
        let _ = self.tx.send(report);
    }

    /// Creates a new receiver that observes subsequent reports.
    pub fn subscribe(&self) -> broadcast::Receiver<Diagnostic> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for DiagnosticBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

fn log(report: &Diagnostic) {
    let kind = report.kind.as_label();
    let source = report.source.as_deref().unwrap_or("-");
    let reason = report.reason.as_deref().unwrap_or("");
    let owner = report.owner.map(|o| o.get());
    let task = report.task.map(|t| t.get());

    if report.is_fault() {
        tracing::warn!(kind, source, ?owner, ?task, tick = ?report.tick, reason, "plugin fault");
    } else {
        tracing::debug!(kind, source, ?owner, ?task, tick = ?report.tick, reason, "lifecycle");
    }
}
