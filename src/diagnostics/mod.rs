//! Diagnostics: report types and broadcast sink.
//!
//! Faults raised by plugin code never propagate past the event bus or the
//! scheduler. They are converted into [`Diagnostic`] reports and published on the
//! [`DiagnosticBus`], together with lifecycle reports (task completion and
//! cancellation, listener registration, plugin unload, ticker start/stop).
//!
//! ## Contents
//! - [`DiagnosticKind`], [`Diagnostic`] report classification and metadata
//! - [`DiagnosticBus`] thin wrapper over `tokio::sync::broadcast`, logging via `tracing`

mod bus;
mod report;

pub use bus::DiagnosticBus;
pub use report::{Diagnostic, DiagnosticKind};
