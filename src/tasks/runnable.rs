//! # Runnable abstraction.
//!
//! A [`Runnable`] is the callback a scheduled task executes. It receives the live
//! [`ScheduledTask`] handle as an explicit argument, so the callback can inspect or
//! change its own interval, or cancel itself, without any shared per-thread slot.
//!
//! ## Hooks
//! ```text
//! heartbeat ──► before_run()            (always on the heartbeat context)
//!          ├─ Sync  ──► run() ──► after_sync_run()     (heartbeat context)
//!          └─ Async ──► run() ──► after_async_run()    (worker context)
//! ```
//! `before_run` is useful for collecting main-context resources an asynchronous run
//! will work on.

use std::sync::Arc;

use crate::error::TaskError;
use crate::tasks::ScheduledTask;

/// # Deferred unit of work.
///
/// # Example
/// ```
/// use tickvisor::{Runnable, ScheduledTask, TaskError};
///
/// struct Autosave;
///
/// impl Runnable for Autosave {
///     fn name(&self) -> &str { "autosave" }
///
///     fn run(&self, task: &ScheduledTask) -> Result<(), TaskError> {
///         if task.interval() == 0 {
///             return Err(TaskError::fail("autosave must repeat"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Runnable: Send + Sync + 'static {
    /// Returns a stable, human-readable name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Executes one run.
    ///
    /// An `Err` (or a panic) cancels the task; it is not retried.
    fn run(&self, task: &ScheduledTask) -> Result<(), TaskError>;

    /// Called on the heartbeat context before every run, even asynchronous ones.
    fn before_run(&self, _task: &ScheduledTask) {}

    /// Called on the heartbeat context after a synchronous run.
    fn after_sync_run(&self, _task: &ScheduledTask) {}

    /// Called on the worker context after an asynchronous run.
    fn after_async_run(&self, _task: &ScheduledTask) {}
}

/// Shared handle to a runnable.
pub type RunnableRef = Arc<dyn Runnable>;
