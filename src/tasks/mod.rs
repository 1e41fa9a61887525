//! # Task abstractions and descriptors.
//!
//! This module provides the task-related types:
//! - [`Runnable`] - trait for implementing scheduled callbacks
//! - [`RunFn`] - function-based runnable implementation
//! - [`RunnableRef`] - shared reference to a runnable (`Arc<dyn Runnable>`)
//! - [`Task`] / [`TaskBuilder`] - validated scheduling request
//! - [`ScheduledTask`] - live handle with id, interval and cancellation

mod builder;
mod run_fn;
mod runnable;
mod scheduled;
mod spec;

pub use builder::TaskBuilder;
pub use run_fn::RunFn;
pub use runnable::{Runnable, RunnableRef};
pub use scheduled::{ScheduledTask, TaskId, TaskState};
pub use spec::{ExecutionMode, Task};
