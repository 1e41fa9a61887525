//! # Task descriptor.
//!
//! Defines [`Task`], an immutable bundle describing how a runnable should be
//! scheduled (delay, repeat interval, execution mode, owner).
//!
//! A descriptor is created only through a [`TaskBuilder`](crate::TaskBuilder), which
//! validates the values:
//! - **Standalone** with [`Task::builder`] then [`Scheduler::execute`](crate::Scheduler::execute)
//! - **Bound** with [`Scheduler::new_builder`](crate::Scheduler::new_builder) then `execute`
//!
//! ## Rules
//! - `delay` and `interval` are tick counts and never negative.
//! - `interval == 0` means the task runs once.

use std::fmt;

use crate::plugin::PluginContainer;
use crate::tasks::builder::TaskBuilder;
use crate::tasks::runnable::RunnableRef;

/// Where a task's runnable executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionMode {
    /// Inline, on the context that calls `heartbeat`.
    #[default]
    Sync,
    /// On a worker thread of the async pool.
    Async,
}

impl ExecutionMode {
    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            ExecutionMode::Sync => "sync",
            ExecutionMode::Async => "async",
        }
    }
}

/// Validated scheduling request.
///
/// ## Example
/// ```rust
/// use tickvisor::{ExecutionMode, PluginContainer, RunFn, Task, TaskError};
///
/// let owner = PluginContainer::new("economy");
/// let task = Task::builder()
///     .owner(&owner)
///     .delay(20)
///     .interval(1200)
///     .asynchronous()
///     .build(RunFn::arc("payday", |_task| Ok::<_, TaskError>(())))
///     .unwrap();
///
/// assert_eq!(task.delay(), 20);
/// assert_eq!(task.interval(), 1200);
/// assert_eq!(task.mode(), ExecutionMode::Async);
/// assert_eq!(task.name(), "payday");
/// ```
#[derive(Clone)]
pub struct Task {
    runnable: RunnableRef,
    delay: u64,
    interval: u64,
    mode: ExecutionMode,
    owner: PluginContainer,
}

impl Task {
    pub(crate) fn new(
        runnable: RunnableRef,
        delay: u64,
        interval: u64,
        mode: ExecutionMode,
        owner: PluginContainer,
    ) -> Self {
        Self {
            runnable,
            delay,
            interval,
            mode,
            owner,
        }
    }

    /// Creates a builder that is not bound to a scheduler.
    pub fn builder() -> TaskBuilder<'static> {
        TaskBuilder::new()
    }

    /// Returns the runnable.
    pub fn runnable(&self) -> &RunnableRef {
        &self.runnable
    }

    /// Convenience: returns the runnable name.
    pub fn name(&self) -> &str {
        self.runnable.name()
    }

    /// Ticks to wait before the first run.
    pub fn delay(&self) -> u64 {
        self.delay
    }

    /// Ticks between runs (`0` = run once).
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Execution mode.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Owning plugin.
    pub fn owner(&self) -> &PluginContainer {
        &self.owner
    }

    pub(crate) fn into_parts(self) -> (RunnableRef, u64, u64, ExecutionMode, PluginContainer) {
        (self.runnable, self.delay, self.interval, self.mode, self.owner)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name())
            .field("delay", &self.delay)
            .field("interval", &self.interval)
            .field("mode", &self.mode)
            .field("owner", &self.owner)
            .finish()
    }
}
