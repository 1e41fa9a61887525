use std::sync::Arc;

use crate::core::Scheduler;
use crate::error::RuntimeError;
use crate::plugin::PluginContainer;
use crate::tasks::ScheduledTask;
use crate::tasks::runnable::RunnableRef;
use crate::tasks::spec::{ExecutionMode, Task};

/// Builder for [`Task`] with fluent API.
///
/// Values are validated in [`build`](Self::build): a negative delay or interval and a
/// missing owner are rejected before anything is queued.
#[derive(Clone)]
pub struct TaskBuilder<'s> {
    scheduler: Option<&'s Scheduler>,
    delay: i64,
    interval: i64,
    mode: ExecutionMode,
    owner: Option<PluginContainer>,
}

impl TaskBuilder<'static> {
    /// Creates a builder with `delay = 0`, `interval = 0`, synchronous mode and no owner.
    pub fn new() -> Self {
        Self {
            scheduler: None,
            delay: 0,
            interval: 0,
            mode: ExecutionMode::Sync,
            owner: None,
        }
    }
}

impl Default for TaskBuilder<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'s> TaskBuilder<'s> {
    pub(crate) fn bound(scheduler: &'s Scheduler) -> Self {
        Self {
            scheduler: Some(scheduler),
            delay: 0,
            interval: 0,
            mode: ExecutionMode::Sync,
            owner: None,
        }
    }

    /// Ticks to wait before the first run.
    pub fn delay(mut self, ticks: i64) -> Self {
        self.delay = ticks;
        self
    }

    /// Ticks between runs; `0` runs once.
    pub fn interval(mut self, ticks: i64) -> Self {
        self.interval = ticks;
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn synchronous(self) -> Self {
        self.mode(ExecutionMode::Sync)
    }

    pub fn asynchronous(self) -> Self {
        self.mode(ExecutionMode::Async)
    }

    /// Plugin the task belongs to.
    pub fn owner(mut self, owner: &PluginContainer) -> Self {
        self.owner = Some(owner.clone());
        self
    }

    /// Validates the values and builds the descriptor.
    pub fn build(self, runnable: RunnableRef) -> Result<Task, RuntimeError> {
        let delay = u64::try_from(self.delay)
            .map_err(|_| RuntimeError::InvalidDelay { delay: self.delay })?;
        let interval = u64::try_from(self.interval).map_err(|_| RuntimeError::InvalidInterval {
            interval: self.interval,
        })?;
        let owner = self.owner.ok_or(RuntimeError::MissingOwner)?;
        Ok(Task::new(runnable, delay, interval, self.mode, owner))
    }

    /// Builds the descriptor and submits it to the bound scheduler.
    ///
    /// Fails with [`RuntimeError::State`] if the builder came from [`Task::builder`].
    pub fn execute(self, runnable: RunnableRef) -> Result<Arc<ScheduledTask>, RuntimeError> {
        let scheduler = self
            .scheduler
            .ok_or_else(|| RuntimeError::state("task builder is not bound to a scheduler"))?;
        let task = self.build(runnable)?;
        Ok(scheduler.execute(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::tasks::RunFn;

    fn noop() -> RunnableRef {
        RunFn::arc("noop", |_t| Ok::<_, TaskError>(()))
    }

    #[test]
    fn defaults_are_one_shot_sync() {
        let owner = PluginContainer::new("p");
        let task = Task::builder().owner(&owner).build(noop()).unwrap();
        assert_eq!(task.delay(), 0);
        assert_eq!(task.interval(), 0);
        assert_eq!(task.mode(), ExecutionMode::Sync);
        assert_eq!(task.owner(), &owner);
    }

    #[test]
    fn negative_values_are_rejected() {
        let owner = PluginContainer::new("p");
        let err = Task::builder()
            .owner(&owner)
            .delay(-1)
            .build(noop())
            .unwrap_err();
        assert_eq!(err, RuntimeError::InvalidDelay { delay: -1 });

        let err = Task::builder()
            .owner(&owner)
            .interval(-7)
            .build(noop())
            .unwrap_err();
        assert_eq!(err, RuntimeError::InvalidInterval { interval: -7 });
    }

    #[test]
    fn owner_is_required() {
        let err = Task::builder().delay(3).build(noop()).unwrap_err();
        assert_eq!(err, RuntimeError::MissingOwner);
    }

    #[test]
    fn unbound_builder_cannot_execute() {
        let owner = PluginContainer::new("p");
        let err = Task::builder().owner(&owner).execute(noop()).unwrap_err();
        assert_eq!(err.as_label(), "invalid_state");
    }
}
