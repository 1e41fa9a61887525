//! # Live scheduled tasks.
//!
//! A [`ScheduledTask`] is the handle returned when a [`Task`](crate::Task) is
//! submitted. It is shared between the scheduler's table, the caller and the
//! runnable itself (which receives it as an argument on every run).
//!
//! ## State machine
//! ```text
//!             heartbeat selects it
//! Pending ───────────────────────────► Running
//!    ▲                                    │
//!    │ interval > 0 (next_due += interval)│
//!    └────────────────────────────────────┤
//!                                         ├── interval == 0 ──► Completed
//!                                         └── cancelled/fault ─► Cancelled
//! Pending ── cancel() ──► Cancelled
//! ```
//!
//! ## Rules
//! - Cancelling is idempotent and never interrupts a run in progress: a running task
//!   observes the flag when it finishes and is then removed instead of rescheduled.
//! - Task ids come from a process-wide counter and are never reused.

use std::fmt;
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering as AtomicOrdering};

use crate::core::scheduler::Shared;
use crate::error::RuntimeError;
use crate::plugin::PluginContainer;
use crate::tasks::runnable::RunnableRef;
use crate::tasks::spec::ExecutionMode;

static TASK_SEQ: AtomicU64 = AtomicU64::new(1);

/// Process-unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn next() -> Self {
        Self(TASK_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Raw numeric value (for logs).
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Lifecycle state of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Queued, waiting for its due tick.
    Pending,
    /// Selected by a heartbeat and not finished yet.
    Running,
    /// Removed by cancellation or after a fault.
    Cancelled,
    /// One-shot task that finished its run.
    Completed,
}

impl TaskState {
    const fn to_u8(self) -> u8 {
        match self {
            TaskState::Pending => 0,
            TaskState::Running => 1,
            TaskState::Cancelled => 2,
            TaskState::Completed => 3,
        }
    }

    const fn from_u8(v: u8) -> Self {
        match v {
            0 => TaskState::Pending,
            1 => TaskState::Running,
            2 => TaskState::Cancelled,
            _ => TaskState::Completed,
        }
    }

    /// True for `Cancelled` and `Completed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Cancelled | TaskState::Completed)
    }

    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Cancelled => "cancelled",
            TaskState::Completed => "completed",
        }
    }
}

/// Handle to a task living in a [`Scheduler`](crate::Scheduler).
pub struct ScheduledTask {
    id: TaskId,
    runnable: RunnableRef,
    mode: ExecutionMode,
    owner: PluginContainer,
    interval: AtomicU64,
    next_due: AtomicU64,
    cancelled: AtomicBool,
    state: AtomicU8,
    scheduler: Weak<Shared>,
}

impl ScheduledTask {
    pub(crate) fn new(
        runnable: RunnableRef,
        mode: ExecutionMode,
        owner: PluginContainer,
        interval: u64,
        next_due: u64,
        scheduler: Weak<Shared>,
    ) -> Self {
        Self {
            id: TaskId::next(),
            runnable,
            mode,
            owner,
            interval: AtomicU64::new(interval),
            next_due: AtomicU64::new(next_due),
            cancelled: AtomicBool::new(false),
            state: AtomicU8::new(TaskState::Pending.to_u8()),
            scheduler,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Runnable name.
    pub fn name(&self) -> &str {
        self.runnable.name()
    }

    pub fn owner(&self) -> &PluginContainer {
        &self.owner
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Current repeat interval in ticks (`0` = no further runs).
    pub fn interval(&self) -> u64 {
        self.interval.load(AtomicOrdering::Acquire)
    }

    /// Changes the repeat interval.
    ///
    /// Takes effect at the next reschedule; setting `0` from inside a run makes the
    /// current run the last one.
    pub fn set_interval(&self, ticks: i64) -> Result<(), RuntimeError> {
        let ticks =
            u64::try_from(ticks).map_err(|_| RuntimeError::InvalidInterval { interval: ticks })?;
        self.interval.store(ticks, AtomicOrdering::Release);
        Ok(())
    }

    /// Tick at which the task is (or was last) due.
    pub fn next_due(&self) -> u64 {
        self.next_due.load(AtomicOrdering::Acquire)
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(AtomicOrdering::Acquire))
    }

    /// True once cancellation was requested (explicitly or after a fault).
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::Acquire)
    }

    /// True if the task reached a terminal state.
    pub fn is_done(&self) -> bool {
        self.state().is_terminal()
    }

    /// Requests cancellation.
    ///
    /// A pending task is removed immediately. A running task finishes its current
    /// run and is then removed. Returns `false` if the task was already cancelled
    /// or completed.
    pub fn cancel(&self) -> bool {
        if self.state() == TaskState::Completed {
            return false;
        }
        if self.cancelled.swap(true, AtomicOrdering::AcqRel) {
            return false;
        }
        match self.scheduler.upgrade() {
            Some(shared) => shared.on_cancel(self),
            None => {
                if !self.is_done() {
                    self.set_state(TaskState::Cancelled);
                }
            }
        }
        true
    }

    pub(crate) fn runnable(&self) -> &RunnableRef {
        &self.runnable
    }

    pub(crate) fn set_state(&self, state: TaskState) {
        self.state.store(state.to_u8(), AtomicOrdering::Release);
    }

    pub(crate) fn set_next_due(&self, tick: u64) {
        self.next_due.store(tick, AtomicOrdering::Release);
    }

    pub(crate) fn mark_cancelled(&self) {
        self.cancelled.store(true, AtomicOrdering::Release);
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id.0)
            .field("name", &self.name())
            .field("mode", &self.mode)
            .field("owner", &self.owner)
            .field("interval", &self.interval())
            .field("next_due", &self.next_due())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::tasks::RunFn;

    fn detached() -> ScheduledTask {
        ScheduledTask::new(
            RunFn::arc("detached", |_t| Ok::<_, TaskError>(())),
            ExecutionMode::Sync,
            PluginContainer::new("p"),
            0,
            5,
            Weak::new(),
        )
    }

    #[test]
    fn state_round_trips_through_u8() {
        for s in [
            TaskState::Pending,
            TaskState::Running,
            TaskState::Cancelled,
            TaskState::Completed,
        ] {
            assert_eq!(TaskState::from_u8(s.to_u8()), s);
        }
    }

    #[test]
    fn cancel_is_idempotent_without_scheduler() {
        let t = detached();
        assert!(t.cancel());
        assert!(!t.cancel());
        assert!(t.is_cancelled());
        assert_eq!(t.state(), TaskState::Cancelled);
    }

    #[test]
    fn completed_task_ignores_cancel() {
        let t = detached();
        t.set_state(TaskState::Completed);
        assert!(!t.cancel());
        assert!(!t.is_cancelled());
    }

    #[test]
    fn set_interval_validates() {
        let t = detached();
        t.set_interval(4).unwrap();
        assert_eq!(t.interval(), 4);
        assert_eq!(
            t.set_interval(-1),
            Err(RuntimeError::InvalidInterval { interval: -1 })
        );
        assert_eq!(t.interval(), 4);
    }
}
