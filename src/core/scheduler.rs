//! # Tick-driven task scheduler.
//!
//! The [`Scheduler`] owns the task table and executes due tasks on every
//! [`heartbeat`](Scheduler::heartbeat). It never measures time itself: the host (or
//! the ticker) supplies the current tick.
//!
//! ## Architecture
//! ```text
//! execute(task) ──► TaskTable { tasks: id → Arc<ScheduledTask>,
//!                               queue: BTreeSet<(next_due, id)> }
//!
//! heartbeat(tick):
//!   lock ─► pop (due <= tick) in (due, id) order ─► mark Running ─► unlock
//!   for each selected task:
//!     cancelled? ──► finish (Cancelled)
//!     before_run()                          (heartbeat context)
//!     Sync  ─► run() ─► after_sync_run() ─► finish
//!     Async ─► AsyncPool::spawn(run() ─► after_async_run() ─► finish)
//!
//! finish(task, outcome):
//!   fault               ─► Cancelled, TaskFaulted
//!   cancel requested    ─► Cancelled, TaskCancelled
//!   interval > 0        ─► Pending, next_due += interval, requeue
//!   otherwise           ─► Completed, TaskCompleted
//! ```
//!
//! ## Rules
//! - The table lock is never held while plugin code runs, so runnables may submit
//!   or cancel tasks (including themselves).
//! - A running task is absent from the queue; an asynchronous task that takes longer
//!   than its interval is not selected again until its run finished.
//! - Faulting tasks are cancelled and reported; they are never retried.
//! - A panic escaping the heartbeat (`catch_panics = false`) faults only the task
//!   that raised it; tasks selected after it return to the queue.
//! - An asynchronous job the runtime refuses faults its task with
//!   `"async worker pool unavailable"`.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticBus, DiagnosticKind};
use crate::plugin::PluginContainer;
use crate::tasks::{ExecutionMode, ScheduledTask, Task, TaskBuilder, TaskId, TaskState};

use super::pool::AsyncPool;
use super::runner;

#[derive(Default)]
struct TaskTable {
    tasks: HashMap<TaskId, Arc<ScheduledTask>>,
    queue: BTreeSet<(u64, TaskId)>,
    last_tick: Option<u64>,
}

impl TaskTable {
    fn current_tick(&self) -> u64 {
        self.last_tick.unwrap_or(0)
    }

    fn remove(&mut self, task: &ScheduledTask) {
        self.queue.remove(&(task.next_due(), task.id()));
        self.tasks.remove(&task.id());
    }
}

/// State shared between the scheduler, its task handles and async workers.
pub(crate) struct Shared {
    table: Mutex<TaskTable>,
    diagnostics: DiagnosticBus,
    catch_panics: bool,
    running_async: AtomicUsize,
}

impl Shared {
    /// Called by [`ScheduledTask::cancel`] after the flag was set.
    pub(crate) fn on_cancel(&self, task: &ScheduledTask) {
        let removed = {
            let mut table = self.table.lock();
            if task.state() == TaskState::Pending {
                table.remove(task);
                task.set_state(TaskState::Cancelled);
                true
            } else {
                false
            }
        };
        if removed {
            self.report(task, DiagnosticKind::TaskCancelled, None, None);
        }
    }

    fn finish(&self, task: &ScheduledTask, outcome: Result<(), String>, tick: u64) {
        let (kind, reason) = {
            let mut table = self.table.lock();
            match outcome {
                Err(reason) => {
                    task.mark_cancelled();
                    table.remove(task);
                    task.set_state(TaskState::Cancelled);
                    (DiagnosticKind::TaskFaulted, Some(reason))
                }
                Ok(()) if task.is_cancelled() => {
                    table.remove(task);
                    task.set_state(TaskState::Cancelled);
                    (DiagnosticKind::TaskCancelled, None)
                }
                Ok(()) => {
                    let interval = task.interval();
                    if interval > 0 {
                        let next = task.next_due().saturating_add(interval);
                        task.set_next_due(next);
                        task.set_state(TaskState::Pending);
                        table.queue.insert((next, task.id()));
                        return;
                    }
                    table.remove(task);
                    task.set_state(TaskState::Completed);
                    (DiagnosticKind::TaskCompleted, None)
                }
            }
        };
        self.report(task, kind, reason, Some(tick));
    }

    fn report(
        &self,
        task: &ScheduledTask,
        kind: DiagnosticKind,
        reason: Option<String>,
        tick: Option<u64>,
    ) {
        let mut report = Diagnostic::new(kind)
            .with_source(task.name())
            .with_owner(task.owner().id())
            .with_task(task.id());
        if let Some(reason) = reason {
            report = report.with_reason(reason);
        }
        if let Some(tick) = tick {
            report = report.with_tick(tick);
        }
        self.diagnostics.publish(report);
    }
}

/// Tasks selected by one heartbeat and not run yet.
///
/// If plugin code unwinds out of the heartbeat (`catch_panics = false`), the task
/// that was running is faulted and the rest go back to the queue untouched.
struct Batch<'a> {
    shared: &'a Shared,
    tick: u64,
    current: Option<Arc<ScheduledTask>>,
    rest: VecDeque<Arc<ScheduledTask>>,
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        if let Some(task) = self.current.take() {
            self.shared
                .finish(&task, Err("panicked: unwound out of heartbeat".into()), self.tick);
        }
        if self.rest.is_empty() {
            return;
        }
        let mut table = self.shared.table.lock();
        for task in self.rest.drain(..) {
            task.set_state(TaskState::Pending);
            table.queue.insert((task.next_due(), task.id()));
        }
    }
}

/// One asynchronous run handed to the worker pool.
///
/// A job the runtime drops without running faults its task instead of leaving it
/// `Running`.
struct AsyncRun {
    shared: Arc<Shared>,
    task: Arc<ScheduledTask>,
    tick: u64,
    finished: bool,
}

impl AsyncRun {
    fn run(mut self) {
        // A panic cannot unwind into the heartbeat from a worker, so it is always caught.
        let outcome = runner::run_once(&self.task, true);
        let after =
            runner::guard_hook(true, || self.task.runnable().after_async_run(&self.task));
        self.shared.finish(&self.task, outcome.and(after), self.tick);
        self.finished = true;
    }
}

impl Drop for AsyncRun {
    fn drop(&mut self) {
        if !self.finished {
            self.shared.finish(
                &self.task,
                Err("async worker pool unavailable".into()),
                self.tick,
            );
        }
        self.shared.running_async.fetch_sub(1, AtomicOrdering::AcqRel);
    }
}

/// Tick-driven scheduler for plugin tasks.
///
/// - Synchronous tasks run inline inside [`heartbeat`](Self::heartbeat).
/// - Asynchronous tasks run on a tokio blocking pool (see [`Config::async_workers`]).
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use tickvisor::{DiagnosticBus, PluginContainer, RunFn, Scheduler, TaskError};
///
/// let scheduler = Scheduler::new(DiagnosticBus::default());
/// let owner = PluginContainer::new("weather");
/// let runs = Arc::new(AtomicU32::new(0));
///
/// let r = Arc::clone(&runs);
/// scheduler
///     .new_builder()
///     .owner(&owner)
///     .delay(2)
///     .execute(RunFn::arc("rain", move |_task| {
///         r.fetch_add(1, Ordering::Relaxed);
///         Ok::<_, TaskError>(())
///     }))
///     .unwrap();
///
/// scheduler.heartbeat(1);
/// assert_eq!(runs.load(Ordering::Relaxed), 0);
/// scheduler.heartbeat(2);
/// assert_eq!(runs.load(Ordering::Relaxed), 1);
/// assert!(scheduler.is_empty());
/// ```
pub struct Scheduler {
    shared: Arc<Shared>,
    pool: Mutex<Option<AsyncPool>>,
    worker_limit: Option<usize>,
}

impl Scheduler {
    /// Creates a scheduler with the default [`Config`].
    pub fn new(diagnostics: DiagnosticBus) -> Self {
        Self::with_config(&Config::default(), diagnostics)
    }

    /// Creates a scheduler using `cfg.catch_panics` and `cfg.async_workers`.
    pub fn with_config(cfg: &Config, diagnostics: DiagnosticBus) -> Self {
        Self {
            shared: Arc::new(Shared {
                table: Mutex::new(TaskTable::default()),
                diagnostics,
                catch_panics: cfg.catch_panics,
                running_async: AtomicUsize::new(0),
            }),
            pool: Mutex::new(None),
            worker_limit: cfg.worker_limit(),
        }
    }

    /// Runs asynchronous tasks on the given runtime instead of picking one.
    pub fn with_runtime(self, handle: Handle) -> Self {
        *self.pool.lock() = Some(AsyncPool::from_handle(handle));
        self
    }

    /// Returns a task builder bound to this scheduler.
    pub fn new_builder(&self) -> TaskBuilder<'_> {
        TaskBuilder::bound(self)
    }

    /// Accepts a task; it first becomes due at `current_tick() + delay`.
    ///
    /// Never blocks on running tasks and never runs the task itself.
    pub fn execute(&self, task: Task) -> Arc<ScheduledTask> {
        let (runnable, delay, interval, mode, owner) = task.into_parts();

        let scheduled = {
            let mut table = self.shared.table.lock();
            let due = table.current_tick().saturating_add(delay);
            let scheduled = Arc::new(ScheduledTask::new(
                runnable,
                mode,
                owner,
                interval,
                due,
                Arc::downgrade(&self.shared),
            ));
            table.queue.insert((due, scheduled.id()));
            table.tasks.insert(scheduled.id(), Arc::clone(&scheduled));
            scheduled
        };

        tracing::debug!(
            task = scheduled.id().get(),
            name = scheduled.name(),
            due = scheduled.next_due(),
            interval,
            mode = mode.as_label(),
            "task scheduled"
        );
        scheduled
    }

    /// Executes every task due at or before `current_tick`.
    pub fn heartbeat(&self, current_tick: u64) {
        let (due, dropped) = {
            let mut table = self.shared.table.lock();
            table.last_tick = Some(current_tick);

            let mut due = Vec::new();
            let mut dropped = Vec::new();
            while let Some(&(tick, id)) = table.queue.first() {
                if tick > current_tick {
                    break;
                }
                table.queue.pop_first();
                let Some(task) = table.tasks.get(&id).cloned() else {
                    continue;
                };
                if task.is_cancelled() {
                    table.tasks.remove(&id);
                    task.set_state(TaskState::Cancelled);
                    dropped.push(task);
                    continue;
                }
                task.set_state(TaskState::Running);
                due.push(task);
            }
            (due, dropped)
        };

        for task in &dropped {
            self.shared
                .report(task, DiagnosticKind::TaskCancelled, None, Some(current_tick));
        }

        let selected = due.len();
        let mut batch = Batch {
            shared: &self.shared,
            tick: current_tick,
            current: None,
            rest: due.into(),
        };
        while let Some(task) = batch.rest.pop_front() {
            batch.current = Some(Arc::clone(&task));
            self.run(task, current_tick);
            batch.current = None;
        }
        if selected > 0 || !dropped.is_empty() {
            tracing::trace!(
                tick = current_tick,
                selected,
                dropped = dropped.len(),
                "heartbeat"
            );
        }
    }

    fn run(&self, task: Arc<ScheduledTask>, tick: u64) {
        // An earlier task of this heartbeat may have cancelled this one.
        if task.is_cancelled() {
            self.shared.finish(&task, Ok(()), tick);
            return;
        }

        let catch_panics = self.shared.catch_panics;
        let before = runner::guard_hook(catch_panics, || task.runnable().before_run(&task));
        if let Err(reason) = before {
            self.shared.finish(&task, Err(reason), tick);
            return;
        }

        match task.mode() {
            ExecutionMode::Sync => {
                let outcome = runner::run_once(&task, catch_panics);
                let after =
                    runner::guard_hook(catch_panics, || task.runnable().after_sync_run(&task));
                self.shared.finish(&task, outcome.and(after), tick);
            }
            ExecutionMode::Async => self.spawn_async(task, tick),
        }
    }

    fn spawn_async(&self, task: Arc<ScheduledTask>, tick: u64) {
        let mut slot = self.pool.lock();
        if slot.as_ref().is_none_or(AsyncPool::is_ambient) {
            match AsyncPool::resolve(self.worker_limit) {
                Ok(pool) => *slot = Some(pool),
                Err(e) => {
                    drop(slot);
                    self.shared.finish(&task, Err(e.to_string()), tick);
                    return;
                }
            }
        }

        self.shared.running_async.fetch_add(1, AtomicOrdering::AcqRel);
        let job = AsyncRun {
            shared: Arc::clone(&self.shared),
            task,
            tick,
            finished: false,
        };
        if let Some(pool) = slot.as_ref() {
            pool.spawn(move || job.run());
        }
    }

    /// Cancels the task with the given id. Returns `false` if it is unknown or was
    /// already cancelled.
    pub fn cancel_task(&self, id: TaskId) -> bool {
        match self.task(id) {
            Some(task) => task.cancel(),
            None => false,
        }
    }

    /// Cancels every task owned by `owner`. Returns how many were cancelled.
    pub fn cancel_tasks(&self, owner: &PluginContainer) -> usize {
        let owned: Vec<Arc<ScheduledTask>> = {
            let table = self.shared.table.lock();
            table
                .tasks
                .values()
                .filter(|t| t.owner() == owner)
                .cloned()
                .collect()
        };
        owned.iter().filter(|t| t.cancel()).count()
    }

    /// Cancels every task. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let all: Vec<Arc<ScheduledTask>> =
            self.shared.table.lock().tasks.values().cloned().collect();
        all.iter().filter(|t| t.cancel()).count()
    }

    /// Looks up a live (pending or running) task.
    pub fn task(&self, id: TaskId) -> Option<Arc<ScheduledTask>> {
        self.shared.table.lock().tasks.get(&id).cloned()
    }

    /// Ids of pending tasks in the order they would run.
    pub fn pending_ids(&self) -> Vec<TaskId> {
        self.shared
            .table
            .lock()
            .queue
            .iter()
            .map(|&(_, id)| id)
            .collect()
    }

    /// Number of live tasks (pending or running).
    pub fn len(&self) -> usize {
        self.shared.table.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tick passed to the last heartbeat (`0` before the first one).
    pub fn current_tick(&self) -> u64 {
        self.shared.table.lock().current_tick()
    }

    /// Tick the next driver-issued heartbeat should use.
    pub(crate) fn next_tick(&self) -> u64 {
        self.shared
            .table
            .lock()
            .last_tick
            .map_or(0, |t| t.saturating_add(1))
    }

    /// Number of asynchronous runs currently in flight.
    pub fn running_async(&self) -> usize {
        self.shared.running_async.load(AtomicOrdering::Acquire)
    }

    /// Diagnostics sink used for task reports.
    pub fn diagnostics(&self) -> &DiagnosticBus {
        &self.shared.diagnostics
    }
}
