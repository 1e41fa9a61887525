//! # Server context: the explicit handle to the runtime services.
//!
//! [`ServerContext`] is constructed once at startup and passed by reference to
//! every component that needs the bus or the scheduler. It owns:
//! - the [`DiagnosticBus`] every component reports to
//! - the [`EventBus`] (listeners and dispatch)
//! - the [`Scheduler`] (tasks and heartbeat)
//! - the optional ticker that drives the heartbeat from a tokio interval
//!
//! ## Plugin teardown
//! ```text
//! unload_plugin(owner)
//!   ├─► events.unregister_owner(owner)     (listeners + single handlers)
//!   ├─► scheduler.cancel_tasks(owner)      (pending removed, running flagged)
//!   └─► publish PluginUnloaded
//! ```
//!
//! ## Ticker lifecycle
//! ```text
//! spawn_ticker(token) ──► TickerStarted ──► drive loop ──► TickerStopped
//!        │                                      ▲
//!        └── second call while running ──► Err(State)
//! stop_ticker() ──► cancel token, await loop
//! run_until_shutdown(token) ──► spawn_ticker ─► token | OS signal ─► stop_ticker ─► cancel_all
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticBus, DiagnosticKind};
use crate::error::RuntimeError;
use crate::plugin::PluginContainer;

use super::event_bus::EventBus;
use super::scheduler::Scheduler;
use super::ticker;

/// What [`ServerContext::unload_plugin`] released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PluginRelease {
    /// Handlers removed from the registry.
    pub handlers: usize,
    /// Tasks cancelled.
    pub tasks: usize,
}

struct Ticker {
    token: CancellationToken,
    join: JoinHandle<u64>,
}

/// Runtime services shared by the host and its plugins.
///
/// ## Example
/// ```rust
/// use tickvisor::{Config, PluginContainer, RunFn, ServerContext, TaskError};
///
/// let ctx = ServerContext::builder(Config::default()).build();
/// let plugin = PluginContainer::new("motd");
///
/// ctx.scheduler()
///     .new_builder()
///     .owner(&plugin)
///     .interval(20)
///     .execute(RunFn::arc("broadcast", |_task| Ok::<_, TaskError>(())))
///     .unwrap();
///
/// let released = ctx.unload_plugin(&plugin);
/// assert_eq!(released.tasks, 1);
/// assert!(ctx.scheduler().is_empty());
/// ```
pub struct ServerContext {
    config: Config,
    diagnostics: DiagnosticBus,
    events: Arc<EventBus>,
    scheduler: Arc<Scheduler>,
    runtime: Option<Handle>,
    ticker: Mutex<Option<Ticker>>,
}

impl ServerContext {
    /// Starts building a context from `config`.
    pub fn builder(config: Config) -> ContextBuilder {
        ContextBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn diagnostics(&self) -> &DiagnosticBus {
        &self.diagnostics
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Releases every listener and task owned by `owner`.
    pub fn unload_plugin(&self, owner: &PluginContainer) -> PluginRelease {
        let released = PluginRelease {
            handlers: self.events.unregister_owner(owner),
            tasks: self.scheduler.cancel_tasks(owner),
        };
        self.diagnostics.publish(
            Diagnostic::new(DiagnosticKind::PluginUnloaded)
                .with_source(owner.name())
                .with_owner(owner.id())
                .with_reason(format!(
                    "handlers={} tasks={}",
                    released.handlers, released.tasks
                )),
        );
        released
    }

    /// Starts the heartbeat driver at `config.tick_rate()`.
    ///
    /// The driver stops when `token` is cancelled or [`stop_ticker`](Self::stop_ticker)
    /// is called. Fails with [`RuntimeError::State`] if a driver is already running
    /// or no tokio runtime is available.
    pub fn spawn_ticker(&self, token: CancellationToken) -> Result<(), RuntimeError> {
        let mut slot = self.ticker.lock();
        if slot.as_ref().is_some_and(|t| !t.join.is_finished()) {
            return Err(RuntimeError::state("ticker is already running"));
        }

        let handle = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current()
                .map_err(|_| RuntimeError::state("no tokio runtime to drive the ticker"))?,
        };

        let period = self.config.tick_rate();
        self.diagnostics.publish(
            Diagnostic::new(DiagnosticKind::TickerStarted)
                .with_source("ticker")
                .with_reason(format!("period={period:?}")),
        );

        let scheduler = Arc::clone(&self.scheduler);
        let diagnostics = self.diagnostics.clone();
        let child = token.clone();
        let join = handle.spawn(async move {
            let driven = ticker::drive(scheduler, period, child).await;
            diagnostics.publish(
                Diagnostic::new(DiagnosticKind::TickerStopped)
                    .with_source("ticker")
                    .with_reason(format!("{driven} heartbeats")),
            );
            driven
        });

        *slot = Some(Ticker { token, join });
        Ok(())
    }

    /// True while a ticker is running.
    pub fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .as_ref()
            .is_some_and(|t| !t.join.is_finished())
    }

    /// Stops the ticker and waits for its loop to exit.
    ///
    /// Returns the number of heartbeats it issued, or `None` if no ticker was started.
    pub async fn stop_ticker(&self) -> Option<u64> {
        let ticker = self.ticker.lock().take()?;
        ticker.token.cancel();
        ticker.join.await.ok()
    }

    /// Drives the heartbeat until `token` is cancelled or the process receives a
    /// termination signal, then stops the ticker and cancels every task.
    ///
    /// Returns the number of heartbeats issued.
    pub async fn run_until_shutdown(&self, token: CancellationToken) -> Result<u64, RuntimeError> {
        self.spawn_ticker(token.child_token())?;

        let signal = tokio::select! {
            _ = token.cancelled() => Ok(()),
            res = ticker::wait_for_shutdown_signal() => res,
        };

        let driven = self.stop_ticker().await.unwrap_or(0);
        let cancelled = self.scheduler.cancel_all();
        tracing::debug!(driven, cancelled, "runtime stopped");

        signal.map_err(|e| RuntimeError::state(format!("signal registration failed: {e}")))?;
        Ok(driven)
    }
}

/// Builder for constructing a [`ServerContext`].
pub struct ContextBuilder {
    config: Config,
    runtime: Option<Handle>,
    diagnostics: Option<DiagnosticBus>,
}

impl ContextBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            runtime: None,
            diagnostics: None,
        }
    }

    /// Uses `handle` for the ticker and for asynchronous tasks.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Reports to an existing diagnostics bus instead of creating one.
    pub fn with_diagnostics(mut self, diagnostics: DiagnosticBus) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Builds the context; every component shares the same diagnostics bus.
    pub fn build(self) -> ServerContext {
        let diagnostics = self
            .diagnostics
            .unwrap_or_else(|| DiagnosticBus::new(self.config.diagnostics_capacity_clamped()));

        let events = Arc::new(EventBus::with_config(&self.config, diagnostics.clone()));
        let mut scheduler = Scheduler::with_config(&self.config, diagnostics.clone());
        if let Some(handle) = &self.runtime {
            scheduler = scheduler.with_runtime(handle.clone());
        }

        ServerContext {
            config: self.config,
            diagnostics,
            events,
            scheduler: Arc::new(scheduler),
            runtime: self.runtime,
            ticker: Mutex::new(None),
        }
    }
}
