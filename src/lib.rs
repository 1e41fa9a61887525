//! # tickvisor
//!
//! **Tickvisor** is the plugin-facing runtime of a game server: an ordered,
//! failure-isolated event bus and a tick-driven task scheduler.
//!
//! Plugins register listeners that react to occurrences (player joins, chat,
//! logins) and submit tasks that run after a delay or repeatedly, measured in
//! server ticks. The host fires occurrences and drives the heartbeat; a plugin that
//! misbehaves loses its own work but never breaks anyone else's.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌────────────┐  ┌────────────┐  ┌────────────┐
//!   │  Plugin A  │  │  Plugin B  │  │  Plugin C  │   (each owns a PluginContainer)
//!   └──┬──────┬──┘  └──┬──────┬──┘  └──┬──────┬──┘
//!      │      │        │      │        │      │
//!   Listener  Task  Listener  Task  Listener  Task
//!      ▼      ▼        ▼      ▼        ▼      ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ServerContext                                               │
//! │  - EventBus   (listeners, SubscriberRegistry, dispatch)      │
//! │  - Scheduler  (task table, heartbeat, async worker pool)     │
//! │  - Ticker     (optional tokio interval driving heartbeat)    │
//! └──────┬────────────────────────┬──────────────────────────────┘
//!        │ HandlerFaulted         │ TaskFaulted / TaskCancelled / TaskCompleted
//!        ▼                        ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │        DiagnosticBus (broadcast channel + tracing)           │
//! │          (capacity: Config::diagnostics_capacity)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Dispatch
//! ```text
//! host ──► EventBus::call(&mut ev)
//!            ├─► resolve(type, capabilities) ──► snapshot sorted by (order, id)
//!            ├─► for each subscriber:
//!            │     cancelled && !ignore_cancelled ─► skip
//!            │     invoke ─► Err/panic ─► HandlerFaulted, continue
//!            └─► return ev.is_cancelled()
//! ```
//!
//! ### Heartbeat
//! ```text
//! host/ticker ──► Scheduler::heartbeat(tick)
//!                   ├─► select due tasks (next_due <= tick) by (next_due, id)
//!                   ├─► Sync  ─► run inline
//!                   ├─► Async ─► run on worker pool
//!                   └─► interval > 0 ─► next_due += interval
//!                       interval = 0 ─► Completed
//!                       fault/cancel ─► Cancelled
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                              |
//! |-------------------|-----------------------------------------------------------------|-------------------------------------------------|
//! | **Occurrences**   | Publishable values with explicit capability views.              | [`Event`], [`Cancellable`], [`LoginResultEvent`]|
//! | **Listeners**     | Explicit handler bindings registered per plugin.                | [`Listener`], [`HandlerSet`], [`DispatchOrder`] |
//! | **Dispatch**      | Ordered, cancellation-aware, failure-isolated delivery.         | [`EventBus`], [`SubscriberRegistry`]            |
//! | **Tasks**         | Delayed and repeating work, synchronous or asynchronous.        | [`Runnable`], [`RunFn`], [`Task`], [`TaskBuilder`] |
//! | **Scheduling**    | Tick-driven execution with per-task cancellation.               | [`Scheduler`], [`ScheduledTask`]                |
//! | **Lifecycle**     | Explicit context, plugin teardown, heartbeat driver.            | [`ServerContext`], [`PluginContainer`]          |
//! | **Diagnostics**   | Fault and lifecycle reports for observers.                      | [`DiagnosticBus`], [`Diagnostic`]               |
//! | **Errors**        | Typed errors for misuse and for plugin callbacks.               | [`RuntimeError`], [`HandlerError`], [`TaskError`] |
//! | **Configuration** | Centralized runtime settings, loadable from TOML.               | [`Config`]                                      |
//!
//! ## Optional features
//! - `logging`: exports [`init_logging`], which installs a `tracing-subscriber`
//!   formatter filtered by `RUST_LOG` _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use tickvisor::{
//!     Config, DispatchOrder, Event, HandlerSet, Listener, PluginContainer, RunFn,
//!     ServerContext, TaskError,
//! };
//! use std::sync::Arc;
//!
//! struct PlayerJoin { name: String, greeting: Option<String> }
//! impl Event for PlayerJoin {}
//!
//! struct Welcome;
//! impl Listener for Welcome {
//!     fn handlers(self: Arc<Self>, set: &mut HandlerSet) {
//!         set.on::<PlayerJoin, _>(DispatchOrder::MIDDLE, false, |join| {
//!             join.greeting = Some(format!("welcome, {}", join.name));
//!             Ok(())
//!         });
//!     }
//! }
//!
//! let ctx = ServerContext::builder(Config::default()).build();
//! let plugin = PluginContainer::new("welcome");
//! ctx.events().register(&plugin, Arc::new(Welcome)).unwrap();
//!
//! let mut join = PlayerJoin { name: "alex".into(), greeting: None };
//! ctx.events().call(&mut join);
//! assert_eq!(join.greeting.as_deref(), Some("welcome, alex"));
//!
//! ctx.scheduler()
//!     .new_builder()
//!     .owner(&plugin)
//!     .delay(3)
//!     .execute(RunFn::arc("reminder", |_task| Ok::<_, TaskError>(())))
//!     .unwrap();
//! for tick in 0..=3 {
//!     ctx.scheduler().heartbeat(tick);
//! }
//! assert!(ctx.scheduler().is_empty());
//! ```
mod config;
mod core;
mod diagnostics;
mod error;
mod events;
mod plugin;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use config::Config;
pub use crate::core::{ContextBuilder, EventBus, PluginRelease, Scheduler, ServerContext};
pub use diagnostics::{Diagnostic, DiagnosticBus, DiagnosticKind};
pub use error::{HandlerError, RuntimeError, TaskError};
pub use events::{
    AsAny, Cancellable, Capability, CapabilitySet, DispatchOrder, Event, LoginResult,
    LoginResultEvent, ObjectListEvent,
};
pub use plugin::{PluginContainer, PluginId};
pub use subscribers::{
    EventKey, HandlerSet, Listener, ListenerId, Snapshot, Subscriber, SubscriberId,
    SubscriberRegistry,
};
pub use tasks::{
    ExecutionMode, RunFn, Runnable, RunnableRef, ScheduledTask, Task, TaskBuilder, TaskId,
    TaskState,
};

// Optional: install a tracing formatter (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
mod logging;
#[cfg(feature = "logging")]
pub use logging::init_logging;
