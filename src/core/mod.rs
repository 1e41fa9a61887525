//! Runtime core: dispatch, scheduling and lifecycle.
//!
//! The public API from this module is [`ServerContext`] (with its builder),
//! [`EventBus`] and [`Scheduler`].
//!
//! Internal modules:
//! - [`runner`]: runs one callback, converting errors and panics into reasons;
//! - [`pool`]: worker runtime for asynchronous tasks;
//! - [`ticker`]: heartbeat driver and OS signal handling;
//! - [`scheduler`]: task table and heartbeat;
//! - [`event_bus`]: listener bookkeeping and ordered dispatch;
//! - [`context`]: wires the components together.

mod context;
mod event_bus;
mod pool;
mod runner;
pub(crate) mod scheduler;
mod ticker;

pub use context::{ContextBuilder, PluginRelease, ServerContext};
pub use event_bus::EventBus;
pub use scheduler::Scheduler;
