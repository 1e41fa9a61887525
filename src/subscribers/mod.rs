//! # Event subscribers.
//!
//! This module provides the data side of event dispatch: subscriber records,
//! the [`Listener`] contract plugins implement, and the ordered
//! [`SubscriberRegistry`] the [`EventBus`](crate::EventBus) resolves against.
//!
//! ## Architecture
//! ```text
//! Listener::handlers(&mut HandlerSet)
//!        │  (explicit bindings: key, order, ignore_cancelled, callback)
//!        ▼
//! EventBus::register(owner, listener) ──► SubscriberRegistry
//!                                          ├── by_key[Type(T)]        sorted (order, id)
//!                                          ├── by_key[Capability(c)]  sorted (order, id)
//!                                          └── by_key[All]            sorted (order, id)
//!
//! EventBus::call(&mut ev) ──► registry.resolve(type, caps) ──► merged snapshot
//! ```
//!
//! ## Implementing a listener
//! See [`Listener`].

mod listener;
mod registry;
mod subscriber;

pub use listener::{HandlerSet, Listener};
pub use registry::{Snapshot, SubscriberRegistry};
pub use subscriber::{EventKey, ListenerId, Subscriber, SubscriberId};

pub(crate) use subscriber::{Callback, dyn_callback, typed_callback};
