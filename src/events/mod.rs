//! Occurrences: the published data model and its dispatch order.
//!
//! ## Contents
//! - [`Event`] the trait every publishable occurrence implements
//! - [`Cancellable`], [`LoginResultEvent`], [`ObjectListEvent`] capability views
//! - [`Capability`], [`CapabilitySet`] explicit capability tags used for resolution
//! - [`DispatchOrder`] bounded ranking that orders subscribers
//!
//! Publishing and subscription live in [`EventBus`](crate::EventBus) and
//! [`SubscriberRegistry`](crate::SubscriberRegistry).

mod event;
mod order;

pub use event::{
    AsAny, Cancellable, Capability, CapabilitySet, Event, LoginResult, LoginResultEvent,
    ObjectListEvent,
};
pub use order::DispatchOrder;
