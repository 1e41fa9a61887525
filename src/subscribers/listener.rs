//! # Listener contract
//!
//! A [`Listener`] is the unit plugins register on the [`EventBus`](crate::EventBus).
//! Instead of being scanned for annotated methods, a listener declares its handlers
//! explicitly into a [`HandlerSet`] when it is registered. Every binding carries the
//! same data an annotated handler would: occurrence key, order and `ignore_cancelled`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use tickvisor::{Capability, DispatchOrder, Event, HandlerSet, Listener};
//!
//! struct Join { name: String }
//! impl Event for Join {}
//!
//! #[derive(Default)]
//! struct Greeter { greeted: AtomicUsize }
//!
//! impl Listener for Greeter {
//!     fn name(&self) -> &str { "greeter" }
//!
//!     fn handlers(self: Arc<Self>, set: &mut HandlerSet) {
//!         let me = Arc::clone(&self);
//!         set.on::<Join, _>(DispatchOrder::MIDDLE, false, move |join| {
//!             let _ = &join.name;
//!             me.greeted.fetch_add(1, Ordering::Relaxed);
//!             Ok(())
//!         });
//!         set.on_capability(Capability::Cancellable, DispatchOrder::HIGHEST, true, |_ev| Ok(()));
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::error::HandlerError;
use crate::events::{Capability, DispatchOrder, Event};

use super::subscriber::{Callback, EventKey, dyn_callback, typed_callback};

/// A bundle of handlers registered and unregistered together.
pub trait Listener: Send + Sync + 'static {
    /// Human-readable name (for logs/diagnostics).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Declares this listener's handlers.
    ///
    /// Called once per registration. Handlers that need the listener's state should
    /// capture a clone of `self`.
    fn handlers(self: Arc<Self>, set: &mut HandlerSet);
}

/// One declared handler, not yet registered.
pub(crate) struct Binding {
    pub(crate) key: EventKey,
    pub(crate) order: DispatchOrder,
    pub(crate) ignore_cancelled: bool,
    pub(crate) label: &'static str,
    pub(crate) callback: Callback,
}

/// Collects the handler bindings a [`Listener`] declares.
#[derive(Default)]
pub struct HandlerSet {
    bindings: Vec<Binding>,
}

impl HandlerSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles the concrete occurrence type `E`.
    pub fn on<E, F>(&mut self, order: DispatchOrder, ignore_cancelled: bool, f: F) -> &mut Self
    where
        E: Event,
        F: Fn(&mut E) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.bindings.push(Binding {
            key: EventKey::of::<E>(),
            order,
            ignore_cancelled,
            label: std::any::type_name::<E>(),
            callback: typed_callback::<E, F>(f),
        });
        self
    }

    /// Handles every occurrence declaring `capability`.
    pub fn on_capability<F>(
        &mut self,
        capability: Capability,
        order: DispatchOrder,
        ignore_cancelled: bool,
        f: F,
    ) -> &mut Self
    where
        F: Fn(&mut dyn Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.bindings.push(Binding {
            key: EventKey::Capability(capability),
            order,
            ignore_cancelled,
            label: match capability {
                Capability::Cancellable => "Cancellable",
                Capability::LoginResult => "LoginResult",
                Capability::ObjectList => "ObjectList",
            },
            callback: dyn_callback(f),
        });
        self
    }

    /// Handles every occurrence.
    pub fn on_all<F>(&mut self, order: DispatchOrder, ignore_cancelled: bool, f: F) -> &mut Self
    where
        F: Fn(&mut dyn Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.bindings.push(Binding {
            key: EventKey::All,
            order,
            ignore_cancelled,
            label: "*",
            callback: dyn_callback(f),
        });
        self
    }

    /// Number of declared bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True if nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub(crate) fn into_bindings(self) -> Vec<Binding> {
        self.bindings
    }
}
