//! # Subscriber records
//!
//! A [`Subscriber`] binds one handler callback to an [`EventKey`] together with its
//! [`DispatchOrder`], its `ignore_cancelled` flag and its owning plugin. Records are
//! immutable once created and shared as `Arc<Subscriber>` between the registry and
//! dispatch snapshots.
//!
//! ## Keys
//! ```text
//! EventKey::All                 ─ every occurrence (root supertype)
//! EventKey::Capability(cap)     ─ every occurrence declaring `cap`
//! EventKey::Type(TypeId)        ─ exactly one concrete occurrence type
//! ```
//!
//! ## Ordering
//! Each subscriber gets a process-unique [`SubscriberId`] from a monotonic counter.
//! Dispatch sorts by `(order, id)`, so equal orders run in registration order, also
//! across keys.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::error::HandlerError;
use crate::events::{Capability, DispatchOrder, Event};
use crate::plugin::PluginContainer;

static SUBSCRIBER_SEQ: AtomicU64 = AtomicU64::new(1);
static LISTENER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Type-erased handler invoked by the bus.
pub(crate) type Callback = Arc<dyn Fn(&mut dyn Event) -> Result<(), HandlerError> + Send + Sync>;

/// What a subscriber is registered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// Every occurrence.
    All,
    /// Every occurrence declaring the capability.
    Capability(Capability),
    /// One concrete occurrence type.
    Type(TypeId),
}

impl EventKey {
    /// Key for the concrete type `E`.
    pub fn of<E: Event>() -> Self {
        EventKey::Type(TypeId::of::<E>())
    }
}

/// Registration sequence number; also the tie-break for equal orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) fn next() -> Self {
        Self(SUBSCRIBER_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Identifier of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> Self {
        Self(LISTENER_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// One registered handler.
pub struct Subscriber {
    id: SubscriberId,
    key: EventKey,
    order: DispatchOrder,
    ignore_cancelled: bool,
    owner: PluginContainer,
    listener: Option<ListenerId>,
    name: Arc<str>,
    callback: Callback,
}

impl Subscriber {
    pub(crate) fn new(
        key: EventKey,
        order: DispatchOrder,
        ignore_cancelled: bool,
        owner: PluginContainer,
        listener: Option<ListenerId>,
        name: Arc<str>,
        callback: Callback,
    ) -> Self {
        Self {
            id: SubscriberId::next(),
            key,
            order,
            ignore_cancelled,
            owner,
            listener,
            name,
            callback,
        }
    }

    /// Registration id.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Key this subscriber is registered against.
    pub fn key(&self) -> EventKey {
        self.key
    }

    /// Dispatch order.
    pub fn order(&self) -> DispatchOrder {
        self.order
    }

    /// Whether the subscriber still receives cancelled occurrences.
    pub fn ignore_cancelled(&self) -> bool {
        self.ignore_cancelled
    }

    /// Owning plugin.
    pub fn owner(&self) -> &PluginContainer {
        &self.owner
    }

    /// Listener this subscriber was declared by, if any.
    pub fn listener(&self) -> Option<ListenerId> {
        self.listener
    }

    /// Human-readable name (for logs/diagnostics).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sort key used by dispatch.
    #[inline]
    pub(crate) fn sort_key(&self) -> (DispatchOrder, SubscriberId) {
        (self.order, self.id)
    }

    /// True if the subscriber should be skipped for an occurrence in this state.
    #[inline]
    pub(crate) fn skips(&self, cancelled: bool) -> bool {
        cancelled && !self.ignore_cancelled
    }

    pub(crate) fn invoke(&self, event: &mut dyn Event) -> Result<(), HandlerError> {
        (self.callback)(event)
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id.0)
            .field("key", &self.key)
            .field("order", &self.order)
            .field("ignore_cancelled", &self.ignore_cancelled)
            .field("owner", &self.owner)
            .field("name", &self.name)
            .finish()
    }
}

/// Wraps a handler for the concrete type `E` into a type-erased callback.
pub(crate) fn typed_callback<E, F>(f: F) -> Callback
where
    E: Event,
    F: Fn(&mut E) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(move |event: &mut dyn Event| {
        match (*event).as_any_mut().downcast_mut::<E>() {
            Some(event) => f(event),
            // Registry keys by TypeId, so a mismatch means a resolution bug.
            None => Err(HandlerError::fail(format!(
                "occurrence is not a {}",
                std::any::type_name::<E>()
            ))),
        }
    })
}

/// Wraps a handler over any occurrence into a callback.
pub(crate) fn dyn_callback<F>(f: F) -> Callback
where
    F: Fn(&mut dyn Event) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping(u32);
    impl Event for Ping {}

    struct Pong;
    impl Event for Pong {}

    #[test]
    fn typed_callback_downcasts() {
        let cb = typed_callback::<Ping, _>(|p| {
            p.0 += 1;
            Ok(())
        });
        let mut ping = Ping(1);
        cb(&mut ping).unwrap();
        assert_eq!(ping.0, 2);
    }

    #[test]
    fn typed_callback_rejects_other_types() {
        let cb = typed_callback::<Ping, _>(|_| Ok(()));
        let err = cb(&mut Pong).unwrap_err();
        assert_eq!(err.as_label(), "handler_failed");
    }

    #[test]
    fn ids_are_monotonic() {
        let a = SubscriberId::next();
        let b = SubscriberId::next();
        assert!(a < b);
        assert_eq!(EventKey::of::<Ping>(), EventKey::Type(TypeId::of::<Ping>()));
    }
}
