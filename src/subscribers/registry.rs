//! # Subscriber registry - ordered subscriber lists and resolution.
//!
//! The registry maps every [`EventKey`] to a list of subscribers kept sorted by
//! `(DispatchOrder, registration id)`, and resolves a concrete occurrence type into
//! the merged dispatch sequence.
//!
//! ## Architecture
//! ```text
//! register(sub) ──► by_key[sub.key]  (insert at partition point, no re-sort)
//!                        │
//!                        └──► invalidate affected resolutions
//!
//! resolve(type, caps) ──► cache hit? ──► Arc<[Arc<Subscriber>]> snapshot
//!                            │
//!                            └─ miss ──► merge by_key[All]
//!                                              + by_key[Capability(c)] for c in caps
//!                                              + by_key[Type(type)]
//!                                        ordered by (order, id), cached
//! ```
//!
//! ## Rules
//! - Lists are only mutated under the write lock; dispatch iterates over the
//!   immutable snapshot returned by `resolve`, so registrations made during a
//!   dispatch never affect that dispatch.
//! - Removal keeps the relative order of the remaining subscribers.
//! - The registry never invokes callbacks.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};

use crate::events::CapabilitySet;
use crate::plugin::PluginId;

use super::subscriber::{EventKey, ListenerId, Subscriber, SubscriberId};

/// Immutable, ordered dispatch sequence.
pub type Snapshot = Arc<[Arc<Subscriber>]>;

#[derive(Default)]
struct Inner {
    by_key: HashMap<EventKey, Vec<Arc<Subscriber>>>,
    resolved: HashMap<(TypeId, CapabilitySet), Snapshot>,
}

impl Inner {
    fn insert(&mut self, sub: Arc<Subscriber>) {
        let key = sub.key();
        let list = self.by_key.entry(key).or_default();
        // After every subscriber with an order <= the new one: equal orders keep
        // registration order.
        let pos = list.partition_point(|s| s.order() <= sub.order());
        list.insert(pos, sub);
        self.invalidate(key);
    }

    fn remove_where(&mut self, mut pred: impl FnMut(&Subscriber) -> bool) -> usize {
        let mut removed = 0;
        let mut touched = Vec::new();

        for (key, list) in self.by_key.iter_mut() {
            let before = list.len();
            list.retain(|s| !pred(&**s));
            if list.len() != before {
                removed += before - list.len();
                touched.push(*key);
            }
        }

        self.by_key.retain(|_, list| !list.is_empty());
        for key in touched {
            self.invalidate(key);
        }
        removed
    }

    fn invalidate(&mut self, key: EventKey) {
        match key {
            EventKey::All => self.resolved.clear(),
            EventKey::Capability(cap) => self.resolved.retain(|(_, caps), _| !caps.contains(cap)),
            EventKey::Type(type_id) => self.resolved.retain(|(t, _), _| *t != type_id),
        }
    }

    fn merge(&self, type_id: TypeId, caps: CapabilitySet) -> Snapshot {
        let keys = std::iter::once(EventKey::All)
            .chain(caps.iter().map(EventKey::Capability))
            .chain(std::iter::once(EventKey::Type(type_id)));

        let mut merged: Vec<Arc<Subscriber>> = keys
            .filter_map(|k| self.by_key.get(&k))
            .flat_map(|list| list.iter().cloned())
            .collect();
        merged.sort_unstable_by_key(|s| s.sort_key());
        merged.into()
    }
}

/// Ordered store of subscribers.
#[derive(Default)]
pub struct SubscriberRegistry {
    inner: RwLock<Inner>,
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a subscriber at its ordered position.
    pub fn register(&self, sub: Subscriber) -> Arc<Subscriber> {
        let sub = Arc::new(sub);
        self.inner.write().insert(Arc::clone(&sub));
        sub
    }

    /// Inserts several subscribers atomically (no dispatch observes a partial set).
    pub fn register_all(&self, subs: impl IntoIterator<Item = Subscriber>) -> Vec<Arc<Subscriber>> {
        let subs: Vec<Arc<Subscriber>> = subs.into_iter().map(Arc::new).collect();
        let mut inner = self.inner.write();
        for sub in &subs {
            inner.insert(Arc::clone(sub));
        }
        subs
    }

    /// Returns the merged dispatch sequence for a concrete occurrence type.
    pub fn resolve(&self, type_id: TypeId, caps: CapabilitySet) -> Snapshot {
        let inner = self.inner.upgradable_read();
        if let Some(snapshot) = inner.resolved.get(&(type_id, caps)) {
            return Arc::clone(snapshot);
        }

        let mut inner = RwLockUpgradableReadGuard::upgrade(inner);
        let snapshot = inner.merge(type_id, caps);
        inner
            .resolved
            .insert((type_id, caps), Arc::clone(&snapshot));
        snapshot
    }

    /// Removes every subscriber owned by `owner`. Returns how many were removed.
    pub fn unregister_owner(&self, owner: PluginId) -> usize {
        self.inner.write().remove_where(|s| s.owner().id() == owner)
    }

    /// Removes every subscriber declared by `listener`.
    pub fn unregister_listener(&self, listener: ListenerId) -> usize {
        self.inner
            .write()
            .remove_where(|s| s.listener() == Some(listener))
    }

    /// Removes a single subscriber. Returns `false` if it was not registered.
    pub fn unregister_subscriber(&self, id: SubscriberId) -> bool {
        self.inner.write().remove_where(|s| s.id() == id) > 0
    }

    /// Subscribers registered directly against `key`, in dispatch order.
    pub fn subscribers(&self, key: EventKey) -> Vec<Arc<Subscriber>> {
        self.inner
            .read()
            .by_key
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of registered subscribers.
    pub fn len(&self) -> usize {
        self.inner.read().by_key.values().map(Vec::len).sum()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().by_key.is_empty()
    }

    /// Number of cached resolutions (for tests and introspection).
    pub fn cached_resolutions(&self) -> usize {
        self.inner.read().resolved.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Capability, DispatchOrder, Event};
    use crate::plugin::PluginContainer;
    use crate::subscribers::subscriber::dyn_callback;

    struct Move;
    impl Event for Move {}

    fn sub(key: EventKey, order: i32, owner: &PluginContainer, name: &str) -> Subscriber {
        Subscriber::new(
            key,
            DispatchOrder::new(order).unwrap(),
            false,
            owner.clone(),
            None,
            name.into(),
            dyn_callback(|_| Ok(())),
        )
    }

    fn names(snapshot: &Snapshot) -> Vec<String> {
        snapshot.iter().map(|s| s.name().to_string()).collect()
    }

    fn move_caps() -> (TypeId, CapabilitySet) {
        (TypeId::of::<Move>(), CapabilitySet::EMPTY)
    }

    #[test]
    fn insertion_keeps_order_and_ties_stable() {
        let reg = SubscriberRegistry::new();
        let p = PluginContainer::new("p");
        let key = EventKey::of::<Move>();
        reg.register(sub(key, 10, &p, "b"));
        reg.register(sub(key, -10, &p, "a"));
        reg.register(sub(key, 10, &p, "c"));
        reg.register(sub(key, 0, &p, "m"));

        let (t, caps) = move_caps();
        assert_eq!(names(&reg.resolve(t, caps)), ["a", "m", "b", "c"]);
    }

    #[test]
    fn resolution_merges_keys_by_global_order() {
        let reg = SubscriberRegistry::new();
        let p = PluginContainer::new("p");
        reg.register(sub(EventKey::Type(TypeId::of::<Move>()), 0, &p, "type-0"));
        reg.register(sub(EventKey::Capability(Capability::Cancellable), -50, &p, "cap-low"));
        reg.register(sub(EventKey::All, 0, &p, "all-0"));
        reg.register(sub(EventKey::Capability(Capability::LoginResult), -100, &p, "login"));

        let mut caps = CapabilitySet::EMPTY;
        caps.insert(Capability::Cancellable);
        let snapshot = reg.resolve(TypeId::of::<Move>(), caps);
        assert_eq!(names(&snapshot), ["cap-low", "type-0", "all-0"]);
    }

    #[test]
    fn resolution_is_cached_and_invalidated() {
        let reg = SubscriberRegistry::new();
        let p = PluginContainer::new("p");
        let (t, caps) = move_caps();
        reg.register(sub(EventKey::of::<Move>(), 0, &p, "first"));

        let a = reg.resolve(t, caps);
        let b = reg.resolve(t, caps);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.cached_resolutions(), 1);

        reg.register(sub(EventKey::All, 0, &p, "second"));
        assert_eq!(reg.cached_resolutions(), 0);
        assert_eq!(names(&reg.resolve(t, caps)), ["first", "second"]);
        // The old snapshot is untouched.
        assert_eq!(names(&a), ["first"]);
    }

    #[test]
    fn capability_registration_only_invalidates_matching_types() {
        let reg = SubscriberRegistry::new();
        let (t, caps) = move_caps();
        reg.resolve(t, caps);
        assert_eq!(reg.cached_resolutions(), 1);

        let p = PluginContainer::new("p");
        reg.register(sub(EventKey::Capability(Capability::Cancellable), 0, &p, "cap"));
        assert_eq!(reg.cached_resolutions(), 1);
    }

    #[test]
    fn unregister_owner_removes_only_that_owner() {
        let reg = SubscriberRegistry::new();
        let a = PluginContainer::new("a");
        let b = PluginContainer::new("b");
        let key = EventKey::of::<Move>();
        reg.register(sub(key, 0, &a, "a1"));
        reg.register(sub(key, 0, &b, "b1"));
        reg.register(sub(key, 5, &a, "a2"));
        reg.register(sub(key, 5, &b, "b2"));
        reg.register(sub(EventKey::All, 0, &a, "a-all"));

        assert_eq!(reg.unregister_owner(a.id()), 3);
        let (t, caps) = move_caps();
        assert_eq!(names(&reg.resolve(t, caps)), ["b1", "b2"]);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.unregister_owner(a.id()), 0);
    }

    #[test]
    fn unregister_single_subscriber() {
        let reg = SubscriberRegistry::new();
        let p = PluginContainer::new("p");
        let s = reg.register(sub(EventKey::of::<Move>(), 0, &p, "only"));
        assert!(reg.unregister_subscriber(s.id()));
        assert!(!reg.unregister_subscriber(s.id()));
        assert!(reg.is_empty());
    }
}
