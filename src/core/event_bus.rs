//! # Event bus: registration and ordered dispatch.
//!
//! [`EventBus`] is the entry point plugins and the host use to register listeners
//! and to fire occurrences. Subscriber storage lives in the
//! [`SubscriberRegistry`]; the bus adds listener bookkeeping, failure isolation
//! and diagnostics.
//!
//! ## Dispatch
//! ```text
//! call(&mut ev)
//!   └─► registry.resolve(TypeId, capabilities) ──► snapshot (sorted by (order, id))
//!         for sub in snapshot:
//!           ev.is_cancelled() && !sub.ignore_cancelled ──► skip
//!           sub.invoke(ev)
//!             ├─ Ok         ──► next
//!             └─ Err/panic  ──► HandlerFaulted ──► next
//!   └─► returns ev.is_cancelled()
//! ```
//!
//! ## Rules
//! - Dispatch runs on the caller's context and returns after every eligible
//!   subscriber was attempted.
//! - The cancelled flag is re-read before every subscriber, so a handler that
//!   cancels affects only the subscribers after it.
//! - Registrations and removals made by a handler apply from the next `call`.
//! - Listener bookkeeping and registry contents change under one lock (map first,
//!   then registry), so a listener is never half registered.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticBus, DiagnosticKind};
use crate::error::{HandlerError, RuntimeError};
use crate::events::{Capability, DispatchOrder, Event};
use crate::plugin::PluginContainer;
use crate::subscribers::{
    Callback, EventKey, HandlerSet, Listener, ListenerId, Subscriber, SubscriberId,
    SubscriberRegistry, dyn_callback, typed_callback,
};

use super::runner;

struct ListenerEntry {
    listener: Arc<dyn Listener>,
    owner: PluginContainer,
    name: Arc<str>,
}

impl ListenerEntry {
    fn is(&self, ptr: *const ()) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.listener) as *const (), ptr)
    }
}

/// Ordered, failure-isolated event dispatcher.
///
/// ## Example
/// ```rust
/// use tickvisor::{Cancellable, DiagnosticBus, DispatchOrder, Event, EventBus, PluginContainer};
///
/// #[derive(Default)]
/// struct Chat { message: String, cancelled: bool }
///
/// impl Cancellable for Chat {
///     fn cancelled(&self) -> bool { self.cancelled }
///     fn set_cancelled(&mut self, cancelled: bool) { self.cancelled = cancelled; }
/// }
///
/// impl Event for Chat {
///     fn as_cancellable(&self) -> Option<&dyn Cancellable> { Some(self) }
///     fn as_cancellable_mut(&mut self) -> Option<&mut dyn Cancellable> { Some(self) }
/// }
///
/// let bus = EventBus::new(DiagnosticBus::default());
/// let filter = PluginContainer::new("filter");
///
/// bus.subscribe::<Chat, _>(&filter, DispatchOrder::LOWEST, false, |chat| {
///     if chat.message.contains("spam") {
///         chat.cancel();
///     }
///     Ok(())
/// });
///
/// let mut chat = Chat { message: "buy spam".into(), ..Default::default() };
/// assert!(bus.call(&mut chat));
/// ```
pub struct EventBus {
    registry: SubscriberRegistry,
    listeners: Mutex<HashMap<ListenerId, ListenerEntry>>,
    diagnostics: DiagnosticBus,
    catch_panics: bool,
}

impl EventBus {
    /// Creates a bus with the default [`Config`].
    pub fn new(diagnostics: DiagnosticBus) -> Self {
        Self::with_config(&Config::default(), diagnostics)
    }

    /// Creates a bus honoring `cfg.catch_panics`.
    pub fn with_config(cfg: &Config, diagnostics: DiagnosticBus) -> Self {
        Self {
            registry: SubscriberRegistry::new(),
            listeners: Mutex::new(HashMap::new()),
            diagnostics,
            catch_panics: cfg.catch_panics,
        }
    }

    /// Registers every handler `listener` declares, owned by `owner`.
    ///
    /// Fails with [`RuntimeError::DuplicateRegistration`] if this listener instance
    /// is already registered.
    pub fn register<L: Listener>(
        &self,
        owner: &PluginContainer,
        listener: Arc<L>,
    ) -> Result<ListenerId, RuntimeError> {
        let ptr = Arc::as_ptr(&listener) as *const ();
        let name: Arc<str> = Arc::from(listener.name());
        self.ensure_unregistered(ptr, &name)?;

        // Plugin code runs here; no lock is held.
        let mut set = HandlerSet::new();
        Arc::clone(&listener).handlers(&mut set);

        let id = ListenerId::next();
        let subs: Vec<Subscriber> = set
            .into_bindings()
            .into_iter()
            .map(|b| {
                Subscriber::new(
                    b.key,
                    b.order,
                    b.ignore_cancelled,
                    owner.clone(),
                    Some(id),
                    format!("{name}::{}", b.label).into(),
                    b.callback,
                )
            })
            .collect();
        let count = subs.len();

        // The listener map and the registry change together under the map lock.
        {
            let mut listeners = self.listeners.lock();
            if listeners.values().any(|e| e.is(ptr)) {
                return Err(duplicate(&name));
            }
            listeners.insert(
                id,
                ListenerEntry {
                    listener,
                    owner: owner.clone(),
                    name: Arc::clone(&name),
                },
            );
            self.registry.register_all(subs);
        }

        self.diagnostics.publish(
            Diagnostic::new(DiagnosticKind::ListenerRegistered)
                .with_source(name)
                .with_owner(owner.id())
                .with_reason(format!("{count} handlers")),
        );
        Ok(id)
    }

    fn ensure_unregistered(&self, ptr: *const (), name: &str) -> Result<(), RuntimeError> {
        if self.listeners.lock().values().any(|e| e.is(ptr)) {
            return Err(duplicate(name));
        }
        Ok(())
    }

    /// Removes a listener and all of its handlers. Returns the number of handlers removed.
    pub fn unregister(&self, id: ListenerId) -> usize {
        let (entry, removed) = {
            let mut listeners = self.listeners.lock();
            let Some(entry) = listeners.remove(&id) else {
                return 0;
            };
            (entry, self.registry.unregister_listener(id))
        };
        self.report_unregistered(&entry, removed);
        removed
    }

    /// Removes every listener and single handler owned by `owner`.
    ///
    /// Returns the number of handlers removed.
    pub fn unregister_owner(&self, owner: &PluginContainer) -> usize {
        let (entries, removed) = {
            let mut listeners = self.listeners.lock();
            let ids: Vec<ListenerId> = listeners
                .iter()
                .filter(|(_, e)| &e.owner == owner)
                .map(|(id, _)| *id)
                .collect();
            let entries: Vec<ListenerEntry> =
                ids.iter().filter_map(|id| listeners.remove(id)).collect();
            (entries, self.registry.unregister_owner(owner.id()))
        };

        for entry in &entries {
            self.report_unregistered(entry, 0);
        }
        removed
    }

    fn report_unregistered(&self, entry: &ListenerEntry, removed: usize) {
        let mut report = Diagnostic::new(DiagnosticKind::ListenerUnregistered)
            .with_source(Arc::clone(&entry.name))
            .with_owner(entry.owner.id());
        if removed > 0 {
            report = report.with_reason(format!("{removed} handlers"));
        }
        self.diagnostics.publish(report);
    }

    /// Subscribes a single handler for the concrete occurrence type `E`.
    pub fn subscribe<E, F>(
        &self,
        owner: &PluginContainer,
        order: DispatchOrder,
        ignore_cancelled: bool,
        f: F,
    ) -> SubscriberId
    where
        E: Event,
        F: Fn(&mut E) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let name = format!("{}::{}", owner.name(), std::any::type_name::<E>());
        self.insert(
            EventKey::of::<E>(),
            order,
            ignore_cancelled,
            owner,
            name,
            typed_callback::<E, F>(f),
        )
    }

    /// Subscribes a handler for every occurrence declaring `capability`.
    pub fn subscribe_capability<F>(
        &self,
        owner: &PluginContainer,
        capability: Capability,
        order: DispatchOrder,
        ignore_cancelled: bool,
        f: F,
    ) -> SubscriberId
    where
        F: Fn(&mut dyn Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let name = format!("{}::{capability:?}", owner.name());
        self.insert(
            EventKey::Capability(capability),
            order,
            ignore_cancelled,
            owner,
            name,
            dyn_callback(f),
        )
    }

    /// Subscribes a handler for every occurrence.
    pub fn subscribe_all<F>(
        &self,
        owner: &PluginContainer,
        order: DispatchOrder,
        ignore_cancelled: bool,
        f: F,
    ) -> SubscriberId
    where
        F: Fn(&mut dyn Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let name = format!("{}::*", owner.name());
        self.insert(EventKey::All, order, ignore_cancelled, owner, name, dyn_callback(f))
    }

    fn insert(
        &self,
        key: EventKey,
        order: DispatchOrder,
        ignore_cancelled: bool,
        owner: &PluginContainer,
        name: String,
        callback: Callback,
    ) -> SubscriberId {
        let sub = Subscriber::new(
            key,
            order,
            ignore_cancelled,
            owner.clone(),
            None,
            name.into(),
            callback,
        );
        self.registry.register(sub).id()
    }

    /// Removes a single handler. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.registry.unregister_subscriber(id)
    }

    /// Dispatches `event` to every matching subscriber in order.
    ///
    /// Returns the final cancelled state (`false` for non-cancellable occurrences).
    pub fn call<E: Event>(&self, event: &mut E) -> bool {
        self.call_dyn(event)
    }

    /// Type-erased form of [`call`](Self::call).
    pub fn call_dyn(&self, event: &mut dyn Event) -> bool {
        let type_id = (*event).as_any().type_id();
        let snapshot = self.registry.resolve(type_id, event.capabilities());

        let (mut invoked, mut skipped, mut faulted) = (0usize, 0usize, 0usize);
        for sub in snapshot.iter() {
            if sub.skips(event.is_cancelled()) {
                skipped += 1;
                continue;
            }
            invoked += 1;
            if let Err(reason) = runner::guard(self.catch_panics, || {
                sub.invoke(&mut *event).map_err(|e| e.as_message())
            }) {
                faulted += 1;
                self.diagnostics.publish(
                    Diagnostic::new(DiagnosticKind::HandlerFaulted)
                        .with_source(sub.name())
                        .with_owner(sub.owner().id())
                        .with_reason(reason),
                );
            }
        }

        let cancelled = event.is_cancelled();
        tracing::trace!(
            event = event.name(),
            invoked,
            skipped,
            faulted,
            cancelled,
            "dispatched"
        );
        cancelled
    }

    /// Underlying subscriber registry.
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Diagnostics sink used for handler faults.
    pub fn diagnostics(&self) -> &DiagnosticBus {
        &self.diagnostics
    }
}

fn duplicate(name: &str) -> RuntimeError {
    RuntimeError::DuplicateRegistration {
        kind: "listener",
        name: name.to_string(),
    }
}
