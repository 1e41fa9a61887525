//! # Plugin ownership tokens.
//!
//! A [`PluginContainer`] is the opaque token every subscriber and scheduled task
//! records as its owner. Unloading a plugin releases exactly the listeners and
//! tasks carrying its token.
//!
//! Ids come from a process-wide counter and are never reused, so two containers
//! created with the same name are still distinct owners.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

static PLUGIN_SEQ: AtomicU64 = AtomicU64::new(1);

/// Process-unique plugin identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(u64);

impl PluginId {
    /// Raw numeric value (for logs).
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plugin#{}", self.0)
    }
}

/// Ownership token for listeners and tasks.
///
/// Cheap to clone; equality and hashing use the id only.
#[derive(Clone)]
pub struct PluginContainer {
    id: PluginId,
    name: Arc<str>,
}

impl PluginContainer {
    /// Creates a new container with a fresh id.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            id: PluginId(PLUGIN_SEQ.fetch_add(1, AtomicOrdering::Relaxed)),
            name: name.into(),
        }
    }

    /// Unique id of this container.
    pub fn id(&self) -> PluginId {
        self.id
    }

    /// Human-readable plugin name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for PluginContainer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PluginContainer {}

impl std::hash::Hash for PluginContainer {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for PluginContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContainer")
            .field("id", &self.id.0)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for PluginContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
