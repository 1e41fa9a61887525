//! # Occurrences published on the event bus.
//!
//! Any `'static + Send` type becomes publishable by implementing [`Event`]. Types
//! opt into **capabilities** by overriding the matching view accessor:
//!
//! | Capability                     | Accessor                      | Trait                  |
//! |--------------------------------|-------------------------------|------------------------|
//! | [`Capability::Cancellable`]    | `as_cancellable(_mut)`        | [`Cancellable`]        |
//! | [`Capability::LoginResult`]    | `as_login_result(_mut)`       | [`LoginResultEvent`]   |
//! | [`Capability::ObjectList`]     | `as_object_list(_mut)`        | [`ObjectListEvent`]    |
//!
//! The capability set of an occurrence is derived from those accessors, so the
//! two can never disagree. Subscribers registered against a capability receive
//! every occurrence that declares it, merged with the subscribers registered
//! against the concrete type.
//!
//! ## Example
//! ```rust
//! use tickvisor::{Cancellable, Capability, Event};
//!
//! struct Chat { message: String, cancelled: bool }
//!
//! impl Cancellable for Chat {
//!     fn cancelled(&self) -> bool { self.cancelled }
//!     fn set_cancelled(&mut self, cancelled: bool) { self.cancelled = cancelled; }
//! }
//!
//! impl Event for Chat {
//!     fn as_cancellable(&self) -> Option<&dyn Cancellable> { Some(self) }
//!     fn as_cancellable_mut(&mut self) -> Option<&mut dyn Cancellable> { Some(self) }
//! }
//!
//! let chat = Chat { message: "hi".into(), cancelled: false };
//! assert!(chat.capabilities().contains(Capability::Cancellable));
//! assert!(!chat.capabilities().contains(Capability::LoginResult));
//! ```

use std::any::Any;
use std::fmt;

/// Upcast helper implemented for every `'static` type.
///
/// Lets the bus downcast a `&mut dyn Event` back to its concrete type.
pub trait AsAny: Any {
    /// `&self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// `&mut self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A value representing something that happened in the host.
pub trait Event: AsAny + Send {
    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Cancellation view, if this occurrence is cancellable.
    fn as_cancellable(&self) -> Option<&dyn Cancellable> {
        None
    }

    /// Mutable cancellation view.
    fn as_cancellable_mut(&mut self) -> Option<&mut dyn Cancellable> {
        None
    }

    /// Login decision view, if this occurrence carries one.
    fn as_login_result(&self) -> Option<&dyn LoginResultEvent> {
        None
    }

    /// Mutable login decision view.
    fn as_login_result_mut(&mut self) -> Option<&mut dyn LoginResultEvent> {
        None
    }

    /// Action list view: the `Vec<O>` behind [`ObjectListEvent::actions`], erased.
    fn as_object_list(&self) -> Option<&dyn Any> {
        None
    }

    /// Mutable action list view.
    fn as_object_list_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }

    /// Capability tags of this occurrence, derived from the view accessors.
    fn capabilities(&self) -> CapabilitySet {
        let mut set = CapabilitySet::EMPTY;
        if self.as_cancellable().is_some() {
            set.insert(Capability::Cancellable);
        }
        if self.as_login_result().is_some() {
            set.insert(Capability::LoginResult);
        }
        if self.as_object_list().is_some() {
            set.insert(Capability::ObjectList);
        }
        set
    }

    /// True if the occurrence is cancellable and currently cancelled.
    fn is_cancelled(&self) -> bool {
        self.as_cancellable().is_some_and(|c| c.cancelled())
    }
}

/// Occurrences whose propagation can be halted for non-`ignore_cancelled` subscribers.
pub trait Cancellable {
    /// Current cancellation state.
    fn cancelled(&self) -> bool;

    /// Sets the cancellation state.
    fn set_cancelled(&mut self, cancelled: bool);

    /// Shorthand for `set_cancelled(true)`.
    fn cancel(&mut self) {
        self.set_cancelled(true);
    }
}

/// Outcome of a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoginResult {
    /// Let the player in.
    #[default]
    Success,
    /// Kick the player.
    Kick,
}

/// Occurrences that carry a login decision handlers may overrule.
pub trait LoginResultEvent {
    /// Current decision.
    fn login_result(&self) -> LoginResult;

    /// Replaces the decision.
    fn set_login_result(&mut self, result: LoginResult);
}

impl dyn Event {
    /// Action list of an [`ObjectListEvent`] whose objects are `O`.
    ///
    /// `None` if the occurrence carries no list or a list of another type.
    pub fn object_list<O: 'static>(&self) -> Option<&Vec<O>> {
        self.as_object_list()?.downcast_ref()
    }

    /// Mutable form of [`object_list`](Self::object_list).
    pub fn object_list_mut<O: 'static>(&mut self) -> Option<&mut Vec<O>> {
        self.as_object_list_mut()?.downcast_mut()
    }
}

/// Occurrences carrying a list of actions handlers may extend or prune.
///
/// Implementors expose the list to capability subscribers through
/// [`Event::as_object_list`], returning `Some(self.actions())`.
pub trait ObjectListEvent {
    /// Element type of the list.
    type Object: PartialEq + 'static;

    fn actions(&self) -> &Vec<Self::Object>;

    fn actions_mut(&mut self) -> &mut Vec<Self::Object>;

    /// Appends an action.
    fn add(&mut self, action: Self::Object) {
        self.actions_mut().push(action);
    }

    /// Removes the first action equal to `action`. Returns `false` if none matched.
    fn remove(&mut self, action: &Self::Object) -> bool {
        let actions = self.actions_mut();
        match actions.iter().position(|a| a == action) {
            Some(pos) => {
                actions.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Capability tag an occurrence may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// See [`Cancellable`].
    Cancellable,
    /// See [`LoginResultEvent`].
    LoginResult,
    /// See [`ObjectListEvent`].
    ObjectList,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 3] = [
        Capability::Cancellable,
        Capability::LoginResult,
        Capability::ObjectList,
    ];

    #[inline]
    fn bit(self) -> u8 {
        match self {
            Capability::Cancellable => 1,
            Capability::LoginResult => 1 << 1,
            Capability::ObjectList => 1 << 2,
        }
    }
}

/// Compact set of [`Capability`] tags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    /// No capabilities.
    pub const EMPTY: Self = Self(0);

    /// Adds a capability.
    #[inline]
    pub fn insert(&mut self, cap: Capability) {
        self.0 |= cap.bit();
    }

    /// True if `cap` is in the set.
    #[inline]
    pub fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    /// True if no capability is set.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the contained capabilities in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for cap in iter {
            set.insert(cap);
        }
        set
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
