//! # Dispatch order of event subscribers.
//!
//! [`DispatchOrder`] is a bounded ranking in `-100..=100`. Subscribers run in
//! **ascending** order: a `LOWEST` subscriber runs first and sees the occurrence
//! before anyone else; a `HIGHEST` subscriber runs last and has the final say
//! (e.g. over cancellation).
//!
//! The named tiers are only landmarks; any value in range is legal.
//!
//! ## Example
//! ```rust
//! use tickvisor::DispatchOrder;
//!
//! let early = DispatchOrder::LOW;
//! let custom = DispatchOrder::new(-20).unwrap();
//! assert!(early < custom && custom < DispatchOrder::MIDDLE);
//! assert!(DispatchOrder::new(101).is_err());
//! ```

use std::fmt;

use crate::error::RuntimeError;

/// Position of a subscriber in the dispatch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DispatchOrder(i8);

impl DispatchOrder {
    /// Smallest legal value; runs first.
    pub const LOWEST: Self = Self(-100);
    /// Early tier.
    pub const LOW: Self = Self(-50);
    /// Default tier.
    pub const MIDDLE: Self = Self(0);
    /// Late tier.
    pub const HIGH: Self = Self(50);
    /// Largest legal value; runs last.
    pub const HIGHEST: Self = Self(100);

    /// Creates an order from an arbitrary integer.
    ///
    /// Returns [`RuntimeError::OrderOutOfRange`] outside `-100..=100`.
    pub fn new(value: i32) -> Result<Self, RuntimeError> {
        if (-100..=100).contains(&value) {
            Ok(Self(value as i8))
        } else {
            Err(RuntimeError::OrderOutOfRange { value })
        }
    }

    /// Numeric value.
    #[inline]
    pub fn get(self) -> i8 {
        self.0
    }
}

impl Default for DispatchOrder {
    fn default() -> Self {
        Self::MIDDLE
    }
}

impl TryFrom<i32> for DispatchOrder {
    type Error = RuntimeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for DispatchOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
