//! # Global runtime configuration.
//!
//! Provides [`Config`], the centralized settings for a [`ServerContext`](crate::ServerContext).
//!
//! Config can be built in code (`Config::default()` plus field edits) or loaded from
//! TOML with [`Config::from_toml_str`] / [`Config::load_from`]. Missing keys fall back
//! to their defaults.
//!
//! ## Sentinel values
//! - `async_workers = 0` → use the ambient tokio runtime (or the runtime default)
//! - `tick_rate_ms = 0` → clamped to 1ms by [`Config::tick_rate`]

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::RuntimeError;

/// Global configuration for the runtime.
///
/// ## Field semantics
/// - `tick_rate_ms`: Period of the heartbeat driven by the ticker (default 50ms, 20 ticks/s)
/// - `async_workers`: Worker threads for asynchronous tasks (`0` = runtime default)
/// - `diagnostics_capacity`: Ring size of the diagnostics broadcast channel (min 1)
/// - `catch_panics`: Convert panics in plugin callbacks into diagnostics
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Heartbeat period in milliseconds.
    pub tick_rate_ms: u64,

    /// Number of worker threads for asynchronous tasks.
    ///
    /// - `0` = reuse the current tokio runtime if there is one, otherwise build a
    ///   runtime with tokio's default worker count
    /// - `n > 0` = build a dedicated runtime with `n` workers
    pub async_workers: usize,

    /// Capacity of the diagnostics broadcast ring buffer.
    pub diagnostics_capacity: usize,

    /// Whether panics in handlers and runnables are caught and reported.
    ///
    /// When `false`, a panicking callback unwinds through `call`/`heartbeat`.
    pub catch_panics: bool,
}

impl Config {
    /// Parses a config from a TOML document.
    ///
    /// # Example
    /// ```
    /// use tickvisor::Config;
    ///
    /// let cfg = Config::from_toml_str("tick_rate_ms = 100").unwrap();
    /// assert_eq!(cfg.tick_rate_ms, 100);
    /// assert_eq!(cfg.diagnostics_capacity, 1024);
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, RuntimeError> {
        toml::from_str(content).map_err(|e| RuntimeError::Config {
            reason: format!("failed to parse config: {e}"),
        })
    }

    /// Loads a config file from disk.
    pub fn load_from(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| RuntimeError::Config {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Returns the heartbeat period (at least 1ms).
    #[inline]
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(1))
    }

    /// Returns the dedicated worker count as an `Option`.
    ///
    /// - `None` → no dedicated runtime size requested
    /// - `Some(n)` → build a runtime with `n` workers
    #[inline]
    pub fn worker_limit(&self) -> Option<usize> {
        if self.async_workers == 0 {
            None
        } else {
            Some(self.async_workers)
        }
    }

    /// Returns the diagnostics capacity clamped to a minimum of 1.
    #[inline]
    pub fn diagnostics_capacity_clamped(&self) -> usize {
        self.diagnostics_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `tick_rate_ms = 50` (20 ticks per second)
    /// - `async_workers = 0` (runtime default)
    /// - `diagnostics_capacity = 1024`
    /// - `catch_panics = true`
    fn default() -> Self {
        Self {
            tick_rate_ms: 50,
            async_workers: 0,
            diagnostics_capacity: 1024,
            catch_panics: true,
        }
    }
}
