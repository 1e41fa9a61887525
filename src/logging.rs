//! # Built-in tracing setup (demo/reference).
//!
//! The library only emits `tracing` events; installing a subscriber is the host's
//! job. [`init_logging`] is a convenience for demos and small hosts.
//!
//! ## Levels
//! - `warn`: handler and task faults
//! - `debug`: lifecycle reports, task submission
//! - `trace`: per-dispatch and per-heartbeat summaries

use tracing_subscriber::EnvFilter;

/// Installs a global formatter filtered by `RUST_LOG`, or by `default_filter`
/// when `RUST_LOG` is unset.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
