//! # Heartbeat driver and OS signal handling.
//!
//! [`drive`] is the loop behind [`ServerContext::spawn_ticker`](crate::ServerContext::spawn_ticker):
//! it calls [`Scheduler::heartbeat`] once per period with consecutive tick numbers
//! until its token is cancelled.
//!
//! ```text
//! loop {
//!   select! {
//!     token.cancelled()  ──► stop, return ticks driven
//!     interval.tick()    ──► heartbeat(next_tick)
//!   }
//! }
//! ```
//!
//! Ticks continue from the scheduler's last heartbeat, so a restarted driver never
//! repeats a tick. Missed periods are delayed, not bursted.
//!
//! ## Signals
//! [`wait_for_shutdown_signal`] completes on `SIGINT`, `SIGTERM` or `SIGQUIT` (unix)
//! or Ctrl-C (other platforms).

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::scheduler::Scheduler;

/// Drives `scheduler` every `period` until `token` is cancelled.
///
/// Returns the number of heartbeats issued.
pub(crate) async fn drive(
    scheduler: Arc<Scheduler>,
    period: Duration,
    token: CancellationToken,
) -> u64 {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut driven = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                scheduler.heartbeat(scheduler.next_tick());
                driven += 1;
            }
        }
    }
    driven
}

/// Waits for a termination signal.
///
/// Returns `Err` if signal registration fails.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
