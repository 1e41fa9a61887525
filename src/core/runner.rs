//! # Run a single invocation of plugin code.
//!
//! Executes one run of a [`ScheduledTask`]'s runnable (or one handler call) and
//! converts errors and panics into a plain reason string.
//!
//! ## Outcome flow
//!
//! ```text
//! Success:
//!   run() → Ok(())            → Ok(())
//!
//! Failure:
//!   run() → Err(Fail/Fatal)   → Err("error: ..." / "fatal: ...")
//!
//! Panic (catch_panics = true):
//!   run() → unwind            → Err("panicked: ...")
//! ```
//!
//! ## Rules
//! - Never publishes diagnostics; callers decide what a failure means.
//! - With `catch_panics = false` a panic unwinds into the caller unchanged.
//! - Hooks (`before_run`, `after_*_run`) are guarded the same way; a panicking hook
//!   counts as a failed run.

use std::fmt::Display;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::error::panic_message;
use crate::tasks::ScheduledTask;

/// Runs `f`, mapping `Err` and (optionally) panics to a reason string.
pub(crate) fn guard<E, F>(catch_panics: bool, f: F) -> Result<(), String>
where
    E: Display,
    F: FnOnce() -> Result<(), E>,
{
    if !catch_panics {
        return f().map_err(|e| e.to_string());
    }
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(res) => res.map_err(|e| e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(&*payload))),
    }
}

/// Runs a hook that cannot fail except by panicking.
pub(crate) fn guard_hook<F: FnOnce()>(catch_panics: bool, f: F) -> Result<(), String> {
    guard(catch_panics, || {
        f();
        Ok::<(), std::convert::Infallible>(())
    })
}

/// Executes one run of `task`'s runnable.
pub(crate) fn run_once(task: &ScheduledTask, catch_panics: bool) -> Result<(), String> {
    guard(catch_panics, || task.runnable().run(task).map_err(|e| e.as_message()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;

    #[test]
    fn errors_become_reasons() {
        let res = guard(true, || Err::<(), _>(TaskError::fail("nope")));
        assert_eq!(res.unwrap_err(), "execution failed: nope");

        let res = guard(true, || Err::<(), _>(TaskError::fail("nope").as_message()));
        assert_eq!(res.unwrap_err(), "error: nope");
    }

    #[test]
    fn panics_are_caught() {
        let res = guard_hook(true, || panic!("kaboom"));
        assert_eq!(res.unwrap_err(), "panicked: kaboom");
    }

    #[test]
    #[should_panic(expected = "kaboom")]
    fn panics_propagate_when_disabled() {
        let _ = guard_hook(false, || panic!("kaboom"));
    }
}
