//! # Function-backed runnable (`RunFn`)
//!
//! [`RunFn`] wraps a closure `F: Fn(&ScheduledTask) -> Result<(), TaskError>`.
//! The closure is called once per run; state shared between runs must live behind
//! `Arc<...>`/atomics captured by the closure.
//!
//! ## Example
//! ```rust
//! use tickvisor::{RunFn, RunnableRef, TaskError};
//!
//! let r: RunnableRef = RunFn::arc("heal", |task| {
//!     if task.interval() > 20 {
//!         task.cancel();
//!     }
//!     Ok::<_, TaskError>(())
//! });
//!
//! assert_eq!(r.name(), "heal");
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use crate::error::TaskError;
use crate::tasks::ScheduledTask;
use crate::tasks::runnable::Runnable;

/// Function-backed runnable.
#[derive(Debug)]
pub struct RunFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> RunFn<F>
where
    F: Fn(&ScheduledTask) -> Result<(), TaskError> + Send + Sync + 'static,
{
    /// Creates a new function-backed runnable.
    ///
    /// Prefer [`RunFn::arc`] when you immediately need a [`RunnableRef`](crate::RunnableRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the runnable behind an `Arc`.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> Runnable for RunFn<F>
where
    F: Fn(&ScheduledTask) -> Result<(), TaskError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, task: &ScheduledTask) -> Result<(), TaskError> {
        (self.f)(task)
    }
}
