//! # Worker pool for asynchronous tasks.
//!
//! Asynchronous runs are handed to tokio's blocking pool via `spawn_blocking`, so a
//! runnable is free to block without stalling the heartbeat.
//!
//! ## Runtime selection
//! ```text
//! explicit handle (ContextBuilder::with_runtime) ──► use it
//! async_workers == 0 and inside a runtime         ──► Handle::current()
//! otherwise                                       ──► owned multi-thread runtime
//!                                                     (async_workers or tokio default)
//! ```
//! The owned runtime is built lazily on the first asynchronous submission and shut
//! down in the background when the pool is dropped. An ambient handle is borrowed
//! per submission and never cached, since its runtime may be gone by the next one.
//!
//! A job that the runtime refuses (it is shutting down) is dropped unrun; callers
//! detect that through the job's own `Drop`.

use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::RuntimeError;

pub(crate) struct AsyncPool {
    handle: Handle,
    owned: Option<Runtime>,
    ambient: bool,
}

impl AsyncPool {
    /// Wraps an existing runtime.
    pub(crate) fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            owned: None,
            ambient: false,
        }
    }

    /// Picks a runtime according to `worker_limit`.
    pub(crate) fn resolve(worker_limit: Option<usize>) -> Result<Self, RuntimeError> {
        if worker_limit.is_none() {
            if let Ok(handle) = Handle::try_current() {
                return Ok(Self {
                    handle,
                    owned: None,
                    ambient: true,
                });
            }
        }

        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name("tickvisor-worker");
        if let Some(n) = worker_limit {
            builder.worker_threads(n);
        }
        let runtime = builder.build().map_err(|e| RuntimeError::Config {
            reason: format!("failed to build async worker runtime: {e}"),
        })?;

        Ok(Self {
            handle: runtime.handle().clone(),
            owned: Some(runtime),
            ambient: false,
        })
    }

    /// True if the pool borrows the caller's runtime.
    pub(crate) fn is_ambient(&self) -> bool {
        self.ambient
    }

    /// Runs `job` on a worker thread.
    pub(crate) fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        drop(self.handle.spawn_blocking(job));
    }
}

impl Drop for AsyncPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.owned.take() {
            runtime.shutdown_background();
        }
    }
}
