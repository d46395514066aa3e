//! # Worker context.
//!
//! [`Context`] is handed to every lifecycle method of an [`ActiveObject`](crate::ActiveObject).
//! It exposes the stop signal, cooperative sleep, the single stop-action slot and the
//! optional status sink of the supervising runtime.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::WorkError;
use crate::status::ThreadStatus;
use crate::worker::{StopActionGuard, StopSignal};

/// Runtime view of one active object.
#[derive(Clone)]
pub struct Context {
    name: Arc<str>,
    stop: StopSignal,
    status: Option<Arc<dyn ThreadStatus>>,
}

impl Context {
    pub(crate) fn new(
        name: Arc<str>,
        stop: StopSignal,
        status: Option<Arc<dyn ThreadStatus>>,
    ) -> Self {
        Self { name, stop, status }
    }

    /// Creates a context with its own stop signal and no status sink.
    ///
    /// Useful to drive a worker (or a single unit of work) outside a supervisor.
    pub fn detached(name: impl Into<Arc<str>>) -> Self {
        Self::new(name.into(), StopSignal::new(None), None)
    }

    /// Name of the active object.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once a stop was requested.
    pub fn is_stopping(&self) -> bool {
        self.stop.is_stopping()
    }

    /// Returns `Err(WorkError::Stopped)` once a stop was requested.
    pub fn check_stop(&self) -> Result<(), WorkError> {
        if self.is_stopping() {
            Err(WorkError::Stopped)
        } else {
            Ok(())
        }
    }

    /// Cooperative sleep; see [`StopSignal::sleep`].
    pub async fn sleep(&self, duration: Duration) -> bool {
        self.stop.sleep(duration).await
    }

    /// Registers the cancel callback of the blocking call about to be made.
    pub fn register_stop_action(&self, action: impl FnOnce() + Send + 'static) -> StopActionGuard {
        self.stop.register_action(action)
    }

    /// Runs `fut` until it completes or a stop is requested.
    ///
    /// The future is dropped on stop, which cancels it at its next await point.
    pub async fn until_stopped<F>(&self, fut: F) -> Result<F::Output, WorkError>
    where
        F: Future,
    {
        if self.is_stopping() {
            return Err(WorkError::Stopped);
        }
        tokio::select! {
            biased;
            _ = self.stop.token().cancelled() => Err(WorkError::Stopped),
            out = fut => Ok(out),
        }
    }

    /// Token cancelled on stop; hand a child of it to code that speaks `CancellationToken`.
    pub fn cancellation(&self) -> CancellationToken {
        self.stop.token().child_token()
    }

    /// Status sink of the supervising runtime, if any.
    pub fn status(&self) -> Option<&dyn ThreadStatus> {
        self.status.as_deref()
    }

    /// The underlying stop signal.
    pub fn signal(&self) -> &StopSignal {
        &self.stop
    }
}
