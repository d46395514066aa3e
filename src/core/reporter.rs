//! # Worker-facing status handle.
//!
//! Every worker generation gets its own [`StatusReporter`]. Reports are applied only
//! while that generation is the supervisor's current worker; anything a replaced or
//! aborted worker still says is logged and dropped.

use std::sync::{Arc, Weak};

use crate::core::supervisor::{Inner, Shared};
use crate::error::Fault;
use crate::status::{PauseToken, State, ThreadStatus};

pub(crate) struct StatusReporter<C> {
    shared: Weak<Shared<C>>,
    generation: u64,
}

impl<C> StatusReporter<C> {
    pub(crate) fn new(shared: Weak<Shared<C>>, generation: u64) -> Self {
        Self { shared, generation }
    }

    /// Runs `f` on the supervisor state if this reporter's worker is still current.
    fn with_current<R>(&self, what: &'static str, f: impl FnOnce(&mut Inner<C>) -> R) -> Option<R> {
        let shared = self.shared.upgrade()?;
        let mut inner = shared.lock();
        if inner.current_generation() != Some(self.generation) {
            tracing::debug!(
                parent: &shared.span,
                generation = self.generation,
                report = what,
                "stale worker report ignored"
            );
            return None;
        }
        Some(f(&mut inner))
    }
}

impl<C> ThreadStatus for StatusReporter<C>
where
    C: Send + Sync + 'static,
{
    fn paused_network(&self, reason: &str) {
        self.with_current("paused_network", |inner| {
            inner.set_state(State::PausedNetwork, Some(Arc::from(reason)));
            inner.publish();
        });
    }

    fn paused_wait(&self, reason: &str) -> PauseToken {
        self.with_current("paused_wait", |inner| {
            let token = PauseToken::new(inner.state, inner.reason.clone());
            inner.set_state(State::PausedWait, Some(Arc::from(reason)));
            inner.publish();
            token
        })
        .unwrap_or_else(|| PauseToken::new(State::Running, None))
    }

    fn unpaused(&self) {
        self.with_current("unpaused", |inner| {
            inner.set_state(State::Running, None);
            inner.publish();
        });
    }

    fn unpaused_with(&self, token: PauseToken) {
        self.with_current("unpaused_with", |inner| {
            inner.set_state(token.state, token.reason);
            inner.publish();
        });
    }

    fn error(&self, fault: Fault) {
        self.with_current("error", |inner| {
            if inner.errors.add(fault) {
                tracing::debug!(errors = inner.errors.len(), "error recorded");
            }
            inner.set_state(State::Running, None);
            inner.publish();
        });
    }

    fn fatal(&self, fault: Fault) {
        self.with_current("fatal", |inner| {
            tracing::warn!(error = %fault, "worker aborted");
            // the worker terminates on its own after reporting
            inner.worker = None;
            let reason: Arc<str> = Arc::from(fault.message());
            inner.errors.set_fatal(fault);
            inner.set_state(State::Aborted, Some(reason));
            inner.publish();
        });
    }

    fn success(&self, category: &str) {
        self.with_current("success", |inner| {
            if inner.errors.is_empty() {
                return;
            }
            inner.errors.remove_category(category);
            if inner.errors.is_empty() {
                inner.publish();
            }
        });
    }
}
