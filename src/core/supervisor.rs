//! # Supervisor: owns zero-or-one running worker, aggregates its errors, fans out status.
//!
//! The [`Supervisor`] reacts to enable/disable and configuration changes, starts and
//! stops its worker, and republishes everything the worker reports to the registered
//! [`StatusListener`]s.
//!
//! ## Key responsibilities
//! - start/stop/reconfigure the worker (`init`, `reinit`, `start`, `stop`)
//! - ingest worker reports through a [`ThreadStatus`](crate::ThreadStatus) handle
//! - keep a deduplicated [`ErrorSet`] and apply the clearing policy
//! - publish one total order of [`Status`] snapshots to listeners
//!
//! ## Locking
//! ```text
//! control (async mutex)   serializes init / reinit / start / stop
//! state   (std mutex)     worker ref, generation, state, reason, errors, listeners
//!
//! stop():
//!   lock state ─► clone worker handle ─► unlock
//!   handle.request_stop().await          (worker may still report fatal/errors here)
//!   lock state ─► drop worker ─► STOPPED ─► publish
//! ```
//!
//! ## Publish-before-start
//! `start()` publishes RUNNING before the worker task is spawned, so no observer can see a
//! live worker while the state still says otherwise.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use workvisor::{ActiveObject, Context, Fault, State, Supervisor, WorkError};
//!
//! struct Idle;
//!
//! #[async_trait]
//! impl ActiveObject for Idle {
//!     fn name(&self) -> &str { "idle" }
//!     async fn run(&mut self, ctx: &Context) -> Result<(), WorkError> {
//!         while ctx.sleep(Duration::from_millis(50)).await {}
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let sup = Supervisor::builder(
//!         |_: &u32| -> Result<Box<dyn ActiveObject>, Fault> { Ok(Box::new(Idle)) },
//!         1u32,
//!     )
//!     .build();
//!
//!     sup.init(true).await;
//!     assert_eq!(sup.status().state, State::Running);
//!
//!     sup.reinit(true, 1).await; // unchanged: no restart
//!     sup.stop(None).await;
//!     assert_eq!(sup.status().state, State::Stopped);
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::Span;

use crate::config::SupervisorConfig;
use crate::core::builder::SupervisorBuilder;
use crate::core::errors::ErrorSet;
use crate::core::factory::WorkerFactory;
use crate::core::reporter::StatusReporter;
use crate::error::{Fault, RuntimeError};
use crate::listeners::{ListenerId, ListenerSet, StatusListener};
use crate::status::{State, Status};
use crate::worker::{self, ActiveHandle, StopNotice};

/// Result of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// A live worker was stopped.
    Stopped,
    /// There was no worker and the subsystem was not aborted.
    AlreadyStopped,
    /// There was no worker because it had aborted.
    WasAborted,
}

pub(crate) struct Running {
    pub(crate) handle: ActiveHandle,
    pub(crate) generation: u64,
}

pub(crate) struct Inner<C> {
    pub(crate) enabled: bool,
    pub(crate) config: Arc<C>,
    pub(crate) worker: Option<Running>,
    pub(crate) generation: u64,
    pub(crate) state: State,
    pub(crate) reason: Option<Arc<str>>,
    pub(crate) errors: ErrorSet,
    pub(crate) listeners: ListenerSet<dyn StatusListener>,
}

impl<C> Inner<C> {
    pub(crate) fn snapshot(&self) -> Status {
        Status::new(self.state)
            .with_reason_opt(self.reason.clone())
            .with_errors(!self.errors.is_empty())
    }

    /// Publishes the current snapshot to every listener.
    pub(crate) fn publish(&self) {
        let status = self.snapshot();
        self.listeners.emit(|l| l.on_status(&status));
    }

    pub(crate) fn set_state(&mut self, state: State, reason: Option<Arc<str>>) {
        self.state = state;
        self.reason = reason;
    }

    pub(crate) fn current_generation(&self) -> Option<u64> {
        self.worker.as_ref().map(|w| w.generation)
    }
}

pub(crate) struct Shared<C> {
    pub(crate) settings: SupervisorConfig,
    pub(crate) factory: Box<dyn WorkerFactory<C>>,
    pub(crate) span: Span,
    pub(crate) inner: Mutex<Inner<C>>,
    pub(crate) control: tokio::sync::Mutex<()>,
}

impl<C> Shared<C> {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Inner<C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C> Drop for Shared<C> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = inner.worker.take() {
            running.handle.signal_stop();
        }
    }
}

/// Lifecycle owner of one worker (cheap to clone; clones share state).
pub struct Supervisor<C> {
    pub(crate) shared: Arc<Shared<C>>,
}

impl<C> Clone for Supervisor<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C> Supervisor<C>
where
    C: PartialEq + Send + Sync + 'static,
{
    /// Returns a builder; the supervisor starts disabled with `config`.
    pub fn builder(factory: impl WorkerFactory<C>, config: C) -> SupervisorBuilder<C> {
        SupervisorBuilder::new(Box::new(factory), config)
    }

    pub(crate) fn from_parts(
        settings: SupervisorConfig,
        factory: Box<dyn WorkerFactory<C>>,
        config: C,
        span: Span,
        listeners: ListenerSet<dyn StatusListener>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings,
                factory,
                span,
                inner: Mutex::new(Inner {
                    enabled: false,
                    config: Arc::new(config),
                    worker: None,
                    generation: 0,
                    state: State::Stopped,
                    reason: None,
                    errors: ErrorSet::new(),
                    listeners,
                }),
                control: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Enables or disables the subsystem with the current config.
    ///
    /// No-op if `enabled` did not change.
    pub async fn init(&self, enabled: bool) {
        let _control = self.shared.control.lock().await;
        let was_enabled = {
            let inner = self.shared.lock();
            if inner.enabled == enabled {
                return;
            }
            inner.enabled
        };
        let outcome = self.stop_locked(None).await;
        self.shared.lock().enabled = enabled;
        self.restart_if(enabled, was_enabled, outcome);
    }

    /// Applies a new enabled flag and config.
    ///
    /// No-op if both are unchanged. Otherwise the worker is stopped, the config swapped,
    /// and the worker restarted iff the subsystem became enabled, or stays enabled and a
    /// worker was actually running. An ABORTED subsystem that stays enabled is therefore
    /// not restarted by a config change.
    pub async fn reinit(&self, enabled: bool, config: C) {
        let _control = self.shared.control.lock().await;
        let was_enabled = {
            let inner = self.shared.lock();
            if inner.enabled == enabled && *inner.config == config {
                tracing::debug!(parent: &self.shared.span, "reinit: nothing changed");
                return;
            }
            inner.enabled
        };
        let outcome = self.stop_locked(None).await;
        {
            let mut inner = self.shared.lock();
            inner.enabled = enabled;
            inner.config = Arc::new(config);
        }
        self.restart_if(enabled, was_enabled, outcome);
    }

    fn restart_if(&self, enabled: bool, was_enabled: bool, outcome: StopOutcome) {
        if enabled && (!was_enabled || outcome == StopOutcome::Stopped) {
            self.start_locked();
        }
    }

    /// Starts a worker from the current config. No-op if one exists.
    pub async fn start(&self) {
        let _control = self.shared.control.lock().await;
        self.start_locked();
    }

    fn start_locked(&self) {
        let mut inner = self.shared.lock();
        if inner.worker.is_some() {
            return;
        }

        let config = Arc::clone(&inner.config);
        let object = match self.shared.factory.create(&config) {
            Ok(object) => object,
            Err(fault) => {
                let err = RuntimeError::WorkerConstruction {
                    fault: fault.clone(),
                };
                tracing::error!(parent: &self.shared.span, label = err.as_label(), error = %err, "worker construction failed");
                inner.errors.clear();
                let reason: Arc<str> = Arc::from(fault.message());
                inner.errors.set_fatal(fault);
                inner.set_state(State::Aborted, Some(reason));
                inner.publish();
                return;
            }
        };

        inner.errors.clear();
        inner.generation += 1;
        let generation = inner.generation;
        inner.set_state(State::Running, None);
        inner.publish();

        let reporter = Arc::new(StatusReporter::new(Arc::downgrade(&self.shared), generation));
        let handle = worker::spawn_boxed(object, Some(reporter), self.shared.span.clone());
        tracing::info!(parent: &self.shared.span, worker = handle.name(), generation, "worker started");
        inner.worker = Some(Running { handle, generation });
    }

    /// Stops the worker and waits for it to exit.
    ///
    /// Returns false if there was nothing to stop, but true if the subsystem had
    /// aborted (so callers may treat it as restartable).
    pub async fn stop(&self, notice: Option<&dyn StopNotice>) -> bool {
        self.stop_outcome(notice).await != StopOutcome::AlreadyStopped
    }

    /// Like [`stop`](Self::stop), with the detailed outcome.
    pub async fn stop_outcome(&self, notice: Option<&dyn StopNotice>) -> StopOutcome {
        let _control = self.shared.control.lock().await;
        self.stop_locked(notice).await
    }

    async fn stop_locked(&self, notice: Option<&dyn StopNotice>) -> StopOutcome {
        let (handle, generation) = {
            let inner = self.shared.lock();
            match &inner.worker {
                Some(running) => (running.handle.clone(), running.generation),
                None if inner.state == State::Aborted => return StopOutcome::WasAborted,
                None => return StopOutcome::AlreadyStopped,
            }
        };

        let notice = notice.zip(self.shared.settings.notice_grace());
        handle.request_stop(notice).await;

        let mut inner = self.shared.lock();
        if inner.current_generation() == Some(generation) {
            inner.worker = None;
        }
        inner.set_state(State::Stopped, None);
        inner.publish();
        tracing::info!(parent: &self.shared.span, worker = handle.name(), generation, "worker stopped");
        StopOutcome::Stopped
    }

    /// Clears the error list.
    ///
    /// When ABORTED only the fatal fault survives, unless the subsystem is disabled, in
    /// which case everything is dropped and the state becomes STOPPED.
    pub fn clear_errors(&self) {
        let mut inner = self.shared.lock();
        if inner.state == State::Aborted {
            if inner.enabled {
                inner.errors.retain_fatal();
            } else {
                inner.errors.clear();
                inner.set_state(State::Stopped, None);
            }
        } else {
            inner.errors.clear();
        }
        inner.publish();
    }

    /// Registers a listener; it receives the current snapshot before this returns.
    pub fn add_listener(&self, listener: Arc<dyn StatusListener>) -> ListenerId {
        let mut inner = self.shared.lock();
        let id = inner.listeners.add(listener);
        let status = inner.snapshot();
        inner.listeners.emit_to(id, |l| l.on_status(&status));
        id
    }

    /// Unregisters a listener. Returns false if the handle is unknown.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.lock().listeners.remove(id)
    }

    /// Current status snapshot.
    pub fn status(&self) -> Status {
        self.shared.lock().snapshot()
    }

    /// Deduplicated faults, first seen first.
    pub fn errors(&self) -> Vec<Fault> {
        self.shared.lock().errors.faults()
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.lock().enabled
    }

    /// True while a worker exists.
    pub fn is_running(&self) -> bool {
        self.shared.lock().worker.is_some()
    }

    /// Current config.
    pub fn config(&self) -> Arc<C> {
        Arc::clone(&self.shared.lock().config)
    }

    /// Subsystem name.
    pub fn name(&self) -> &str {
        &self.shared.settings.name
    }
}
