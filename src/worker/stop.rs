//! # Stop signal with a single stop-action slot.
//!
//! [`StopSignal`] pairs a mutex-guarded `stopping` flag with a [`CancellationToken`] that is
//! cancelled under the same mutex. Cooperative sleeps wait on the token, and
//! `cancelled()` completes immediately on a token that is already cancelled, so a stop
//! request can never slip in between "check flag" and "start sleeping".
//!
//! ## Rules
//! - `request()` is idempotent; only the first call runs the hook and the stop action.
//! - At most one stop action is registered at a time (blocking calls do not nest).
//! - An action registered after the stop already happened runs immediately.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::worker::StopHook;

type StopAction = Box<dyn FnOnce() + Send>;

/// Lifecycle phase of an active object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Spawned, `init` not entered yet.
    Created,
    /// Inside `init`.
    Initializing,
    /// Inside `run`.
    Running,
    /// Inside `exit`.
    Exiting,
    /// `exit` returned.
    Exited,
}

struct StopState {
    phase: Phase,
    stopping: bool,
    action: Option<(u64, StopAction)>,
    next_action: u64,
}

struct StopInner {
    state: Mutex<StopState>,
    token: CancellationToken,
    hook: Option<StopHook>,
}

/// Shared stop flag of one active object (cheap to clone).
#[derive(Clone)]
pub struct StopSignal {
    inner: Arc<StopInner>,
}

impl StopSignal {
    /// Creates a signal with an optional stop hook.
    pub fn new(hook: Option<StopHook>) -> Self {
        Self {
            inner: Arc::new(StopInner {
                state: Mutex::new(StopState {
                    phase: Phase::Created,
                    stopping: false,
                    action: None,
                    next_action: 1,
                }),
                token: CancellationToken::new(),
                hook,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StopState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests a stop. Returns true if this call initiated it.
    ///
    /// The hook (only while the object is in [`Phase::Running`]) and the registered stop
    /// action run synchronously on the calling task, after the mutex has been released.
    pub fn request(&self) -> bool {
        let (action, hook) = {
            let mut st = self.lock();
            if st.stopping {
                return false;
            }
            st.stopping = true;
            self.inner.token.cancel();
            let hook = if st.phase == Phase::Running {
                self.inner.hook.clone()
            } else {
                None
            };
            (st.action.take().map(|(_, action)| action), hook)
        };

        if let Some(hook) = hook {
            hook();
        }
        if let Some(action) = action {
            action();
        }
        true
    }

    /// True once a stop was requested.
    pub fn is_stopping(&self) -> bool {
        self.lock().stopping
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.lock().phase = phase;
    }

    /// Enters [`Phase::Running`] unless a stop was already requested.
    pub(crate) fn enter_running(&self) -> bool {
        let mut st = self.lock();
        if st.stopping {
            return false;
        }
        st.phase = Phase::Running;
        true
    }

    /// Token cancelled when the stop is requested.
    pub fn token(&self) -> &CancellationToken {
        &self.inner.token
    }

    /// Sleeps for `duration` unless stopped first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if a stop was requested
    /// before or during the sleep (in which case it returns without sleeping further).
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_stopping() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.inner.token.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Registers the cancel callback of the one blocking call in progress.
    ///
    /// The slot is cleared when the returned guard drops. Registering while another
    /// action is still registered is a bug; debug builds panic, release builds replace it.
    pub fn register_action(&self, action: impl FnOnce() + Send + 'static) -> StopActionGuard {
        let mut st = self.lock();
        if st.stopping {
            drop(st);
            action();
            return StopActionGuard {
                signal: None,
                id: 0,
            };
        }
        debug_assert!(
            st.action.is_none(),
            "stop action already registered; blocking calls must not nest"
        );
        let id = st.next_action;
        st.next_action += 1;
        st.action = Some((id, Box::new(action)));
        StopActionGuard {
            signal: Some(self.clone()),
            id,
        }
    }

    fn clear_action(&self, id: u64) {
        let mut st = self.lock();
        if matches!(st.action, Some((current, _)) if current == id) {
            st.action = None;
        }
    }
}

/// Keeps a stop action registered; dropping it unregisters the action.
#[must_use = "the stop action is unregistered when the guard is dropped"]
pub struct StopActionGuard {
    signal: Option<StopSignal>,
    id: u64,
}

impl StopActionGuard {
    /// True if the action already ran because the stop happened before registration.
    pub fn fired_immediately(&self) -> bool {
        self.signal.is_none()
    }
}

impl Drop for StopActionGuard {
    fn drop(&mut self) {
        if let Some(signal) = self.signal.take() {
            signal.clear_action(self.id);
        }
    }
}
