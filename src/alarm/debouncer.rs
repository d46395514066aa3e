//! # AlarmDebouncer: the window as a status listener.
//!
//! ## Delivery rules
//! - every incoming supervisor status is republished, carrying the latest verdict;
//! - `ping` and `reconfigure` republish only when the verdict (`show`, `tripped`) changed;
//! - a listener added after the first status receives the current [`AlarmStatus`] at once.
//!
//! Delivery happens under the debouncer's mutex. When the debouncer is registered with a
//! supervisor that means under the supervisor's mutex as well, so alarm listeners must not
//! call back into either.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::alarm::window::{AlarmWindow, Severity};
use crate::config::AlarmConfig;
use crate::listeners::{ListenerId, ListenerSet, StatusListener};
use crate::status::Status;

/// A supervisor status together with the debounced verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmStatus {
    /// The raw status.
    pub status: Status,
    /// Whether the status should be shown as it is.
    pub show: bool,
    /// Whether the error share of the window reached the threshold.
    pub tripped: bool,
}

/// Observer of debounced alarm statuses.
pub trait AlarmListener: Send + Sync + 'static {
    fn on_alarm(&self, alarm: &AlarmStatus);

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

struct Debounce {
    config: AlarmConfig,
    window: AlarmWindow,
    current: Option<AlarmStatus>,
    listeners: ListenerSet<dyn AlarmListener>,
}

impl Debounce {
    /// Recomputes the verdict for the last status; returns true if it changed.
    fn refresh(&mut self, now: Instant) -> bool {
        let Some(current) = &self.current else {
            return false;
        };
        let severity = Severity::of(&current.status);
        let show = self.window.show(severity, now, &self.config);
        let tripped = self.window.tripped(now, &self.config);
        let changed = show != current.show || tripped != current.tripped;
        if let Some(current) = &mut self.current {
            current.show = show;
            current.tripped = tripped;
        }
        changed
    }

    fn publish(&self) {
        if let Some(alarm) = &self.current {
            self.listeners.emit(|l| l.on_alarm(alarm));
        }
    }
}

/// Time-windowed hysteresis filter over a supervisor's status stream.
///
/// # Example
/// ```
/// use std::time::{Duration, Instant};
/// use workvisor::{AlarmConfig, AlarmDebouncer, State, Status};
///
/// let alarm = AlarmDebouncer::new(AlarmConfig::default());
/// let t0 = Instant::now();
///
/// alarm.on_status_at(&Status::new(State::PausedNetwork), t0);
/// assert!(!alarm.current().unwrap().show);
///
/// alarm.ping_at(t0 + Duration::from_secs(45 * 60));
/// assert!(alarm.current().unwrap().show);
/// ```
pub struct AlarmDebouncer {
    inner: Mutex<Debounce>,
}

impl AlarmDebouncer {
    pub fn new(config: AlarmConfig) -> Self {
        Self {
            inner: Mutex::new(Debounce {
                config,
                window: AlarmWindow::new(),
                current: None,
                listeners: ListenerSet::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Debounce> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a listener; it gets the current verdict at once if there is one.
    pub fn add_listener(&self, listener: Arc<dyn AlarmListener>) -> ListenerId {
        let mut inner = self.lock();
        let id = inner.listeners.add(listener);
        if let Some(alarm) = &inner.current {
            inner.listeners.emit_to(id, |l| l.on_alarm(alarm));
        }
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.lock().listeners.remove(id)
    }

    /// Last status with its verdict.
    pub fn current(&self) -> Option<AlarmStatus> {
        self.lock().current.clone()
    }

    pub fn config(&self) -> AlarmConfig {
        self.lock().config
    }

    /// Ingests `status` observed at `now` and republishes.
    pub fn on_status_at(&self, status: &Status, now: Instant) {
        let mut inner = self.lock();
        let window = inner.config.window;
        inner.window.observe(Severity::of(status), now, window);
        inner.current = Some(AlarmStatus {
            status: status.clone(),
            show: false,
            tripped: false,
        });
        inner.refresh(now);
        inner.publish();
    }

    /// Re-evaluates the window at `now`; republishes only on a changed verdict.
    pub fn ping_at(&self, now: Instant) {
        let mut inner = self.lock();
        if inner.refresh(now) {
            tracing::debug!(
                show = inner.current.as_ref().is_some_and(|a| a.show),
                "alarm verdict changed"
            );
            inner.publish();
        }
    }

    pub fn ping(&self) {
        self.ping_at(now());
    }

    /// Applies a new config at `now`. No-op if it is unchanged; the history is kept.
    pub fn reconfigure_at(&self, config: AlarmConfig, now: Instant) {
        let mut inner = self.lock();
        if inner.config == config {
            return;
        }
        inner.config = config;
        if inner.refresh(now) {
            inner.publish();
        }
    }

    pub fn reconfigure(&self, config: AlarmConfig) {
        self.reconfigure_at(config, now());
    }

    /// Pings every `every` until `token` is cancelled or the debouncer is dropped.
    ///
    /// Periods shorter than 10ms are raised to 10ms.
    pub fn spawn_pinger(self: &Arc<Self>, every: Duration, token: CancellationToken) -> JoinHandle<()> {
        let this: Weak<Self> = Arc::downgrade(self);
        let every = every.max(MIN_PING_PERIOD);
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(every);
            ticks.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticks.tick() => {
                        let Some(debouncer) = this.upgrade() else { break };
                        debouncer.ping();
                    }
                }
            }
        })
    }
}

impl StatusListener for AlarmDebouncer {
    fn on_status(&self, status: &Status) {
        self.on_status_at(status, now());
    }

    fn name(&self) -> &str {
        "alarm-debouncer"
    }
}

const MIN_PING_PERIOD: Duration = Duration::from_millis(10);

/// Current instant on the tokio clock (the paused clock in tests).
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}
