//! # Supervisor states and status snapshots.
//!
//! [`State`] is the coarse lifecycle state of one supervised subsystem. [`Status`] is what
//! listeners receive: the state, an optional human-readable reason and whether the
//! error list is non-empty.
//!
//! ## Ordering guarantees
//! Each status has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use workvisor::{State, Status};
//!
//! let st = Status::new(State::PausedNetwork)
//!     .with_reason("proxy unreachable")
//!     .with_errors(true);
//!
//! assert_eq!(st.state, State::PausedNetwork);
//! assert_eq!(st.reason.as_deref(), Some("proxy unreachable"));
//! assert!(st.has_errors);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for status ordering.
static STATUS_SEQ: AtomicU64 = AtomicU64::new(0);

/// Lifecycle state of a supervised subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// No worker exists (disabled, or stopped on request).
    Stopped,
    /// A worker exists and is processing.
    Running,
    /// The worker is waiting for the network to come back.
    PausedNetwork,
    /// The worker is waiting for something other than the network.
    PausedWait,
    /// The worker died on a fatal fault and was not restarted.
    Aborted,
}

impl State {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            State::Stopped => "stopped",
            State::Running => "running",
            State::PausedNetwork => "paused_network",
            State::PausedWait => "paused_wait",
            State::Aborted => "aborted",
        }
    }

    /// True for states in which a worker is alive.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            State::Running | State::PausedNetwork | State::PausedWait
        )
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Status snapshot published to listeners.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Current state.
    pub state: State,
    /// Human-readable reason (pause cause, abort cause).
    pub reason: Option<Arc<str>>,
    /// True if the supervisor currently holds at least one error.
    pub has_errors: bool,
}

impl Status {
    /// Creates a status of the given state with current timestamp and next sequence number.
    pub fn new(state: State) -> Self {
        Self {
            seq: STATUS_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            state,
            reason: None,
            has_errors: false,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets or clears the reason.
    #[inline]
    pub fn with_reason_opt(mut self, reason: Option<Arc<str>>) -> Self {
        self.reason = reason;
        self
    }

    /// Sets the error-list flag.
    #[inline]
    pub fn with_errors(mut self, has_errors: bool) -> Self {
        self.has_errors = has_errors;
        self
    }
}

/// Opaque record of the state that preceded a pause.
///
/// Returned by [`ThreadStatus::paused_wait`](crate::ThreadStatus::paused_wait); handing it back
/// to [`ThreadStatus::unpaused_with`](crate::ThreadStatus::unpaused_with) restores exactly that
/// state and reason, which makes nested pause scopes compose.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "pass the token back to unpaused_with() to restore the previous state"]
pub struct PauseToken {
    pub(crate) state: State,
    pub(crate) reason: Option<Arc<str>>,
}

impl PauseToken {
    pub(crate) fn new(state: State, reason: Option<Arc<str>>) -> Self {
        Self { state, reason }
    }

    /// State that will be restored.
    pub fn state(&self) -> State {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Status::new(State::Running);
        let b = Status::new(State::Stopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_active_states() {
        assert!(State::Running.is_active());
        assert!(State::PausedNetwork.is_active());
        assert!(State::PausedWait.is_active());
        assert!(!State::Stopped.is_active());
        assert!(!State::Aborted.is_active());
    }

    #[test]
    fn test_labels() {
        assert_eq!(State::PausedWait.to_string(), "paused_wait");
        assert_eq!(State::Aborted.as_label(), "aborted");
    }
}
