//! # LogWriter — status transitions to `tracing`
//!
//! A minimal listener that logs every status snapshot it receives.
//!
//! ## Example output
//! ```text
//! INFO status state=running seq=4 errors=false
//! WARN status state=paused_network seq=5 reason="proxy unreachable" errors=false
//! ERROR status state=aborted seq=9 reason="entity store unavailable: db gone" errors=true
//! ```

use crate::listeners::StatusListener;
use crate::status::{State, Status};

/// Status writer listener.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl StatusListener for LogWriter {
    fn on_status(&self, s: &Status) {
        let reason = s.reason.as_deref().unwrap_or("");
        match s.state {
            State::Running | State::Stopped => {
                tracing::info!(state = %s.state, seq = s.seq, reason, errors = s.has_errors, "status");
            }
            State::PausedNetwork | State::PausedWait => {
                tracing::warn!(state = %s.state, seq = s.seq, reason, errors = s.has_errors, "status");
            }
            State::Aborted => {
                tracing::error!(state = %s.state, seq = s.seq, reason, errors = s.has_errors, "status");
            }
        }
    }

    fn name(&self) -> &str {
        "LogWriter"
    }
}
