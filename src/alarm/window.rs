//! # Sliding error window.
//!
//! The window stores the instants at which the stream entered or left the error state,
//! starting outside error: `[enter, leave, enter, leave, ...]`. An odd length means the
//! stream is in error right now.
//!
//! ```text
//!  window = 90min                               now
//!  ◄──────────────────────────────────────────────►
//!     ████████░░░░░░░░░██████████░░░░░░░░░░░░██████
//!     t0      t1       t2        t3          t4      (odd length: open interval t4..now)
//! ```
//!
//! Entries are purged only when a new transition is recorded, in whole error intervals,
//! so the parity is kept.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::AlarmConfig;
use crate::status::{State, Status};

/// How a status counts for the alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Healthy, or waiting on purpose.
    NoError,
    /// A degraded state that is shown only once it lasted long enough.
    AdjustableError,
    /// Not running at all; resets the window.
    Other,
}

impl Severity {
    /// Classifies a supervisor status.
    ///
    /// ```
    /// use workvisor::{Severity, State, Status};
    ///
    /// assert_eq!(Severity::of(&Status::new(State::Running)), Severity::NoError);
    /// assert_eq!(
    ///     Severity::of(&Status::new(State::Running).with_errors(true)),
    ///     Severity::AdjustableError,
    /// );
    /// assert_eq!(Severity::of(&Status::new(State::Aborted)), Severity::Other);
    /// ```
    pub fn of(status: &Status) -> Self {
        match status.state {
            State::Running if status.has_errors => Severity::AdjustableError,
            State::Running => Severity::NoError,
            State::PausedNetwork => Severity::AdjustableError,
            State::PausedWait => Severity::NoError,
            State::Stopped | State::Aborted => Severity::Other,
        }
    }
}

/// Transition history of the error state.
#[derive(Debug, Clone, Default)]
pub struct AlarmWindow {
    transitions: VecDeque<Instant>,
}

impl AlarmWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the last recorded transition entered the error state.
    pub fn in_error(&self) -> bool {
        self.transitions.len() % 2 == 1
    }

    /// Number of recorded transitions.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Drops all history.
    pub fn reset(&mut self) {
        self.transitions.clear();
    }

    /// Records the severity observed at `now`.
    ///
    /// `Other` resets the window. A change of error-ness purges intervals that ended
    /// before `now - window` and appends `now`.
    pub fn observe(&mut self, severity: Severity, now: Instant, window: Duration) {
        let in_error = match severity {
            Severity::Other => {
                self.reset();
                return;
            }
            Severity::AdjustableError => true,
            Severity::NoError => false,
        };
        if in_error == self.in_error() {
            return;
        }
        self.purge(now, window);
        match self.transitions.back() {
            // a zero-length interval collapses
            Some(&last) if now <= last => {
                self.transitions.pop_back();
            }
            _ => self.transitions.push_back(now),
        }
    }

    fn purge(&mut self, now: Instant, window: Duration) {
        let Some(start) = now.checked_sub(window) else {
            return;
        };
        while self.transitions.len() >= 2 && self.transitions[1] <= start {
            self.transitions.pop_front();
            self.transitions.pop_front();
        }
    }

    /// Error time within `[now - window, now]`.
    pub fn error_time(&self, now: Instant, window: Duration) -> Duration {
        let start = now.checked_sub(window);
        let mut total = Duration::ZERO;
        let mut iter = self.transitions.iter();
        while let Some(&enter) = iter.next() {
            let leave = iter.next().copied().unwrap_or(now).min(now);
            let enter = match start {
                Some(start) => enter.max(start),
                None => enter,
            };
            total += leave.saturating_duration_since(enter);
        }
        total
    }

    /// True when the error share of the window reached the configured threshold.
    ///
    /// With a zero threshold any error time (or being in error) trips.
    pub fn tripped(&self, now: Instant, cfg: &AlarmConfig) -> bool {
        let threshold = cfg.threshold();
        let spent = self.error_time(now, cfg.window);
        if threshold.is_zero() {
            self.in_error() || !spent.is_zero()
        } else {
            spent >= threshold
        }
    }

    /// Debounced verdict for a status of `severity`.
    ///
    /// Anything but an adjustable error, or a disabled alarm, is shown at once.
    pub fn show(&self, severity: Severity, now: Instant, cfg: &AlarmConfig) -> bool {
        !cfg.enabled || severity != Severity::AdjustableError || self.tripped(now, cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Duration = Duration::from_secs(60);

    fn cfg() -> AlarmConfig {
        AlarmConfig {
            enabled: true,
            window: 90 * MIN,
            percent: 50,
        }
    }

    #[test]
    fn test_parity_follows_error_state() {
        let t0 = Instant::now();
        let mut w = AlarmWindow::new();
        w.observe(Severity::NoError, t0, 90 * MIN);
        assert!(w.is_empty());

        w.observe(Severity::AdjustableError, t0, 90 * MIN);
        assert!(w.in_error());
        w.observe(Severity::AdjustableError, t0 + MIN, 90 * MIN);
        assert_eq!(w.len(), 1);

        w.observe(Severity::NoError, t0 + 2 * MIN, 90 * MIN);
        assert!(!w.in_error());
        assert_eq!(w.error_time(t0 + 10 * MIN, 90 * MIN), 2 * MIN);
    }

    #[test]
    fn test_other_resets() {
        let t0 = Instant::now();
        let mut w = AlarmWindow::new();
        w.observe(Severity::AdjustableError, t0, 90 * MIN);
        w.observe(Severity::Other, t0 + 60 * MIN, 90 * MIN);
        assert!(w.is_empty());
        assert!(!w.tripped(t0 + 60 * MIN, &cfg()));
    }

    #[test]
    fn test_purge_keeps_whole_intervals() {
        let t0 = Instant::now();
        let mut w = AlarmWindow::new();
        w.observe(Severity::AdjustableError, t0, 10 * MIN);
        w.observe(Severity::NoError, t0 + MIN, 10 * MIN);
        w.observe(Severity::AdjustableError, t0 + 20 * MIN, 10 * MIN);
        assert_eq!(w.len(), 1);
        assert!(w.in_error());
    }

    #[test]
    fn test_zero_length_interval_collapses() {
        let t0 = Instant::now();
        let mut w = AlarmWindow::new();
        w.observe(Severity::AdjustableError, t0, MIN);
        w.observe(Severity::NoError, t0, MIN);
        assert!(w.is_empty());
    }

    #[test]
    fn test_error_time_clipped_to_window() {
        let t0 = Instant::now();
        let mut w = AlarmWindow::new();
        w.observe(Severity::AdjustableError, t0, 90 * MIN);
        assert_eq!(w.error_time(t0 + 200 * MIN, 90 * MIN), 90 * MIN);
    }

    #[test]
    fn test_show_rules() {
        let t0 = Instant::now();
        let mut w = AlarmWindow::new();
        w.observe(Severity::AdjustableError, t0, 90 * MIN);
        let now = t0 + 10 * MIN;

        assert!(!w.show(Severity::AdjustableError, now, &cfg()));
        assert!(w.show(Severity::NoError, now, &cfg()));
        assert!(w.show(Severity::Other, now, &cfg()));
        let disabled = AlarmConfig {
            enabled: false,
            ..cfg()
        };
        assert!(w.show(Severity::AdjustableError, now, &disabled));
    }

    #[test]
    fn test_zero_percent_trips_on_any_error() {
        let t0 = Instant::now();
        let mut w = AlarmWindow::new();
        let cfg = AlarmConfig { percent: 0, ..cfg() };
        assert!(!w.tripped(t0, &cfg));
        w.observe(Severity::AdjustableError, t0, cfg.window);
        assert!(w.tripped(t0, &cfg));
    }
}
