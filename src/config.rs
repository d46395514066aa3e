//! # Runtime configuration.
//!
//! - [`SupervisorConfig`]: settings of the supervision runtime itself.
//! - [`ProcessorConfig`]: polling mode and timing of an [`EntityProcessor`](crate::EntityProcessor).
//! - [`AlarmConfig`]: window and threshold of the [`AlarmDebouncer`](crate::AlarmDebouncer).
//!
//! The supervisor's *worker* configuration is not defined here: it is any
//! `C: PartialEq + Send + Sync` value handed to [`Supervisor::reinit`](crate::Supervisor::reinit).
//!
//! ## Sentinel values
//! - `stop_notice_after = 0s` → never emit a "still waiting" notification
//! - `pause_limit = 0s` → retry-not-before stamps are not capped
//! - `percent = 0` → any error time trips the alarm window

use std::time::Duration;

use crate::policies::JitterPolicy;

/// Settings of the supervision runtime.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Subsystem name used in logs and as the default span name field.
    pub name: String,

    /// How long `stop()` waits for the worker before notifying a [`StopNotice`](crate::StopNotice).
    pub stop_notice_after: Duration,
}

impl SupervisorConfig {
    /// Creates a config with the given name and default timings.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the notice grace period as an `Option`.
    #[inline]
    pub fn notice_grace(&self) -> Option<Duration> {
        if self.stop_notice_after == Duration::ZERO {
            None
        } else {
            Some(self.stop_notice_after)
        }
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `name = "subsystem"`
    /// - `stop_notice_after = 500ms`
    fn default() -> Self {
        Self {
            name: "subsystem".to_string(),
            stop_notice_after: Duration::from_millis(500),
        }
    }
}

/// How the entity processor finds work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PollMode {
    /// Walk every eligible entity once per pass, then sleep `scan_interval`.
    #[default]
    Scan,
    /// Process the first lockable eligible entity; idle-poll when none is found.
    Find,
}

/// Polling mode and timing of an entity processor.
#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    /// Worker name used in logs.
    pub name: String,

    /// Polling mode.
    pub mode: PollMode,

    /// Sleep between two scan passes.
    pub scan_interval: Duration,

    /// Sleep in find mode when no entity qualified.
    pub idle_interval: Duration,

    /// Upper bound on how far a `pause_retry` stamp may lie in the future.
    pub pause_limit: Duration,

    /// Report unexpected domain faults to the supervisor error set.
    pub escalate_errors: bool,

    /// Randomization of the polling sleeps.
    pub jitter: JitterPolicy,
}

impl ProcessorConfig {
    /// Creates a config with the given name and mode and default timings.
    pub fn new(name: impl Into<String>, mode: PollMode) -> Self {
        Self {
            name: name.into(),
            mode,
            ..Self::default()
        }
    }

    /// Returns the pause cap as an `Option`.
    #[inline]
    pub fn pause_cap(&self) -> Option<Duration> {
        if self.pause_limit == Duration::ZERO {
            None
        } else {
            Some(self.pause_limit)
        }
    }

    /// Returns the jittered sleep between scan passes.
    pub fn next_scan_sleep(&self) -> Duration {
        self.jitter.apply(self.scan_interval)
    }

    /// Returns the jittered idle sleep in find mode.
    pub fn next_idle_sleep(&self) -> Duration {
        self.jitter.apply(self.idle_interval)
    }
}

impl Default for ProcessorConfig {
    /// Default configuration:
    ///
    /// - `mode = Scan`
    /// - `scan_interval = 5s`, `idle_interval = 1s`
    /// - `pause_limit = 1h`
    /// - `escalate_errors = true`
    /// - `jitter = None`
    fn default() -> Self {
        Self {
            name: "entities".to_string(),
            mode: PollMode::Scan,
            scan_interval: Duration::from_secs(5),
            idle_interval: Duration::from_secs(1),
            pause_limit: Duration::from_secs(60 * 60),
            escalate_errors: true,
            jitter: JitterPolicy::None,
        }
    }
}

/// Window and threshold of the alarm debouncer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlarmConfig {
    /// When false, every status is shown immediately.
    pub enabled: bool,

    /// Length of the trailing window.
    pub window: Duration,

    /// Share of the window (0..=100) that must be in error before the alarm trips.
    pub percent: u8,
}

impl AlarmConfig {
    /// Accumulated error time within the window needed to trip the alarm.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use workvisor::AlarmConfig;
    ///
    /// let cfg = AlarmConfig { enabled: true, window: Duration::from_secs(90 * 60), percent: 50 };
    /// assert_eq!(cfg.threshold(), Duration::from_secs(45 * 60));
    /// ```
    pub fn threshold(&self) -> Duration {
        let percent = u32::from(self.percent.min(100));
        self.window * percent / 100
    }
}

impl Default for AlarmConfig {
    /// Default configuration: enabled, 90 minute window, 50%.
    fn default() -> Self {
        Self {
            enabled: true,
            window: Duration::from_secs(90 * 60),
            percent: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        let mut sup = SupervisorConfig::named("orders");
        assert_eq!(sup.name, "orders");
        assert_eq!(sup.notice_grace(), Some(Duration::from_millis(500)));
        sup.stop_notice_after = Duration::ZERO;
        assert_eq!(sup.notice_grace(), None);

        let mut proc = ProcessorConfig::new("rolls", PollMode::Find);
        assert_eq!(proc.mode, PollMode::Find);
        assert_eq!(proc.pause_cap(), Some(Duration::from_secs(3600)));
        proc.pause_limit = Duration::ZERO;
        assert_eq!(proc.pause_cap(), None);
    }

    #[test]
    fn test_sleeps_without_jitter_are_exact() {
        let proc = ProcessorConfig::default();
        assert_eq!(proc.next_scan_sleep(), Duration::from_secs(5));
        assert_eq!(proc.next_idle_sleep(), Duration::from_secs(1));
    }

    #[test]
    fn test_alarm_threshold_clamps_percent() {
        let cfg = AlarmConfig {
            enabled: true,
            window: Duration::from_secs(100),
            percent: 250,
        };
        assert_eq!(cfg.threshold(), Duration::from_secs(100));

        let cfg = AlarmConfig { percent: 0, ..cfg };
        assert_eq!(cfg.threshold(), Duration::ZERO);
    }
}
