//! # Jitter policy for polling sleeps.
//!
//! [`JitterPolicy`] adds randomness to poll intervals so that processors started together
//! do not hit the entity store at the same instants.
//!
//! - [`JitterPolicy::None`] — no randomization, predictable sleeps
//! - [`JitterPolicy::Full`] — random sleep in [0, interval]
//! - [`JitterPolicy::Equal`] — sleep = interval/2 + random[0, interval/2]

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of polling sleeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum JitterPolicy {
    /// No jitter: use the exact interval.
    #[default]
    None,

    /// Full jitter: random sleep in [0, interval].
    ///
    /// Spreads load the most, but may poll almost continuously.
    Full,

    /// Equal jitter: sleep = interval/2 + random[0, interval/2].
    ///
    /// Keeps at least half of the configured interval.
    Equal,
}

impl JitterPolicy {
    /// Returns the sleep to use for a configured `interval`.
    pub fn apply(&self, interval: Duration) -> Duration {
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        match self {
            JitterPolicy::None => interval,
            JitterPolicy::Full => Duration::from_millis(spread(0, ms)),
            JitterPolicy::Equal => Duration::from_millis(spread(ms / 2, ms)),
        }
    }
}

/// Uniform pick in `[lo, hi]`.
fn spread(lo: u64, hi: u64) -> u64 {
    if lo >= hi {
        return lo;
    }
    rand::rng().random_range(lo..=hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_identity() {
        let d = Duration::from_millis(1234);
        assert_eq!(JitterPolicy::None.apply(d), d);
    }

    #[test]
    fn test_full_jitter_bounds() {
        for _ in 0..50 {
            let delay = JitterPolicy::Full.apply(Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_equal_jitter_bounds() {
        for _ in 0..50 {
            let delay = JitterPolicy::Equal.apply(Duration::from_millis(1000));
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_zero_interval() {
        assert_eq!(JitterPolicy::Full.apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(JitterPolicy::Equal.apply(Duration::ZERO), Duration::ZERO);
    }
}
