//! # Alarm debouncing.
//!
//! Turns the raw status stream of a supervisor into a smoothed "show as error" signal.
//!
//! ```text
//! Supervisor ──Status──► AlarmDebouncer (a StatusListener)
//!                            ├─ classify: NoError / AdjustableError / Other
//!                            ├─ AlarmWindow: transition instants, lazy purge
//!                            └─► ListenerSet<dyn AlarmListener> ──AlarmStatus──► UI
//! ```
//!
//! [`AlarmWindow`] is pure (time is passed in); [`AlarmDebouncer`] adds locking, listeners
//! and a periodic ping.

mod debouncer;
mod window;

pub use debouncer::{AlarmDebouncer, AlarmListener, AlarmStatus};
pub use window::{AlarmWindow, Severity};
