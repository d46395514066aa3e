//! # Status listeners.
//!
//! This module provides the [`StatusListener`] trait and the [`ListenerSet`] used by the
//! supervisor (and the alarm debouncer) to fan status snapshots out to registered listeners.
//!
//! ## Architecture
//! ```text
//! Supervisor state change
//!     └─► ListenerSet::emit(&Status)      (under the supervisor's state mutex)
//!              ├──► listener 1 .on_status()
//!              ├──► AlarmDebouncer .on_status() ──► its own ListenerSet<dyn AlarmListener>
//!              └──► LogWriter .on_status()        (feature = "logging")
//! ```
//!
//! Registration is explicit: `add_listener` returns a [`ListenerId`] that the owner of the
//! listener must hand back to `remove_listener`. Nothing is dropped implicitly.

mod listener;
#[cfg(feature = "logging")]
mod log;
mod set;

pub use listener::StatusListener;
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::{ListenerId, ListenerSet};
