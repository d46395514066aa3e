//! Status events: the data model reported by a supervisor and consumed by listeners.
//!
//! ## Contents
//! - [`State`], [`Status`] state classification and the published snapshot
//! - [`PauseToken`] restores the exact state that preceded a pause scope
//! - [`ThreadStatus`] narrow reporting surface handed to the running worker
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor` (control operations and worker reports).
//! - **Consumers**: every [`StatusListener`](crate::StatusListener), e.g. the alarm debouncer.

mod sink;
mod state;

pub use sink::ThreadStatus;
pub use state::{PauseToken, State, Status};
