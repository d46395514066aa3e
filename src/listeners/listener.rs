//! # Status listener trait.
//!
//! Provides [`StatusListener`], the extension point for observing a supervisor.
//!
//! ## Rules
//! - Delivery is synchronous and happens while the supervisor holds its state mutex, so
//!   every listener sees one total order of snapshots and the registration snapshot always
//!   comes first.
//! - Listeners must return quickly and must not call mutating supervisor methods from
//!   `on_status` (that would deadlock). Hand the snapshot to a channel if real work is needed.
//! - Panics are caught and logged; other listeners are unaffected.
//!
//! ## Example
//! ```rust
//! use std::sync::Mutex;
//! use workvisor::{State, Status, StatusListener};
//!
//! #[derive(Default)]
//! struct LastState(Mutex<Option<State>>);
//!
//! impl StatusListener for LastState {
//!     fn on_status(&self, status: &Status) {
//!         *self.0.lock().unwrap() = Some(status.state);
//!     }
//!
//!     fn name(&self) -> &str { "last-state" }
//! }
//! ```

use crate::status::Status;

/// Observer of supervisor status snapshots.
pub trait StatusListener: Send + Sync + 'static {
    /// Receives one status snapshot.
    fn on_status(&self, status: &Status);

    /// Returns the listener name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
