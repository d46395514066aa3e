//! # ListenerSet: synchronous fan-out with panic isolation.
//!
//! [`ListenerSet`] keeps explicitly registered listeners and delivers each value to all of
//! them in registration order.
//!
//! ## What it guarantees
//! - Registration order delivery.
//! - A panicking listener is logged and skipped; delivery continues with the next one.
//!
//! ## What it does **not** guarantee
//! - Thread safety on its own: the owner wraps it in its mutex, which is also what gives
//!   listeners a single total order.
//!
//! ## Diagram
//! ```text
//!    emit(deliver)
//!        ├──► deliver(listener #1)
//!        ├──► deliver(listener #2)   (panic → logged, continue)
//!        └──► deliver(listener #N)
//! ```

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::panic_message;

static LISTENER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Handle returned on registration; pass it back to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(LISTENER_SEQ.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Ordered set of listeners of type `L` (usually a trait object).
pub struct ListenerSet<L: ?Sized> {
    entries: Vec<(ListenerId, Arc<L>)>,
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<L: ?Sized> ListenerSet<L> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener and returns its handle.
    pub fn add(&mut self, listener: Arc<L>) -> ListenerId {
        let id = ListenerId::next();
        self.entries.push((id, listener));
        id
    }

    /// Unregisters a listener; returns false if the handle is unknown.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(other, _)| *other != id);
        self.entries.len() != before
    }

    /// Delivers to every listener (registration order).
    pub fn emit(&self, deliver: impl Fn(&L)) {
        for (id, listener) in &self.entries {
            Self::guarded(*id, listener, &deliver);
        }
    }

    /// Delivers to a single listener.
    pub fn emit_to(&self, id: ListenerId, deliver: impl Fn(&L)) -> bool {
        match self.entries.iter().find(|(other, _)| *other == id) {
            Some((id, listener)) => {
                Self::guarded(*id, listener, &deliver);
                true
            }
            None => false,
        }
    }

    fn guarded(id: ListenerId, listener: &Arc<L>, deliver: &impl Fn(&L)) {
        if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| deliver(&**listener))) {
            tracing::error!(
                listener = %id,
                panic = %panic_message(panic_err.as_ref()),
                "listener panicked"
            );
        }
    }

    /// True if there are no listeners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
