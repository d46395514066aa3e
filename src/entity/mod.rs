//! # Entity processing: claim, process and release persisted work items.
//!
//! An [`EntityProcessor`] is an [`ActiveObject`](crate::ActiveObject) that repeatedly walks an
//! [`EntityStore`], locks one entity at a time, drives it through the status machine of a
//! [`Manipulator`] and hands it to the domain [`EntityWork`].
//!
//! ## Contents
//! - [`Entity`], [`EntityStore`], [`View`], [`LockToken`] the store facade the processor consumes
//! - [`Manipulator`] selection predicate and status transitions of one entity kind
//! - [`StatusEntity`], [`StatusManipulator`] a ready-made manipulator over a status triple
//! - [`EntityWork`], [`ScanFilter`] the per-entity unit of work
//! - [`MemoryStore`] in-memory store with lock bookkeeping (tests, demos)
//!
//! ## Per-entity pass
//! ```text
//! lock_try(key) ── None ──► skip (owned elsewhere)
//!     │ Some(token)
//!     ▼
//! get(key) ─► select(fresh)? ── no ──► skip
//!     │ yes
//!     ▼
//! mark_active ─► work.process(&mut entity)
//!     ├─ Ok(true)        ─► mark_complete    ─► success(category)
//!     ├─ Ok(false)       ─► mark_incomplete
//!     ├─ Err(Stopped)    ─► mark_incomplete  ─► Err(Stopped)
//!     ├─ Err(Store)      ─────────────────────► Err(Store)   (worker aborts)
//!     └─ Err(Fault)      ─► mark_error       ─► log, escalate, continue
//!     ▼
//! release(key, token)                         (every path, exactly once)
//! ```

mod manipulator;
mod memory;
mod processor;
mod store;
mod work;

pub use manipulator::{
    ErrorMode, Manipulator, StatusEntity, StatusManipulator, StatusTriple, retry_stamp,
};
pub use memory::MemoryStore;
pub use processor::EntityProcessor;
pub use store::{Entity, EntityStore, LockToken, Order, Selector, View};
pub use work::{EntityWork, ScanFilter};
