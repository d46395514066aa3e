//! # Entity store facade.
//!
//! The processor never owns entities. It reads them through an [`EntityStore`], which
//! provides live filtered [`View`]s, non-blocking locks and writes guarded by a [`LockToken`].

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;

/// Selection predicate of a view.
pub type Selector<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Sort order of a view (priority order, first = most urgent).
pub type Order<E> = Arc<dyn Fn(&E, &E) -> Ordering + Send + Sync>;

/// A persisted work item.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Store identity.
    type Key: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// Returns the store identity.
    fn key(&self) -> Self::Key;

    /// Identifier used in logs.
    fn label(&self) -> String {
        format!("{:?}", self.key())
    }
}

/// Proof of exclusive ownership of one entity.
///
/// Not `Clone`: [`EntityStore::release`] consumes it, so a token is released at most once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a lock token must be released"]
pub struct LockToken {
    id: u64,
}

impl LockToken {
    /// Creates a token; only stores should call this.
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    /// Store-assigned id.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Live, filtered and sorted projection over a store.
///
/// While suspended the view is frozen: length and order do not change, so an index-based
/// walk is stable. Entities returned by a frozen view may be stale.
pub trait View<E>: Send + Sync {
    /// Freezes the current contents. Calls nest.
    fn suspend(&mut self);

    /// Undoes one `suspend`; the view is live again after the outermost one.
    fn resume(&mut self);

    /// Number of entities in the view.
    fn len(&self) -> usize;

    /// Entity at position `index`.
    fn get(&self, index: usize) -> Option<E>;

    /// Replaces the sort order.
    fn sort(&mut self, order: Order<E>);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Persistence facade consumed by the entity processor.
///
/// Any `Err` is fatal to the processor.
#[async_trait]
pub trait EntityStore<E: Entity>: Send + Sync + 'static {
    /// Opens a view over all entities matching `selector`, sorted by `order`.
    async fn view(&self, selector: Selector<E>, order: Order<E>)
    -> Result<Box<dyn View<E>>, StoreError>;

    /// Tries to lock the entity without waiting. `Ok(None)` if it is locked elsewhere or gone.
    async fn lock_try(&self, key: &E::Key) -> Result<Option<LockToken>, StoreError>;

    /// Loads a fresh copy.
    async fn get(&self, key: &E::Key) -> Result<Option<E>, StoreError>;

    /// Persists `entity`; the token must own it.
    async fn update(&self, entity: &E, token: &LockToken) -> Result<(), StoreError>;

    /// Releases the lock.
    async fn release(&self, key: &E::Key, token: LockToken);
}
