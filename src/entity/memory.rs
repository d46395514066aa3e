//! # In-memory entity store.
//!
//! [`MemoryStore`] implements [`EntityStore`] over a `Vec` kept in insertion order. It is a
//! complete facade (live views, exclusive locks, token-checked updates) and keeps counters
//! that make lock discipline observable:
//!
//! - `lock_count` / `release_count`: successful `lock_try` calls and `release` calls;
//! - `outstanding_locks`: locks currently held.
//!
//! A [`StoreError`] injected with [`MemoryStore::inject_fault`] is returned by every
//! fallible operation until [`MemoryStore::clear_fault`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::entity::store::{Entity, EntityStore, LockToken, Order, Selector, View};
use crate::error::StoreError;

struct Tables<E: Entity> {
    entities: Vec<E>,
    locks: HashMap<E::Key, u64>,
    next_token: u64,
    lock_count: usize,
    release_count: usize,
    fault: Option<StoreError>,
}

impl<E: Entity> Tables<E> {
    fn check(&self) -> Result<(), StoreError> {
        match &self.fault {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn find(&self, key: &E::Key) -> Option<usize> {
        self.entities.iter().position(|e| e.key() == *key)
    }
}

/// Shared in-memory store (cheap to clone; clones share the tables).
pub struct MemoryStore<E: Entity> {
    tables: Arc<Mutex<Tables<E>>>,
}

impl<E: Entity> Clone for MemoryStore<E> {
    fn clone(&self) -> Self {
        Self {
            tables: Arc::clone(&self.tables),
        }
    }
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryStore<E> {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables {
                entities: Vec::new(),
                locks: HashMap::new(),
                next_token: 1,
                lock_count: 0,
                release_count: 0,
                fault: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables<E>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts `entity`, replacing a stored one with the same key.
    pub fn insert(&self, entity: E) {
        let mut t = self.lock();
        match t.find(&entity.key()) {
            Some(i) => t.entities[i] = entity,
            None => t.entities.push(entity),
        }
    }

    /// Removes an entity. A lock on it stays until released.
    pub fn remove(&self, key: &E::Key) -> Option<E> {
        let mut t = self.lock();
        let i = t.find(key)?;
        Some(t.entities.remove(i))
    }

    /// Current stored copy.
    pub fn snapshot(&self, key: &E::Key) -> Option<E> {
        let t = self.lock();
        t.find(key).map(|i| t.entities[i].clone())
    }

    /// All entities in insertion order.
    pub fn entities(&self) -> Vec<E> {
        self.lock().entities.clone()
    }

    pub fn is_locked(&self, key: &E::Key) -> bool {
        self.lock().locks.contains_key(key)
    }

    pub fn outstanding_locks(&self) -> usize {
        self.lock().locks.len()
    }

    pub fn lock_count(&self) -> usize {
        self.lock().lock_count
    }

    pub fn release_count(&self) -> usize {
        self.lock().release_count
    }

    /// Makes every fallible operation fail with `err`.
    pub fn inject_fault(&self, err: StoreError) {
        self.lock().fault = Some(err);
    }

    pub fn clear_fault(&self) {
        self.lock().fault = None;
    }
}

#[async_trait]
impl<E: Entity> EntityStore<E> for MemoryStore<E> {
    async fn view(
        &self,
        selector: Selector<E>,
        order: Order<E>,
    ) -> Result<Box<dyn View<E>>, StoreError> {
        self.lock().check()?;
        Ok(Box::new(MemoryView {
            tables: Arc::clone(&self.tables),
            selector,
            order,
            depth: 0,
            frozen: Vec::new(),
        }))
    }

    async fn lock_try(&self, key: &E::Key) -> Result<Option<LockToken>, StoreError> {
        let mut t = self.lock();
        t.check()?;
        if t.locks.contains_key(key) || t.find(key).is_none() {
            return Ok(None);
        }
        let id = t.next_token;
        t.next_token += 1;
        t.lock_count += 1;
        t.locks.insert(key.clone(), id);
        Ok(Some(LockToken::new(id)))
    }

    async fn get(&self, key: &E::Key) -> Result<Option<E>, StoreError> {
        let t = self.lock();
        t.check()?;
        Ok(t.find(key).map(|i| t.entities[i].clone()))
    }

    async fn update(&self, entity: &E, token: &LockToken) -> Result<(), StoreError> {
        let mut t = self.lock();
        t.check()?;
        let key = entity.key();
        if t.locks.get(&key) != Some(&token.id()) {
            return Err(StoreError::LockLost {
                entity: entity.label(),
            });
        }
        match t.find(&key) {
            Some(i) => t.entities[i] = entity.clone(),
            None => t.entities.push(entity.clone()),
        }
        Ok(())
    }

    async fn release(&self, key: &E::Key, token: LockToken) {
        let mut t = self.lock();
        t.release_count += 1;
        if t.locks.get(key) == Some(&token.id()) {
            t.locks.remove(key);
        } else {
            tracing::warn!(entity = ?key, token = token.id(), "release of a lock not held");
        }
    }
}

struct MemoryView<E: Entity> {
    tables: Arc<Mutex<Tables<E>>>,
    selector: Selector<E>,
    order: Order<E>,
    depth: usize,
    frozen: Vec<E>,
}

impl<E: Entity> MemoryView<E> {
    fn collect(&self) -> Vec<E> {
        let t = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let mut items: Vec<E> = t
            .entities
            .iter()
            .filter(|e| (self.selector)(*e))
            .cloned()
            .collect();
        drop(t);
        items.sort_by(|a, b| (self.order)(a, b));
        items
    }
}

impl<E: Entity> View<E> for MemoryView<E> {
    fn suspend(&mut self) {
        if self.depth == 0 {
            self.frozen = self.collect();
        }
        self.depth += 1;
    }

    fn resume(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.frozen.clear();
        }
    }

    fn len(&self) -> usize {
        if self.depth > 0 {
            self.frozen.len()
        } else {
            self.collect().len()
        }
    }

    fn get(&self, index: usize) -> Option<E> {
        if self.depth > 0 {
            self.frozen.get(index).cloned()
        } else {
            self.collect().into_iter().nth(index)
        }
    }

    fn sort(&mut self, order: Order<E>) {
        self.order = order;
        if self.depth > 0 {
            let order = Arc::clone(&self.order);
            self.frozen.sort_by(|a, b| order(a, b));
        }
    }
}
