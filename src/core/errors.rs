//! # Deduplicated error records.
//!
//! [`ErrorSet`] keeps the faults a supervisor shows on demand. Entries are unique by
//! formatted message, in first-seen order. The fault that aborted the worker is
//! remembered separately so a "clear" can keep it.

use crate::error::Fault;

/// Ordered, message-deduplicated collection of faults.
#[derive(Debug, Default, Clone)]
pub struct ErrorSet {
    entries: Vec<Fault>,
    fatal: Option<Fault>,
}

impl ErrorSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `fault` unless an entry with the same message exists. Returns true if added.
    pub fn add(&mut self, fault: Fault) -> bool {
        if self.entries.iter().any(|f| f.same_report(&fault)) {
            return false;
        }
        self.entries.push(fault);
        true
    }

    /// Records the fault that aborted the worker (and adds it).
    pub fn set_fatal(&mut self, fault: Fault) {
        self.fatal = Some(fault.clone());
        self.add(fault);
    }

    /// The fault that aborted the worker, if any.
    pub fn fatal(&self) -> Option<&Fault> {
        self.fatal.as_ref()
    }

    /// Drops everything, including the fatal fault.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.fatal = None;
    }

    /// Drops everything except the fatal fault.
    pub fn retain_fatal(&mut self) {
        self.entries.clear();
        if let Some(fatal) = &self.fatal {
            self.entries.push(fatal.clone());
        }
    }

    /// Removes all entries tagged with `category`. Returns how many were removed.
    ///
    /// The fatal fault is never removed this way.
    pub fn remove_category(&mut self, category: &str) -> usize {
        let fatal = self.fatal.clone();
        let before = self.entries.len();
        self.entries.retain(|f| {
            f.category() != Some(category) || fatal.as_ref().is_some_and(|x| x.same_report(f))
        });
        before - self.entries.len()
    }

    /// Snapshot of the entries in first-seen order.
    pub fn faults(&self) -> Vec<Fault> {
        self.entries.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
