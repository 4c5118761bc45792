//! # Bounded Transition History
//!
//! A fixed-capacity, overwrite-oldest log for state-transition records.
//! Unbounded per-record history is a denial-of-service vector on chains
//! with per-record storage rent, so the log keeps only the last
//! `capacity` entries and drops the oldest on overflow.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default ring depth for per-trade transition history.
pub const TRANSITION_HISTORY_CAPACITY: usize = 16;

/// A fixed-capacity ring log. Appending past capacity evicts the oldest
/// entry; iteration is always oldest-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionLog<T> {
    capacity: usize,
    entries: VecDeque<T>,
    /// Total number of entries ever recorded, including evicted ones.
    recorded: u64,
}

impl<T> TransitionLog<T> {
    /// Create an empty log with the given capacity.
    ///
    /// A capacity of zero is clamped to one so the most recent transition
    /// is always observable.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            recorded: 0,
        }
    }

    /// Append an entry, evicting the oldest if the log is full.
    pub fn record(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.recorded = self.recorded.saturating_add(1);
    }

    /// Entries currently retained, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// The most recent entry, if any.
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Number of entries currently retained.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of entries ever recorded, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.recorded
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for TransitionLog<T> {
    fn default() -> Self {
        Self::with_capacity(TRANSITION_HISTORY_CAPACITY)
    }
}
