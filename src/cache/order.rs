//! Insertion Order Module
//!
//! Tracks key insertion order for FIFO eviction. Reads never move a key.

use std::collections::VecDeque;

use crate::cache::CacheKey;

// == Insertion Order ==
/// Keys in the order they were first inserted:
/// - Front = oldest
/// - Back = newest
#[derive(Debug, Default)]
pub struct InsertionOrder {
    order: VecDeque<CacheKey>,
}

impl InsertionOrder {
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Push ==
    /// Records a newly inserted key as the newest.
    ///
    /// The caller must not push a key that is already tracked; an overwrite
    /// keeps its original place.
    pub fn push(&mut self, key: &CacheKey) {
        self.order.push_back(key.clone());
    }

    // == Remove ==
    pub fn remove(&mut self, key: &CacheKey) {
        self.order.retain(|k| k != key);
    }

    /// Drops every tracked key the predicate rejects.
    pub fn retain(&mut self, mut keep: impl FnMut(&CacheKey) -> bool) {
        self.order.retain(|k| keep(k));
    }

    // == Pop Oldest ==
    /// Returns and removes the oldest-inserted key.
    pub fn pop_oldest(&mut self) -> Option<CacheKey> {
        self.order.pop_front()
    }

    pub fn peek_oldest(&self) -> Option<&CacheKey> {
        self.order.front()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &CacheKey> {
        self.order.iter()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.order.iter().any(|k| k == key)
    }
}
