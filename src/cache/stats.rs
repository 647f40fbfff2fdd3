//! Cache Statistics Module
//!
//! Counters and diagnostic snapshots. Nothing here is used for correctness.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads that returned a fresh value
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    /// Entries dropped to respect the capacity bound
    pub evictions: u64,
    /// Entries removed because their TTL ran out (lazily or by the sweeper)
    pub expired: u64,
    /// Entries removed by delete or invalidation
    pub invalidated: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expired(&mut self, count: usize) {
        self.expired += count as u64;
    }

    pub fn record_invalidated(&mut self, count: usize) {
        self.invalidated += count as u64;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}

// == Store Snapshot ==
/// Point-in-time view of a store for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSnapshot {
    pub count: usize,
    /// None when the store is unbounded
    pub max_size: Option<usize>,
    /// Oldest-inserted first
    pub entries: Vec<EntrySnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntrySnapshot {
    pub key: String,
    pub remaining_ttl_ms: u64,
}
