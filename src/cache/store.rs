//! Cache Store Module
//!
//! Main cache engine: a map of timed entries with lazy expiry, optional FIFO
//! capacity bound, and structured or pattern-based invalidation.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::cache::{
    CacheKey, CacheStats, EntrySnapshot, InsertionOrder, Invalidation, KeyPattern, StoreSnapshot,
    TimedEntry,
};
use crate::config::Config;
use crate::error::Result;

/// How many recent invalidations `set_if_epoch` can check against.
const INVALIDATION_LOG_LEN: usize = 1024;

/// What an epoch bump made stale.
#[derive(Debug)]
enum Stale {
    Matching(Invalidation),
    Everything,
}

impl Stale {
    fn covers(&self, key: &CacheKey) -> bool {
        match self {
            Stale::Matching(invalidation) => invalidation.matches(key),
            Stale::Everything => true,
        }
    }
}

// == Cache Store ==
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<CacheKey, TimedEntry<V>>,
    /// FIFO eviction order
    order: InsertionOrder,
    /// Diagnostic counters
    stats: CacheStats,
    /// Maximum number of entries, None = unbounded
    capacity: Option<usize>,
    /// TTL for entries set without an explicit one
    default_ttl: Duration,
    /// Bumped by every delete, invalidation and clear
    epoch: u64,
    /// The most recent bumps, newest last; entry `i` belongs to epoch
    /// `epoch - len + 1 + i`
    recent: VecDeque<Stale>,
}

impl<V: Clone> CacheStore<V> {
    // == Constructors ==
    pub fn new(capacity: Option<usize>, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            stats: CacheStats::new(),
            capacity,
            default_ttl,
            epoch: 0,
            recent: VecDeque::new(),
        }
    }

    /// Client variant: at most `max_entries`, oldest-inserted evicted first.
    pub fn bounded(max_entries: usize, default_ttl: Duration) -> Self {
        Self::new(Some(max_entries), default_ttl)
    }

    /// Server variant: unbounded, reclaimed by the sweeper.
    pub fn unbounded(default_ttl: Duration) -> Self {
        Self::new(None, default_ttl)
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_entries, config.default_ttl())
    }

    // == Set ==
    /// Stores a value, overwriting any previous one for the key.
    ///
    /// An overwrite keeps the key's original insertion position. Inserting a
    /// new key into a full store first evicts the oldest-inserted key.
    pub fn set(&mut self, key: CacheKey, value: V, ttl: Option<Duration>) {
        let is_overwrite = self.entries.contains_key(&key);

        if !is_overwrite {
            if let Some(capacity) = self.capacity {
                if capacity == 0 {
                    debug!(key = %key, "cache has zero capacity, value not stored");
                    return;
                }
                if self.entries.len() >= capacity {
                    if let Some(evicted) = self.order.pop_oldest() {
                        self.entries.remove(&evicted);
                        self.stats.record_eviction();
                        debug!(key = %evicted, "evicted oldest entry");
                    }
                }
            }
        }

        let ttl = ttl.unwrap_or(self.default_ttl);
        if !is_overwrite {
            self.order.push(&key);
        }
        self.entries
            .insert(key, TimedEntry::new(value, ttl, Instant::now()));
        self.stats.set_total_entries(self.entries.len());
    }

    /// Stores only if no invalidation since `epoch` was read covers `key`.
    ///
    /// Invalidations older than the log are assumed to cover it. Returns
    /// whether the value was stored.
    pub fn set_if_epoch(
        &mut self,
        key: CacheKey,
        value: V,
        ttl: Option<Duration>,
        epoch: u64,
    ) -> bool {
        if self.invalidated_since(&key, epoch) {
            debug!(key = %key, "invalidated while fetching, result not stored");
            return false;
        }
        self.set(key, value, ttl);
        true
    }

    fn invalidated_since(&self, key: &CacheKey, epoch: u64) -> bool {
        let missed = self.epoch.saturating_sub(epoch);
        if missed == 0 {
            return false;
        }
        match usize::try_from(missed) {
            Ok(missed) if missed <= self.recent.len() => {
                self.recent.iter().rev().take(missed).any(|stale| stale.covers(key))
            }
            _ => true,
        }
    }

    fn bump_epoch(&mut self, stale: Stale) {
        self.epoch += 1;
        if self.recent.len() == INVALIDATION_LOG_LEN {
            self.recent.pop_front();
        }
        self.recent.push_back(stale);
    }

    // == Get ==
    /// Returns the value if present and fresh. Expired entries are removed.
    pub fn get(&mut self, key: &CacheKey) -> Option<V> {
        let fresh = match self.entries.get(key) {
            Some(entry) => !entry.is_expired_at(Instant::now()),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if fresh {
            self.stats.record_hit();
            self.entries.get(key).map(|entry| entry.value.clone())
        } else {
            self.entries.remove(key);
            self.order.remove(key);
            self.stats.record_expired(1);
            self.stats.record_miss();
            self.stats.set_total_entries(self.entries.len());
            None
        }
    }

    /// Freshness check that does not touch the hit/miss counters.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired_at(now))
            .unwrap_or(false)
    }

    /// Remaining TTL of a fresh entry.
    pub fn ttl_remaining(&self, key: &CacheKey) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.ttl_remaining_at(now))
    }

    // == Delete ==
    /// Removes an entry. Returns whether anything was removed.
    pub fn delete(&mut self, key: &CacheKey) -> bool {
        self.bump_epoch(Stale::Matching(Invalidation::Key(key.clone())));
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.order.remove(key);
            self.stats.record_invalidated(1);
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }

    // == Invalidate ==
    /// Removes every key whose serialized form fully matches `pattern`.
    pub fn invalidate_pattern(&mut self, pattern: &str) -> Result<usize> {
        let pattern = KeyPattern::new(pattern)?;
        Ok(self.invalidate(&Invalidation::Pattern(pattern)))
    }

    /// Removes every key matched by the invalidation. Returns the count.
    pub fn invalidate(&mut self, invalidation: &Invalidation) -> usize {
        if let Invalidation::Key(key) = invalidation {
            return usize::from(self.delete(key));
        }

        self.bump_epoch(Stale::Matching(invalidation.clone()));
        let doomed: Vec<CacheKey> = self
            .entries
            .keys()
            .filter(|key| invalidation.matches(key))
            .cloned()
            .collect();

        for key in &doomed {
            self.entries.remove(key);
        }
        let entries = &self.entries;
        self.order.retain(|key| entries.contains_key(key));

        let count = doomed.len();
        self.stats.record_invalidated(count);
        self.stats.set_total_entries(self.entries.len());
        debug!(%invalidation, removed = count, "invalidated cache entries");
        count
    }

    // == Purge Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));

        let count = before - self.entries.len();
        if count > 0 {
            let entries = &self.entries;
            self.order.retain(|key| entries.contains_key(key));
            self.stats.record_expired(count);
            self.stats.set_total_entries(self.entries.len());
        }
        count
    }

    // == Clear ==
    pub fn clear(&mut self) -> usize {
        self.bump_epoch(Stale::Everything);
        let count = self.entries.len();
        self.entries.clear();
        self.order.clear();
        self.stats.record_invalidated(count);
        self.stats.set_total_entries(0);
        count
    }

    // == Introspection ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Invalidation generation, read before a fetch and checked by `set_if_epoch`.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let now = Instant::now();
        let entries = self
            .order
            .iter()
            .filter_map(|key| {
                self.entries.get(key).map(|entry| EntrySnapshot {
                    key: key.to_string(),
                    remaining_ttl_ms: u64::try_from(entry.ttl_remaining_at(now).as_millis())
                        .unwrap_or(u64::MAX),
                })
            })
            .collect();

        StoreSnapshot {
            count: self.entries.len(),
            max_size: self.capacity,
            entries,
        }
    }
}
