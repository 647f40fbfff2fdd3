//! Timed Entry Module
//!
//! A cached value wrapped with an absolute expiry instant.

use std::time::Duration;

use tokio::time::Instant;

// == Timed Entry ==
/// A single cache entry: the value plus the instant after which it is dead.
#[derive(Debug, Clone)]
pub struct TimedEntry<V> {
    /// The stored value
    pub value: V,
    /// When the entry was written
    pub inserted_at: Instant,
    /// Absolute expiry; the entry is invalid once `now >= expires_at`
    pub expires_at: Instant,
}

impl<V> TimedEntry<V> {
    // == Constructor ==
    /// Creates an entry that expires `ttl` after `now`.
    ///
    /// A zero TTL produces an entry that is already expired.
    pub fn new(value: V, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            inserted_at: now,
            expires_at: now + ttl,
        }
    }

    // == Is Expired ==
    /// Checks expiry against a caller-supplied instant.
    ///
    /// Boundary condition: the entry is expired at exactly `expires_at`. The
    /// sweeper and `get` both go through this, so they agree on validity.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Checks expiry against the current instant.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    // == Time To Live ==
    /// Remaining lifetime, zero once expired.
    pub fn ttl_remaining_at(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }

    pub fn ttl_remaining(&self) -> Duration {
        self.ttl_remaining_at(Instant::now())
    }
}
