//! Response DTOs for the diagnostics API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;
use crate::coalesce::CoalescerStats;

/// Response body for GET /cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
    /// Milliseconds until the entry expires
    pub ttl_remaining_ms: u64,
}

/// Response body for PUT /cache
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub message: String,
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for DELETE /cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub key: String,
    /// False when nothing was cached under the key
    pub removed: bool,
}

/// Response body for POST /invalidate and DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expired: u64,
    pub invalidated: u64,
    pub total_entries: usize,
    /// None when the store is unbounded
    pub max_entries: Option<usize>,
    /// hits / (hits + misses)
    pub hit_rate: f64,
    pub fetches: u64,
    pub coalesced: u64,
    pub in_flight: usize,
}

impl StatsResponse {
    pub fn new(cache: &CacheStats, max_entries: Option<usize>, coalescer: &CoalescerStats) -> Self {
        Self {
            hits: cache.hits,
            misses: cache.misses,
            evictions: cache.evictions,
            expired: cache.expired,
            invalidated: cache.invalidated,
            total_entries: cache.total_entries,
            max_entries,
            hit_rate: cache.hit_rate(),
            fetches: coalescer.executions,
            coalesced: coalescer.joined,
            in_flight: coalescer.in_flight,
        }
    }
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in RFC 3339 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
