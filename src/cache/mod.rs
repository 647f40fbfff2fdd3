//! Cache Module
//!
//! In-memory store with TTL expiration, optional FIFO capacity bound and
//! structured or pattern-based invalidation.

mod entry;
mod key;
mod order;
mod pattern;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::TimedEntry;
pub use key::{canonical_json, CacheKey, LIST_QUALIFIER};
pub use order::InsertionOrder;
pub use pattern::{Invalidation, KeyPattern};
pub use stats::{CacheStats, EntrySnapshot, StoreSnapshot};
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed serialized key length in bytes
pub const MAX_KEY_LENGTH: usize = 1024;
