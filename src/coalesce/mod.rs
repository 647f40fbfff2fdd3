//! Request Coalescing
//!
//! In-flight deduplication keyed by operation fingerprints.

mod coalescer;
mod fingerprint;

pub use coalescer::{CoalescerStats, RequestCoalescer};
pub use fingerprint::Fingerprint;
