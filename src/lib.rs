//! casecache - read-through cache layer for a helpdesk backend
//!
//! TTL expiry, FIFO-bounded or swept storage, pattern invalidation on writes
//! and coalescing of concurrent identical fetches.

pub mod api;
pub mod cache;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod models;
pub mod operation;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheKey, CacheStore, Invalidation};
pub use coalesce::{Fingerprint, RequestCoalescer};
pub use config::Config;
pub use error::{CacheError, Result};
pub use operation::{CachedOperation, OperationClass, TtlPolicy, WriteOutcome};
pub use tasks::spawn_expiry_sweeper;
