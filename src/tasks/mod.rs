//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - Expiry sweeper: reclaims memory held by expired entries nobody reads

mod sweeper;

pub use sweeper::spawn_expiry_sweeper;
