//! API Module
//!
//! HTTP diagnostics surface over a running cache.
//!
//! # Endpoints
//! - `PUT /cache`, `DELETE /cache` - Seed a value, clear everything
//! - `GET /cache/:key`, `DELETE /cache/:key` - Peek at or drop one key
//! - `POST /invalidate` - Pattern or namespace invalidation
//! - `GET /stats`, `GET /entries` - Counters and per-entry TTL
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
