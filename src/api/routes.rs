//! API Routes
//!
//! Configures the Axum router with the cache diagnostics endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, entries_handler, get_handler, health_handler,
    invalidate_handler, set_handler, stats_handler, AppState,
};

/// Creates the router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /cache` - Seed a value
/// - `DELETE /cache` - Clear the cache
/// - `GET /cache/:key` - Peek at a cached value (percent-encode the key)
/// - `DELETE /cache/:key` - Drop one key
/// - `POST /invalidate` - Invalidate by pattern or namespace
/// - `GET /stats` - Counters and coalescing stats
/// - `GET /entries` - Keys with remaining TTL
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache", put(set_handler).delete(clear_handler))
        .route("/cache/:key", get(get_handler).delete(delete_handler))
        .route("/invalidate", post(invalidate_handler))
        .route("/stats", get(stats_handler))
        .route("/entries", get(entries_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
