//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror. Errors are `Clone` so a
//! single coalesced failure can be handed to every waiter.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Malformed key, identifier or argument, rejected before touching the cache
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Key not present (admin surface only; the store itself returns `Option`)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// The underlying fetch or mutation failed
    #[error("Fetch failed: {0}")]
    Fetch(Arc<anyhow::Error>),

    /// A post-write invalidation step failed; the write itself went through
    #[error("Invalidation failed: {0}")]
    Invalidation(String),

    /// The caller stopped waiting for a coalesced operation
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Wraps a fetcher or mutation failure.
    pub fn fetch(err: anyhow::Error) -> Self {
        CacheError::Fetch(Arc::new(err))
    }

    /// Returns true for failures coming from the system of record.
    pub fn is_fetch(&self) -> bool {
        matches!(self, CacheError::Fetch(_))
    }
}

impl From<anyhow::Error> for CacheError {
    fn from(err: anyhow::Error) -> Self {
        CacheError::fetch(err)
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Validation(_) | CacheError::Invalidation(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::Fetch(_) => StatusCode::BAD_GATEWAY,
            CacheError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
