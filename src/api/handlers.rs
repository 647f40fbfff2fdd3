//! API Handlers
//!
//! HTTP request handlers for the cache diagnostics endpoints.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::{CacheKey, StoreSnapshot};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, InvalidateRequest, RemovedResponse, SetRequest,
    SetResponse, StatsResponse,
};
use crate::operation::CachedOperation;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache of JSON payloads plus its coalescer
    pub cache: CachedOperation<Value>,
}

impl AppState {
    pub fn new(cache: CachedOperation<Value>) -> Self {
        Self { cache }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(CachedOperation::from_config(config))
    }
}

/// Handler for PUT /cache
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::Validation(error_msg));
    }
    let key = CacheKey::parse(&req.key)?;
    let ttl = req.ttl.map(Duration::from_secs);

    state.cache.store().write().await.set(key, req.value, ttl);

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(raw_key): Path<String>,
) -> Result<Json<GetResponse>> {
    let key = CacheKey::parse(&raw_key)?;

    // Write lock: an expired entry is removed on read
    let mut store = state.cache.store().write().await;
    let value = store
        .get(&key)
        .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
    let ttl_remaining_ms = store
        .ttl_remaining(&key)
        .map(|ttl| u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0);

    Ok(Json(GetResponse {
        key: key.to_string(),
        value,
        ttl_remaining_ms,
    }))
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(raw_key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let key = CacheKey::parse(&raw_key)?;
    let removed = state.cache.store().write().await.delete(&key);

    Ok(Json(DeleteResponse {
        key: key.to_string(),
        removed,
    }))
}

/// Handler for POST /invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<RemovedResponse>> {
    let invalidation = req.into_invalidation()?;
    let removed = state.cache.invalidate(&[invalidation]).await;

    Ok(Json(RemovedResponse { removed }))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<RemovedResponse> {
    let removed = state.cache.clear().await;
    Json(RemovedResponse { removed })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let (cache_stats, capacity) = {
        let store = state.cache.store().read().await;
        (store.stats(), store.capacity())
    };
    let coalescer_stats = state.cache.coalescer().stats();

    Json(StatsResponse::new(&cache_stats, capacity, &coalescer_stats))
}

/// Handler for GET /entries
pub async fn entries_handler(State(state): State<AppState>) -> Json<StoreSnapshot> {
    Json(state.cache.store().read().await.snapshot())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use serde_json::json;

    fn test_state() -> AppState {
        AppState::new(CachedOperation::new(CacheStore::bounded(
            100,
            Duration::from_secs(300),
        )))
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state();

        let req = SetRequest {
            key: "casos:1".to_string(),
            value: json!({"estado": "abierto"}),
            ttl: None,
        };
        set_handler(State(state.clone()), Json(req)).await.unwrap();

        let response = get_handler(State(state), Path("casos:1".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!({"estado": "abierto"}));
        assert!(response.ttl_remaining_ms > 0);
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let result = get_handler(State(test_state()), Path("casos:404".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_malformed_key() {
        let result = get_handler(State(test_state()), Path(":oops".to_string())).await;
        assert!(matches!(result, Err(CacheError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_handler_is_idempotent() {
        let state = test_state();
        state
            .cache
            .store()
            .write()
            .await
            .set(CacheKey::parse("casos:1").unwrap(), json!(1), None);

        let first = delete_handler(State(state.clone()), Path("casos:1".to_string()))
            .await
            .unwrap();
        let second = delete_handler(State(state), Path("casos:1".to_string()))
            .await
            .unwrap();

        assert!(first.removed);
        assert!(!second.removed);
    }

    #[tokio::test]
    async fn test_invalidate_handler() {
        let state = test_state();
        {
            let mut store = state.cache.store().write().await;
            store.set(CacheKey::parse("casos:1").unwrap(), json!(1), None);
            store.set(CacheKey::parse("casos:2").unwrap(), json!(2), None);
            store.set(CacheKey::parse("clientes:9").unwrap(), json!(9), None);
        }

        let req = InvalidateRequest {
            pattern: Some("casos:.*".to_string()),
            namespace: None,
        };
        let response = invalidate_handler(State(state.clone()), Json(req))
            .await
            .unwrap();

        assert_eq!(response.removed, 2);
        assert_eq!(state.cache.store().read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_bad_pattern() {
        let req = InvalidateRequest {
            pattern: Some("casos:(".to_string()),
            namespace: None,
        };
        let result = invalidate_handler(State(test_state()), Json(req)).await;
        assert!(matches!(result, Err(CacheError::Invalidation(_))));
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let response = stats_handler(State(test_state())).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.max_entries, Some(100));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
