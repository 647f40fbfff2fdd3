//! Request DTOs for the diagnostics API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::Invalidation;
use crate::error::{CacheError, Result};

/// Request body for seeding a value (PUT /cache)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// Serialized cache key, e.g. `casos:42`
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        None
    }
}

/// Request body for POST /invalidate. Exactly one field must be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateRequest {
    /// Regex matched against the whole serialized key
    #[serde(default)]
    pub pattern: Option<String>,
    /// Exact namespace
    #[serde(default)]
    pub namespace: Option<String>,
}

impl InvalidateRequest {
    pub fn validate(&self) -> Option<String> {
        match (&self.pattern, &self.namespace) {
            (Some(_), Some(_)) => Some("Specify either 'pattern' or 'namespace', not both".to_string()),
            (None, None) => Some("One of 'pattern' or 'namespace' is required".to_string()),
            (_, Some(ns)) if ns.is_empty() => Some("Namespace cannot be empty".to_string()),
            _ => None,
        }
    }

    /// Validates and builds the invalidation.
    pub fn into_invalidation(self) -> Result<Invalidation> {
        if let Some(error_msg) = self.validate() {
            return Err(CacheError::Validation(error_msg));
        }
        match (self.pattern, self.namespace) {
            (Some(pattern), None) => Invalidation::pattern(&pattern),
            (None, Some(namespace)) => Ok(Invalidation::namespace(namespace)),
            _ => Err(CacheError::Validation("Invalid invalidation request".to_string())),
        }
    }
}
