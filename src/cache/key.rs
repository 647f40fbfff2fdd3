//! Cache Key Module
//!
//! Structured `(namespace, qualifier)` keys. The serialized `namespace:qualifier`
//! form is what pattern invalidation matches against; namespace invalidation
//! compares the structured namespace directly.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::cache::MAX_KEY_LENGTH;
use crate::error::{CacheError, Result};

/// Qualifier prefix used by list queries.
pub const LIST_QUALIFIER: &str = "list";

// == Cache Key ==
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    namespace: String,
    qualifier: Option<String>,
}

impl CacheKey {
    // == Constructors ==
    /// Builds a validated key.
    pub fn new(namespace: impl Into<String>, qualifier: impl Into<String>) -> Result<Self> {
        let key = Self {
            namespace: namespace.into(),
            qualifier: Some(qualifier.into()),
        };
        key.validate()?;
        Ok(key)
    }

    /// A key that is just a namespace, e.g. `clientes`.
    pub fn namespace_only(namespace: impl Into<String>) -> Result<Self> {
        let key = Self {
            namespace: namespace.into(),
            qualifier: None,
        };
        key.validate()?;
        Ok(key)
    }

    /// By-id lookup key, e.g. `casos:42`.
    pub fn record(namespace: impl Into<String>, id: impl fmt::Display) -> Result<Self> {
        let id = id.to_string();
        if id.trim().is_empty() {
            return Err(CacheError::Validation(
                "Record identifier cannot be empty".to_string(),
            ));
        }
        Self::new(namespace, id)
    }

    /// List query key with a canonicalized filter bag, e.g.
    /// `casos:list:{"estado":"abierto"}`.
    pub fn list(namespace: impl Into<String>, filters: &Value) -> Result<Self> {
        let qualifier = format!("{}:{}", LIST_QUALIFIER, canonical_json(filters));
        Self::new(namespace, qualifier)
    }

    /// Parses the serialized form, splitting on the first `:`.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.split_once(':') {
            Some((namespace, qualifier)) => Self::new(namespace, qualifier),
            None => Self::namespace_only(raw),
        }
    }

    // == Accessors ==
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// True for keys built by [`CacheKey::list`].
    pub fn is_list(&self) -> bool {
        self.qualifier
            .as_deref()
            .map(|q| q == LIST_QUALIFIER || q.starts_with("list:"))
            .unwrap_or(false)
    }

    /// Anchored regex source matching exactly this key.
    pub fn exact_pattern(&self) -> String {
        regex::escape(&self.to_string())
    }

    // == Validation ==
    fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(CacheError::Validation(
                "Key namespace cannot be empty".to_string(),
            ));
        }
        if let Some(bad) = self
            .namespace
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(CacheError::Validation(format!(
                "Invalid character {:?} in key namespace '{}'",
                bad, self.namespace
            )));
        }
        if let Some(qualifier) = &self.qualifier {
            if qualifier.is_empty() {
                return Err(CacheError::Validation(format!(
                    "Key qualifier for namespace '{}' cannot be empty",
                    self.namespace
                )));
            }
            if qualifier.chars().any(char::is_control) {
                return Err(CacheError::Validation(
                    "Key qualifier cannot contain control characters".to_string(),
                ));
            }
        }
        let len = self.namespace.len() + self.qualifier.as_ref().map_or(0, |q| q.len() + 1);
        if len > MAX_KEY_LENGTH {
            return Err(CacheError::Validation(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        Ok(())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{}:{}", self.namespace, qualifier),
            None => f.write_str(&self.namespace),
        }
    }
}

impl FromStr for CacheKey {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// == Canonicalization ==
/// Renders a JSON value deterministically: object members sorted by key at
/// every depth, `null` members dropped, array order kept.
pub fn canonical_json(value: &Value) -> String {
    canonicalize(value).to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut members: Vec<(&String, &Value)> =
                map.iter().filter(|(_, v)| !v.is_null()).collect();
            members.sort_by(|a, b| a.0.cmp(b.0));

            let mut sorted = Map::new();
            for (k, v) in members {
                sorted.insert(k.clone(), canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
