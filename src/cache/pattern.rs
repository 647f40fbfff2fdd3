//! Invalidation Patterns
//!
//! Regex patterns are the serialization convenience at the API boundary;
//! internally invalidation can also target a structured key or namespace.

use std::fmt;

use regex::Regex;

use crate::cache::CacheKey;
use crate::error::{CacheError, Result};

// == Key Pattern ==
/// A compiled regex tested against the whole serialized key.
///
/// `casos:.*` matches `casos:42` and `casos:list:{}`; `casos:1` matches only
/// `casos:1`, never `casos:12`.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    /// Compiles `source` anchored at both ends.
    pub fn new(source: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", source)).map_err(|e| {
            CacheError::Invalidation(format!("Invalid pattern '{}': {}", source, e))
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, key: &CacheKey) -> bool {
        self.regex.is_match(&key.to_string())
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// == Invalidation ==
/// What a successful write makes stale.
#[derive(Debug, Clone)]
pub enum Invalidation {
    /// One exact key
    Key(CacheKey),
    /// Every key whose namespace is exactly this
    Namespace(String),
    /// Every key whose serialized form matches
    Pattern(KeyPattern),
}

impl Invalidation {
    pub fn key(key: CacheKey) -> Self {
        Invalidation::Key(key)
    }

    pub fn namespace(namespace: impl Into<String>) -> Self {
        Invalidation::Namespace(namespace.into())
    }

    pub fn pattern(source: &str) -> Result<Self> {
        KeyPattern::new(source).map(Invalidation::Pattern)
    }

    /// Every list query of a namespace (`<ns>:list:.*`).
    pub fn lists_of(namespace: &str) -> Result<Self> {
        Self::pattern(&format!("{}:list(:.*)?", regex::escape(namespace)))
    }

    pub fn matches(&self, key: &CacheKey) -> bool {
        match self {
            Invalidation::Key(target) => target == key,
            Invalidation::Namespace(namespace) => key.namespace() == namespace,
            Invalidation::Pattern(pattern) => pattern.matches(key),
        }
    }
}

impl fmt::Display for Invalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invalidation::Key(key) => write!(f, "key {}", key),
            Invalidation::Namespace(namespace) => write!(f, "namespace {}", namespace),
            Invalidation::Pattern(pattern) => write!(f, "pattern {}", pattern),
        }
    }
}
