//! Operation fingerprints.
//!
//! Two logically identical calls produce the same fingerprint regardless of
//! query parameter or body member ordering.

use std::fmt;

use serde_json::Value;

use crate::cache::{canonical_json, CacheKey};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// `METHOD:target:body`, with the method uppercased, query parameters
    /// sorted and the body canonicalized. A missing body renders empty.
    pub fn new(method: &str, target: &str, body: Option<&Value>) -> Self {
        let body = body.map(canonical_json).unwrap_or_default();
        Self(format!(
            "{}:{}:{}",
            method.trim().to_ascii_uppercase(),
            normalize_target(target),
            body
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize_target(target: &str) -> String {
    let target = target.trim();
    let Some((path, query)) = target.split_once('?') else {
        return target.to_string();
    };

    let mut params: Vec<&str> = query.split('&').filter(|p| !p.is_empty()).collect();
    if params.is_empty() {
        return path.to_string();
    }
    // Stable sort on the parameter name keeps repeated names in call order
    params.sort_by_key(|p| param_name(*p));
    format!("{}?{}", path, params.join("&"))
}

fn param_name(param: &str) -> &str {
    param.split_once('=').map_or(param, |(name, _)| name)
}

impl From<&CacheKey> for Fingerprint {
    fn from(key: &CacheKey) -> Self {
        Self(key.to_string())
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
