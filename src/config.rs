//! Configuration Module
//!
//! Handles loading cache and server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::operation::TtlPolicy;

/// Cache layer configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries, None = unbounded (server variant)
    pub max_entries: Option<usize>,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// TTL in seconds for list queries
    pub list_ttl: u64,
    /// TTL in seconds for by-id lookups
    pub detail_ttl: u64,
    /// Expiry sweeper interval in seconds
    pub sweep_interval: u64,
    /// How long a caller waits for a coalesced fetch, in seconds, 0 = no limit
    pub fetch_timeout: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Entry cap, unset or 0 = unbounded (default: unbounded)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_LIST_TTL` - List query TTL in seconds (default: 120)
    /// - `CACHE_DETAIL_TTL` - Detail lookup TTL in seconds (default: 600)
    /// - `CACHE_SWEEP_INTERVAL` - Sweeper cadence in seconds (default: 60)
    /// - `CACHE_FETCH_TIMEOUT` - Fetch wait limit in seconds, 0 = no limit (default: 30)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_var::<usize>("CACHE_MAX_ENTRIES").filter(|n| *n > 0),
            default_ttl: env_var("CACHE_DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            list_ttl: env_var("CACHE_LIST_TTL").unwrap_or(defaults.list_ttl),
            detail_ttl: env_var("CACHE_DETAIL_TTL").unwrap_or(defaults.detail_ttl),
            sweep_interval: env_var("CACHE_SWEEP_INTERVAL")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.sweep_interval),
            fetch_timeout: env_var("CACHE_FETCH_TIMEOUT").unwrap_or(defaults.fetch_timeout),
            server_port: env_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    /// None when fetch waits are unlimited.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(self.fetch_timeout)).filter(|timeout| !timeout.is_zero())
    }

    /// Per-operation-class TTLs.
    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy {
            list: Duration::from_secs(self.list_ttl),
            detail: Duration::from_secs(self.detail_ttl),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: None,
            default_ttl: 300,
            list_ttl: 120,
            detail_ttl: 600,
            sweep_interval: 60,
            fetch_timeout: 30,
            server_port: 3000,
        }
    }
}

fn env_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
