//! Cached Operations
//!
//! Read-through: check the store, coalesce the miss, populate, return.
//! Write-through: run the mutation, then invalidate what it made stale.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheStore, Invalidation};
use crate::coalesce::{Fingerprint, RequestCoalescer};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_expiry_sweeper;

// == TTL Policy ==
/// Kind of read, used to pick a TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationClass {
    /// Filtered collections; stale sooner under concurrent writes
    List,
    /// By-id lookups
    Detail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub list: Duration,
    pub detail: Duration,
}

impl TtlPolicy {
    pub fn ttl_for(&self, class: OperationClass) -> Duration {
        match class {
            OperationClass::List => self.list,
            OperationClass::Detail => self.detail,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            list: Duration::from_secs(120),
            detail: Duration::from_secs(600),
        }
    }
}

// == Write Outcome ==
/// Result of a successful write.
#[derive(Debug)]
pub struct WriteOutcome<T> {
    /// What the mutation returned
    pub value: T,
    /// Entries removed by invalidation
    pub removed: usize,
    /// Invalidations that could not be applied; cached data may be stale until TTL
    pub stale: Vec<CacheError>,
}

impl<T> WriteOutcome<T> {
    pub fn is_fully_invalidated(&self) -> bool {
        self.stale.is_empty()
    }
}

// == Cached Operation ==
/// Cloneable handle over one store and its coalescer.
#[derive(Debug)]
pub struct CachedOperation<V> {
    store: Arc<RwLock<CacheStore<V>>>,
    coalescer: Arc<RequestCoalescer<V>>,
    ttl_policy: TtlPolicy,
    fetch_timeout: Option<Duration>,
}

impl<V> Clone for CachedOperation<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            coalescer: Arc::clone(&self.coalescer),
            ttl_policy: self.ttl_policy,
            fetch_timeout: self.fetch_timeout,
        }
    }
}

impl<V> CachedOperation<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    pub fn new(store: CacheStore<V>) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            coalescer: Arc::new(RequestCoalescer::new()),
            ttl_policy: TtlPolicy::default(),
            fetch_timeout: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let operation =
            Self::new(CacheStore::from_config(config)).with_ttl_policy(config.ttl_policy());
        match config.fetch_timeout() {
            Some(timeout) => operation.with_fetch_timeout(timeout),
            None => operation,
        }
    }

    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    /// Callers stop waiting for a fetch after `timeout`. Zero means no limit.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout).filter(|timeout| !timeout.is_zero());
        self
    }

    // == Accessors ==
    pub fn store(&self) -> &Arc<RwLock<CacheStore<V>>> {
        &self.store
    }

    pub fn coalescer(&self) -> &Arc<RequestCoalescer<V>> {
        &self.coalescer
    }

    pub fn ttl_for(&self, class: OperationClass) -> Duration {
        self.ttl_policy.ttl_for(class)
    }

    // == Read Path ==
    /// Returns the cached value for `key`, fetching and caching it on a miss.
    ///
    /// Concurrent misses on the same key share one fetch. Failures are
    /// returned to every waiter and never cached.
    pub async fn cached_read<F, Fut>(&self, key: &CacheKey, ttl: Duration, fetcher: F) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        self.read_through(key, ttl, self.fetch_timeout, fetcher).await
    }

    pub async fn cached_read_with_timeout<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        timeout: Duration,
        fetcher: F,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        self.read_through(key, ttl, Some(timeout), fetcher).await
    }

    /// Read with the TTL configured for the operation class.
    pub async fn cached_read_class<F, Fut>(
        &self,
        key: &CacheKey,
        class: OperationClass,
        fetcher: F,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        self.cached_read(key, self.ttl_for(class), fetcher).await
    }

    async fn read_through<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        timeout: Option<Duration>,
        fetcher: F,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let (cached, epoch) = {
            let mut store = self.store.write().await;
            (store.get(key), store.epoch())
        };
        if let Some(value) = cached {
            debug!(key = %key, "cache hit");
            return Ok(value);
        }
        debug!(key = %key, "cache miss");

        let store = Arc::clone(&self.store);
        let owned_key = key.clone();
        let factory = move || async move {
            let value = fetcher().await.map_err(CacheError::fetch)?;
            store
                .write()
                .await
                .set_if_epoch(owned_key, value.clone(), Some(ttl), epoch);
            Ok(value)
        };

        let fingerprint = Fingerprint::from(key);
        match timeout {
            Some(timeout) => {
                self.coalescer
                    .coalesce_with_timeout(fingerprint, timeout, factory)
                    .await
            }
            None => self.coalescer.coalesce(fingerprint, factory).await,
        }
    }

    // == Write Path ==
    /// Runs `mutation`, then applies every invalidation.
    ///
    /// A failed mutation invalidates nothing. Invalidation never fails the
    /// write; problems are reported in [`WriteOutcome::stale`].
    pub async fn cached_write<T, F, Fut>(
        &self,
        mutation: F,
        invalidations: &[Invalidation],
    ) -> Result<WriteOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.write_through(mutation, invalidations, Vec::new()).await
    }

    /// [`cached_write`](Self::cached_write) with regex patterns, e.g.
    /// `["casos:42", "casos:list:.*"]`.
    pub async fn cached_write_patterns<T, F, Fut>(
        &self,
        mutation: F,
        patterns: &[&str],
    ) -> Result<WriteOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut invalidations = Vec::with_capacity(patterns.len());
        let mut stale = Vec::new();
        for pattern in patterns {
            match Invalidation::pattern(pattern) {
                Ok(invalidation) => invalidations.push(invalidation),
                Err(err) => stale.push(err),
            }
        }
        self.write_through(mutation, &invalidations, stale).await
    }

    async fn write_through<T, F, Fut>(
        &self,
        mutation: F,
        invalidations: &[Invalidation],
        stale: Vec<CacheError>,
    ) -> Result<WriteOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let value = mutation().await.map_err(|err| {
            warn!(error = %err, "mutation failed, cache left untouched");
            CacheError::fetch(err)
        })?;

        let removed = self.invalidate(invalidations).await;
        for err in &stale {
            warn!(error = %err, "write succeeded but cache may be stale");
        }

        Ok(WriteOutcome {
            value,
            removed,
            stale,
        })
    }

    // == Invalidation ==
    pub async fn invalidate(&self, invalidations: &[Invalidation]) -> usize {
        let mut store = self.store.write().await;
        let removed: usize = invalidations
            .iter()
            .map(|invalidation| store.invalidate(invalidation))
            .sum();
        if !invalidations.is_empty() {
            info!(count = invalidations.len(), removed, "applied invalidations");
        }
        removed
    }

    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        self.store.write().await.invalidate_pattern(pattern)
    }

    // == Lifecycle ==
    /// Drops every entry, e.g. on logout or shutdown.
    pub async fn clear(&self) -> usize {
        let removed = self.store.write().await.clear();
        info!(removed, "cache cleared");
        removed
    }

    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        spawn_expiry_sweeper(Arc::clone(&self.store), interval)
    }
}
