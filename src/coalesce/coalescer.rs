//! Request Coalescer
//!
//! Deduplicates concurrent identical operations: while an operation for a
//! fingerprint is in flight, later callers await its shared result instead of
//! starting their own.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};

type SharedResult<V> = Shared<BoxFuture<'static, Result<V>>>;
type Registry<V> = Arc<Mutex<HashMap<String, InFlight<V>>>>;

struct InFlight<V> {
    generation: u64,
    result: SharedResult<V>,
}

// == Coalescer Stats ==
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoalescerStats {
    /// Physical operations started
    pub executions: u64,
    /// Callers that attached to an operation already in flight
    pub joined: u64,
    /// Operations currently in flight
    pub in_flight: usize,
}

// == Request Coalescer ==
pub struct RequestCoalescer<V> {
    inflight: Registry<V>,
    next_generation: AtomicU64,
    executions: AtomicU64,
    joined: AtomicU64,
}

impl<V> RequestCoalescer<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            executions: AtomicU64::new(0),
            joined: AtomicU64::new(0),
        }
    }

    // == Coalesce ==
    /// Runs `factory`'s operation unless one with the same fingerprint is in
    /// flight, in which case its result is shared.
    ///
    /// The operation runs as its own task, so it finishes and deregisters
    /// even if every caller stops waiting. Deregistration happens before any
    /// waiter sees the result; a later call starts a fresh attempt.
    pub async fn coalesce<F, Fut>(&self, fingerprint: impl Into<String>, factory: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        self.join_or_start(fingerprint.into(), factory).await
    }

    /// Like [`coalesce`](Self::coalesce) but gives up waiting after `timeout`.
    ///
    /// The operation itself is not cancelled.
    pub async fn coalesce_with_timeout<F, Fut>(
        &self,
        fingerprint: impl Into<String>,
        timeout: Duration,
        factory: F,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let fingerprint = fingerprint.into();
        let shared = self.join_or_start(fingerprint.clone(), factory);
        match tokio::time::timeout(timeout, shared).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%fingerprint, ?timeout, "gave up waiting for coalesced operation");
                Err(CacheError::Timeout(timeout))
            }
        }
    }

    fn join_or_start<F, Fut>(&self, fingerprint: String, factory: F) -> SharedResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let mut inflight = self.inflight.lock();

        if let Some(existing) = inflight.get(&fingerprint) {
            self.joined.fetch_add(1, Ordering::Relaxed);
            debug!(%fingerprint, "joined in-flight operation");
            return existing.result.clone();
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel::<Result<V>>();
        let waiting_on = fingerprint.clone();
        let result = async move {
            rx.await.unwrap_or_else(|_| {
                Err(CacheError::fetch(anyhow::anyhow!(
                    "operation for '{}' ended without a result",
                    waiting_on
                )))
            })
        }
        .boxed()
        .shared();

        inflight.insert(
            fingerprint.clone(),
            InFlight {
                generation,
                result: result.clone(),
            },
        );
        drop(inflight);

        // Registered first, started second. The guard exists before the
        // factory runs so a panicking factory cannot leak the registration.
        let guard = Deregister {
            registry: Arc::clone(&self.inflight),
            fingerprint: fingerprint.clone(),
            generation,
        };
        let operation = factory();
        tokio::spawn(async move {
            let outcome = operation.await;
            drop(guard);
            let _ = tx.send(outcome);
        });

        self.executions.fetch_add(1, Ordering::Relaxed);
        debug!(%fingerprint, generation, "started operation");
        result
    }

    // == Introspection ==
    pub fn is_in_flight(&self, fingerprint: &str) -> bool {
        self.inflight.lock().contains_key(fingerprint)
    }

    pub fn in_flight_count(&self) -> usize {
        self.inflight.lock().len()
    }

    pub fn stats(&self) -> CoalescerStats {
        CoalescerStats {
            executions: self.executions.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
            in_flight: self.in_flight_count(),
        }
    }
}

impl<V> Default for RequestCoalescer<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for RequestCoalescer<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoalescer")
            .field("in_flight", &self.inflight.lock().len())
            .field("executions", &self.executions.load(Ordering::Relaxed))
            .finish()
    }
}

/// Removes the registration when the operation settles, panics or is dropped.
struct Deregister<V> {
    registry: Registry<V>,
    fingerprint: String,
    generation: u64,
}

impl<V> Drop for Deregister<V> {
    fn drop(&mut self) {
        let mut inflight = self.registry.lock();
        // A newer registration under the same fingerprint is not ours to remove
        if inflight
            .get(&self.fingerprint)
            .is_some_and(|entry| entry.generation == self.generation)
        {
            inflight.remove(&self.fingerprint);
        }
    }
}
