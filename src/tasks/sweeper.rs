//! Expiry Sweeper
//!
//! Background task that periodically purges expired cache entries. Reads
//! never depend on it: `get` checks expiry itself, the sweeper only reclaims
//! memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::cache::CacheStore;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Spawns a background task that purges expired entries every `interval`.
///
/// The first sweep runs one interval after start. Each sweep runs in its own
/// task; if it panics the failure is logged and the next tick proceeds.
/// Abort the returned handle to stop sweeping.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RwLock::new(CacheStore::<String>::unbounded(Duration::from_secs(300))));
/// let sweeper = spawn_expiry_sweeper(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_expiry_sweeper<V>(
    cache: Arc<RwLock<CacheStore<V>>>,
    interval: Duration,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    let interval = interval.max(MIN_SWEEP_INTERVAL);

    tokio::spawn(async move {
        info!("Starting expiry sweeper with interval of {:?}", interval);

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let store = Arc::clone(&cache);
            let sweep = tokio::spawn(async move { store.write().await.purge_expired() });

            match sweep.await {
                Ok(0) => debug!("Expiry sweep: no expired entries found"),
                Ok(removed) => info!("Expiry sweep: removed {} expired entries", removed),
                Err(err) => error!("Expiry sweep failed, retrying next tick: {}", err),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn key(raw: &str) -> CacheKey {
        CacheKey::parse(raw).unwrap()
    }

    fn shared_store<V: Clone>() -> Arc<RwLock<CacheStore<V>>> {
        Arc::new(RwLock::new(CacheStore::unbounded(Duration::from_secs(300))))
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired_entries() {
        let cache = shared_store();
        cache
            .write()
            .await
            .set(key("casos:1"), "value", Some(Duration::from_secs(1)));

        let handle = spawn_expiry_sweeper(cache.clone(), Duration::from_secs(1));

        // Entry expires at 1s, first sweep at 1s
        tokio::time::sleep(Duration::from_millis(1500)).await;

        // Checked via len, not get, so lazy expiry cannot mask the sweeper
        assert_eq!(cache.read().await.len(), 0, "Expired entry should have been swept");
        assert_eq!(cache.read().await.stats().expired, 1);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_preserves_valid_entries() {
        let cache = shared_store();
        cache
            .write()
            .await
            .set(key("casos:1"), "value", Some(Duration::from_secs(3600)));

        let handle = spawn_expiry_sweeper(cache.clone(), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(cache.write().await.get(&key("casos:1")), Some("value"));

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_can_be_aborted() {
        let cache = shared_store::<String>();

        let handle = spawn_expiry_sweeper(cache, Duration::from_secs(1));
        handle.abort();

        let result = handle.await;
        assert!(result.unwrap_err().is_cancelled());
    }

    /// Panics the first time an armed instance is dropped.
    #[derive(Clone)]
    struct Tripwire {
        armed: Arc<AtomicBool>,
    }

    impl Drop for Tripwire {
        fn drop(&mut self) {
            if self.armed.swap(false, Ordering::SeqCst) {
                panic!("tripwire dropped during sweep");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_sweep_does_not_stop_sweeper() {
        let cache = shared_store();
        {
            let mut store = cache.write().await;
            let armed = Tripwire {
                armed: Arc::new(AtomicBool::new(true)),
            };
            let inert = Tripwire {
                armed: Arc::new(AtomicBool::new(false)),
            };
            store.set(key("casos:1"), armed, Some(Duration::from_millis(500)));
            store.set(key("casos:2"), inert, Some(Duration::from_millis(500)));
        }

        let handle = spawn_expiry_sweeper(cache.clone(), Duration::from_secs(1));

        // First sweep panics, second one finishes the job
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(!handle.is_finished(), "Sweeper should survive a failed sweep");
        assert_eq!(cache.read().await.len(), 0);

        handle.abort();
    }
}
