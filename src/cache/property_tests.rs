//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store's invariants over generated operation sequences.

use proptest::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::time::Duration;

use crate::cache::{CacheKey, CacheStore, Invalidation};

// == Test Configuration ==
const TEST_DEFAULT_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
fn namespace_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("casos".to_string()),
        Just("clientes".to_string()),
        Just("usuarios".to_string()),
        "[a-z]{1,12}",
    ]
}

fn key_strategy() -> impl Strategy<Value = CacheKey> {
    (namespace_strategy(), "[a-zA-Z0-9_{}\":]{1,32}")
        .prop_map(|(ns, qualifier)| CacheKey::new(ns, qualifier).unwrap())
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: CacheKey, value: u32 },
    Get { key: CacheKey },
    Delete { key: CacheKey },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), any::<u32>()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hit and miss counters reflect exactly what `get` returned.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut store = CacheStore::unbounded(TEST_DEFAULT_TTL);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => store.set(key, value, None),
                CacheOp::Get { key } => match store.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Delete { key } => {
                    store.delete(&key);
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, store.len(), "Total entries mismatch");
    }

    // The latest `set` for a key wins and deletes are final.
    #[test]
    fn prop_store_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let mut store = CacheStore::unbounded(TEST_DEFAULT_TTL);
        let mut model = std::collections::HashMap::new();

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    store.set(key.clone(), value, None);
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(store.get(&key), model.get(&key).copied());
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(store.delete(&key), model.remove(&key).is_some());
                }
            }
        }
        prop_assert_eq!(store.len(), model.len());
    }

    // A bounded store never holds more than its capacity.
    #[test]
    fn prop_capacity_enforcement(
        keys in prop::collection::vec(key_strategy(), 1..200),
        capacity in 1usize..50
    ) {
        let mut store = CacheStore::bounded(capacity, TEST_DEFAULT_TTL);

        for (i, key) in keys.into_iter().enumerate() {
            store.set(key, i, None);
            prop_assert!(
                store.len() <= capacity,
                "Cache size {} exceeds max {}",
                store.len(),
                capacity
            );
        }
    }

    // Inserting capacity + 1 distinct keys evicts exactly the first one,
    // no matter how often the others were read in between.
    #[test]
    fn prop_fifo_eviction_victim(
        keys in prop::collection::hash_set(key_strategy(), 2..20),
        reads in prop::collection::vec(0usize..20, 0..40)
    ) {
        let keys: Vec<CacheKey> = keys.into_iter().collect();
        let (overflow, initial) = keys.split_last().unwrap();
        let capacity = initial.len();
        let mut store = CacheStore::bounded(capacity, TEST_DEFAULT_TTL);

        for (i, key) in initial.iter().enumerate() {
            store.set(key.clone(), i, None);
        }
        for index in reads {
            store.get(&initial[index % capacity]);
        }

        store.set(overflow.clone(), usize::MAX, None);

        prop_assert_eq!(store.len(), capacity);
        prop_assert!(!store.contains(&initial[0]), "Oldest key should have been evicted");
        prop_assert!(store.contains(overflow));
        for key in initial.iter().skip(1) {
            prop_assert!(store.contains(key), "Key '{}' should survive", key);
        }
    }

    // Namespace invalidation removes exactly the keys of that namespace.
    #[test]
    fn prop_namespace_invalidation_is_exact(
        keys in prop::collection::hash_set(key_strategy(), 1..40),
        target in namespace_strategy()
    ) {
        let mut store = CacheStore::unbounded(TEST_DEFAULT_TTL);
        for key in &keys {
            store.set(key.clone(), 0u8, None);
        }

        let expected = keys.iter().filter(|k| k.namespace() == target).count();
        let removed = store.invalidate(&Invalidation::namespace(target.clone()));

        prop_assert_eq!(removed, expected);
        for key in &keys {
            prop_assert_eq!(store.contains(key), key.namespace() != target);
        }
    }

    // Pattern `<ns>:.*` agrees with namespace invalidation for qualified keys.
    #[test]
    fn prop_pattern_matches_namespace(keys in prop::collection::hash_set(key_strategy(), 1..40)) {
        let mut by_pattern = CacheStore::unbounded(TEST_DEFAULT_TTL);
        let mut by_namespace = CacheStore::unbounded(TEST_DEFAULT_TTL);
        for key in &keys {
            by_pattern.set(key.clone(), 0u8, None);
            by_namespace.set(key.clone(), 0u8, None);
        }

        let a = by_pattern.invalidate_pattern("casos:.*").unwrap();
        let b = by_namespace.invalidate(&Invalidation::namespace("casos"));

        prop_assert_eq!(a, b);
        prop_assert_eq!(by_pattern.len(), by_namespace.len());
    }

    // Filter bags produce the same key regardless of member order.
    #[test]
    fn prop_list_key_ignores_member_order(
        members in prop::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..8)
    ) {
        let forward: Map<String, Value> = members
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let mut reversed = Map::new();
        for (k, v) in members.iter().rev() {
            reversed.insert(k.clone(), Value::String(v.clone()));
        }

        let a = CacheKey::list("casos", &Value::Object(forward)).unwrap();
        let b = CacheKey::list("casos", &Value::Object(reversed)).unwrap();
        prop_assert_eq!(a, b);
    }
}

// Separate proptest block with fewer cases for clock-driven tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // A value is returned strictly before t0 + ttl and never at or after it.
    #[test]
    fn prop_ttl_expiration_behavior(
        key in key_strategy(),
        ttl_ms in 1u64..100_000,
        before_ms in 0u64..100_000
    ) {
        let before_ms = before_ms % ttl_ms;
        let rt = paused_runtime();

        let (early, late) = rt.block_on(async {
            let mut store = CacheStore::unbounded(TEST_DEFAULT_TTL);
            store.set(key.clone(), "v", Some(Duration::from_millis(ttl_ms)));

            tokio::time::advance(Duration::from_millis(before_ms)).await;
            let early = store.get(&key);

            tokio::time::advance(Duration::from_millis(ttl_ms - before_ms)).await;
            let late = store.get(&key);
            (early, late)
        });

        prop_assert_eq!(early, Some("v"), "Entry should exist before TTL expires");
        prop_assert_eq!(late, None, "Entry should not be found once TTL elapsed");
    }

    // Purging removes exactly the expired entries and nothing else.
    #[test]
    fn prop_purge_removes_only_expired(
        ttls in prop::collection::vec(1u64..20, 1..30),
        elapsed in 0u64..25
    ) {
        let rt = paused_runtime();

        let (removed, survivors) = rt.block_on(async {
            let mut store = CacheStore::unbounded(TEST_DEFAULT_TTL);
            for (i, ttl) in ttls.iter().enumerate() {
                let key = CacheKey::record("casos", i).unwrap();
                store.set(key, *ttl, Some(Duration::from_secs(*ttl)));
            }

            tokio::time::advance(Duration::from_secs(elapsed)).await;
            let removed = store.purge_expired();
            (removed, store.len())
        });

        let expected_removed = ttls.iter().filter(|ttl| **ttl <= elapsed).count();
        prop_assert_eq!(removed, expected_removed);
        prop_assert_eq!(survivors, ttls.len() - expected_removed);
    }
}

#[test]
fn test_distinct_record_keys() {
    let keys: HashSet<CacheKey> = (0..100)
        .map(|i| CacheKey::record("casos", i).unwrap())
        .collect();
    assert_eq!(keys.len(), 100);
}
