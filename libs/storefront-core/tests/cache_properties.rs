//! Property tests for the eviction policies
//!
//! Random operation sequences are replayed against the cache and the bounds
//! are checked after every step.

use proptest::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use storefront_core::EvictingCache;

#[derive(Debug, Clone)]
enum Op {
    Put(u8, u32),
    Get(u8),
    Invalidate(u8),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0u8..16, 1u32..64).prop_map(|(k, v)| Op::Put(k, v)),
        3 => (0u8..16).prop_map(Op::Get),
        2 => (0u8..16).prop_map(Op::Invalidate),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    #[test]
    fn lru_never_exceeds_capacity(capacity in 1usize..8, ops in prop::collection::vec(op_strategy(), 1..200)) {
        let cache: EvictingCache<u8, u32> = EvictingCache::lru(capacity);
        for op in ops {
            match op {
                Op::Put(k, v) => {
                    cache.put(k, v);
                    prop_assert!(cache.contains(&k));
                }
                Op::Get(k) => {
                    cache.get(&k);
                }
                Op::Invalidate(k) => {
                    cache.invalidate(&k);
                    prop_assert!(cache.get(&k).is_none());
                }
                Op::Clear => {
                    cache.clear();
                    prop_assert!(cache.is_empty());
                }
            }
            prop_assert!(cache.len() <= capacity);
        }
    }

    #[test]
    fn lru_matches_reference_model(capacity in 1usize..6, ops in prop::collection::vec(op_strategy(), 1..150)) {
        let cache: EvictingCache<u8, u32> = EvictingCache::lru(capacity);
        // Front is least recently used.
        let mut model: VecDeque<(u8, u32)> = VecDeque::new();

        for op in ops {
            match op {
                Op::Put(k, v) => {
                    model.retain(|(key, _)| *key != k);
                    model.push_back((k, v));
                    if model.len() > capacity {
                        model.pop_front();
                    }
                    cache.put(k, v);
                }
                Op::Get(k) => {
                    let expected = model.iter().position(|(key, _)| *key == k).map(|i| {
                        let entry = model.remove(i).unwrap();
                        model.push_back(entry);
                        entry.1
                    });
                    prop_assert_eq!(cache.get(&k), expected);
                }
                Op::Invalidate(k) => {
                    model.retain(|(key, _)| *key != k);
                    cache.invalidate(&k);
                }
                Op::Clear => {
                    model.clear();
                    cache.clear();
                }
            }
            prop_assert_eq!(cache.len(), model.len());
        }
    }

    #[test]
    fn size_policy_stays_within_budget(budget in 1u64..200, ops in prop::collection::vec(op_strategy(), 1..200)) {
        let cache: EvictingCache<u8, u32> =
            EvictingCache::size_bounded(budget, Arc::new(|_: &u8, v: &u32| u64::from(*v)));
        let mut live: HashMap<u8, u32> = HashMap::new();

        for op in ops {
            match op {
                Op::Put(k, v) => {
                    let evicted = cache.put(k, v);
                    live.insert(k, v);
                    for key in evicted {
                        live.remove(&key);
                    }
                }
                Op::Get(k) => {
                    prop_assert_eq!(cache.get(&k), live.get(&k).copied());
                }
                Op::Invalidate(k) => {
                    live.remove(&k);
                    cache.invalidate(&k);
                    prop_assert!(cache.get(&k).is_none());
                }
                Op::Clear => {
                    live.clear();
                    cache.clear();
                }
            }
            let used: u64 = live.values().map(|v| u64::from(*v)).sum();
            prop_assert!(used <= budget);
            prop_assert_eq!(cache.stats().estimated_bytes, used);
            prop_assert_eq!(cache.len(), live.len());
        }
    }
}
