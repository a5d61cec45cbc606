//! Bounded in-memory cache with a pluggable eviction policy
//!
//! [`EvictingCache`] keeps its key map, the policy's ordering structure and the
//! running cost under one mutex, so recency updates and "evict while over
//! budget" are atomic with respect to concurrent callers. Exactly one policy is
//! active per cache:
//!
//! - [`LruPolicy`]: at most `max_entries` keys, evicting the least recently
//!   used one. `get` and `put` both refresh recency.
//! - [`SizePolicy`]: a byte budget over per-entry estimated costs, evicting in
//!   insertion order while the running total exceeds the budget. Reads do not
//!   reorder entries.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use storefront_common::{
    DEFAULT_MAX_CACHE_BYTES, DEFAULT_MAX_CACHE_ENTRIES, DEFAULT_ORDER_WEIGHT_BYTES,
    DEFAULT_SWEEP_INTERVAL_SECS,
};
use tracing::debug;

/// Which eviction policy a cache runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicyKind {
    /// Count-bounded least-recently-used
    Lru,
    /// Byte-budget-bounded, evicting in insertion order
    Size,
}

impl std::str::FromStr for EvictionPolicyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lru" => Ok(Self::Lru),
            "size" => Ok(Self::Size),
            other => Err(format!("unknown eviction policy: {other}")),
        }
    }
}

/// Order cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Active eviction policy
    pub policy: EvictionPolicyKind,
    /// Maximum number of entries (LRU policy)
    pub max_entries: usize,
    /// Maximum estimated bytes (size policy)
    pub max_bytes: u64,
    /// Estimated cost of one cached order
    pub order_weight_bytes: u64,
    /// Run the periodic full sweep
    pub sweep_enabled: bool,
    /// Period of the full sweep in seconds
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            policy: EvictionPolicyKind::Lru,
            max_entries: DEFAULT_MAX_CACHE_ENTRIES,
            max_bytes: DEFAULT_MAX_CACHE_BYTES,
            order_weight_bytes: DEFAULT_ORDER_WEIGHT_BYTES,
            sweep_enabled: true,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

/// Decides which entry goes when the cache is over its bound.
///
/// Every hook is called with the cache lock held.
pub trait EvictionPolicy<K>: Send {
    /// A key was inserted or fully replaced with the given estimated cost
    fn on_insert(&mut self, key: &K, cost: u64);

    /// A key was read
    fn on_access(&mut self, key: &K);

    /// A key left the cache for any reason
    fn on_remove(&mut self, key: &K);

    /// Whether the tracked entries exceed the configured bound
    fn over_budget(&self) -> bool;

    /// Next key to evict
    fn victim(&self) -> Option<K>;

    /// Forget every tracked key
    fn clear(&mut self);

    /// Running estimated cost of the tracked entries
    fn used_bytes(&self) -> u64 {
        0
    }

    /// Policy name for logs
    fn name(&self) -> &'static str;
}

/// Keys ordered by a monotonically increasing sequence number
#[derive(Debug)]
struct SequenceOrder<K> {
    next_seq: u64,
    by_seq: BTreeMap<u64, K>,
    seq_of: HashMap<K, u64>,
}

impl<K: Eq + Hash + Clone> SequenceOrder<K> {
    fn new() -> Self {
        Self {
            next_seq: 0,
            by_seq: BTreeMap::new(),
            seq_of: HashMap::new(),
        }
    }

    /// Move `key` to the back, inserting it if absent
    fn touch(&mut self, key: &K) {
        if let Some(old) = self.seq_of.get(key) {
            self.by_seq.remove(old);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_seq.insert(seq, key.clone());
        self.seq_of.insert(key.clone(), seq);
    }

    fn remove(&mut self, key: &K) {
        if let Some(seq) = self.seq_of.remove(key) {
            self.by_seq.remove(&seq);
        }
    }

    fn front(&self) -> Option<&K> {
        self.by_seq.values().next()
    }

    fn len(&self) -> usize {
        self.seq_of.len()
    }

    fn clear(&mut self) {
        self.by_seq.clear();
        self.seq_of.clear();
    }
}

/// Count-bounded least-recently-used policy
#[derive(Debug)]
pub struct LruPolicy<K> {
    max_entries: usize,
    order: SequenceOrder<K>,
}

impl<K: Eq + Hash + Clone> LruPolicy<K> {
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            order: SequenceOrder::new(),
        }
    }
}

impl<K: Eq + Hash + Clone + Send> EvictionPolicy<K> for LruPolicy<K> {
    fn on_insert(&mut self, key: &K, _cost: u64) {
        self.order.touch(key);
    }

    fn on_access(&mut self, key: &K) {
        self.order.touch(key);
    }

    fn on_remove(&mut self, key: &K) {
        self.order.remove(key);
    }

    fn over_budget(&self) -> bool {
        self.order.len() > self.max_entries
    }

    fn victim(&self) -> Option<K> {
        self.order.front().cloned()
    }

    fn clear(&mut self) {
        self.order.clear();
    }

    fn name(&self) -> &'static str {
        "lru"
    }
}

/// Byte-budget policy evicting in insertion order
#[derive(Debug)]
pub struct SizePolicy<K> {
    max_bytes: u64,
    order: SequenceOrder<K>,
    costs: HashMap<K, u64>,
    used: u64,
}

impl<K: Eq + Hash + Clone> SizePolicy<K> {
    #[must_use]
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            order: SequenceOrder::new(),
            costs: HashMap::new(),
            used: 0,
        }
    }
}

impl<K: Eq + Hash + Clone + Send> EvictionPolicy<K> for SizePolicy<K> {
    fn on_insert(&mut self, key: &K, cost: u64) {
        if let Some(old) = self.costs.insert(key.clone(), cost) {
            self.used = self.used.saturating_sub(old);
        }
        self.used = self.used.saturating_add(cost);
        self.order.touch(key);
    }

    fn on_access(&mut self, _key: &K) {}

    fn on_remove(&mut self, key: &K) {
        if let Some(cost) = self.costs.remove(key) {
            self.used = self.used.saturating_sub(cost);
        }
        self.order.remove(key);
    }

    fn over_budget(&self) -> bool {
        self.used > self.max_bytes
    }

    fn victim(&self) -> Option<K> {
        self.order.front().cloned()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.costs.clear();
        self.used = 0;
    }

    fn used_bytes(&self) -> u64 {
        self.used
    }

    fn name(&self) -> &'static str {
        "size"
    }
}

/// Estimates the cost of an entry
pub type Weigher<K, V> = Arc<dyn Fn(&K, &V) -> u64 + Send + Sync>;

/// A cached value with its bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub cost: u64,
    pub inserted_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u64,
}

impl<V> CacheEntry<V> {
    fn new(value: V, cost: u64) -> Self {
        let now = Utc::now();
        Self {
            value,
            cost,
            inserted_at: now,
            last_accessed: now,
            access_count: 0,
        }
    }

    fn record_access(&mut self) {
        self.access_count += 1;
        self.last_accessed = Utc::now();
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
    pub estimated_bytes: u64,
    pub evictions: u64,
    pub invalidations: u64,
    pub clears: u64,
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn calculate_hit_rate(&mut self) {
        let total = self.hits + self.misses;
        self.hit_rate = if total > 0 {
            #[allow(clippy::cast_precision_loss)]
            {
                self.hits as f64 / total as f64
            }
        } else {
            0.0
        };
    }
}

struct CacheInner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    policy: Box<dyn EvictionPolicy<K>>,
    generation: u64,
    stats: CacheStats,
}

impl<K, V> CacheInner<K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    fn insert(&mut self, key: K, value: V, cost: u64) -> Vec<K> {
        self.policy.on_insert(&key, cost);
        self.entries.insert(key, CacheEntry::new(value, cost));

        let mut evicted = Vec::new();
        while self.policy.over_budget() {
            let Some(victim) = self.policy.victim() else {
                break;
            };
            self.policy.on_remove(&victim);
            self.entries.remove(&victim);
            self.stats.evictions += 1;
            evicted.push(victim);
        }
        evicted
    }
}

/// Bounded key/value store guarded by a single lock
pub struct EvictingCache<K, V> {
    inner: Mutex<CacheInner<K, V>>,
    weigher: Weigher<K, V>,
}

impl<K, V> EvictingCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    V: Clone,
{
    /// Create a cache with an explicit policy and weigher
    #[must_use]
    pub fn new(policy: Box<dyn EvictionPolicy<K>>, weigher: Weigher<K, V>) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                policy,
                generation: 0,
                stats: CacheStats::default(),
            }),
            weigher,
        }
    }

    /// Count-bounded LRU cache holding at most `max_entries` keys
    #[must_use]
    pub fn lru(max_entries: usize) -> Self {
        Self::new(
            Box::new(LruPolicy::new(max_entries)),
            Arc::new(|_: &K, _: &V| 1_u64),
        )
    }

    /// Size-bounded FIFO cache with the given byte budget
    #[must_use]
    pub fn size_bounded(max_bytes: u64, weigher: Weigher<K, V>) -> Self {
        Self::new(Box::new(SizePolicy::new(max_bytes)), weigher)
    }

    /// Look up a key, refreshing its recency on a hit
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let value = inner.entries.get_mut(key).map(|entry| {
            entry.record_access();
            entry.value.clone()
        });
        if value.is_some() {
            inner.policy.on_access(key);
            inner.stats.hits += 1;
        } else {
            inner.stats.misses += 1;
        }
        value
    }

    /// Whether a key is cached. Does not count as an access.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Insert or fully replace a value, then evict while over budget.
    ///
    /// Returns the evicted keys. A single value larger than the whole budget
    /// evicts itself.
    pub fn put(&self, key: K, value: V) -> Vec<K> {
        let cost = (self.weigher)(&key, &value);
        let mut inner = self.inner.lock();
        let evicted = inner.insert(key, value, cost);
        drop(inner);

        for key in &evicted {
            debug!("Evicted cache entry {:?}", key);
        }
        evicted
    }

    /// Insert only if no invalidation or clear happened since `generation`
    /// was read. Returns whether the value was stored.
    pub fn put_if_generation(&self, key: K, value: V, generation: u64) -> bool {
        let cost = (self.weigher)(&key, &value);
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!("Skipped populating {:?}: invalidated during load", key);
            return false;
        }
        let evicted = inner.insert(key, value, cost);
        drop(inner);

        for key in &evicted {
            debug!("Evicted cache entry {:?}", key);
        }
        true
    }

    /// Remove a key. Returns `false` when it was not cached.
    pub fn invalidate(&self, key: &K) -> bool {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        if inner.entries.remove(key).is_some() {
            inner.policy.on_remove(key);
            inner.stats.invalidations += 1;
            true
        } else {
            false
        }
    }

    /// Remove every entry. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        let removed = inner.entries.len();
        inner.entries.clear();
        inner.policy.clear();
        inner.stats.clears += 1;
        removed
    }

    /// Counter bumped by every invalidation and clear
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Snapshot of the cached keys, in no particular order
    pub fn keys(&self) -> Vec<K> {
        self.inner.lock().entries.keys().cloned().collect()
    }

    /// Name of the active eviction policy
    pub fn policy_name(&self) -> &'static str {
        self.inner.lock().policy.name()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats.clone();
        stats.entries = inner.entries.len() as u64;
        stats.estimated_bytes = inner.policy.used_bytes();
        stats.calculate_hit_rate();
        stats
    }

    /// Reset hit/miss/eviction counters
    pub fn reset_stats(&self) {
        self.inner.lock().stats = CacheStats::default();
    }
}
