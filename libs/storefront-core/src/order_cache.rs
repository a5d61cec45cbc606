//! Read-through cache of orders keyed by product name

use crate::cache::{CacheConfig, CacheStats, EvictingCache, EvictionPolicyKind};
use crate::models::Order;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Orders containing a product, cached by the product's exact name
pub struct OrderCache {
    cache: EvictingCache<String, Vec<Order>>,
}

impl OrderCache {
    /// Create a cache running the policy selected in `config`
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let cache = match config.policy {
            EvictionPolicyKind::Lru => EvictingCache::lru(config.max_entries),
            EvictionPolicyKind::Size => {
                let weight = config.order_weight_bytes;
                EvictingCache::size_bounded(
                    config.max_bytes,
                    Arc::new(move |_: &String, orders: &Vec<Order>| {
                        weight.saturating_mul(orders.len() as u64)
                    }),
                )
            }
        };
        info!(
            "Order cache created with {} eviction policy",
            cache.policy_name()
        );
        Self { cache }
    }

    /// Create a cache with default configuration
    #[must_use]
    pub fn new_default() -> Self {
        Self::new(&CacheConfig::default())
    }

    /// Get orders from cache or fetch if not cached.
    ///
    /// A loader result is only cached if no invalidation or clear happened
    /// while it was running, so a write that completes during a slow load is
    /// never masked by the pre-write result.
    ///
    /// # Errors
    ///
    /// Returns the loader's error unchanged; nothing is cached in that case.
    pub async fn get_or_load<F, Fut, E>(
        &self,
        product_name: &str,
        loader: F,
    ) -> std::result::Result<Vec<Order>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Vec<Order>, E>>,
    {
        let key = product_name.to_string();
        if let Some(orders) = self.cache.get(&key) {
            debug!("Order cache hit for product '{}'", product_name);
            return Ok(orders);
        }

        debug!("Order cache miss for product '{}', loading", product_name);
        let generation = self.cache.generation();
        let orders = loader().await?;
        if self.cache.put_if_generation(key, orders.clone(), generation) {
            debug!(
                "Cached {} orders for product '{}'",
                orders.len(),
                product_name
            );
        }
        Ok(orders)
    }

    /// Cached orders for a product, if present
    #[must_use]
    pub fn get(&self, product_name: &str) -> Option<Vec<Order>> {
        self.cache.get(&product_name.to_string())
    }

    /// Store orders for a product, replacing any previous entry
    pub fn put(&self, product_name: &str, orders: Vec<Order>) {
        let count = orders.len();
        self.cache.put(product_name.to_string(), orders);
        debug!("Cached {} orders for product '{}'", count, product_name);
    }

    /// Whether a product name is cached
    #[must_use]
    pub fn contains(&self, product_name: &str) -> bool {
        self.cache.contains(&product_name.to_string())
    }

    /// Drop the entry for a product name. Absent keys are a no-op.
    pub fn invalidate(&self, product_name: &str) -> bool {
        let removed = self.cache.invalidate(&product_name.to_string());
        if removed {
            info!("Invalidated order cache for product '{}'", product_name);
        }
        removed
    }

    /// Drop every entry
    pub fn clear(&self) -> usize {
        let removed = self.cache.clear();
        info!("Cleared order cache ({} entries)", removed);
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    #[must_use]
    pub fn policy_name(&self) -> &'static str {
        self.cache.policy_name()
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
