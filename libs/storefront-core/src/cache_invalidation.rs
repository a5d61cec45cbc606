//! Invalidation of cached order lists on writes
//!
//! The order cache is keyed by product name, so every write that can change
//! which orders contain a product (or what those orders look like) must drop
//! the entries for each affected name before the write is acknowledged.
//! [`OrderMutation::affected_product_names`] enumerates those names and
//! [`CacheInvalidationPolicy::apply`] evicts them.

use crate::order_cache::OrderCache;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// A write that may leave cached order lists stale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderMutation {
    /// A new order was created with these products
    OrderCreated { product_names: Vec<String> },
    /// An order's product set changed from `before` to `after`
    OrderUpdated {
        before: Vec<String>,
        after: Vec<String>,
    },
    /// An order with these products was deleted
    OrderDeleted { product_names: Vec<String> },
    /// A product was added to an existing order
    ProductAddedToOrder { product_name: String },
    /// A product was removed from an existing order
    ProductRemovedFromOrder { product_name: String },
    /// A product was renamed and/or repriced. `co_product_names` holds every
    /// product name of the orders containing it, whose snapshots and totals
    /// were rewritten with it.
    ProductUpdated {
        old_name: String,
        new_name: String,
        co_product_names: Vec<String>,
    },
    /// A product was deleted
    ProductDeleted { product_name: String },
}

/// Kind of mutation behind an invalidation event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    OrderCreated,
    OrderUpdated,
    OrderDeleted,
    ProductAddedToOrder,
    ProductRemovedFromOrder,
    ProductUpdated,
    ProductDeleted,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationKind::OrderCreated => write!(f, "OrderCreated"),
            MutationKind::OrderUpdated => write!(f, "OrderUpdated"),
            MutationKind::OrderDeleted => write!(f, "OrderDeleted"),
            MutationKind::ProductAddedToOrder => write!(f, "ProductAddedToOrder"),
            MutationKind::ProductRemovedFromOrder => write!(f, "ProductRemovedFromOrder"),
            MutationKind::ProductUpdated => write!(f, "ProductUpdated"),
            MutationKind::ProductDeleted => write!(f, "ProductDeleted"),
        }
    }
}

impl OrderMutation {
    #[must_use]
    pub fn kind(&self) -> MutationKind {
        match self {
            OrderMutation::OrderCreated { .. } => MutationKind::OrderCreated,
            OrderMutation::OrderUpdated { .. } => MutationKind::OrderUpdated,
            OrderMutation::OrderDeleted { .. } => MutationKind::OrderDeleted,
            OrderMutation::ProductAddedToOrder { .. } => MutationKind::ProductAddedToOrder,
            OrderMutation::ProductRemovedFromOrder { .. } => MutationKind::ProductRemovedFromOrder,
            OrderMutation::ProductUpdated { .. } => MutationKind::ProductUpdated,
            OrderMutation::ProductDeleted { .. } => MutationKind::ProductDeleted,
        }
    }

    /// Every product name whose cached order list may now be stale.
    ///
    /// An order update covers both the old and the new product set. A product
    /// update covers the old name, which still holds the pre-write list, the
    /// new name, which may hold a cached empty list, and every other product
    /// sharing an order with it.
    #[must_use]
    pub fn affected_product_names(&self) -> BTreeSet<String> {
        match self {
            OrderMutation::OrderCreated { product_names }
            | OrderMutation::OrderDeleted { product_names } => {
                product_names.iter().cloned().collect()
            }
            OrderMutation::OrderUpdated { before, after } => {
                before.iter().chain(after.iter()).cloned().collect()
            }
            OrderMutation::ProductAddedToOrder { product_name }
            | OrderMutation::ProductRemovedFromOrder { product_name }
            | OrderMutation::ProductDeleted { product_name } => {
                BTreeSet::from([product_name.clone()])
            }
            OrderMutation::ProductUpdated {
                old_name,
                new_name,
                co_product_names,
            } => co_product_names
                .iter()
                .chain([old_name, new_name])
                .cloned()
                .collect(),
        }
    }
}

/// Record of one applied invalidation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationEvent {
    pub event_id: Uuid,
    pub kind: MutationKind,
    /// Names the mutation affected
    pub affected_keys: Vec<String>,
    /// Names that were actually cached and got removed
    pub removed_keys: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Invalidation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationConfig {
    /// Maximum number of events to keep in history
    pub max_events: usize,
    /// Event retention duration
    pub event_retention: Duration,
}

impl Default for InvalidationConfig {
    fn default() -> Self {
        Self {
            max_events: 1000,
            event_retention: Duration::from_secs(3600), // 1 hour
        }
    }
}

/// Invalidation statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvalidationStats {
    pub total_events: u64,
    pub keys_removed: u64,
    pub keys_absent: u64,
    pub last_invalidation: Option<DateTime<Utc>>,
}

/// Applies [`OrderMutation`]s to the order cache
pub struct CacheInvalidationPolicy {
    cache: Arc<OrderCache>,
    events: RwLock<VecDeque<InvalidationEvent>>,
    config: InvalidationConfig,
    stats: RwLock<InvalidationStats>,
}

impl CacheInvalidationPolicy {
    #[must_use]
    pub fn new(cache: Arc<OrderCache>, config: InvalidationConfig) -> Self {
        Self {
            cache,
            events: RwLock::new(VecDeque::new()),
            config,
            stats: RwLock::new(InvalidationStats::default()),
        }
    }

    /// Create a policy with default configuration
    #[must_use]
    pub fn new_default(cache: Arc<OrderCache>) -> Self {
        Self::new(cache, InvalidationConfig::default())
    }

    /// Evict every cache entry the mutation may have made stale.
    ///
    /// Returns once all affected entries are gone; callers must not
    /// acknowledge the write before this returns.
    pub fn apply(&self, mutation: &OrderMutation) -> InvalidationEvent {
        let affected = mutation.affected_product_names();
        let removed: Vec<String> = affected
            .iter()
            .filter(|name| self.cache.invalidate(name))
            .cloned()
            .collect();

        let event = InvalidationEvent {
            event_id: Uuid::new_v4(),
            kind: mutation.kind(),
            affected_keys: affected.into_iter().collect(),
            removed_keys: removed,
            timestamp: Utc::now(),
        };

        {
            let mut stats = self.stats.write();
            stats.total_events += 1;
            stats.keys_removed += event.removed_keys.len() as u64;
            stats.keys_absent += (event.affected_keys.len() - event.removed_keys.len()) as u64;
            stats.last_invalidation = Some(event.timestamp);
        }
        self.store_event(&event);

        debug!(
            "Processed {} invalidation: {} affected, {} removed",
            event.kind,
            event.affected_keys.len(),
            event.removed_keys.len()
        );
        event
    }

    /// The cache this policy invalidates
    #[must_use]
    pub fn cache(&self) -> &Arc<OrderCache> {
        &self.cache
    }

    /// Get invalidation statistics
    #[must_use]
    pub fn stats(&self) -> InvalidationStats {
        self.stats.read().clone()
    }

    /// Most recent events, newest first
    #[must_use]
    pub fn recent_events(&self, limit: usize) -> Vec<InvalidationEvent> {
        let events = self.events.read();
        events.iter().rev().take(limit).cloned().collect()
    }

    fn store_event(&self, event: &InvalidationEvent) {
        let mut events = self.events.write();
        events.push_back(event.clone());

        while events.len() > self.config.max_events {
            events.pop_front();
        }

        let cutoff_time = Utc::now()
            - chrono::Duration::from_std(self.config.event_retention).unwrap_or_default();
        events.retain(|event| event.timestamp > cutoff_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_order_created_affects_all_products() {
        let mutation = OrderMutation::OrderCreated {
            product_names: names(&["Laptop", "Mouse"]),
        };
        assert_eq!(mutation.affected_product_names(), set(&["Laptop", "Mouse"]));
        assert_eq!(mutation.kind(), MutationKind::OrderCreated);
    }

    #[test]
    fn test_order_updated_affects_union_of_old_and_new() {
        let mutation = OrderMutation::OrderUpdated {
            before: names(&["Laptop", "Mouse"]),
            after: names(&["Mouse", "Keyboard"]),
        };
        assert_eq!(
            mutation.affected_product_names(),
            set(&["Keyboard", "Laptop", "Mouse"])
        );
    }

    #[test]
    fn test_product_update_affects_old_and_new_name() {
        let mutation = OrderMutation::ProductUpdated {
            old_name: "Old".to_string(),
            new_name: "New".to_string(),
            co_product_names: vec![],
        };
        assert_eq!(mutation.affected_product_names(), set(&["New", "Old"]));

        let repriced = OrderMutation::ProductUpdated {
            old_name: "Same".to_string(),
            new_name: "Same".to_string(),
            co_product_names: names(&["Same"]),
        };
        assert_eq!(repriced.affected_product_names(), set(&["Same"]));
    }

    #[test]
    fn test_product_update_affects_co_products() {
        let mutation = OrderMutation::ProductUpdated {
            old_name: "Laptop".to_string(),
            new_name: "Notebook".to_string(),
            co_product_names: names(&["Laptop", "Mouse", "Keyboard"]),
        };
        assert_eq!(
            mutation.affected_product_names(),
            set(&["Keyboard", "Laptop", "Mouse", "Notebook"])
        );
    }

    #[test]
    fn test_single_product_mutations() {
        for mutation in [
            OrderMutation::ProductAddedToOrder {
                product_name: "Laptop".to_string(),
            },
            OrderMutation::ProductRemovedFromOrder {
                product_name: "Laptop".to_string(),
            },
            OrderMutation::ProductDeleted {
                product_name: "Laptop".to_string(),
            },
        ] {
            assert_eq!(mutation.affected_product_names(), set(&["Laptop"]));
        }
    }

    #[test]
    fn test_apply_removes_cached_entries() {
        let cache = Arc::new(OrderCache::new_default());
        cache.put("Laptop", vec![]);
        cache.put("Mouse", vec![]);
        cache.put("Monitor", vec![]);
        let policy = CacheInvalidationPolicy::new_default(Arc::clone(&cache));

        let event = policy.apply(&OrderMutation::OrderCreated {
            product_names: names(&["Laptop", "Mouse", "Keyboard"]),
        });

        assert_eq!(event.removed_keys, names(&["Laptop", "Mouse"]));
        assert_eq!(event.affected_keys.len(), 3);
        assert!(!cache.contains("Laptop"));
        assert!(!cache.contains("Mouse"));
        assert!(cache.contains("Monitor"));

        let stats = policy.stats();
        assert_eq!(stats.total_events, 1);
        assert_eq!(stats.keys_removed, 2);
        assert_eq!(stats.keys_absent, 1);
        assert!(stats.last_invalidation.is_some());
    }

    #[test]
    fn test_apply_on_absent_keys_is_noop() {
        let cache = Arc::new(OrderCache::new_default());
        let policy = CacheInvalidationPolicy::new_default(Arc::clone(&cache));

        let event = policy.apply(&OrderMutation::ProductDeleted {
            product_name: "Ghost".to_string(),
        });
        assert!(event.removed_keys.is_empty());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_event_history_is_bounded() {
        let cache = Arc::new(OrderCache::new_default());
        let config = InvalidationConfig {
            max_events: 3,
            ..InvalidationConfig::default()
        };
        let policy = CacheInvalidationPolicy::new(cache, config);

        for i in 0..5 {
            policy.apply(&OrderMutation::ProductDeleted {
                product_name: format!("p{i}"),
            });
        }

        let events = policy.recent_events(10);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].affected_keys, names(&["p4"]));
        assert_eq!(policy.recent_events(1).len(), 1);
    }

    #[test]
    fn test_mutation_kind_display() {
        assert_eq!(MutationKind::ProductUpdated.to_string(), "ProductUpdated");
        assert_eq!(MutationKind::OrderDeleted.to_string(), "OrderDeleted");
    }
}
