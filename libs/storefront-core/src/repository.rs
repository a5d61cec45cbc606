//! Order and product persistence

use crate::error::Result;
use crate::models::{Order, Product};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Storage behind the order service
///
/// Orders hold product snapshots; saving a product refreshes the snapshot in
/// every order that contains it.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Every order containing a product with exactly this name
    async fn load_orders_by_product_name(&self, product_name: &str) -> Result<Vec<Order>>;

    async fn list_orders(&self) -> Result<Vec<Order>>;

    async fn find_order(&self, id: i64) -> Result<Option<Order>>;

    /// Insert (id `0`) or replace an order. Returns the stored order.
    async fn save_order(&self, order: Order) -> Result<Order>;

    /// Remove an order, returning it if it existed
    async fn delete_order(&self, id: i64) -> Result<Option<Order>>;

    async fn list_products(&self) -> Result<Vec<Product>>;

    async fn find_product(&self, id: i64) -> Result<Option<Product>>;

    /// Products for the given ids; unknown ids are skipped
    async fn find_products(&self, ids: &[i64]) -> Result<Vec<Product>>;

    /// Insert (id `0`) or replace a product. Returns the stored product.
    async fn save_product(&self, product: Product) -> Result<Product>;

    /// Remove a product, returning it if it existed
    async fn delete_product(&self, id: i64) -> Result<Option<Product>>;
}

#[derive(Debug, Default)]
struct Tables {
    orders: BTreeMap<i64, Order>,
    products: BTreeMap<i64, Product>,
    last_order_id: i64,
    last_product_id: i64,
}

/// Process-local repository
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    tables: RwLock<Tables>,
    order_queries: AtomicU64,
}

impl InMemoryOrderRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `load_orders_by_product_name` calls served
    #[must_use]
    pub fn order_queries(&self) -> u64 {
        self.order_queries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn load_orders_by_product_name(&self, product_name: &str) -> Result<Vec<Order>> {
        self.order_queries.fetch_add(1, Ordering::Relaxed);
        let tables = self.tables.read();
        Ok(tables
            .orders
            .values()
            .filter(|o| o.contains_product_named(product_name))
            .cloned()
            .collect())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.tables.read().orders.values().cloned().collect())
    }

    async fn find_order(&self, id: i64) -> Result<Option<Order>> {
        Ok(self.tables.read().orders.get(&id).cloned())
    }

    async fn save_order(&self, mut order: Order) -> Result<Order> {
        let mut tables = self.tables.write();
        if order.id == 0 {
            tables.last_order_id += 1;
            order.id = tables.last_order_id;
        } else {
            tables.last_order_id = tables.last_order_id.max(order.id);
        }
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn delete_order(&self, id: i64) -> Result<Option<Order>> {
        Ok(self.tables.write().orders.remove(&id))
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.tables.read().products.values().cloned().collect())
    }

    async fn find_product(&self, id: i64) -> Result<Option<Product>> {
        Ok(self.tables.read().products.get(&id).cloned())
    }

    async fn find_products(&self, ids: &[i64]) -> Result<Vec<Product>> {
        let tables = self.tables.read();
        Ok(ids
            .iter()
            .filter_map(|id| tables.products.get(id).cloned())
            .collect())
    }

    async fn save_product(&self, mut product: Product) -> Result<Product> {
        let mut tables = self.tables.write();
        if product.id == 0 {
            tables.last_product_id += 1;
            product.id = tables.last_product_id;
        } else {
            tables.last_product_id = tables.last_product_id.max(product.id);
        }
        tables.products.insert(product.id, product.clone());

        for order in tables.orders.values_mut() {
            let mut touched = false;
            for snapshot in order.products.iter_mut().filter(|p| p.id == product.id) {
                *snapshot = product.clone();
                touched = true;
            }
            if touched {
                order.recalculate_total_amount();
            }
        }
        Ok(product)
    }

    async fn delete_product(&self, id: i64) -> Result<Option<Product>> {
        Ok(self.tables.write().products.remove(&id))
    }
}
