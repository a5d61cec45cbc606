//! Order and product operations with cache maintenance
//!
//! Reads by product name go through the order cache. Every write is applied
//! to the repository first and then handed to the invalidation policy, so
//! when a write call returns no cached list predating it is left behind.

use crate::cache_invalidation::{CacheInvalidationPolicy, OrderMutation};
use crate::error::{Result, StorefrontError};
use crate::models::{Order, Product};
use crate::order_cache::OrderCache;
use crate::repository::OrderRepository;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Name no product may carry, compared case-insensitively
pub const RESERVED_PRODUCT_NAME: &str = "Test";

/// Order/product service backed by an [`OrderRepository`]
pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
    invalidation: Arc<CacheInvalidationPolicy>,
}

impl OrderService {
    #[must_use]
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        invalidation: Arc<CacheInvalidationPolicy>,
    ) -> Self {
        Self {
            repository,
            invalidation,
        }
    }

    fn cache(&self) -> &OrderCache {
        self.invalidation.cache()
    }

    /// Orders containing the named product, served from the cache when
    /// possible
    ///
    /// # Errors
    ///
    /// Propagates repository errors; nothing is cached in that case.
    pub async fn find_orders_by_product_name(&self, product_name: &str) -> Result<Vec<Order>> {
        let repository = Arc::clone(&self.repository);
        self.cache()
            .get_or_load(product_name, || async move {
                repository.load_orders_by_product_name(product_name).await
            })
            .await
    }

    /// Drop every cached order list
    pub fn clear_orders_cache(&self) -> usize {
        let removed = self.cache().clear();
        info!("Order cache cleared on request ({} entries)", removed);
        removed
    }

    /// # Errors
    ///
    /// Propagates repository errors.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        self.repository.list_orders().await
    }

    /// # Errors
    ///
    /// Propagates repository errors.
    pub async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        self.repository.find_order(id).await
    }

    async fn resolve_products(&self, product_ids: &[i64]) -> Result<Vec<Product>> {
        let ids: Vec<i64> = product_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Err(StorefrontError::validation(
                "an order must contain at least one product",
            ));
        }

        let products = self.repository.find_products(&ids).await?;
        if products.len() != ids.len() {
            return Err(StorefrontError::validation(
                "one or more products were not found",
            ));
        }
        Ok(products)
    }

    /// Create an order from existing products
    ///
    /// # Errors
    ///
    /// `Validation` if no product ids are given or any id is unknown.
    pub async fn create_order(
        &self,
        customer_name: impl Into<String>,
        product_ids: &[i64],
    ) -> Result<Order> {
        let products = self.resolve_products(product_ids).await?;
        let order = self
            .repository
            .save_order(Order::new(0, customer_name, products))
            .await?;

        self.invalidation.apply(&OrderMutation::OrderCreated {
            product_names: order.product_names(),
        });
        debug!("Created order {}", order.id);
        Ok(order)
    }

    /// Replace the customer and product set of an order. `None` if the order
    /// does not exist.
    ///
    /// # Errors
    ///
    /// `Validation` if no product ids are given or any id is unknown.
    pub async fn update_order(
        &self,
        id: i64,
        customer_name: impl Into<String>,
        product_ids: &[i64],
    ) -> Result<Option<Order>> {
        let Some(mut order) = self.repository.find_order(id).await? else {
            return Ok(None);
        };
        let products = self.resolve_products(product_ids).await?;

        let before = order.product_names();
        order.customer_name = customer_name.into();
        order.products = products;
        order.recalculate_total_amount();
        let order = self.repository.save_order(order).await?;

        self.invalidation.apply(&OrderMutation::OrderUpdated {
            before,
            after: order.product_names(),
        });
        Ok(Some(order))
    }

    /// Delete an order. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Propagates repository errors.
    pub async fn delete_order(&self, id: i64) -> Result<bool> {
        let Some(order) = self.repository.delete_order(id).await? else {
            return Ok(false);
        };
        self.invalidation.apply(&OrderMutation::OrderDeleted {
            product_names: order.product_names(),
        });
        Ok(true)
    }

    /// Add a product to an order. `None` if either does not exist.
    ///
    /// # Errors
    ///
    /// Propagates repository errors.
    pub async fn add_product_to_order(
        &self,
        order_id: i64,
        product_id: i64,
    ) -> Result<Option<Order>> {
        let Some(product) = self.repository.find_product(product_id).await? else {
            return Ok(None);
        };
        let Some(mut order) = self.repository.find_order(order_id).await? else {
            return Ok(None);
        };

        if !order.products.iter().any(|p| p.id == product.id) {
            order.products.push(product.clone());
        }
        order.recalculate_total_amount();
        let order = self.repository.save_order(order).await?;

        self.invalidation.apply(&OrderMutation::ProductAddedToOrder {
            product_name: product.name,
        });
        Ok(Some(order))
    }

    /// Remove a product from an order. `None` if the order does not exist.
    ///
    /// # Errors
    ///
    /// Propagates repository errors.
    pub async fn remove_product_from_order(
        &self,
        order_id: i64,
        product_id: i64,
    ) -> Result<Option<Order>> {
        let Some(mut order) = self.repository.find_order(order_id).await? else {
            return Ok(None);
        };

        let removed = order
            .products
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| p.name.clone());
        order.products.retain(|p| p.id != product_id);
        order.recalculate_total_amount();
        let order = self.repository.save_order(order).await?;

        if let Some(product_name) = removed {
            self.invalidation
                .apply(&OrderMutation::ProductRemovedFromOrder { product_name });
        }
        Ok(Some(order))
    }

    /// # Errors
    ///
    /// Propagates repository errors.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.repository.list_products().await
    }

    /// # Errors
    ///
    /// Propagates repository errors.
    pub async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        self.repository.find_product(id).await
    }

    fn validate_product(name: &str, price: f64) -> Result<()> {
        if name.trim().is_empty() {
            return Err(StorefrontError::validation("product name must not be empty"));
        }
        if name.eq_ignore_ascii_case(RESERVED_PRODUCT_NAME) {
            return Err(StorefrontError::validation(format!(
                "a product cannot be named '{RESERVED_PRODUCT_NAME}'"
            )));
        }
        if !price.is_finite() || price < 0.0 {
            return Err(StorefrontError::validation(
                "product price must be a non-negative number",
            ));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `Validation` for an empty or reserved name or a negative price.
    pub async fn create_product(&self, name: impl Into<String>, price: f64) -> Result<Product> {
        let name = name.into();
        Self::validate_product(&name, price)?;
        self.repository
            .save_product(Product { id: 0, name, price })
            .await
    }

    /// Rename and/or reprice a product. Orders containing it are refreshed
    /// by the repository, and the cached lists of every product in those
    /// orders are dropped. `None` if the product does not exist.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty or reserved name or a negative price.
    pub async fn update_product(
        &self,
        id: i64,
        name: impl Into<String>,
        price: f64,
    ) -> Result<Option<Product>> {
        let name = name.into();
        Self::validate_product(&name, price)?;
        let Some(existing) = self.repository.find_product(id).await? else {
            return Ok(None);
        };
        // Orders holding the product get their snapshot and total rewritten,
        // so lists cached under any of their products go stale too.
        let co_product_names: BTreeSet<String> = self
            .repository
            .list_orders()
            .await?
            .iter()
            .filter(|o| o.products.iter().any(|p| p.id == id))
            .flat_map(Order::product_names)
            .collect();

        let saved = self
            .repository
            .save_product(Product { id, name, price })
            .await?;
        self.invalidation.apply(&OrderMutation::ProductUpdated {
            old_name: existing.name,
            new_name: saved.name.clone(),
            co_product_names: co_product_names.into_iter().collect(),
        });
        Ok(Some(saved))
    }

    /// Delete a product no order references. Returns `false` if it did not
    /// exist.
    ///
    /// # Errors
    ///
    /// `ProductInUse` if any order still contains the product.
    pub async fn delete_product(&self, id: i64) -> Result<bool> {
        let Some(product) = self.repository.find_product(id).await? else {
            return Ok(false);
        };
        let in_use = self
            .repository
            .list_orders()
            .await?
            .iter()
            .any(|o| o.products.iter().any(|p| p.id == id));
        if in_use {
            return Err(StorefrontError::ProductInUse { name: product.name });
        }

        self.repository.delete_product(id).await?;
        self.invalidation.apply(&OrderMutation::ProductDeleted {
            product_name: product.name,
        });
        Ok(true)
    }
}
