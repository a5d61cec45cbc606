//! Storefront Core - order caching and background log extraction
//!
//! # Features
//!
//! - **Bounded Order Cache**: orders keyed by product name, evicted by
//!   least-recent use or by an estimated byte budget
//! - **Write Invalidation**: every order/product write drops the cached lists
//!   it may have made stale
//! - **Scheduled Sweep**: a periodic full clear bounding staleness
//! - **Log Extraction Tasks**: asynchronous, restart-tolerant extraction of log
//!   lines in a time range
//!
//! # Quick Start
//!
//! ```no_run
//! use storefront_core::{StorefrontConfig, Storefront, StorefrontError};
//!
//! # async fn example() -> Result<(), StorefrontError> {
//! let storefront = Storefront::start(StorefrontConfig::default())?;
//!
//! let from = storefront_common::parse_timestamp("2024-01-01 00:00:00").unwrap();
//! let to = storefront_common::parse_timestamp("2024-01-01 23:59:59").unwrap();
//! let id = storefront.tasks().create_task(from, to);
//! let status = storefront.tasks().wait_for(&id).await?;
//! println!("Task {id} finished with {status}");
//!
//! storefront.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Crate Features
//!
//! - `test-utils`: Enable test utilities (for testing only)

pub mod app;
pub mod cache;
pub mod cache_invalidation;
pub mod config;
pub mod error;
pub mod models;
pub mod order_cache;
pub mod repository;
pub mod service;
pub mod sweeper;
pub mod tasks;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use app::Storefront;
pub use cache::{
    CacheConfig, CacheEntry, CacheStats, EvictingCache, EvictionPolicy, EvictionPolicyKind,
    LruPolicy, SizePolicy, Weigher,
};
pub use cache_invalidation::{
    CacheInvalidationPolicy, InvalidationConfig, InvalidationEvent, InvalidationStats,
    MutationKind, OrderMutation,
};
pub use config::{ConfigLoader, LoggingConfig, StorefrontConfig};
pub use error::{Result, StorefrontError};
pub use models::{LogTask, Order, Product, TaskStatus, TimeRange};
pub use order_cache::OrderCache;
pub use repository::{InMemoryOrderRepository, OrderRepository};
pub use service::OrderService;
pub use sweeper::ScheduledSweeper;
pub use tasks::{
    extract_by_date, extract_range, ExtractionSummary, Extractor, FileExtractor, TaskConfig,
    TaskManager, TaskRunner, TaskStore,
};
