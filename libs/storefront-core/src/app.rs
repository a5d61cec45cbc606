//! Composition root owning every long-lived component

use crate::cache_invalidation::CacheInvalidationPolicy;
use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::order_cache::OrderCache;
use crate::repository::OrderRepository;
use crate::service::OrderService;
use crate::sweeper::ScheduledSweeper;
use crate::tasks::TaskManager;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Running storefront: order cache, its sweeper and the log task manager
///
/// Components are created in [`Storefront::start`] and torn down in
/// [`Storefront::shutdown`].
pub struct Storefront {
    config: StorefrontConfig,
    cache: Arc<OrderCache>,
    invalidation: Arc<CacheInvalidationPolicy>,
    sweeper: Option<ScheduledSweeper>,
    tasks: TaskManager,
}

impl Storefront {
    /// Validate `config` and start all components.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the task output
    /// directory cannot be opened.
    pub fn start(config: StorefrontConfig) -> Result<Self> {
        config.validate()?;

        let cache = Arc::new(OrderCache::new(&config.cache));
        let invalidation = Arc::new(CacheInvalidationPolicy::new_default(Arc::clone(&cache)));
        let sweeper = config.cache.sweep_enabled.then(|| {
            ScheduledSweeper::start(
                Arc::clone(&cache),
                Duration::from_secs(config.cache.sweep_interval_secs),
            )
        });
        let tasks = TaskManager::start(&config.tasks)?;

        info!(
            "Storefront started ({} cache policy, {} task workers)",
            cache.policy_name(),
            config.tasks.workers
        );
        Ok(Self {
            config,
            cache,
            invalidation,
            sweeper,
            tasks,
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<OrderCache> {
        &self.cache
    }

    #[must_use]
    pub fn invalidation(&self) -> &Arc<CacheInvalidationPolicy> {
        &self.invalidation
    }

    #[must_use]
    pub fn sweeper(&self) -> Option<&ScheduledSweeper> {
        self.sweeper.as_ref()
    }

    #[must_use]
    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    /// Order service over `repository` sharing this storefront's cache
    #[must_use]
    pub fn order_service(&self, repository: Arc<dyn OrderRepository>) -> OrderService {
        OrderService::new(repository, Arc::clone(&self.invalidation))
    }

    /// Stop the sweeper and the task workers
    pub async fn shutdown(mut self) {
        if let Some(sweeper) = self.sweeper.as_mut() {
            sweeper.stop();
        }
        self.tasks.shutdown().await;
        info!("Storefront stopped");
    }
}
