//! Periodic full clear of the order cache
//!
//! Pure LRU never expires a key that keeps getting read, so a recurring timer
//! clears the whole cache on a fixed period regardless of traffic. A skipped
//! or late sweep only widens the staleness window.

use crate::order_cache::OrderCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

/// Background task clearing the cache every `period`
pub struct ScheduledSweeper {
    period: Duration,
    sweeps: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledSweeper {
    /// Start sweeping. The first sweep fires one full period from now.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(cache: Arc<OrderCache>, period: Duration) -> Self {
        let sweeps = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&sweeps);

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let removed = cache.clear();
                counter.fetch_add(1, Ordering::Relaxed);
                info!("Scheduled sweep cleared {} order cache entries", removed);
            }
        });

        info!("Order cache sweeper started with period {:?}", period);
        Self {
            period,
            sweeps,
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of sweeps performed so far
    #[must_use]
    pub fn sweep_count(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the timer. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Order cache sweeper stopped");
        }
    }
}

impl Drop for ScheduledSweeper {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
