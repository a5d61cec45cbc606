//! Background log extraction tasks
//!
//! - [`TaskStore`] owns the id → task index and rebuilds it from result files
//!   on startup.
//! - [`TaskRunner`] executes queued tasks on a pool of workers and moves each
//!   one from `PENDING` to exactly one of `DONE` or `ERROR`.
//! - [`TaskManager`] ties both together behind the create/status/result API.

pub mod extract;
pub mod manager;
pub mod runner;
pub mod store;

pub use extract::{extract_by_date, extract_range, ExtractionSummary, Extractor, FileExtractor};
pub use manager::TaskManager;
pub use runner::TaskRunner;
pub use store::TaskStore;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use storefront_common::{
    DEFAULT_INITIAL_DELAY_MS, DEFAULT_OUTPUT_DIR, DEFAULT_SOURCE_LOG, DEFAULT_TASK_WORKERS,
};

/// Log extraction task configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Application log the tasks read from
    pub source_log: PathBuf,
    /// Directory holding result files
    pub output_dir: PathBuf,
    /// Artificial delay before each task starts reading
    pub initial_delay_ms: u64,
    /// Number of concurrent workers
    pub workers: usize,
}

impl TaskConfig {
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            source_log: PathBuf::from(DEFAULT_SOURCE_LOG),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            workers: DEFAULT_TASK_WORKERS,
        }
    }
}
