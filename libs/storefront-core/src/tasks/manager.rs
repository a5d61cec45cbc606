//! Create/status/result facade over the task store and runner

use super::runner::TaskRunner;
use super::store::TaskStore;
use super::TaskConfig;
use crate::error::Result;
use crate::models::{LogTask, TaskStatus, TimeRange};
use chrono::NaiveDateTime;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Asynchronous log extraction service
pub struct TaskManager {
    store: Arc<TaskStore>,
    runner: TaskRunner,
}

impl TaskManager {
    /// Open the result directory, recover finished tasks from it and start
    /// the workers.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory cannot be created or listed.
    pub fn start(config: &TaskConfig) -> Result<Self> {
        let store = Arc::new(TaskStore::open(&config.output_dir)?);
        let runner = TaskRunner::start(Arc::clone(&store), config);
        Ok(Self { store, runner })
    }

    /// Build a manager from an existing store and runner
    #[must_use]
    pub fn from_parts(store: Arc<TaskStore>, runner: TaskRunner) -> Self {
        Self { store, runner }
    }

    /// Register a task for `[from, to]` and queue it. Returns immediately
    /// with the new id; the task is `PENDING` until a worker finishes it.
    pub fn create_task(&self, from: NaiveDateTime, to: NaiveDateTime) -> String {
        let task = self.store.create(TimeRange::new(from, to));
        info!("Created log task {} for {} .. {}", task.id, from, to);
        self.runner.submit(&task);
        task.id
    }

    /// Status of a task, `None` when the id is unknown
    #[must_use]
    pub fn status(&self, id: &str) -> Option<TaskStatus> {
        self.store.status(id)
    }

    /// Result file of a `DONE` task
    #[must_use]
    pub fn result_path(&self, id: &str) -> Option<PathBuf> {
        self.store.result_path(id)
    }

    #[must_use]
    pub fn task(&self, id: &str) -> Option<LogTask> {
        self.store.get(id)
    }

    #[must_use]
    pub fn tasks(&self) -> Vec<LogTask> {
        self.store.list()
    }

    /// Wait until the task is `DONE` or `ERROR`
    ///
    /// # Errors
    ///
    /// `TaskNotFound` if the id is unknown.
    pub async fn wait_for(&self, id: &str) -> Result<TaskStatus> {
        self.store.wait_for(id).await
    }

    #[must_use]
    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// Stop the workers; see [`TaskRunner::shutdown`]
    pub async fn shutdown(&mut self) {
        self.runner.shutdown().await;
    }
}
