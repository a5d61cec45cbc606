//! Task index backed by the result directory

use crate::error::{Result, StorefrontError};
use crate::models::{LogTask, TaskStatus, TimeRange};
use dashmap::DashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use storefront_common::{result_file_name, task_id_from_file_name};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Concurrent id → task map
///
/// Every status transition bumps a change counter that [`TaskStore::wait_for`]
/// listens on.
pub struct TaskStore {
    tasks: DashMap<String, LogTask>,
    output_dir: PathBuf,
    changes: watch::Sender<u64>,
}

impl TaskStore {
    /// Open the store over `output_dir`, creating the directory if needed and
    /// rebuilding the index from the result files it already holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or listed.
    pub fn open(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Self::index(output_dir)
    }

    /// Open the store over an output directory that must already exist.
    /// Nothing is created on disk.
    ///
    /// # Errors
    ///
    /// `Io` with `NotFound` if `output_dir` is not a directory, or if it
    /// cannot be listed.
    pub fn open_existing(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        if !output_dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("output directory {} does not exist", output_dir.display()),
            )
            .into());
        }
        Self::index(output_dir)
    }

    fn index(output_dir: PathBuf) -> Result<Self> {
        let (changes, _) = watch::channel(0);
        let store = Self {
            tasks: DashMap::new(),
            output_dir,
            changes,
        };
        let recovered = store.recover()?;
        info!(
            "Task store opened at {} with {} recovered tasks",
            store.output_dir.display(),
            recovered
        );
        Ok(store)
    }

    /// Register every `log_<id>.txt` file in the output directory as a `DONE`
    /// task. Ids already known are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn recover(&self) -> Result<usize> {
        let mut recovered = 0;
        for entry in fs::read_dir(&self.output_dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let file_name = entry.file_name();
            let Some(id) = file_name.to_str().and_then(task_id_from_file_name) else {
                continue;
            };
            if self.tasks.contains_key(id) {
                continue;
            }
            debug!("Recovered task {} from {}", id, entry.path().display());
            self.tasks
                .insert(id.to_string(), LogTask::recovered(id, entry.path()));
            recovered += 1;
        }
        if recovered > 0 {
            self.notify();
        }
        Ok(recovered)
    }

    /// Register a new `PENDING` task with a fresh id
    pub fn create(&self, range: TimeRange) -> LogTask {
        let task = LogTask::pending(Uuid::new_v4().to_string(), range);
        self.tasks.insert(task.id.clone(), task.clone());
        self.notify();
        task
    }

    /// Snapshot of a task
    #[must_use]
    pub fn get(&self, id: &str) -> Option<LogTask> {
        self.tasks.get(id).map(|t| t.clone())
    }

    #[must_use]
    pub fn status(&self, id: &str) -> Option<TaskStatus> {
        self.tasks.get(id).map(|t| t.status)
    }

    /// Result file of a task, only once it is `DONE`
    #[must_use]
    pub fn result_path(&self, id: &str) -> Option<PathBuf> {
        self.tasks.get(id).and_then(|t| match t.status {
            TaskStatus::Done => t.file_path.clone(),
            _ => None,
        })
    }

    /// Where the result file for `id` is written
    #[must_use]
    pub fn result_file_path(&self, id: &str) -> PathBuf {
        self.output_dir.join(result_file_name(id))
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Move a `PENDING` task to `DONE`. Returns `false` if the task is unknown
    /// or already terminal.
    pub fn mark_done(&self, id: &str, path: PathBuf) -> bool {
        self.transition(id, |task| {
            task.status = TaskStatus::Done;
            task.file_path = Some(path);
        })
    }

    /// Move a `PENDING` task to `ERROR`. Returns `false` if the task is
    /// unknown or already terminal.
    pub fn mark_failed(&self, id: &str, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        self.transition(id, |task| {
            task.status = TaskStatus::Error;
            task.error = Some(reason);
        })
    }

    fn transition(&self, id: &str, apply: impl FnOnce(&mut LogTask)) -> bool {
        let changed = match self.tasks.get_mut(id) {
            Some(mut task) if task.status == TaskStatus::Pending => {
                apply(&mut *task);
                true
            }
            _ => false,
        };
        if changed {
            self.notify();
        }
        changed
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }

    /// Receiver bumped on every change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Snapshot of all tasks, newest first
    #[must_use]
    pub fn list(&self) -> Vec<LogTask> {
        let mut tasks: Vec<LogTask> = self.tasks.iter().map(|t| t.value().clone()).collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        tasks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait until the task reaches a terminal status
    ///
    /// # Errors
    ///
    /// `TaskNotFound` if the id is unknown.
    pub async fn wait_for(&self, id: &str) -> Result<TaskStatus> {
        let mut changes = self.subscribe();
        loop {
            match self.status(id) {
                None => {
                    return Err(StorefrontError::TaskNotFound { id: id.to_string() });
                }
                Some(status) if status.is_terminal() => return Ok(status),
                Some(_) => {}
            }
            // The sender lives in `self`, so this only fails once the store is gone.
            if changes.changed().await.is_err() {
                return Err(StorefrontError::TaskNotFound { id: id.to_string() });
            }
        }
    }
}
