//! Worker pool executing extraction tasks

use super::extract::{Extractor, FileExtractor};
use super::store::TaskStore;
use super::TaskConfig;
use crate::error::StorefrontError;
use crate::models::{LogTask, TimeRange};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug)]
struct Job {
    id: String,
    range: TimeRange,
}

#[derive(Clone)]
struct WorkerContext {
    store: Arc<TaskStore>,
    extractor: Arc<dyn Extractor>,
    source: PathBuf,
    initial_delay: Duration,
    queue: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>,
}

/// Bounded pool of workers draining a shared job queue
///
/// Submitting never blocks; jobs beyond the worker count wait in the queue.
pub struct TaskRunner {
    store: Arc<TaskStore>,
    queue: Option<mpsc::UnboundedSender<Job>>,
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl TaskRunner {
    /// Spawn `config.workers` workers running [`FileExtractor`].
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(store: Arc<TaskStore>, config: &TaskConfig) -> Self {
        Self::with_extractor(store, config, Arc::new(FileExtractor))
    }

    /// Spawn `config.workers` workers running `extractor`
    #[must_use]
    pub fn with_extractor(
        store: Arc<TaskStore>,
        config: &TaskConfig,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        let context = WorkerContext {
            store: Arc::clone(&store),
            extractor,
            source: config.source_log.clone(),
            initial_delay: config.initial_delay(),
            queue: Arc::new(Mutex::new(receiver)),
        };

        let worker_count = config.workers.max(1);
        let workers = (0..worker_count)
            .map(|worker| tokio::spawn(run_worker(worker, context.clone(), shutdown.subscribe())))
            .collect();

        info!("Task runner started with {} workers", worker_count);
        Self {
            store,
            queue: Some(sender),
            shutdown,
            workers,
        }
    }

    /// Queue a `PENDING` task for execution.
    ///
    /// After shutdown the task is failed immediately.
    pub fn submit(&self, task: &LogTask) {
        let Some(range) = task.range else {
            warn!("Task {} has no range and cannot be executed", task.id);
            return;
        };
        let job = Job {
            id: task.id.clone(),
            range,
        };

        let rejected = match &self.queue {
            Some(queue) => queue.send(job).err().map(|e| e.0),
            None => Some(job),
        };
        if let Some(job) = rejected {
            let cause = StorefrontError::ExecutionInterrupted { id: job.id.clone() };
            self.store.mark_failed(&job.id, cause.to_string());
            warn!("Task {} rejected: runner is shut down", job.id);
        }
    }

    /// Number of worker tasks still alive
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.workers.iter().filter(|w| !w.is_finished()).count()
    }

    /// Stop accepting jobs and wait for the workers to exit.
    ///
    /// Queued jobs and jobs still in their initial delay end in `ERROR`; jobs
    /// already reading the source run to completion.
    pub async fn shutdown(&mut self) {
        if self.queue.take().is_none() && self.workers.is_empty() {
            return;
        }
        self.shutdown.send_replace(true);

        for worker in self.workers.drain(..) {
            if let Err(e) = worker.await {
                error!("Task worker terminated abnormally: {}", e);
            }
        }
        info!("Task runner stopped");
    }
}

impl Drop for TaskRunner {
    // Workers drain the queue on their own once the sender is gone.
    fn drop(&mut self) {
        self.queue.take();
        self.shutdown.send_replace(true);
    }
}

async fn run_worker(worker: usize, context: WorkerContext, shutdown: watch::Receiver<bool>) {
    debug!("Task worker {} started", worker);
    loop {
        let job = context.queue.lock().await.recv().await;
        let Some(job) = job else { break };
        execute(&context, shutdown.clone(), job).await;
    }
    debug!("Task worker {} stopped", worker);
}

/// Resolves once shutdown is signalled. A dropped sender counts as shutdown.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[instrument(skip(context, shutdown, job), fields(task_id = %job.id))]
async fn execute(context: &WorkerContext, mut shutdown: watch::Receiver<bool>, job: Job) {
    let already_stopped = *shutdown.borrow();
    let interrupted = already_stopped
        || tokio::select! {
            () = tokio::time::sleep(context.initial_delay) => false,
            () = stopped(&mut shutdown) => true,
        };
    if interrupted {
        let cause = StorefrontError::ExecutionInterrupted { id: job.id.clone() };
        context.store.mark_failed(&job.id, cause.to_string());
        warn!("Task {} interrupted before reading the source", job.id);
        return;
    }

    info!("Extracting {} .. {}", job.range.from, job.range.to);
    let destination = context.store.result_file_path(&job.id);
    let extractor = Arc::clone(&context.extractor);
    let source = context.source.clone();
    let target = destination.clone();
    let range = job.range;

    let outcome =
        tokio::spawn(async move { extractor.extract(&source, &target, &range).await }).await;

    match outcome {
        Ok(Ok(summary)) => {
            context.store.mark_done(&job.id, destination);
            info!(
                "Task {} done: {} lines kept, {} out of range, {} malformed",
                job.id, summary.kept, summary.out_of_range, summary.malformed
            );
        }
        Ok(Err(e)) => {
            context.store.mark_failed(&job.id, e.to_string());
            error!("Task {} failed: {}", job.id, e);
        }
        Err(join_error) => {
            let cause = StorefrontError::TaskPanicked { id: job.id.clone() };
            context.store.mark_failed(&job.id, cause.to_string());
            error!("Task {} aborted: {}", job.id, join_error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use crate::tasks::ExtractionSummary;
    use crate::test_utils::{sample_log_lines, write_log_file};
    use async_trait::async_trait;
    use std::path::Path;
    use storefront_common::parse_timestamp;
    use tempfile::TempDir;

    struct PanickingExtractor;

    #[async_trait]
    impl Extractor for PanickingExtractor {
        async fn extract(
            &self,
            _source: &Path,
            _destination: &Path,
            _range: &TimeRange,
        ) -> crate::Result<ExtractionSummary> {
            panic!("extractor exploded");
        }
    }

    fn config(dir: &Path, delay_ms: u64) -> TaskConfig {
        TaskConfig {
            source_log: dir.join("app.log"),
            output_dir: dir.join("generated"),
            initial_delay_ms: delay_ms,
            workers: 2,
        }
    }

    fn range() -> TimeRange {
        TimeRange::new(
            parse_timestamp("2024-01-01 00:00:02").unwrap(),
            parse_timestamp("2024-01-01 00:00:04").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_runner_completes_task() {
        let dir = TempDir::new().unwrap();
        write_log_file(dir.path(), &sample_log_lines());
        let config = config(dir.path(), 0);
        let store = Arc::new(TaskStore::open(&config.output_dir).unwrap());
        let mut runner = TaskRunner::start(Arc::clone(&store), &config);

        let task = store.create(range());
        runner.submit(&task);

        assert_eq!(store.wait_for(&task.id).await.unwrap(), TaskStatus::Done);
        let path = store.result_path(&task.id).unwrap();
        assert_eq!(path, store.result_file_path(&task.id));
        assert_eq!(std::fs::read_to_string(path).unwrap().lines().count(), 3);

        runner.shutdown().await;
    }

    #[tokio::test]
    async fn test_runner_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path(), 0);
        let store = Arc::new(TaskStore::open(&config.output_dir).unwrap());
        let mut runner = TaskRunner::start(Arc::clone(&store), &config);

        let task = store.create(range());
        runner.submit(&task);

        assert_eq!(store.wait_for(&task.id).await.unwrap(), TaskStatus::Error);
        assert!(store.result_path(&task.id).is_none());
        assert!(!store.result_file_path(&task.id).exists());
        let error = store.get(&task.id).unwrap().error.unwrap();
        assert!(error.contains("Source log unavailable"));

        runner.shutdown().await;
    }

    #[tokio::test]
    async fn test_panicking_job_is_isolated() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path(), 0);
        let store = Arc::new(TaskStore::open(&config.output_dir).unwrap());
        let mut runner =
            TaskRunner::with_extractor(Arc::clone(&store), &config, Arc::new(PanickingExtractor));

        let first = store.create(range());
        let second = store.create(range());
        runner.submit(&first);
        runner.submit(&second);

        assert_eq!(store.wait_for(&first.id).await.unwrap(), TaskStatus::Error);
        assert_eq!(store.wait_for(&second.id).await.unwrap(), TaskStatus::Error);
        assert!(store
            .get(&first.id)
            .unwrap()
            .error
            .unwrap()
            .contains("panicked"));
        assert_eq!(runner.active_workers(), 2);

        runner.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_delayed_tasks() {
        let dir = TempDir::new().unwrap();
        write_log_file(dir.path(), &sample_log_lines());
        let config = config(dir.path(), 60_000);
        let store = Arc::new(TaskStore::open(&config.output_dir).unwrap());
        let mut runner = TaskRunner::start(Arc::clone(&store), &config);

        let tasks: Vec<LogTask> = (0..4).map(|_| store.create(range())).collect();
        for task in &tasks {
            runner.submit(task);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        runner.shutdown().await;

        for task in &tasks {
            assert_eq!(store.status(&task.id), Some(TaskStatus::Error));
            assert!(!store.result_file_path(&task.id).exists());
        }
        assert_eq!(runner.active_workers(), 0);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails_task() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path(), 0);
        let store = Arc::new(TaskStore::open(&config.output_dir).unwrap());
        let mut runner = TaskRunner::start(Arc::clone(&store), &config);
        runner.shutdown().await;
        runner.shutdown().await;

        let task = store.create(range());
        runner.submit(&task);

        assert_eq!(store.status(&task.id), Some(TaskStatus::Error));
    }
}
