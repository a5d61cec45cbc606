//! End-to-end tests for log extraction tasks

use std::path::{Path, PathBuf};
use std::time::Duration;
use storefront_common::parse_timestamp;
use storefront_core::{TaskConfig, TaskManager, TaskStatus};
use tempfile::TempDir;

fn write_source(dir: &Path) -> PathBuf {
    let path = dir.join("app.log");
    let lines = [
        "2024-01-01 00:00:01 INFO  boot",
        "2024-01-01 00:00:02 INFO  first",
        "2024-01-01 00:00:03 INFO  second",
        "not a timestamped line",
        "2024-01-01 00:00:04 INFO  third",
        "2024-01-01 00:00:05 INFO  late",
    ];
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

fn config(dir: &Path, delay_ms: u64, workers: usize) -> TaskConfig {
    TaskConfig {
        source_log: dir.join("app.log"),
        output_dir: dir.join("generated"),
        initial_delay_ms: delay_ms,
        workers,
    }
}

#[tokio::test]
async fn test_task_goes_pending_then_done() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path());
    let mut manager = TaskManager::start(&config(dir.path(), 100, 2)).unwrap();

    let id = manager.create_task(
        parse_timestamp("2024-01-01 00:00:02").unwrap(),
        parse_timestamp("2024-01-01 00:00:04").unwrap(),
    );
    assert_eq!(manager.status(&id), Some(TaskStatus::Pending));

    let status = tokio::time::timeout(Duration::from_secs(10), manager.wait_for(&id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status, TaskStatus::Done);

    let content = std::fs::read_to_string(manager.result_path(&id).unwrap()).unwrap();
    assert_eq!(
        content,
        "2024-01-01 00:00:02 INFO  first\n\
         2024-01-01 00:00:03 INFO  second\n\
         2024-01-01 00:00:04 INFO  third\n"
    );

    manager.shutdown().await;
}

#[tokio::test]
async fn test_missing_source_goes_error() {
    let dir = TempDir::new().unwrap();
    let mut manager = TaskManager::start(&config(dir.path(), 0, 1)).unwrap();

    let id = manager.create_task(
        parse_timestamp("2024-01-01 00:00:00").unwrap(),
        parse_timestamp("2024-01-01 00:00:10").unwrap(),
    );

    assert_eq!(manager.wait_for(&id).await.unwrap(), TaskStatus::Error);
    assert!(manager.result_path(&id).is_none());
    let generated: Vec<_> = std::fs::read_dir(dir.path().join("generated"))
        .unwrap()
        .collect();
    assert!(generated.is_empty());

    manager.shutdown().await;
}

#[tokio::test]
async fn test_restart_recovers_result_files() {
    let dir = TempDir::new().unwrap();
    let generated = dir.path().join("generated");
    std::fs::create_dir_all(&generated).unwrap();
    std::fs::write(generated.join("log_X.txt"), "2024-01-01 00:00:02 INFO  first\n").unwrap();

    let mut manager = TaskManager::start(&config(dir.path(), 0, 1)).unwrap();

    assert_eq!(manager.status("X"), Some(TaskStatus::Done));
    assert_eq!(manager.result_path("X"), Some(generated.join("log_X.txt")));
    assert!(manager.status("Y").is_none());
    assert_eq!(manager.tasks().len(), 1);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_many_concurrent_tasks_all_finish() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path());
    let mut manager = TaskManager::start(&config(dir.path(), 10, 3)).unwrap();

    let ids: Vec<String> = (0..12)
        .map(|_| {
            manager.create_task(
                parse_timestamp("2024-01-01 00:00:01").unwrap(),
                parse_timestamp("2024-01-01 00:00:05").unwrap(),
            )
        })
        .collect();

    for id in &ids {
        assert_eq!(manager.wait_for(id).await.unwrap(), TaskStatus::Done);
        let content = std::fs::read_to_string(manager.result_path(id).unwrap()).unwrap();
        assert_eq!(content.lines().count(), 5);
    }
    assert_eq!(manager.tasks().len(), 12);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_fails_pending_tasks() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path());
    let mut manager = TaskManager::start(&config(dir.path(), 60_000, 1)).unwrap();

    let first = manager.create_task(
        parse_timestamp("2024-01-01 00:00:01").unwrap(),
        parse_timestamp("2024-01-01 00:00:05").unwrap(),
    );
    let second = manager.create_task(
        parse_timestamp("2024-01-01 00:00:01").unwrap(),
        parse_timestamp("2024-01-01 00:00:05").unwrap(),
    );

    manager.shutdown().await;

    assert_eq!(manager.status(&first), Some(TaskStatus::Error));
    assert_eq!(manager.status(&second), Some(TaskStatus::Error));

    let late = manager.create_task(
        parse_timestamp("2024-01-01 00:00:01").unwrap(),
        parse_timestamp("2024-01-01 00:00:05").unwrap(),
    );
    assert_eq!(manager.status(&late), Some(TaskStatus::Error));
}
