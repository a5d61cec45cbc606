//! Tracing subscriber setup

use std::fs::OpenOptions;
use storefront_core::LoggingConfig;
use thiserror::Error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Error types for logging setup
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to open log file: {0}")]
    FileOpen(#[from] std::io::Error),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Result type for logging operations
pub type Result<T> = std::result::Result<T, LoggingError>;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Level used when `RUST_LOG` is unset
#[must_use]
pub fn effective_level(config: &LoggingConfig, verbose: bool) -> &str {
    if verbose {
        "debug"
    } else {
        config.level.as_str()
    }
}

/// Install the global subscriber: stderr output plus an optional
/// non-blocking file writer.
///
/// The returned guard flushes the file writer on drop and must live as long
/// as the process logs.
///
/// # Errors
/// Returns an error if the log file cannot be opened or a global subscriber
/// is already installed
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let level = effective_level(config, verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<BoxedLayer> = vec![console_layer(config.json)];

    let guard = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = if config.json {
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_current_span(true)
                    .with_target(true)
                    .with_thread_ids(true)
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .boxed()
            };
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    if let Some(path) = &config.log_file {
        info!("File logging initialized: {}", path.display());
    }
    Ok(guard)
}

fn console_layer(json: bool) -> BoxedLayer {
    if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    }
}
