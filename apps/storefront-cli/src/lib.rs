//! Storefront CLI library

pub mod logging;

use anyhow::{bail, Context};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use storefront_common::{format_timestamp, parse_date, parse_timestamp, DEFAULT_TEMP_DIR};
use storefront_core::{
    extract_by_date, ConfigLoader, LogTask, Storefront, StorefrontConfig, TaskStatus, TaskStore,
};

#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(about = "Order cache and log extraction tasks")]
#[command(version)]
pub struct Cli {
    /// Configuration file (JSON or YAML)
    #[arg(long, short, env = "STOREFRONT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Extract the log lines of a time range and wait for the result
    Extract {
        /// Range start, inclusive ("YYYY-MM-DD HH:MM:SS")
        #[arg(long, value_parser = parse_timestamp)]
        from: NaiveDateTime,
        /// Range end, inclusive ("YYYY-MM-DD HH:MM:SS")
        #[arg(long, value_parser = parse_timestamp)]
        to: NaiveDateTime,
        /// Source application log
        #[arg(long)]
        source: Option<PathBuf>,
        /// Directory for result files
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Delay before the task starts reading, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Number of task workers
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Show the status of a task
    Status {
        /// Task id
        id: String,
    },
    /// Show the result file of a finished task
    #[command(name = "result")]
    ResultPath {
        /// Task id
        id: String,
    },
    /// List tasks recovered from the output directory
    Tasks,
    /// Copy every log line of one day into a temporary file
    ByDate {
        /// Day to extract ("YYYY-MM-DD")
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
        /// Source application log
        #[arg(long)]
        source: Option<PathBuf>,
        /// Directory for the produced file
        #[arg(long)]
        temp_dir: Option<PathBuf>,
    },
}

/// Load configuration with defaults < file < environment < command flags
///
/// # Errors
/// Returns an error if the configuration cannot be loaded or is invalid
pub fn load_config(cli: &Cli) -> anyhow::Result<StorefrontConfig> {
    let mut loader = ConfigLoader::new().with_validation(false);
    if let Some(path) = &cli.config {
        loader = loader.with_config_file(path);
    }
    let mut config = loader.load()?;
    apply_overrides(&mut config, &cli.command);
    config.validate()?;
    Ok(config)
}

/// Apply the command's path and tuning flags to `config`
pub fn apply_overrides(config: &mut StorefrontConfig, command: &Commands) {
    match command {
        Commands::Extract {
            source,
            output_dir,
            delay_ms,
            workers,
            ..
        } => {
            if let Some(source) = source {
                config.tasks.source_log.clone_from(source);
            }
            if let Some(output_dir) = output_dir {
                config.tasks.output_dir.clone_from(output_dir);
            }
            if let Some(delay_ms) = delay_ms {
                config.tasks.initial_delay_ms = *delay_ms;
            }
            if let Some(workers) = workers {
                config.tasks.workers = *workers;
            }
        }
        Commands::ByDate {
            source: Some(source),
            ..
        } => {
            config.tasks.source_log.clone_from(source);
        }
        _ => {}
    }
}

/// Execute a command, writing user-facing output to `writer`
///
/// # Errors
/// Returns an error if the command fails
pub async fn run<W: Write>(
    command: Commands,
    config: StorefrontConfig,
    writer: &mut W,
) -> anyhow::Result<()> {
    match command {
        Commands::Extract { from, to, .. } => {
            if from > to {
                bail!("--from must not be after --to");
            }
            let storefront = Storefront::start(config)?;
            let id = storefront.tasks().create_task(from, to);
            writeln!(writer, "{id}")?;

            let status = storefront.tasks().wait_for(&id).await?;
            let task = storefront.tasks().task(&id);
            storefront.shutdown().await;

            match task {
                Some(task) => print_task(&task, writer)?,
                None => writeln!(writer, "{status}")?,
            }
        }
        Commands::Status { id } => {
            let store = TaskStore::open_existing(&config.tasks.output_dir)?;
            match store.status(&id) {
                Some(status) => writeln!(writer, "{status}")?,
                None => writeln!(writer, "NOT_FOUND")?,
            }
        }
        Commands::ResultPath { id } => {
            let store = TaskStore::open_existing(&config.tasks.output_dir)?;
            match (store.status(&id), store.result_path(&id)) {
                (_, Some(path)) => writeln!(writer, "{}", path.display())?,
                (Some(status), None) => bail!("Task {id} has no result yet (status {status})"),
                (None, None) => bail!("Task {id} not found"),
            }
        }
        Commands::Tasks => {
            let store = TaskStore::open_existing(&config.tasks.output_dir)?;
            print_tasks(&store.list(), writer)?;
        }
        Commands::ByDate { date, temp_dir, .. } => {
            let temp_dir = temp_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_TEMP_DIR));
            let produced = extract_by_date(&config.tasks.source_log, &temp_dir, date)
                .await
                .with_context(|| format!("Failed to extract log lines for {date}"))?;
            match produced {
                Some(path) => writeln!(writer, "{}", path.display())?,
                None => writeln!(writer, "No log lines found for {date}")?,
            }
        }
    }
    Ok(())
}

/// Print one task to the given writer
///
/// # Errors
/// Returns an error if writing fails
pub fn print_task<W: Write>(task: &LogTask, writer: &mut W) -> std::io::Result<()> {
    write!(writer, "{} {}", task.id, task.status)?;
    if let Some(range) = &task.range {
        write!(
            writer,
            " [{} .. {}]",
            format_timestamp(&range.from),
            format_timestamp(&range.to)
        )?;
    }
    match (task.status, &task.file_path, &task.error) {
        (TaskStatus::Done, Some(path), _) => write!(writer, " {}", path.display())?,
        (TaskStatus::Error, _, Some(error)) => write!(writer, " ({error})")?,
        _ => {}
    }
    writeln!(writer)
}

/// Print tasks to the given writer
///
/// # Errors
/// Returns an error if writing fails
pub fn print_tasks<W: Write>(tasks: &[LogTask], writer: &mut W) -> std::io::Result<()> {
    if tasks.is_empty() {
        writeln!(writer, "No tasks found")?;
        return Ok(());
    }

    writeln!(writer, "Found {} tasks:", tasks.len())?;
    for task in tasks {
        print_task(task, writer)?;
    }
    Ok(())
}
