//! Constants shared by the storefront crates

/// Canonical timestamp format at the start of every application log line
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Width in bytes of a formatted log timestamp (`YYYY-MM-DD HH:MM:SS`)
pub const LOG_TIMESTAMP_WIDTH: usize = 19;

/// Date format used by the by-date extraction
pub const LOG_DATE_FORMAT: &str = "%Y-%m-%d";

/// Prefix of every generated result file
pub const RESULT_FILE_PREFIX: &str = "log_";

/// Suffix of every generated result file
pub const RESULT_FILE_SUFFIX: &str = ".txt";

/// Suffix appended while a result file is still being written
pub const PARTIAL_FILE_SUFFIX: &str = ".part";

/// Default application log that extraction tasks read from
pub const DEFAULT_SOURCE_LOG: &str = "logs/app.log";

/// Default directory holding generated result files
pub const DEFAULT_OUTPUT_DIR: &str = "logs/generated";

/// Default directory for by-date extraction output
pub const DEFAULT_TEMP_DIR: &str = "logs/temp";

/// Default maximum number of cached product names
pub const DEFAULT_MAX_CACHE_ENTRIES: usize = 1000;

/// Default byte budget when the size policy is active (10 MiB)
pub const DEFAULT_MAX_CACHE_BYTES: u64 = 10 * 1024 * 1024;

/// Estimated cost of a single cached order
pub const DEFAULT_ORDER_WEIGHT_BYTES: u64 = 512;

/// Default period of the full cache sweep (30 minutes)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30 * 60;

/// Artificial delay before an extraction task starts reading (45 seconds)
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 45_000;

/// Default number of extraction workers
pub const DEFAULT_TASK_WORKERS: usize = 8;
