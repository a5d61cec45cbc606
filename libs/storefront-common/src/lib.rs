//! Storefront Common - Shared constants and helpers
//!
//! This crate holds the pieces both the core library and the CLI need to agree
//! on: the canonical log timestamp format and the result file naming
//! convention used for task recovery.
//!
//! # Examples
//!
//! ```
//! use storefront_common::{result_file_name, task_id_from_file_name, RESULT_FILE_PREFIX};
//!
//! assert_eq!(RESULT_FILE_PREFIX, "log_");
//!
//! let name = result_file_name("1234");
//! assert_eq!(name, "log_1234.txt");
//! assert_eq!(task_id_from_file_name(&name), Some("1234"));
//! ```

pub mod constants;
pub mod utils;

pub use constants::*;
pub use utils::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_re_exported_constants() {
        assert_eq!(LOG_TIMESTAMP_FORMAT, "%Y-%m-%d %H:%M:%S");
        assert_eq!(LOG_TIMESTAMP_WIDTH, 19);
        assert_eq!(DEFAULT_MAX_CACHE_ENTRIES, 1000);
    }

    #[test]
    fn test_re_exported_functions() {
        let ts = parse_timestamp("2024-01-01 00:00:00").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-01 00:00:00");
        assert_eq!(parse_line_timestamp("2024-01-01 00:00:00 x"), Some(ts));
        assert_eq!(task_id_from_file_name(&result_file_name("x")), Some("x"));
    }
}
