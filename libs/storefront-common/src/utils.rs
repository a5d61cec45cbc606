//! Helpers for log timestamps and result file naming

use crate::constants::{
    LOG_DATE_FORMAT, LOG_TIMESTAMP_FORMAT, LOG_TIMESTAMP_WIDTH, RESULT_FILE_PREFIX,
    RESULT_FILE_SUFFIX,
};
use chrono::{NaiveDate, NaiveDateTime};

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp
///
/// # Errors
/// Returns `chrono::ParseError` if the string is not in the canonical format
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, LOG_TIMESTAMP_FORMAT)
}

/// Format a timestamp in the canonical log format
#[must_use]
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(LOG_TIMESTAMP_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` date
///
/// # Errors
/// Returns `chrono::ParseError` if the string is not a valid date
pub fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value, LOG_DATE_FORMAT)
}

/// Parse the fixed-width timestamp at the start of a log line.
///
/// Returns `None` for lines that are too short or whose prefix is not a
/// canonical timestamp.
#[must_use]
pub fn parse_line_timestamp(line: &str) -> Option<NaiveDateTime> {
    let prefix = line.get(..LOG_TIMESTAMP_WIDTH)?;
    parse_timestamp(prefix).ok()
}

/// File name of the result file produced for a task id
#[must_use]
pub fn result_file_name(task_id: &str) -> String {
    format!("{RESULT_FILE_PREFIX}{task_id}{RESULT_FILE_SUFFIX}")
}

/// Recover the task id from a result file name.
///
/// Only names of the exact form `log_<id>.txt` with a non-empty id match.
#[must_use]
pub fn task_id_from_file_name(file_name: &str) -> Option<&str> {
    let id = file_name
        .strip_prefix(RESULT_FILE_PREFIX)?
        .strip_suffix(RESULT_FILE_SUFFIX)?;
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Validate a UUID string
#[must_use]
pub fn is_valid_uuid(uuid_str: &str) -> bool {
    uuid::Uuid::parse_str(uuid_str).is_ok()
}
