//! Streaming extraction of log lines by timestamp

use crate::error::{Result, StorefrontError};
use crate::models::TimeRange;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use storefront_common::{
    parse_line_timestamp, LOG_DATE_FORMAT, LOG_TIMESTAMP_WIDTH, PARTIAL_FILE_SUFFIX,
};
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, warn};
use uuid::Uuid;

/// Line counts of one extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Lines inside the range, written to the result file
    pub kept: u64,
    /// Lines with a valid timestamp outside the range
    pub out_of_range: u64,
    /// Lines without a parseable leading timestamp
    pub malformed: u64,
}

/// Work performed by a task once its initial delay has elapsed
#[async_trait]
pub trait Extractor: Send + Sync + 'static {
    /// Produce the result file at `destination` from `source`
    async fn extract(
        &self,
        source: &Path,
        destination: &Path,
        range: &TimeRange,
    ) -> Result<ExtractionSummary>;
}

/// Timestamp range filter over a plain text log
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExtractor;

#[async_trait]
impl Extractor for FileExtractor {
    async fn extract(
        &self,
        source: &Path,
        destination: &Path,
        range: &TimeRange,
    ) -> Result<ExtractionSummary> {
        extract_range(source, destination, range).await
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(PARTIAL_FILE_SUFFIX);
    PathBuf::from(name)
}

async fn open_source(source: &Path) -> Result<File> {
    match File::open(source).await {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StorefrontError::SourceUnavailable {
            path: source.display().to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Copy every line of `source` whose leading timestamp lies in `range`
/// (inclusive) to `destination`.
///
/// Lines without a parseable timestamp, including lines whose prefix is not
/// valid UTF-8, are dropped and extraction continues. Kept lines are copied
/// byte for byte. The output is written to
/// a `.part` sibling and renamed into place only on success, so `destination`
/// never holds a partial result.
///
/// # Errors
///
/// `SourceUnavailable` if `source` does not exist, `Io` for any read or write
/// failure.
pub async fn extract_range(
    source: &Path,
    destination: &Path,
    range: &TimeRange,
) -> Result<ExtractionSummary> {
    let input = open_source(source).await?;
    let partial = partial_path(destination);

    let result = write_filtered(input, &partial, |line, summary| {
        match line_timestamp(line) {
            Some(ts) if range.contains(&ts) => {
                summary.kept += 1;
                true
            }
            Some(_) => {
                summary.out_of_range += 1;
                false
            }
            None => {
                summary.malformed += 1;
                false
            }
        }
    })
    .await;

    match result {
        Ok(summary) => {
            fs::rename(&partial, destination).await?;
            Ok(summary)
        }
        Err(e) => {
            discard(&partial).await;
            Err(e)
        }
    }
}

/// Remove an unfinished output file. A file that was never created is fine.
async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove partial file {}: {}", path.display(), e);
        }
    }
}

/// Timestamp at the start of a raw log line. Only the fixed-width prefix has
/// to be valid UTF-8; the rest of the line is never decoded.
fn line_timestamp(line: &[u8]) -> Option<NaiveDateTime> {
    let prefix = line.get(..LOG_TIMESTAMP_WIDTH)?;
    std::str::from_utf8(prefix)
        .ok()
        .and_then(parse_line_timestamp)
}

/// Strip the line terminator (`\n` or `\r\n`)
fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

async fn write_filtered<F>(input: File, output: &Path, mut keep: F) -> Result<ExtractionSummary>
where
    F: FnMut(&[u8], &mut ExtractionSummary) -> bool,
{
    let mut summary = ExtractionSummary::default();
    let mut reader = BufReader::new(input);
    let mut writer = BufWriter::new(File::create(output).await?);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = trim_newline(&buf);
        if keep(line, &mut summary) {
            writer.write_all(line).await?;
            writer.write_all(b"\n").await?;
        }
    }
    writer.flush().await?;
    writer.into_inner().sync_all().await?;

    Ok(summary)
}

/// Copy every line of `source` that starts with `date` into a new file under
/// `temp_dir`.
///
/// Returns `None` (and leaves no file behind) when no line matched.
///
/// # Errors
///
/// `SourceUnavailable` if `source` does not exist, `Io` for any read or write
/// failure.
pub async fn extract_by_date(
    source: &Path,
    temp_dir: &Path,
    date: NaiveDate,
) -> Result<Option<PathBuf>> {
    let input = open_source(source).await?;
    fs::create_dir_all(temp_dir).await?;

    let prefix = date.format(LOG_DATE_FORMAT).to_string();
    let destination = temp_dir.join(format!("log-{prefix}-{}.txt", Uuid::new_v4()));

    let summary = match write_filtered(input, &destination, |line, summary| {
        if line.starts_with(prefix.as_bytes()) {
            summary.kept += 1;
            true
        } else {
            false
        }
    })
    .await
    {
        Ok(summary) => summary,
        Err(e) => {
            discard(&destination).await;
            return Err(e);
        }
    };

    if summary.kept == 0 {
        fs::remove_file(&destination).await?;
        debug!("No log lines found for {}", prefix);
        return Ok(None);
    }

    debug!("Extracted {} log lines for {}", summary.kept, prefix);
    Ok(Some(destination))
}
