use anyhow::{Context, Result};
use csv::{QuoteStyle, WriterBuilder};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::crawler::result::{AnnouncementRecord, CrawlResult};

/// Writes crawl results as a CSV file
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the target file with `result`. The rows are written to a sibling
    /// file first, so a failed write never leaves a partial target behind.
    pub fn write(&self, result: &CrawlResult) -> Result<usize> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let staging = self.staging_path();
        let file = fs::File::create(&staging)
            .context(format!("Failed to create output file: {}", staging.display()))?;

        if let Err(e) = write_records(file, result.records()) {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }

        fs::rename(&staging, &self.path)
            .context(format!("Failed to move output into place: {}", self.path.display()))?;

        debug!("Exported {} records to CSV file: {}", result.len(), self.path.display());
        Ok(result.len())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "announcements.csv".into());
        name.push(".partial");
        self.path.with_file_name(name)
    }
}

/// Header plus one line per record. Every field is quoted so spreadsheet
/// tools keep stock codes as text.
pub fn write_records<W: io::Write>(writer: W, records: &[AnnouncementRecord]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    writer
        .write_record(AnnouncementRecord::HEADERS)
        .context("Failed to write CSV header")?;

    for record in records {
        writer.serialize(record).context("Failed to write CSV row")?;
    }

    writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}
