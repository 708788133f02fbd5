//! CSV report writing and re-reading.

use crate::{ImageRecord, QualityBand};
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;

/// Header row of the quality report.
pub const REPORT_HEADERS: [&str; 6] = ["group", "file", "path", "width", "height", "quality"];

/// Streaming CSV sink: one row per completed image, in completion order.
pub struct ReportWriter {
    writer: csv::Writer<File>,
}

impl ReportWriter {
    /// Creates the report file and writes the header row.
    ///
    /// # Errors
    ///
    /// Failing to create or write the report is fatal for the run.
    pub fn create(path: &Path) -> Result<Self> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("could not create report {}", path.display()))?;
        writer.write_record(REPORT_HEADERS)?;
        Ok(Self { writer })
    }

    /// Appends one record.
    pub fn write(&mut self, record: &ImageRecord) -> Result<()> {
        let width = record.width.to_string();
        let height = record.height.to_string();
        self.writer.write_record([
            record.group.as_str(),
            record.file_name.as_str(),
            record.path.as_str(),
            width.as_str(),
            height.as_str(),
            record.quality.label(),
        ])?;
        Ok(())
    }

    /// Flushes all buffered rows to disk.
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush().context("flushing report")?;
        Ok(())
    }
}

/// Reads a previously written report back into records.
///
/// Coercion is defensive: the quality column accepts either a band label or a
/// numeric code as text, and anything unrecognized degrades to the sentinel;
/// non-numeric dimension cells become zero.
///
/// # Errors
///
/// Returns an error when the file cannot be opened or a row is structurally
/// malformed CSV.
pub fn read_report(path: &Path) -> Result<Vec<ImageRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("could not open report {}", path.display()))?;
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.context("malformed report row")?;
        let field = |index: usize| row.get(index).unwrap_or("").to_string();
        records.push(ImageRecord {
            group: field(0),
            file_name: field(1),
            path: field(2),
            width: row.get(3).and_then(|v| v.parse().ok()).unwrap_or(0),
            height: row.get(4).and_then(|v| v.parse().ok()).unwrap_or(0),
            quality: row
                .get(5)
                .and_then(QualityBand::parse)
                .unwrap_or(QualityBand::Unscored),
        });
    }
    Ok(records)
}
