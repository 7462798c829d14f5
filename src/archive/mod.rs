//! # Archive Module
//!
//! Append-only local copy of every record.
//!
//! The archive is a CSV file whose header names the fourteen record fields.
//! Unavailable values are written as `N/A`. The file is never truncated: the
//! header is only written when the file is new or empty, so restarts keep
//! earlier rows.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{RelayError, Result};
use crate::record::{SensorReading, FIELD_NAMES};

/// Durable sink for readings.
///
/// Single writer; failures are reported to the orchestrator, which logs them
/// without affecting transport dispatch.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArchiveSink: Send {
    async fn append(&mut self, reading: &SensorReading) -> Result<()>;
}

/// CSV archive on local storage
#[derive(Debug)]
pub struct CsvArchive {
    path: PathBuf,
    file: Option<File>,
}

impl CsvArchive {
    /// Create an archive at `path`; the file is opened on the first append
    /// and re-opened after a write failure (e.g. remounted SD card)
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<File> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| RelayError::Archive(format!("Failed to open {}: {}", self.path.display(), e)))?;

        let is_empty = file
            .metadata()
            .map_err(|e| RelayError::Archive(format!("Failed to stat {}: {}", self.path.display(), e)))?
            .len()
            == 0;
        if is_empty {
            file.write_all(csv_row(FIELD_NAMES.iter().copied()).as_bytes())
                .map_err(|e| RelayError::Archive(format!("Failed to write header: {}", e)))?;
            info!("Started archive {}", self.path.display());
        }

        Ok(file)
    }
}

#[async_trait]
impl ArchiveSink for CsvArchive {
    async fn append(&mut self, reading: &SensorReading) -> Result<()> {
        // A failed write drops the handle so the next append re-opens
        let mut file = match self.file.take() {
            Some(file) => file,
            None => self.open()?,
        };

        let fields = reading.rendered_fields();
        let row = csv_row(fields.iter().map(String::as_str));

        if let Err(e) = file.write_all(row.as_bytes()).and_then(|()| file.flush()) {
            return Err(RelayError::Archive(format!(
                "Failed to append to {}: {}",
                self.path.display(),
                e
            )));
        }

        self.file = Some(file);
        debug!("Archived row ({} bytes)", row.len());
        Ok(())
    }
}

/// Render one CSV row terminated by `\r\n`, quoting fields as needed
pub fn csv_row<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    let mut row = fields.map(csv_field).collect::<Vec<_>>().join(",");
    row.push_str("\r\n");
    row
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
