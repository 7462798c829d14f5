//! # Acknowledgement Log
//!
//! JSON Lines log of packets received from the radio peer, with file rotation.
//!
//! Each line is one object:
//!
//! ```text
//! {"timestamp":"2026-10-19T17:18:00.123Z","transport":"radio","chunk_index":0,"len":8,"payload":"RSSI:-71"}
//! ```
//!
//! A new file is started after `max_records_per_file` lines, and only the
//! newest `max_files_to_keep` files are retained.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;

const FILE_PREFIX: &str = "acks_";
const FILE_SUFFIX: &str = ".jsonl";

#[derive(Debug, Serialize)]
struct AckEntry<'a> {
    timestamp: String,
    transport: &'a str,
    chunk_index: usize,
    len: usize,
    payload: String,
}

/// Rotating JSONL writer for radio acknowledgements
#[derive(Debug)]
pub struct AckLog {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    files_opened: u32,
}

impl AckLog {
    /// Create a log in `dir`; the directory and first file are created on
    /// the first record
    pub fn new(dir: impl AsRef<Path>, max_records_per_file: usize, max_files_to_keep: usize) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            files_opened: 0,
        }
    }

    /// Append one received packet
    pub fn record(&mut self, transport: &str, chunk_index: usize, payload: &[u8]) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let entry = AckEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            transport,
            chunk_index,
            len: payload.len(),
            payload: String::from_utf8_lossy(payload).into_owned(),
        };

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, &entry)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            self.records_in_file += 1;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut old) = self.writer.take() {
            old.flush()?;
        }

        fs::create_dir_all(&self.dir)?;

        self.files_opened += 1;
        let name = format!(
            "{}{}_{:04}{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.files_opened,
            FILE_SUFFIX
        );
        let path = self.dir.join(name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Ack log now writing {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.prune();
        Ok(())
    }

    /// Delete the oldest log files beyond the retention limit
    fn prune(&self) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to list ack log dir {}: {}", self.dir.display(), e);
                return;
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(FILE_PREFIX) && n.ends_with(FILE_SUFFIX))
            })
            .collect();

        // Names embed timestamp then sequence, so lexical order is age order
        files.sort();

        let excess = files.len().saturating_sub(self.max_files_to_keep);
        for path in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove old ack log {}: {}", path.display(), e);
            }
        }
    }
}
