// ABOUTME: JSONL record logger — appends each execution record to a per-run log file.
// ABOUTME: One timestamped file per run under the configured records directory.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;

use super::record::{ExecutionRecord, RecordSink};

/// Appends execution records as JSONL lines to a run log file.
pub struct RecordLogger {
    writer: Mutex<BufWriter<File>>,
    pub path: PathBuf,
}

impl RecordLogger {
    /// Create a logger that writes to `dir`.
    ///
    /// Creates the directory and opens a new JSONL file named with the current
    /// UTC timestamp.
    pub fn new_in_dir(dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)?;
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S%.3f").to_string();
        let path = dir.join(format!("{}.jsonl", timestamp));
        let file = File::create(&path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path,
        })
    }
}

impl RecordSink for RecordLogger {
    fn record(&self, record: &ExecutionRecord) -> anyhow::Result<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("record log writer poisoned"))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}
