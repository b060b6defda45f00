// ABOUTME: Execution records — structured events for tool failures, fallback exhaustion, crashes.
// ABOUTME: Sinks receive records; a failing sink is logged and never interrupts the loop.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    ToolFailure,
    FallbackExhausted,
    Crash,
}

/// One structured execution event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub kind: RecordKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    pub message: String,
    pub is_error: bool,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn new(kind: RecordKind, tool_name: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            tool_name,
            message: message.into(),
            is_error: true,
            timestamp: Utc::now(),
        }
    }
}

/// Destination for execution records.
pub trait RecordSink: Send + Sync {
    fn record(&self, record: &ExecutionRecord) -> anyhow::Result<()>;
}

/// Send a record to a sink, logging instead of propagating any failure.
pub fn emit_record(sink: &dyn RecordSink, record: ExecutionRecord) {
    if let Err(e) = sink.record(&record) {
        warn!(kind = ?record.kind, error = %e, "failed to write execution record");
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<ExecutionRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, kind: RecordKind) -> usize {
        self.records().iter().filter(|r| r.kind == kind).count()
    }
}

impl RecordSink for MemorySink {
    fn record(&self, record: &ExecutionRecord) -> anyhow::Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("record buffer poisoned"))?
            .push(record.clone());
        Ok(())
    }
}
