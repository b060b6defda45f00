// ABOUTME: Session module — execution records and where they are written.
// ABOUTME: Provides the RecordSink seam, an in-memory sink, and a JSONL file logger.

pub mod log;
pub mod record;

pub use log::RecordLogger;
pub use record::{ExecutionRecord, MemorySink, RecordKind, RecordSink, emit_record};
