//! Key-Value Log Module
//!
//! Append-only durable log of `(key, value)` records.
//!
//! ## Responsibilities
//! - Append records after the in-memory insert has been accepted
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Replay on startup, stopping at the first undecodable record
//! - Inline (sync) or single-worker (async) persistence
//!
//! The log is never truncated or rewritten; it only grows.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Record 1                                 │
//! │ ┌─────────┬─────────┬─────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │ Len (4) │ Data   │ │
//! │ └─────────┴─────────┴─────────┴────────┘ │
//! ├──────────────────────────────────────────┤
//! │ Record 2                                 │
//! │ ┌─────────┬─────────┬─────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │ Len (4) │ Data   │ │
//! │ └─────────┴─────────┴─────────┴────────┘ │
//! └──────────────────────────────────────────┘
//! ```
//!
//! Integers are little-endian. `Data` is the bincode encoding of a
//! [`Record`]; the CRC covers the LSN bytes and `Data`.

mod entry;
mod reader;
mod writer;
mod replay;
mod appender;

pub use entry::{LogEntry, Record, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use reader::{LogIterator, LogReader};
pub use writer::LogWriter;
pub use replay::{LogReplay, ReplayResult};
pub use appender::{AsyncAppender, LogAppender, RecordSink, WorkerStats};
