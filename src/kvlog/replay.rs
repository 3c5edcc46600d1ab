//! Log Replay
//!
//! Rebuilds state at startup by decoding the log front to back.

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

use super::{LogReader, Record};

/// Replays a log file into a caller-supplied sink
pub struct LogReplay;

/// Result of a replay (or verify) pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayResult {
    /// Number of records accepted by the sink
    pub entries_recovered: u64,

    /// Number of records rejected because their key was already bound to a
    /// different value
    pub entries_conflicting: u64,

    /// LSN of the last decodable record (0 if none)
    pub last_lsn: u64,

    /// Whether replay stopped at a damaged or torn record instead of a
    /// clean end of file
    pub stopped_early: bool,

    /// Length of the decodable prefix of the file in bytes
    pub valid_bytes: u64,
}

impl LogReplay {
    /// Replay every record in `path`, in order, into `apply`
    ///
    /// `apply` returns `false` when it rejects a record as conflicting.
    /// Replay stops cleanly at end of file and stops with a warning at the
    /// first record that cannot be read or decoded; everything before that
    /// point has already been applied. Only failing to open the file is
    /// returned as an error.
    pub fn replay<F>(path: &Path, mut apply: F) -> Result<ReplayResult>
    where
        F: FnMut(Record) -> bool,
    {
        let mut reader = LogReader::open(path)?;
        let mut result = ReplayResult::default();

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    result.last_lsn = entry.lsn;
                    if apply(entry.record) {
                        result.entries_recovered += 1;
                    } else {
                        result.entries_conflicting += 1;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let cause = if e.is_decode_error() {
                        "damaged record"
                    } else {
                        "read failure"
                    };
                    tracing::warn!(
                        "Log replay of {} stopped at offset {} after {} records ({}): {}",
                        path.display(),
                        reader.position(),
                        result.entries_recovered + result.entries_conflicting,
                        cause,
                        e
                    );
                    result.stopped_early = true;
                    break;
                }
            }
        }

        result.valid_bytes = reader.position();
        Ok(result)
    }

    /// Walk a log file without applying it anywhere
    ///
    /// Conflicts are detected the same way a store would: first record for
    /// a key wins.
    pub fn verify(path: &Path) -> Result<ReplayResult> {
        let mut seen: HashMap<String, String> = HashMap::new();
        Self::replay(path, |record| match seen.get(&record.key) {
            Some(existing) => *existing == record.value,
            None => {
                seen.insert(record.key, record.value);
                true
            }
        })
    }
}
