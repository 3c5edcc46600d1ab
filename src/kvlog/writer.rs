//! Log Writer
//!
//! Appends framed records to the log file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{Result, StoreError};

use super::{LogEntry, Record};

/// Writes entries to the log file
///
/// Each append is handed to the OS before returning; `sync_strategy`
/// only decides when the data is fsynced.
pub struct LogWriter {
    file: File,
    path: PathBuf,
    next_lsn: u64,
    sync_strategy: SyncStrategy,
    /// Appends since the last fsync
    uncommitted: usize,
}

impl LogWriter {
    /// Open or create a log file for appending
    ///
    /// Fails with `StoreError::StorageInit` if the file cannot be opened
    /// or created.
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| StoreError::storage_init(path, e))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            next_lsn: 1,
            sync_strategy,
            uncommitted: 0,
        })
    }

    /// Continue numbering after the last LSN found by replay
    pub fn resume_after(&mut self, last_lsn: u64) {
        self.next_lsn = last_lsn + 1;
    }

    /// Append a record to the log, returning its LSN
    pub fn append(&mut self, record: &Record) -> Result<u64> {
        let lsn = self.next_lsn;
        let bytes = LogEntry::encode(lsn, record)?;

        self.file.write_all(&bytes)?;
        self.next_lsn += 1;
        self.uncommitted += 1;

        match self.sync_strategy {
            SyncStrategy::EveryWrite => self.sync()?,
            SyncStrategy::EveryNEntries { count } if self.uncommitted >= count => self.sync()?,
            SyncStrategy::EveryNEntries { .. } => {}
        }

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.uncommitted = 0;
        Ok(())
    }

    /// LSN the next append will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Appends not yet fsynced
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        if self.uncommitted > 0 {
            if let Err(e) = self.sync() {
                tracing::warn!("Failed to sync log {} on close: {}", self.path.display(), e);
            }
        }
    }
}
