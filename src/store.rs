//! Store Module
//!
//! The short-key store that coordinates the key table and the log.
//!
//! ## Responsibilities
//! - Replay the log into the key table on startup
//! - Deduplicate values and generate keys on `put`
//! - Hand accepted records to the log (inline or via the worker)
//! - Serve `get`/`count` from memory only

use std::fs;
use std::path::Path;

use crate::config::{Config, PersistenceMode};
use crate::error::{Result, StoreError};
use crate::keygen;
use crate::kvlog::{LogAppender, LogReplay, LogWriter, Record, RecordSink, ReplayResult};
use crate::table::KeyTable;

/// The main store
///
/// ## Concurrency Model
///
/// - **Reads** (`get`/`count`/`contains`): shared lock on the key table,
///   never touch the log.
/// - **Writes** (`put`): the dedup scan and key generation run under the
///   shared lock; only the final check-absent + insert is exclusive. The
///   record is handed to the log after the table lock is released.
///
/// ## Known Limitation
///
/// The dedup check and the insert are separate steps. Two threads putting
/// the same new value at the same time can both miss it in the scan and
/// end up with two keys for one value. Each key is still valid and
/// durable.
///
/// ## Durability
///
/// In-memory state wins: `put` returns a usable key even when persisting
/// the record fails. Failures are logged. In async mode a record is only
/// durable once the worker has written it.
///
/// The log is never truncated. If replay stopped at a damaged or torn
/// record, everything appended in this session lands behind the damage and
/// the next replay cannot reach it. Those keys are gone after a restart and
/// the same key may be handed out again for a different value. Startup logs
/// a warning when this happens; `linkstore verify` reports it as well.
pub struct Store {
    /// Store configuration
    config: Config,

    /// Committed keys (internal RwLock)
    table: KeyTable,

    /// Where accepted records go
    log: LogAppender,

    /// What startup replay found
    replay: ReplayResult,
}

impl Store {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Open/create the log file
    /// 2. Replay it into the key table
    /// 3. Start the persistence path (inline or worker)
    ///
    /// Only a log that cannot be opened or created is an error
    /// (`StoreError::StorageInit`); a damaged log is replayed up to the
    /// first bad record.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let path = config.log_path.clone();

        // Step 1: Create parent directory and open the log for appending
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::storage_init(&path, e))?;
        }
        let mut writer = LogWriter::open(&path, config.sync_strategy)?;

        // Step 2: Replay through the same insert path `put` uses
        let table = KeyTable::new();
        let replay = LogReplay::replay(&path, |record| Self::apply_replayed(&table, record))
            .map_err(|e| match e {
                StoreError::Io(source) => StoreError::storage_init(&path, source),
                other => other,
            })?;
        writer.resume_after(replay.last_lsn);

        tracing::info!(
            "Replayed {} records from {} ({} conflicting, last_lsn={})",
            replay.entries_recovered,
            path.display(),
            replay.entries_conflicting,
            replay.last_lsn
        );
        if replay.stopped_early {
            tracing::warn!(
                "{} has a damaged tail after byte {}; records written from now on \
                 will not be visible after a restart",
                path.display(),
                replay.valid_bytes
            );
        }

        // Step 3: Start persistence
        let log = LogAppender::new(writer, config.persistence)?;

        Ok(Self {
            config,
            table,
            log,
            replay,
        })
    }

    /// Build an empty store that persists into `sink` instead of the log file
    ///
    /// Nothing is replayed and `config.log_path` is not touched; only the
    /// persistence mode is taken from `config`.
    pub fn with_sink<S: RecordSink>(config: Config, sink: S) -> Result<Self> {
        config.validate()?;
        let log = LogAppender::new(sink, config.persistence)?;

        Ok(Self {
            config,
            table: KeyTable::new(),
            log,
            replay: ReplayResult::default(),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified log file
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().log_path(path).build();
        Self::open(config)
    }

    /// First record for a key wins; a later one with another value is
    /// skipped.
    fn apply_replayed(table: &KeyTable, record: Record) -> bool {
        match table.get(&record.key) {
            Some(existing) if existing == record.value => {
                tracing::debug!("Duplicate record for key {} in log", record.key);
                true
            }
            Some(existing) => {
                tracing::warn!(
                    "Conflicting record for key {} skipped: kept {:?}, log also has {:?}",
                    record.key,
                    existing,
                    record.value
                );
                false
            }
            None => table.set(record.key, record.value),
        }
    }

    /// Get the value for a key
    pub fn get(&self, key: &str) -> Option<String> {
        self.table.get(key)
    }

    /// Number of keys in the store
    pub fn count(&self) -> usize {
        self.table.len()
    }

    /// Find an existing key for `value` (full scan)
    ///
    /// With more than one match the key returned is unspecified.
    pub fn contains(&self, value: &str) -> Option<String> {
        self.table.find_key(value)
    }

    /// Store a value and return its key
    ///
    /// Steps:
    /// 1. Return the existing key if the value is already stored
    /// 2. Generate a candidate key from the current count
    /// 3. Insert if the key is free, otherwise try the next candidate
    /// 4. Hand the record to the log
    pub fn put(&self, value: &str) -> String {
        if let Some(key) = self.contains(value) {
            return key;
        }

        let mut next_index = 0;
        loop {
            let index = self.count().max(next_index);
            let key = keygen::gen_key(index);

            if self.table.set(key.clone(), value.to_string()) {
                self.persist(&key, value);
                return key;
            }

            tracing::trace!("Key {} already taken, regenerating", key);
            next_index = index + 1;
        }
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.log.append(Record::new(key, value)) {
            tracing::warn!("Failed to persist record for key {}: {}", key, e);
        }
    }

    /// Close the store gracefully
    ///
    /// Waits for queued records to be written and syncs the log.
    /// Dropping the store does the same but can only log failures.
    pub fn close(self) -> Result<()> {
        self.log.close()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the log file path
    pub fn log_path(&self) -> &Path {
        &self.config.log_path
    }

    /// Get the persistence mode in effect
    pub fn persistence(&self) -> PersistenceMode {
        self.log.mode()
    }

    /// What startup replay found
    pub fn replay_result(&self) -> &ReplayResult {
        &self.replay
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
