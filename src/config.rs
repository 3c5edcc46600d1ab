//! Configuration for linkstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Main configuration for a Store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Log Configuration
    // -------------------------------------------------------------------------
    /// Path of the append-only record log (created if absent)
    pub log_path: PathBuf,

    /// Whether records are written inline or by a background worker
    pub persistence: PersistenceMode,

    /// Sync strategy: how often to fsync the log
    pub sync_strategy: SyncStrategy,
}

/// How accepted writes reach the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    /// Encode and write on the calling thread before `put` returns
    Sync,

    /// Hand records to a bounded queue drained by one worker thread.
    /// A full queue blocks the caller.
    Async { queue_capacity: usize },
}

/// Log fsync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("./linkstore.log"),
            persistence: PersistenceMode::Sync,
            sync_strategy: SyncStrategy::EveryNEntries { count: 100 },
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the log cannot honour
    pub fn validate(&self) -> Result<()> {
        if let SyncStrategy::EveryNEntries { count: 0 } = self.sync_strategy {
            return Err(StoreError::Config(
                "sync strategy EveryNEntries needs a count of at least 1".to_string(),
            ));
        }
        if let PersistenceMode::Async { queue_capacity: 0 } = self.persistence {
            return Err(StoreError::Config(
                "async persistence needs a queue capacity of at least 1".to_string(),
            ));
        }
        if self.log_path.as_os_str().is_empty() {
            return Err(StoreError::Config("log path is empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the log file path
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_path = path.into();
        self
    }

    /// Set the persistence mode directly
    pub fn persistence(mut self, mode: PersistenceMode) -> Self {
        self.config.persistence = mode;
        self
    }

    /// Select persistence by queue capacity: 0 writes inline, anything
    /// larger starts the background worker with a queue of that size
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.persistence = match capacity {
            0 => PersistenceMode::Sync,
            n => PersistenceMode::Async { queue_capacity: n },
        };
        self
    }

    /// Set the log sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
