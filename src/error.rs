//! Error types for linkstore
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for linkstore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The log file could not be opened or created. The store cannot run
    /// without somewhere to persist, so this is the one error `Store::open`
    /// hands back to the embedding application.
    #[error("Cannot initialize storage at {}: {source}", .path.display())]
    StorageInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    #[error("Log corruption detected: {0}")]
    LogCorruption(String),

    #[error("Log truncated: incomplete record at offset {offset}")]
    LogTruncated { offset: u64 },

    #[error("Incomplete frame: need {needed} bytes, have {available}")]
    IncompleteFrame { needed: usize, available: usize },

    #[error("Log writer is closed")]
    LogClosed,

    #[error("Log worker failed: {0}")]
    LogWorker(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Wrap an open failure for the log at `path`
    pub fn storage_init(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageInit {
            path: path.into(),
            source,
        }
    }

    /// Whether this error marks the end of the usable log during replay
    /// (as opposed to an I/O failure of the underlying file)
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::LogCorruption(_)
                | Self::LogTruncated { .. }
                | Self::IncompleteFrame { .. }
                | Self::Serialization(_)
        )
    }
}
