//! # linkstore
//!
//! A short-key store for long values (typically URLs) with:
//! - Generated base-62 keys, one key per distinct value
//! - An append-only log replayed on startup
//! - Inline or background-worker persistence with a bounded queue
//! - Shared-lock reads that never wait on disk
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Caller (handlers, CLI, ...)                  │
//! │                get / put / count                            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Store                                │
//! │            dedup · key generation · replay                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  KeyTable   │          │ LogAppender │
//!   │  (RwLock)   │          │ sync/async  │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  LogWriter  │
//!                           │  (append)   │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod keygen;
pub mod kvlog;
pub mod table;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::{Config, PersistenceMode, SyncStrategy};
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of linkstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
