//! linkstore CLI
//!
//! Command-line interface for working with a linkstore log file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use linkstore::kvlog::LogReplay;
use linkstore::{Config, Store, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// linkstore CLI
#[derive(Parser, Debug)]
#[command(name = "linkstore")]
#[command(about = "Short-key store backed by an append-only log")]
#[command(version)]
struct Args {
    /// Log file
    #[arg(short, long, default_value = "./linkstore.log")]
    log_path: PathBuf,

    /// Persistence queue capacity (0 writes inline)
    #[arg(short, long, default_value = "0")]
    queue_capacity: usize,

    /// fsync after this many records (1 syncs every write)
    #[arg(short, long, default_value = "100")]
    sync_every: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a value and print its key
    Put {
        /// The value to store
        value: String,
    },

    /// Print the value for a key
    Get {
        /// The key to look up
        key: String,
    },

    /// Print the number of stored keys
    Count,

    /// Check the log file without loading it into a store
    Verify,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,linkstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Commands::Verify = args.command {
        return verify(&args.log_path);
    }

    let sync_strategy = match args.sync_every {
        1 => SyncStrategy::EveryWrite,
        count => SyncStrategy::EveryNEntries { count },
    };

    let config = Config::builder()
        .log_path(&args.log_path)
        .queue_capacity(args.queue_capacity)
        .sync_strategy(sync_strategy)
        .build();

    let store = match Store::open(config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let status = match args.command {
        Commands::Put { value } => {
            println!("{}", store.put(&value));
            ExitCode::SUCCESS
        }
        Commands::Get { key } => match store.get(&key) {
            Some(value) => {
                println!("{}", value);
                ExitCode::SUCCESS
            }
            None => {
                tracing::info!("Key {} not found", key);
                ExitCode::FAILURE
            }
        },
        Commands::Count => {
            println!("{}", store.count());
            ExitCode::SUCCESS
        }
        Commands::Verify => unreachable!("handled before the store is opened"),
    };

    if let Err(e) = store.close() {
        tracing::error!("Failed to close store: {}", e);
        return ExitCode::FAILURE;
    }

    status
}

fn verify(path: &Path) -> ExitCode {
    match LogReplay::verify(path) {
        Ok(result) => {
            println!("records:     {}", result.entries_recovered);
            println!("conflicting: {}", result.entries_conflicting);
            println!("last lsn:    {}", result.last_lsn);
            println!("valid bytes: {}", result.valid_bytes);
            println!("clean tail:  {}", !result.stopped_early);
            if result.stopped_early {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            tracing::error!("Failed to read {}: {}", path.display(), e);
            ExitCode::FAILURE
        }
    }
}
