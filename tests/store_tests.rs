//! Tests for Store
//!
//! These tests verify:
//! - put/get/count semantics and value deduplication
//! - Durability across restarts in both persistence modes
//! - Replay of damaged and conflicting logs
//! - Key collision handling
//! - Concurrent access patterns

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use linkstore::config::{Config, PersistenceMode, SyncStrategy};
use linkstore::kvlog::{LogReader, LogReplay, LogWriter, Record, RecordSink};
use linkstore::{Store, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("store.log");
    (temp_dir, log_path)
}

fn sync_config(path: &Path) -> Config {
    Config::builder()
        .log_path(path)
        .sync_strategy(SyncStrategy::EveryWrite)
        .build()
}

fn async_config(path: &Path, capacity: usize) -> Config {
    Config::builder()
        .log_path(path)
        .queue_capacity(capacity)
        .sync_strategy(SyncStrategy::EveryNEntries { count: 16 })
        .build()
}

fn write_log(path: &Path, records: &[(&str, &str)]) {
    let mut writer = LogWriter::open(path, SyncStrategy::EveryWrite).unwrap();
    for (key, value) in records {
        writer.append(&Record::new(*key, *value)).unwrap();
    }
}

fn log_record_count(path: &Path) -> u64 {
    LogReplay::verify(path).unwrap().entries_recovered
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_open_creates_log_and_parent_dirs() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("nested").join("dir").join("store.log");

    let store = Store::open(sync_config(&log_path)).unwrap();

    assert!(log_path.exists());
    assert_eq!(store.count(), 0);
    assert_eq!(store.log_path(), log_path.as_path());
}

#[test]
fn test_put_get_count_scenario() {
    let (_temp, log_path) = setup_temp_log();

    {
        let store = Store::open(sync_config(&log_path)).unwrap();

        assert_eq!(store.put("http://a.com"), "0");
        assert_eq!(store.put("http://b.com"), "1");
        assert_eq!(store.put("http://a.com"), "0");
        assert_eq!(store.count(), 2);

        store.close().unwrap();
    }

    // No record for the repeated value
    assert_eq!(log_record_count(&log_path), 2);

    let store = Store::open(sync_config(&log_path)).unwrap();
    assert_eq!(store.get("0"), Some("http://a.com".to_string()));
    assert_eq!(store.get("1"), Some("http://b.com".to_string()));
    assert_eq!(store.count(), 2);
}

#[test]
fn test_get_missing_key() {
    let (_temp, log_path) = setup_temp_log();
    let store = Store::open(sync_config(&log_path)).unwrap();

    assert_eq!(store.get("nope"), None);
}

#[test]
fn test_distinct_values_get_distinct_keys() {
    let (_temp, log_path) = setup_temp_log();
    let store = Store::open(sync_config(&log_path)).unwrap();

    let mut keys = HashSet::new();
    for i in 0..200 {
        let value = format!("http://example.com/{}", i);
        let key = store.put(&value);
        assert_eq!(store.get(&key), Some(value));
        keys.insert(key);
    }

    assert_eq!(keys.len(), 200);
    assert_eq!(store.count(), 200);
}

#[test]
fn test_repeated_put_writes_one_record() {
    let (_temp, log_path) = setup_temp_log();
    let store = Store::open(sync_config(&log_path)).unwrap();

    let key = store.put("http://same.com");
    for _ in 0..5 {
        assert_eq!(store.put("http://same.com"), key);
    }

    assert_eq!(store.contains("http://same.com"), Some(key));
    assert_eq!(log_record_count(&log_path), 1);
}

#[test]
fn test_sync_put_is_logged_before_return() {
    let (_temp, log_path) = setup_temp_log();
    let store = Store::open(sync_config(&log_path)).unwrap();

    let key = store.put("http://a.com");

    let entry = LogReader::open(&log_path)
        .unwrap()
        .next_entry()
        .unwrap()
        .unwrap();
    assert_eq!(entry.record, Record::new(key, "http://a.com"));
}

// =============================================================================
// Open Failure Tests
// =============================================================================

#[test]
fn test_open_directory_as_log_fails() {
    let temp_dir = TempDir::new().unwrap();

    let result = Store::open(sync_config(temp_dir.path()));
    assert!(matches!(result, Err(StoreError::StorageInit { .. })));
}

#[test]
fn test_open_under_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();

    let result = Store::open(sync_config(&blocker.join("store.log")));
    assert!(matches!(result, Err(StoreError::StorageInit { .. })));
}

#[test]
fn test_invalid_config_rejected() {
    let (_temp, log_path) = setup_temp_log();
    let config = Config::builder()
        .log_path(&log_path)
        .sync_strategy(SyncStrategy::EveryNEntries { count: 0 })
        .build();

    assert!(matches!(Store::open(config), Err(StoreError::Config(_))));
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_corrupt_tail_keeps_valid_records() {
    let (_temp, log_path) = setup_temp_log();
    {
        let store = Store::open(sync_config(&log_path)).unwrap();
        store.put("http://a.com");
        store.put("http://b.com");
        store.put("http://c.com");
        store.close().unwrap();
    }

    let mut file = OpenOptions::new().append(true).open(&log_path).unwrap();
    file.write_all(&[0x13, 0x37, 0x00, 0x42]).unwrap();
    drop(file);

    let store = Store::open(sync_config(&log_path)).unwrap();

    assert_eq!(store.count(), 3);
    assert_eq!(store.get("2"), Some("http://c.com".to_string()));
    assert!(store.replay_result().stopped_early);
    assert_eq!(store.replay_result().entries_recovered, 3);
}

#[test]
fn test_writes_after_damaged_tail_lost_on_restart() {
    let (_temp, log_path) = setup_temp_log();
    {
        let store = Store::open(sync_config(&log_path)).unwrap();
        assert_eq!(store.put("http://a.com"), "0");
        store.close().unwrap();
    }

    let mut file = OpenOptions::new().append(true).open(&log_path).unwrap();
    file.write_all(&[0x13, 0x37, 0x00, 0x42]).unwrap();
    drop(file);

    // Appended behind the damage
    {
        let store = Store::open(sync_config(&log_path)).unwrap();
        assert!(store.replay_result().stopped_early);
        assert_eq!(store.put("http://b.com"), "1");
        assert_eq!(store.get("1"), Some("http://b.com".to_string()));
        store.close().unwrap();
    }

    let store = Store::open(sync_config(&log_path)).unwrap();

    assert!(store.replay_result().stopped_early);
    assert_eq!(store.count(), 1);
    assert_eq!(store.get("1"), None);
    assert_eq!(store.get("0"), Some("http://a.com".to_string()));

    // The lost key is handed out again
    assert_eq!(store.put("http://c.com"), "1");
    assert_eq!(store.get("1"), Some("http://c.com".to_string()));
}

// =============================================================================
// Persistence Failure Tests
// =============================================================================

/// Sink whose every write fails
struct FailingSink {
    attempts: Arc<AtomicUsize>,
}

impl RecordSink for FailingSink {
    fn write_record(&mut self, _record: &Record) -> linkstore::Result<u64> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }

    fn sync(&mut self) -> linkstore::Result<()> {
        Ok(())
    }
}

#[test]
fn test_sync_write_failure_keeps_key() {
    let (_temp, log_path) = setup_temp_log();
    let attempts = Arc::new(AtomicUsize::new(0));
    let sink = FailingSink {
        attempts: Arc::clone(&attempts),
    };

    let store = Store::with_sink(sync_config(&log_path), sink).unwrap();
    assert_eq!(store.persistence(), PersistenceMode::Sync);

    assert_eq!(store.put("http://a.com"), "0");
    // Written inline, before put returned
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    assert_eq!(store.get("0"), Some("http://a.com".to_string()));
    assert_eq!(store.count(), 1);
    assert_eq!(store.contains("http://a.com"), Some("0".to_string()));

    // A later put still works and dedup does not touch the sink
    assert_eq!(store.put("http://b.com"), "1");
    assert_eq!(store.put("http://a.com"), "0");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(store.count(), 2);

    store.close().unwrap();
    assert!(!log_path.exists());
}

#[test]
fn test_async_write_failure_keeps_key() {
    let (_temp, log_path) = setup_temp_log();
    let attempts = Arc::new(AtomicUsize::new(0));
    let sink = FailingSink {
        attempts: Arc::clone(&attempts),
    };

    let store = Store::with_sink(async_config(&log_path, 4), sink).unwrap();

    assert_eq!(store.put("http://a.com"), "0");
    assert_eq!(store.put("http://b.com"), "1");
    assert_eq!(store.get("1"), Some("http://b.com".to_string()));

    // The worker keeps going past failures and drains on close
    store.close().unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_truncated_last_record_dropped() {
    let (_temp, log_path) = setup_temp_log();
    {
        let store = Store::open(sync_config(&log_path)).unwrap();
        store.put("http://a.com");
        store.put("http://b.com");
        store.put("http://c.com");
        store.close().unwrap();
    }

    let len = fs::metadata(&log_path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&log_path).unwrap();
    file.set_len(len - 3).unwrap();
    drop(file);

    let store = Store::open(sync_config(&log_path)).unwrap();

    assert_eq!(store.count(), 2);
    assert_eq!(store.get("1"), Some("http://b.com".to_string()));
    assert_eq!(store.get("2"), None);
}

#[test]
fn test_conflicting_record_skipped() {
    let (_temp, log_path) = setup_temp_log();
    write_log(&log_path, &[("0", "http://a.com"), ("0", "http://evil.com"), ("1", "http://b.com")]);

    let store = Store::open(sync_config(&log_path)).unwrap();

    assert_eq!(store.get("0"), Some("http://a.com".to_string()));
    assert_eq!(store.count(), 2);
    assert_eq!(store.replay_result().entries_conflicting, 1);
    assert!(!store.replay_result().stopped_early);
}

#[test]
fn test_identical_duplicate_record_is_harmless() {
    let (_temp, log_path) = setup_temp_log();
    write_log(&log_path, &[("0", "http://a.com"), ("0", "http://a.com")]);

    let store = Store::open(sync_config(&log_path)).unwrap();

    assert_eq!(store.count(), 1);
    assert_eq!(store.replay_result().entries_conflicting, 0);
}

#[test]
fn test_lsn_continues_after_restart() {
    let (_temp, log_path) = setup_temp_log();
    {
        let store = Store::open(sync_config(&log_path)).unwrap();
        store.put("http://a.com");
        store.put("http://b.com");
        store.close().unwrap();
    }
    {
        let store = Store::open(sync_config(&log_path)).unwrap();
        assert_eq!(store.replay_result().last_lsn, 2);
        assert_eq!(store.put("http://c.com"), "2");
        store.close().unwrap();
    }

    let lsns: Vec<u64> = LogReader::open(&log_path)
        .unwrap()
        .entries()
        .map(|e| e.unwrap().lsn)
        .collect();
    assert_eq!(lsns, vec![1, 2, 3]);
}

// =============================================================================
// Key Collision Tests
// =============================================================================

#[test]
fn test_collision_regenerates_key() {
    let (_temp, log_path) = setup_temp_log();
    // Key "2" is taken while the table holds a single entry
    write_log(&log_path, &[("2", "http://x.com")]);

    let store = Store::open(sync_config(&log_path)).unwrap();

    assert_eq!(store.put("http://a.com"), "1");
    // count() is 2 now, "2" is taken, next candidate is "3"
    assert_eq!(store.put("http://b.com"), "3");
    assert_eq!(store.get("2"), Some("http://x.com".to_string()));
    assert_eq!(store.count(), 3);
}

// =============================================================================
// Async Persistence Tests
// =============================================================================

#[test]
fn test_queue_capacity_selects_mode() {
    let (_temp, log_path) = setup_temp_log();

    let store = Store::open(async_config(&log_path, 8)).unwrap();
    assert_eq!(
        store.persistence(),
        PersistenceMode::Async { queue_capacity: 8 }
    );
    store.close().unwrap();

    let store = Store::open(async_config(&log_path, 0)).unwrap();
    assert_eq!(store.persistence(), PersistenceMode::Sync);
}

#[test]
fn test_async_round_trip_after_close() {
    let (_temp, log_path) = setup_temp_log();
    let mut expected = Vec::new();
    {
        let store = Store::open(async_config(&log_path, 4)).unwrap();
        for i in 0..50 {
            let value = format!("http://async.example/{}", i);
            expected.push((store.put(&value), value));
        }
        assert_eq!(store.count(), 50);
        store.close().unwrap();
    }

    let store = Store::open(sync_config(&log_path)).unwrap();
    assert_eq!(store.count(), 50);
    for (key, value) in expected {
        assert_eq!(store.get(&key), Some(value));
    }
}

#[test]
fn test_async_drop_drains_queue() {
    let (_temp, log_path) = setup_temp_log();
    {
        let store = Store::open(async_config(&log_path, 1)).unwrap();
        for i in 0..20 {
            store.put(&format!("http://drop.example/{}", i));
        }
    }

    assert_eq!(log_record_count(&log_path), 20);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_distinct_puts() {
    let (_temp, log_path) = setup_temp_log();
    let store = Arc::new(Store::open(async_config(&log_path, 16)).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                (0..50)
                    .map(|i| {
                        let value = format!("http://t{}.example/{}", t, i);
                        (store.put(&value), value)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let pairs: Vec<(String, String)> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    let keys: HashSet<&String> = pairs.iter().map(|(k, _)| k).collect();
    assert_eq!(keys.len(), 400);
    assert_eq!(store.count(), 400);
    for (key, value) in &pairs {
        assert_eq!(store.get(key).as_ref(), Some(value));
    }

    Arc::try_unwrap(store).ok().unwrap().close().unwrap();

    let reopened = Store::open(sync_config(&log_path)).unwrap();
    assert_eq!(reopened.count(), 400);
}

#[test]
fn test_reads_during_writes() {
    let (_temp, log_path) = setup_temp_log();
    let store = Arc::new(Store::open(sync_config(&log_path)).unwrap());
    let first = store.put("http://first.com");

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..100 {
                store.put(&format!("http://w.example/{}", i));
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let first = first.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    assert_eq!(store.get(&first), Some("http://first.com".to_string()));
                    assert!(store.count() >= 1);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(store.count(), 101);
}
