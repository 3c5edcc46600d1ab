//! Log Appenders
//!
//! The two ways an accepted record reaches the log:
//! - **Sync**: the calling thread writes under a mutex before returning.
//! - **Async**: the record goes onto a bounded queue; a single worker
//!   thread owns the writer and drains the queue in submission order.
//!   A full queue blocks the submitter until the worker catches up.
//!
//! ```text
//!  put() ──┐
//!  put() ──┼──► bounded queue ──► worker thread ──► LogWriter ──► file
//!  put() ──┘     (crossbeam)       (sole owner)
//! ```

use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::config::PersistenceMode;
use crate::error::{Result, StoreError};

use super::{LogWriter, Record};

/// Destination the persistence worker writes into
pub trait RecordSink: Send + 'static {
    /// Persist one record, returning its LSN
    fn write_record(&mut self, record: &Record) -> Result<u64>;

    /// Flush everything written so far to stable storage
    fn sync(&mut self) -> Result<()>;
}

impl RecordSink for LogWriter {
    fn write_record(&mut self, record: &Record) -> Result<u64> {
        self.append(record)
    }

    fn sync(&mut self) -> Result<()> {
        LogWriter::sync(self)
    }
}

/// Counters reported by the worker when it exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub records_written: u64,
    pub records_failed: u64,
}

/// Bounded queue plus the one thread that drains it
pub struct AsyncAppender {
    sender: Option<Sender<Record>>,
    worker: Option<JoinHandle<WorkerStats>>,
    capacity: usize,
}

impl AsyncAppender {
    /// Start a worker that owns `sink`, fed by a queue of `capacity` records
    pub fn spawn<S: RecordSink>(sink: S, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(StoreError::Config(
                "async appender needs a queue capacity of at least 1".to_string(),
            ));
        }

        let (sender, receiver) = channel::bounded(capacity);
        let worker = thread::Builder::new()
            .name("linkstore-log".to_string())
            .spawn(move || run_worker(sink, receiver))?;

        tracing::debug!("Log worker started with queue capacity {}", capacity);

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            capacity,
        })
    }

    /// Queue a record for the worker, blocking while the queue is full
    pub fn submit(&self, record: Record) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(StoreError::LogClosed)?;
        sender.send(record).map_err(|_| StoreError::LogClosed)
    }

    /// Records waiting in the queue (not counting one the worker holds)
    pub fn pending(&self) -> usize {
        self.sender.as_ref().map_or(0, |s| s.len())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Close the queue, wait for the worker to drain it and return its stats
    pub fn shutdown(mut self) -> Result<WorkerStats> {
        self.finish()
    }

    fn finish(&mut self) -> Result<WorkerStats> {
        // Dropping the only sender ends the worker's receive loop once the
        // queue is empty.
        drop(self.sender.take());

        match self.worker.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| StoreError::LogWorker("log worker panicked".to_string())),
            None => Ok(WorkerStats::default()),
        }
    }
}

impl Drop for AsyncAppender {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(e) = self.finish() {
                tracing::error!("Log worker did not shut down cleanly: {}", e);
            }
        }
    }
}

fn run_worker<S: RecordSink>(mut sink: S, queue: Receiver<Record>) -> WorkerStats {
    let mut stats = WorkerStats::default();

    for record in queue.iter() {
        match sink.write_record(&record) {
            Ok(lsn) => {
                stats.records_written += 1;
                tracing::trace!("Persisted key {} at lsn {}", record.key, lsn);
            }
            Err(e) => {
                // One bad record must not stop the ones behind it
                stats.records_failed += 1;
                tracing::warn!("Failed to persist record for key {}: {}", record.key, e);
            }
        }
    }

    if let Err(e) = sink.sync() {
        tracing::warn!("Failed to sync log on worker shutdown: {}", e);
    }

    tracing::debug!(
        "Log worker stopped: {} written, {} failed",
        stats.records_written,
        stats.records_failed
    );

    stats
}

/// Persistence path chosen at store construction
pub enum LogAppender {
    /// Caller writes inline
    Sync(Mutex<Box<dyn RecordSink>>),

    /// Caller enqueues; the worker writes
    Async(AsyncAppender),
}

impl LogAppender {
    pub fn new<S: RecordSink>(sink: S, mode: PersistenceMode) -> Result<Self> {
        match mode {
            PersistenceMode::Sync => Ok(Self::Sync(Mutex::new(Box::new(sink)))),
            PersistenceMode::Async { queue_capacity } => {
                Ok(Self::Async(AsyncAppender::spawn(sink, queue_capacity)?))
            }
        }
    }

    /// Hand a record to the log
    ///
    /// In sync mode the result is the write outcome. In async mode it only
    /// reports whether the record was queued; write failures are logged by
    /// the worker.
    pub fn append(&self, record: Record) -> Result<()> {
        match self {
            Self::Sync(sink) => sink.lock().write_record(&record).map(|_| ()),
            Self::Async(appender) => appender.submit(record),
        }
    }

    pub fn mode(&self) -> PersistenceMode {
        match self {
            Self::Sync(_) => PersistenceMode::Sync,
            Self::Async(appender) => PersistenceMode::Async {
                queue_capacity: appender.capacity(),
            },
        }
    }

    /// Drain outstanding records and fsync
    pub fn close(self) -> Result<()> {
        match self {
            Self::Sync(sink) => sink.into_inner().sync(),
            Self::Async(appender) => {
                let stats = appender.shutdown()?;
                if stats.records_failed > 0 {
                    tracing::warn!(
                        "{} records could not be persisted during this session",
                        stats.records_failed
                    );
                }
                Ok(())
            }
        }
    }
}
