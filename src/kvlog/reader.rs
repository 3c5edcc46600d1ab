//! Log Reader
//!
//! Reads frames sequentially from the start of the log file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{Result, StoreError};

use super::entry::FrameHeader;
use super::{LogEntry, HEADER_SIZE};

/// Reads entries from the log file
pub struct LogReader {
    reader: BufReader<File>,
    /// Byte offset of the next frame (end of the last good one)
    position: u64,
}

impl LogReader {
    /// Open a log file for reading from offset 0
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Offset just past the last successfully decoded frame
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the next entry from the log
    ///
    /// Returns:
    /// - `Ok(Some(entry))` for a complete, checksummed frame
    /// - `Ok(None)` at a clean end of file (frame boundary)
    /// - `Err(LogTruncated)` when the file ends mid-frame
    /// - `Err(LogCorruption | Serialization)` for a damaged frame
    pub fn next_entry(&mut self) -> Result<Option<LogEntry>> {
        let mut header_buf = [0u8; HEADER_SIZE];
        let read = read_full(&mut self.reader, &mut header_buf)?;
        if read == 0 {
            return Ok(None);
        }
        if read < HEADER_SIZE {
            return Err(StoreError::LogTruncated {
                offset: self.position,
            });
        }

        let header = FrameHeader::parse(&header_buf)?;

        let mut payload = vec![0u8; header.len as usize];
        let read = read_full(&mut self.reader, &mut payload)?;
        if read < payload.len() {
            return Err(StoreError::LogTruncated {
                offset: self.position,
            });
        }

        let entry = LogEntry::decode(header, &payload)?;
        self.position += (HEADER_SIZE + payload.len()) as u64;

        Ok(Some(entry))
    }

    /// Iterate over entries; the iterator ends after the first error
    pub fn entries(self) -> LogIterator {
        LogIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over log entries
pub struct LogIterator {
    reader: LogReader,
    done: bool,
}

impl Iterator for LogIterator {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` as far as the stream allows, returning the bytes read.
/// Unlike `read_exact`, a short count is reported instead of an error so
/// the caller can tell a clean EOF from a torn frame.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
