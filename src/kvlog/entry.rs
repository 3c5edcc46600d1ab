//! Log entry definitions
//!
//! Defines the persisted record and its on-disk frame.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Frame header size: LSN (8) + CRC (4) + payload length (4)
pub const HEADER_SIZE: usize = 16;

/// Largest payload a frame may carry (16 MB). A length field above this
/// can only come from a torn or corrupted header.
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// One durable fact: `key` maps to `value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub value: String,
}

impl Record {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A record together with its position in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Log Sequence Number - monotonically increasing, starts at 1
    pub lsn: u64,

    /// The persisted pair
    pub record: Record,
}

/// Parsed fixed-size frame header
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl FrameHeader {
    pub(crate) fn parse(buf: &[u8; HEADER_SIZE]) -> Result<Self> {
        let mut lsn = [0u8; 8];
        let mut crc = [0u8; 4];
        let mut len = [0u8; 4];
        lsn.copy_from_slice(&buf[0..8]);
        crc.copy_from_slice(&buf[8..12]);
        len.copy_from_slice(&buf[12..16]);

        let header = Self {
            lsn: u64::from_le_bytes(lsn),
            crc: u32::from_le_bytes(crc),
            len: u32::from_le_bytes(len),
        };

        if header.len > MAX_PAYLOAD_SIZE {
            return Err(StoreError::LogCorruption(format!(
                "payload length {} exceeds maximum {}",
                header.len, MAX_PAYLOAD_SIZE
            )));
        }

        Ok(header)
    }
}

impl LogEntry {
    pub fn new(lsn: u64, record: Record) -> Self {
        Self { lsn, record }
    }

    /// Serialize this entry into a complete frame
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Self::encode(self.lsn, &self.record)
    }

    /// Frame a borrowed record without building a `LogEntry`
    pub(crate) fn encode(lsn: u64, record: &Record) -> Result<Vec<u8>> {
        let payload =
            bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        if payload.len() > MAX_PAYLOAD_SIZE as usize {
            return Err(StoreError::Serialization(format!(
                "record of {} bytes exceeds maximum {}",
                payload.len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        let crc = compute_crc(lsn, &payload);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&lsn.to_le_bytes());
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&payload);

        Ok(bytes)
    }

    /// Deserialize one frame from the start of `bytes`
    ///
    /// Trailing bytes beyond the frame are ignored. A slice that ends
    /// mid-frame yields `IncompleteFrame`; file offsets are the reader's
    /// business.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(StoreError::IncompleteFrame {
                needed: HEADER_SIZE,
                available: bytes.len(),
            });
        }

        let mut header_buf = [0u8; HEADER_SIZE];
        header_buf.copy_from_slice(&bytes[..HEADER_SIZE]);
        let header = FrameHeader::parse(&header_buf)?;

        let end = HEADER_SIZE + header.len as usize;
        if bytes.len() < end {
            return Err(StoreError::IncompleteFrame {
                needed: end,
                available: bytes.len(),
            });
        }

        Self::decode(header, &bytes[HEADER_SIZE..end])
    }

    /// Verify the checksum and decode the payload of a frame
    pub(crate) fn decode(header: FrameHeader, payload: &[u8]) -> Result<Self> {
        let actual = compute_crc(header.lsn, payload);
        if actual != header.crc {
            return Err(StoreError::LogCorruption(format!(
                "CRC mismatch for lsn {}: expected {:#010x}, got {:#010x}",
                header.lsn, header.crc, actual
            )));
        }

        let record: Record =
            bincode::deserialize(payload).map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(Self {
            lsn: header.lsn,
            record,
        })
    }

    /// Total frame size on disk
    pub fn encoded_len(&self) -> Result<usize> {
        let payload = bincode::serialized_size(&self.record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(HEADER_SIZE + payload as usize)
    }
}

fn compute_crc(lsn: u64, payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&lsn.to_le_bytes());
    hasher.update(payload);
    hasher.finalize()
}
