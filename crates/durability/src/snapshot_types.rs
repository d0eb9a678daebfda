//! Snapshot format types
//!
//! This module defines the snapshot envelope used to persist a point-in-time
//! image of a tuple space.
//!
//! ## Snapshot File Layout
//!
//! ```text
//! +------------------+
//! | Magic (10 bytes) |  "LINDA_SNAP"
//! +------------------+
//! | Version (4)      |  Format version (1)
//! +------------------+
//! | Timestamp (8)    |  Microseconds since epoch
//! +------------------+
//! | Tuple Count (8)  |  Number of tuples in the payload
//! +------------------+
//! | Payload Len (8)  |  Length of the payload in bytes
//! +------------------+
//! | Payload          |  MessagePack-encoded list of tuples, insertion order
//! +------------------+
//! | CRC32 (4)        |  Checksum of everything above
//! +------------------+
//! ```
//!
//! All integers are little-endian.

use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Snapshot file magic bytes
pub const SNAPSHOT_MAGIC: &[u8; 10] = b"LINDA_SNAP";

/// Snapshot format version 1
pub const SNAPSHOT_VERSION_1: u32 = 1;

/// Header size: Magic(10) + Version(4) + Timestamp(8) + TupleCount(8) + PayloadLen(8)
pub const SNAPSHOT_HEADER_SIZE: usize = 38;

/// Minimum snapshot size: Header + CRC32(4)
pub const MIN_SNAPSHOT_SIZE: usize = SNAPSHOT_HEADER_SIZE + 4;

// ============================================================================
// Snapshot Header
// ============================================================================

/// Snapshot header with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Format version
    pub version: u32,
    /// When snapshot was taken (microseconds since epoch)
    pub timestamp_micros: u64,
    /// Number of tuples in the payload
    pub tuple_count: u64,
    /// Payload length in bytes
    pub payload_len: u64,
}

impl SnapshotHeader {
    /// Create new header with current timestamp
    pub fn new(tuple_count: u64, payload_len: u64) -> Self {
        SnapshotHeader {
            version: SNAPSHOT_VERSION_1,
            timestamp_micros: now_micros(),
            tuple_count,
            payload_len,
        }
    }

    /// Serialize header to bytes (including magic)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SNAPSHOT_HEADER_SIZE);
        buf.extend_from_slice(SNAPSHOT_MAGIC);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.timestamp_micros.to_le_bytes());
        buf.extend_from_slice(&self.tuple_count.to_le_bytes());
        buf.extend_from_slice(&self.payload_len.to_le_bytes());
        buf
    }

    /// Parse header from bytes (including magic)
    pub fn from_bytes(data: &[u8]) -> Result<Self, SnapshotError> {
        if data.len() < SNAPSHOT_HEADER_SIZE {
            return Err(SnapshotError::TooShort {
                expected: SNAPSHOT_HEADER_SIZE,
                actual: data.len(),
            });
        }

        if &data[0..10] != SNAPSHOT_MAGIC {
            return Err(SnapshotError::InvalidMagic {
                found: data[0..10].to_vec(),
            });
        }

        let version = read_u32(&data[10..14]);
        if version != SNAPSHOT_VERSION_1 {
            return Err(SnapshotError::UnsupportedVersion(version));
        }

        Ok(SnapshotHeader {
            version,
            timestamp_micros: read_u64(&data[14..22]),
            tuple_count: read_u64(&data[22..30]),
            payload_len: read_u64(&data[30..38]),
        })
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

// ============================================================================
// Snapshot Info
// ============================================================================

/// Snapshot info returned after successful write
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    /// Path to snapshot file
    pub path: std::path::PathBuf,
    /// Timestamp when snapshot was taken
    pub timestamp_micros: u64,
    /// Number of tuples written
    pub tuple_count: u64,
    /// Total size in bytes
    pub size_bytes: u64,
}

// ============================================================================
// Error Types
// ============================================================================

/// Snapshot errors
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Snapshot data too short
    #[error("Snapshot too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Expected minimum size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// Invalid magic bytes
    #[error("Invalid magic bytes: expected LINDA_SNAP, found {:?}", found)]
    InvalidMagic {
        /// Found bytes
        found: Vec<u8>,
    },

    /// Unsupported version
    #[error("Unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Expected checksum
        expected: u32,
        /// Actual checksum
        actual: u32,
    },

    /// Payload length or tuple count disagrees with the header
    #[error("Length mismatch: header says {expected}, found {actual}")]
    LengthMismatch {
        /// Value recorded in the header
        expected: u64,
        /// Value found in the file
        actual: u64,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

impl From<SnapshotError> for linda_core::Error {
    fn from(e: SnapshotError) -> Self {
        match e {
            SnapshotError::Io(io) => linda_core::Error::IoError(io),
            SnapshotError::Serialize(msg) => linda_core::Error::SerializationError(msg),
            other => linda_core::Error::Corruption(other.to_string()),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Get current time in microseconds since epoch
///
/// Returns 0 if system clock is before Unix epoch (clock went backwards).
pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

// ============================================================================
// Tests
// ============================================================================
