//! Snapshot Writer and Reader
//!
//! This module implements snapshot persistence for tuple spaces with:
//! - MessagePack payload of the tuple list (insertion order preserved)
//! - CRC32 checksum over header and payload
//! - Atomic write (temp file + rename) that overwrites any previous snapshot
//!
//! The writer and reader know nothing about locking. Callers hand the writer
//! a consistent copy of the space and install what the reader returns.
//!
//! ## Usage
//!
//! ```ignore
//! let mut writer = SnapshotWriter::new();
//! let info = writer.write_atomic(&tuples, path)?;
//!
//! let snapshot = SnapshotReader::read(path)?;
//! assert_eq!(snapshot.tuples.len() as u64, info.tuple_count);
//! ```

use crate::snapshot_types::*;
use linda_core::Tuple;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// Payload encoding
// ============================================================================

/// Encode a tuple list as the snapshot payload
pub fn encode_tuples(tuples: &[Tuple]) -> Result<Vec<u8>, SnapshotError> {
    rmp_serde::to_vec(tuples).map_err(|e| SnapshotError::Serialize(e.to_string()))
}

/// Decode a snapshot payload back into a tuple list
pub fn decode_tuples(payload: &[u8]) -> Result<Vec<Tuple>, SnapshotError> {
    rmp_serde::from_slice(payload).map_err(|e| SnapshotError::Deserialize(e.to_string()))
}

// ============================================================================
// Snapshot Writer
// ============================================================================

/// Snapshot writer with CRC32 checksum support
pub struct SnapshotWriter {
    hasher: crc32fast::Hasher,
}

impl SnapshotWriter {
    /// Create a new snapshot writer
    pub fn new() -> Self {
        SnapshotWriter {
            hasher: crc32fast::Hasher::new(),
        }
    }

    /// Write snapshot to file
    ///
    /// Writes header, payload, and CRC32 checksum.
    /// Does NOT use atomic write - call `write_atomic` for that.
    pub fn write(&mut self, tuples: &[Tuple], path: &Path) -> Result<SnapshotInfo, SnapshotError> {
        debug!(path = %path.display(), tuples = tuples.len(), "Writing snapshot");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let payload = encode_tuples(tuples)?;
        let header = SnapshotHeader::new(tuples.len() as u64, payload.len() as u64);

        let mut file = File::create(path)?;
        self.hasher = crc32fast::Hasher::new();

        let header_bytes = header.to_bytes();
        file.write_all(&header_bytes)?;
        self.hasher.update(&header_bytes);

        file.write_all(&payload)?;
        self.hasher.update(&payload);

        let checksum = self.hasher.clone().finalize();
        file.write_all(&checksum.to_le_bytes())?;

        file.sync_all()?;

        let size_bytes = std::fs::metadata(path)?.len();

        info!(
            path = %path.display(),
            tuple_count = header.tuple_count,
            size_bytes,
            "Snapshot written successfully"
        );

        Ok(SnapshotInfo {
            path: path.to_path_buf(),
            timestamp_micros: header.timestamp_micros,
            tuple_count: header.tuple_count,
            size_bytes,
        })
    }

    /// Write snapshot atomically
    ///
    /// Uses temp file + rename pattern:
    /// 1. Write to temp file
    /// 2. Sync temp file
    /// 3. Rename temp to final (atomic on POSIX)
    ///
    /// If any step fails, temp file is cleaned up and the previous snapshot
    /// at `path`, if any, is left untouched.
    pub fn write_atomic(
        &mut self,
        tuples: &[Tuple],
        path: &Path,
    ) -> Result<SnapshotInfo, SnapshotError> {
        let temp_path = path.with_extension("snap.tmp");

        debug!(
            final_path = %path.display(),
            temp_path = %temp_path.display(),
            "Starting atomic snapshot write"
        );

        // Clean up stale temp file if exists (from previous failed attempt)
        if temp_path.exists() {
            warn!(path = %temp_path.display(), "Removing stale temp file");
            let _ = std::fs::remove_file(&temp_path);
        }

        match self.write(tuples, &temp_path) {
            Ok(info) => match std::fs::rename(&temp_path, path) {
                Ok(()) => {
                    debug!(path = %path.display(), "Atomic rename completed");
                    Ok(SnapshotInfo {
                        path: path.to_path_buf(),
                        ..info
                    })
                }
                Err(e) => {
                    warn!(
                        temp_path = %temp_path.display(),
                        error = %e,
                        "Rename failed, cleaning up temp file"
                    );
                    let _ = std::fs::remove_file(&temp_path);
                    Err(SnapshotError::Io(e))
                }
            },
            Err(e) => {
                warn!(
                    temp_path = %temp_path.display(),
                    error = %e,
                    "Write failed, cleaning up temp file"
                );
                let _ = std::fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }
}

impl Default for SnapshotWriter {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Snapshot Reader
// ============================================================================

/// A decoded snapshot
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Parsed header
    pub header: SnapshotHeader,
    /// Tuples in the order they were saved
    pub tuples: Vec<Tuple>,
}

/// Snapshot reader for reading and validating snapshots
pub struct SnapshotReader;

impl SnapshotReader {
    /// Validate snapshot checksum from file
    pub fn validate_checksum(path: &Path) -> Result<(), SnapshotError> {
        let data = std::fs::read(path)?;
        Self::validate_checksum_from_bytes(&data)
    }

    /// Validate checksum from bytes
    pub fn validate_checksum_from_bytes(data: &[u8]) -> Result<(), SnapshotError> {
        if data.len() < MIN_SNAPSHOT_SIZE {
            return Err(SnapshotError::TooShort {
                expected: MIN_SNAPSHOT_SIZE,
                actual: data.len(),
            });
        }

        let (content, checksum_bytes) = data.split_at(data.len() - 4);
        let stored = u32::from_le_bytes([
            checksum_bytes[0],
            checksum_bytes[1],
            checksum_bytes[2],
            checksum_bytes[3],
        ]);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(content);
        let computed = hasher.finalize();

        if stored != computed {
            return Err(SnapshotError::ChecksumMismatch {
                expected: stored,
                actual: computed,
            });
        }

        Ok(())
    }

    /// Read snapshot header from file
    pub fn read_header(path: &Path) -> Result<SnapshotHeader, SnapshotError> {
        let data = std::fs::read(path)?;
        SnapshotHeader::from_bytes(&data)
    }

    /// Read and decode a complete snapshot from file
    pub fn read(path: &Path) -> Result<Snapshot, SnapshotError> {
        let data = std::fs::read(path)?;
        Self::parse(&data)
    }

    /// Parse and decode a snapshot from bytes
    pub fn parse(data: &[u8]) -> Result<Snapshot, SnapshotError> {
        // Header first so a foreign file reports bad magic rather than a checksum
        let header = SnapshotHeader::from_bytes(data)?;
        Self::validate_checksum_from_bytes(data)?;

        let payload = &data[SNAPSHOT_HEADER_SIZE..data.len() - 4];
        if payload.len() as u64 != header.payload_len {
            return Err(SnapshotError::LengthMismatch {
                expected: header.payload_len,
                actual: payload.len() as u64,
            });
        }

        let tuples = decode_tuples(payload)?;
        if tuples.len() as u64 != header.tuple_count {
            return Err(SnapshotError::LengthMismatch {
                expected: header.tuple_count,
                actual: tuples.len() as u64,
            });
        }

        debug!(tuple_count = tuples.len(), "Parsed snapshot");
        Ok(Snapshot { header, tuples })
    }
}

// ============================================================================
// Tests
// ============================================================================
