//! Durability layer for Linda tuple spaces
//!
//! This crate handles everything that touches disk:
//!
//! - Snapshot file format: versioned header, MessagePack payload, CRC32
//! - Atomic snapshot writes (temp file + rename)
//! - Snapshot reading with corruption detection
//!
//! Locking is the caller's concern: the engine holds the space lock while
//! it calls [`SnapshotWriter`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod snapshot; // Snapshot writer and reader
pub mod snapshot_types; // Snapshot header and error types

pub use snapshot::{decode_tuples, encode_tuples, Snapshot, SnapshotReader, SnapshotWriter};
pub use snapshot_types::{
    now_micros, SnapshotError, SnapshotHeader, SnapshotInfo, MIN_SNAPSHOT_SIZE,
    SNAPSHOT_HEADER_SIZE, SNAPSHOT_MAGIC, SNAPSHOT_VERSION_1,
};
