//! Snapshot persistence for a tuple space
//!
//! `PersistentTupleSpace` pairs a [`TupleSpace`] with a snapshot file. Saves
//! and loads run under the space lock, so a snapshot is a point-in-time image
//! and a restore is atomic with respect to every other operation. Callers
//! block for the duration of the I/O.
//!
//! Nothing is saved implicitly. Call [`PersistentTupleSpace::shutdown`] before
//! exiting to keep the contents.

use crate::config::SpaceConfig;
use crate::space::TupleSpace;
use linda_core::{Error, Result};
use linda_durability::{SnapshotError, SnapshotInfo, SnapshotReader, SnapshotWriter};
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A tuple space with a snapshot file
///
/// Dereferences to [`TupleSpace`], so every space operation is available
/// directly.
#[derive(Debug, Clone)]
pub struct PersistentTupleSpace {
    space: TupleSpace,
    snapshot_path: PathBuf,
}

impl PersistentTupleSpace {
    /// Open a space as described by `config`
    ///
    /// With `load_on_open`, an existing snapshot is restored; a missing one
    /// leaves the space empty.
    ///
    /// # Errors
    ///
    /// `Error::Config` for an invalid config, `Error::Corruption` for an
    /// unreadable snapshot.
    pub fn open(config: &SpaceConfig) -> Result<Self> {
        config.validate()?;
        let store = Self::with_space(
            TupleSpace::with_limits(config.limits()),
            config.snapshot_path.clone(),
        );
        if config.load_on_open {
            store.load()?;
        }
        Ok(store)
    }

    /// Empty space with default limits, saving to `snapshot_path`
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self::with_space(TupleSpace::new(), snapshot_path)
    }

    /// Attach an existing space to `snapshot_path`
    pub fn with_space(space: TupleSpace, snapshot_path: impl Into<PathBuf>) -> Self {
        PersistentTupleSpace {
            space,
            snapshot_path: snapshot_path.into(),
        }
    }

    /// The underlying space
    pub fn space(&self) -> &TupleSpace {
        &self.space
    }

    /// Default snapshot location
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Save the current contents to the default snapshot path
    pub fn save(&self) -> Result<SnapshotInfo> {
        self.save_to(&self.snapshot_path)
    }

    /// Save the current contents to `path`, replacing any existing file
    ///
    /// The previous file survives a failed save.
    pub fn save_to(&self, path: &Path) -> Result<SnapshotInfo> {
        let written = self.space.with_contents("save", |contents| {
            SnapshotWriter::new().write_atomic(contents.tuples(), path)
        })?;

        match written {
            Ok(info) => {
                info!(
                    space = self.space.id(),
                    path = %info.path.display(),
                    tuples = info.tuple_count,
                    bytes = info.size_bytes,
                    "tuple space saved"
                );
                Ok(info)
            }
            Err(e) => {
                warn!(
                    space = self.space.id(),
                    path = %path.display(),
                    error = %e,
                    "tuple space save failed"
                );
                Err(e.into())
            }
        }
    }

    /// Restore from the default snapshot path
    ///
    /// See [`PersistentTupleSpace::load_from`].
    pub fn load(&self) -> Result<Option<usize>> {
        self.load_from(&self.snapshot_path)
    }

    /// Replace the contents with the tuples saved at `path`
    ///
    /// Returns the number of restored tuples, or `None` when no file exists
    /// (the space is left untouched). Blocked retrievals are woken after a
    /// restore. Pending registrations are not fired by restored tuples.
    ///
    /// # Errors
    ///
    /// `Error::Corruption` if the file is damaged or holds tuples beyond this
    /// space's limits; the contents are unchanged in that case.
    pub fn load_from(&self, path: &Path) -> Result<Option<usize>> {
        let restored = self.space.with_contents("load", |contents| {
            let snapshot = match SnapshotReader::read(path) {
                Ok(snapshot) => snapshot,
                Err(SnapshotError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                    return Ok(None);
                }
                Err(e) => return Err(Error::from(e)),
            };

            for (index, tuple) in snapshot.tuples.iter().enumerate() {
                contents.limits().validate_tuple(tuple).map_err(|e| {
                    Error::Corruption(format!("snapshot tuple {} is invalid: {}", index, e))
                })?;
            }

            let count = snapshot.tuples.len();
            contents.replace(snapshot.tuples);
            Ok(Some(count))
        })?;

        match &restored {
            Ok(Some(count)) => info!(
                space = self.space.id(),
                path = %path.display(),
                tuples = count,
                "tuple space restored"
            ),
            Ok(None) => info!(
                space = self.space.id(),
                path = %path.display(),
                "no snapshot to restore"
            ),
            Err(e) => warn!(
                space = self.space.id(),
                path = %path.display(),
                error = %e,
                "tuple space restore failed"
            ),
        }
        restored
    }

    /// Best-effort save to the default snapshot path
    ///
    /// Failures are logged and otherwise ignored.
    pub fn shutdown(&self) {
        if let Err(e) = self.save() {
            warn!(
                space = self.space.id(),
                path = %self.snapshot_path.display(),
                error = %e,
                "save on shutdown failed; contents not persisted"
            );
        }
    }
}

impl Deref for PersistentTupleSpace {
    type Target = TupleSpace;

    fn deref(&self) -> &TupleSpace {
        &self.space
    }
}
