//! Space configuration via `linda.toml`
//!
//! A persistent space reads its snapshot location and input limits from a
//! small config file. A default `linda.toml` can be written on first use; to
//! change settings, edit the file and reopen the space.

use linda_core::{Error, Limits, Result, DEFAULT_MAX_ARITY, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name used next to the snapshot.
pub const CONFIG_FILE_NAME: &str = "linda.toml";

/// Snapshot file used when none is configured.
pub const DEFAULT_SNAPSHOT_FILE: &str = "linda_tuples.snap";

/// Configuration for a persistent tuple space, loaded from `linda.toml`.
///
/// # Example
///
/// ```toml
/// snapshot_path = "linda_tuples.snap"
/// load_on_open = true
/// max_arity = 64
/// max_depth = 16
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceConfig {
    /// Where `save` and `load` read and write the snapshot.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    /// Restore the snapshot when the space is opened.
    #[serde(default = "default_load_on_open")]
    pub load_on_open: bool,
    /// Maximum number of fields in a tuple or template.
    #[serde(default = "default_max_arity")]
    pub max_arity: usize,
    /// Maximum nesting depth of tuples and templates.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from(DEFAULT_SNAPSHOT_FILE)
}

fn default_load_on_open() -> bool {
    true
}

fn default_max_arity() -> usize {
    DEFAULT_MAX_ARITY
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            load_on_open: default_load_on_open(),
            max_arity: default_max_arity(),
            max_depth: default_max_depth(),
        }
    }
}

impl SpaceConfig {
    /// Default config with a different snapshot location
    pub fn with_snapshot_path(path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: path.into(),
            ..Self::default()
        }
    }

    /// Input limits described by this config
    pub fn limits(&self) -> Limits {
        Limits {
            max_arity: self.max_arity,
            max_depth: self.max_depth,
        }
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an empty snapshot path or a zero limit.
    pub fn validate(&self) -> Result<()> {
        if self.snapshot_path.as_os_str().is_empty() {
            return Err(Error::Config("snapshot_path must not be empty".to_string()));
        }
        if self.max_arity == 0 {
            return Err(Error::Config("max_arity must be at least 1".to_string()));
        }
        if self.max_depth == 0 {
            return Err(Error::Config("max_depth must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Linda tuple space configuration
#
# Snapshot file written by save/shutdown and read by load.
snapshot_path = "linda_tuples.snap"

# Restore the snapshot when the space is opened (default: true).
# A missing snapshot file is not an error.
load_on_open = true

# Input limits. Tuples and templates beyond them are rejected.
max_arity = 64
max_depth = 16
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: SpaceConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
