//! Error types for tuple spaces
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! A normal "no match" outcome is never an error: non-blocking retrievals
//! return `None` or an empty `Vec`.

use crate::limits::LimitError;
use std::io;
use thiserror::Error;

/// Result type alias for tuple space operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for tuple spaces
#[derive(Debug, Error)]
pub enum Error {
    /// Ill-formed tuple passed to `write`
    #[error("Invalid tuple: {0}")]
    InvalidTuple(LimitError),

    /// Ill-formed template passed to a retrieval or registration
    #[error("Invalid template: {0}")]
    InvalidTemplate(LimitError),

    /// A blocking wait was cancelled through its token
    #[error("Wait cancelled")]
    Cancelled,

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// An operation was invoked on a space from inside one of its own callbacks
    #[error("Reentrant call to {0} from inside a callback")]
    ReentrantCall(&'static str),

    /// I/O error (file operations, etc.)
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Persisted data is corrupt or unreadable
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Is this the cancellation signal of a blocking wait
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Is this a rejected argument (tuple or template)
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidTuple(_) | Error::InvalidTemplate(_))
    }
}
