//! Tuple space engine
//!
//! This crate orchestrates the lower layers:
//! - TupleSpace: the shared tuple multiset with blocking and non-blocking retrieval
//! - Event registrations: callbacks fired by matching writes
//! - Cancellation tokens for blocking waits
//! - Snapshot persistence (save / load / shutdown)
//! - Configuration via `linda.toml`
//!
//! The engine is the only component that knows about:
//! - Locking and wakeups
//! - Callback invocation and reentrancy
//! - Coordinating space contents with the snapshot file

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod config;
pub mod events;
pub mod persistent;
pub mod space;

pub use cancel::CancelToken;
pub use config::{SpaceConfig, CONFIG_FILE_NAME, DEFAULT_SNAPSHOT_FILE};
pub use events::{Callback, EventMode, EventTiming};
pub use persistent::PersistentTupleSpace;
pub use space::{SpaceStats, TupleSpace};

// Re-export the data model so engine users need a single dependency
pub use linda_core::{
    template, tuple, Error, Limits, Result, Template, TemplateField, Tuple, Value, ValueType,
};
