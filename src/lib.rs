//! Linda - pattern-matched shared memory for concurrent processes
//!
//! A tuple space holds ordered, typed tuples. Processes coordinate by writing
//! tuples and retrieving them with templates whose fields are either literal
//! values or type wildcards.
//!
//! # Quick Start
//!
//! ```
//! use linda::{template, tuple, TupleSpace, ValueType};
//!
//! let space = TupleSpace::new();
//! space.write(tuple![42, "hello"])?;
//!
//! // Non-blocking read leaves the tuple in place
//! let seen = space.try_read(&template![ValueType::Int, ValueType::String])?;
//! assert_eq!(seen, Some(tuple![42, "hello"]));
//! assert_eq!(space.len()?, 1);
//! # Ok::<(), linda::Error>(())
//! ```
//!
//! # Architecture
//!
//! - `linda-core`: values, tuples, templates, matching, limits, errors
//! - `linda-durability`: the snapshot file format
//! - `linda-engine`: the space itself, event registrations, persistence, config
//!
//! This crate re-exports the public API of all three.

pub use linda_core::{
    matches, template, tuple, Error, LimitError, Limits, Result, Template, TemplateField, Tuple,
    Value, ValueType, DEFAULT_MAX_ARITY, DEFAULT_MAX_DEPTH,
};
pub use linda_durability::{SnapshotError, SnapshotInfo};
pub use linda_engine::{
    Callback, CancelToken, EventMode, EventTiming, PersistentTupleSpace, SpaceConfig, SpaceStats,
    TupleSpace, CONFIG_FILE_NAME, DEFAULT_SNAPSHOT_FILE,
};
