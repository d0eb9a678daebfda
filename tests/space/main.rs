//! Tuple space integration tests
//!
//! Cross-crate tests through the public `linda` API:
//! - scenarios: the reference walkthroughs (write/read, bulk take, blocking take, event take)
//! - properties: matching, retrieval and persistence laws
//! - events: registration timing, modes, ordering and failure isolation
//! - persistence: snapshot save/load/shutdown and config-driven open

#[path = "../common/mod.rs"]
mod common;

mod persistence;
mod properties;
mod scenarios;
