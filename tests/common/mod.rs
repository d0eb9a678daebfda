//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use linda::{template, PersistentTupleSpace, Template, TupleSpace, ValueType};
use std::sync::Once;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route library log events to the test harness output
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Fresh space with logging enabled
pub fn space() -> TupleSpace {
    init_tracing();
    TupleSpace::new()
}

// ============================================================================
// TestStore - persistent space in a temp directory
// ============================================================================

/// Persistent space whose snapshot lives in a temp directory
pub struct TestStore {
    pub store: PersistentTupleSpace,
    pub dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        init_tracing();
        let dir = TempDir::new().expect("create temp dir");
        let store = PersistentTupleSpace::new(dir.path().join("linda_tuples.snap"));
        TestStore { store, dir }
    }

    /// Second store over the same snapshot file, as after a restart
    pub fn reopen(&self) -> PersistentTupleSpace {
        PersistentTupleSpace::new(self.store.snapshot_path())
    }
}

// ============================================================================
// Templates and timing
// ============================================================================

/// `(Integer, String)`
pub fn int_string() -> Template {
    template![ValueType::Int, ValueType::String]
}

/// `(String, Integer)`
pub fn string_int() -> Template {
    template![ValueType::String, ValueType::Int]
}

/// `(Boolean, String)`
pub fn bool_string() -> Template {
    template![ValueType::Bool, ValueType::String]
}

/// There is no way to observe a parked thread, so give waiters time to block
pub fn let_waiters_park() {
    thread::sleep(Duration::from_millis(100));
}
