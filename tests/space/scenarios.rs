//! Reference scenarios

use crate::common::*;
use linda::{tuple, EventMode, EventTiming};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;

/// Scenario A: write then non-blocking read leaves the tuple in place
#[test]
fn scenario_a_write_then_try_read() {
    let space = space();
    space.write(tuple![42, "hello"]).unwrap();

    let found = space.try_read(&int_string()).unwrap();
    assert_eq!(found, Some(tuple![42, "hello"]));
    assert_eq!(space.len().unwrap(), 1);
}

/// Scenario B: take_all removes every match and nothing else
#[test]
fn scenario_b_take_all_then_read_all() {
    let space = space();
    space.write(tuple![1, "a"]).unwrap();
    space.write(tuple![2, "b"]).unwrap();
    space.write(tuple![3, "c"]).unwrap();
    space.write(tuple!["x", 4]).unwrap();

    let taken = space.take_all(&int_string()).unwrap();
    assert_eq!(taken.len(), 3);
    assert!(space.read_all(&int_string()).unwrap().is_empty());
    assert_eq!(
        space.try_read(&string_int()).unwrap(),
        Some(tuple!["x", 4])
    );
}

/// Scenario C: a blocked take returns once a matching tuple is written
#[test]
fn scenario_c_blocking_take_unblocks_on_write() {
    let space = space();
    let t1 = {
        let space = space.clone();
        thread::spawn(move || space.take(&bool_string()).unwrap())
    };

    let_waiters_park();
    space.write(tuple![true, "blocking"]).unwrap();

    assert_eq!(t1.join().unwrap(), tuple![true, "blocking"]);
    assert_eq!(space.try_read(&bool_string()).unwrap(), None);
}

/// Scenario D: a future take registration consumes one write, once
#[test]
fn scenario_d_future_take_registration_fires_once() {
    let space = space();
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);

    space
        .event_register(EventMode::Take, EventTiming::Future, int_string(), move |t| {
            sink.lock().push(t);
            Ok(())
        })
        .unwrap();

    space.write(tuple![1, "a"]).unwrap();
    assert_eq!(*delivered.lock(), vec![tuple![1, "a"]]);
    assert_eq!(space.try_read(&int_string()).unwrap(), None);

    space.write(tuple![2, "b"]).unwrap();
    assert_eq!(delivered.lock().len(), 1);
    assert_eq!(space.try_read(&int_string()).unwrap(), Some(tuple![2, "b"]));
}
