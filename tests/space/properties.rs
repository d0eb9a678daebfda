//! Retrieval and persistence laws

use crate::common::*;
use linda::{
    template, tuple, CancelToken, EventMode, EventTiming, Template, TemplateField, Tuple, Value,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000).prop_map(Value::Int),
        (-1.0e6f64..1.0e6).prop_map(Value::Float),
        "[a-c]{0,2}".prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..3).prop_map(Value::Bytes),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(2, 8, 3, |inner| {
        prop::collection::vec(inner, 0..3).prop_map(|fields| Value::Tuple(Tuple::new(fields)))
    })
}

fn arb_tuple() -> impl Strategy<Value = Tuple> {
    prop::collection::vec(arb_value(), 0..4).prop_map(Tuple::new)
}

/// Fields are random literals or random type wildcards
fn arb_template() -> impl Strategy<Value = Template> {
    let field = prop_oneof![
        arb_value().prop_map(TemplateField::Literal),
        arb_value().prop_map(|v| match v.value_type() {
            Some(ty) => TemplateField::Type(ty),
            None => TemplateField::Literal(v),
        }),
    ];
    prop::collection::vec(field, 0..4).prop_map(Template::new)
}

/// Multiset comparison key
fn sorted(tuples: Vec<Tuple>) -> Vec<String> {
    let mut keys: Vec<String> = tuples.into_iter().map(|t| format!("{:?}", t)).collect();
    keys.sort();
    keys
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// P1: try_read finds a written tuple iff the template matches it
    #[test]
    fn p1_try_read_agrees_with_matching(t in arb_tuple(), m in arb_template()) {
        let space = space();
        space.write(t.clone()).unwrap();

        let found = space.try_read(&m).unwrap();
        if m.matches(&t) {
            prop_assert_eq!(found, Some(t));
        } else {
            prop_assert_eq!(found, None);
        }
        prop_assert_eq!(space.len().unwrap(), 1);
    }

    /// P1: a template built from a tuple always finds it
    #[test]
    fn p1_exact_template_finds_tuple(t in arb_tuple()) {
        let space = space();
        space.write(t.clone()).unwrap();
        prop_assert_eq!(space.try_read(&Template::exact(&t)).unwrap(), Some(t));
    }

    /// P2: take removes exactly one matching tuple
    #[test]
    fn p2_take_removes_exactly_one(tuples in prop::collection::vec(arb_tuple(), 1..8), pick in any::<prop::sample::Index>()) {
        let space = space();
        for t in &tuples {
            space.write(t.clone()).unwrap();
        }
        let target = pick.get(&tuples).clone();
        let m = Template::exact(&target);
        let before = space.count(&m).unwrap();

        let taken = space.take(&m).unwrap();
        prop_assert_eq!(taken, target);
        prop_assert_eq!(space.len().unwrap(), tuples.len() - 1);
        prop_assert_eq!(space.count(&m).unwrap(), before - 1);
    }

    /// P3: reads without intervening changes agree
    #[test]
    fn p3_reads_are_idempotent(tuples in prop::collection::vec(arb_tuple(), 0..8), m in arb_template()) {
        let space = space();
        for t in tuples {
            space.write(t).unwrap();
        }
        let first = space.try_read(&m).unwrap();
        prop_assert_eq!(space.try_read(&m).unwrap(), first.clone());
        prop_assert_eq!(space.read_all(&m).unwrap(), space.read_all(&m).unwrap());
        if let Some(t) = first {
            prop_assert_eq!(space.read(&m).unwrap(), t);
        }
    }

    /// P7: save, clear, load restores the same multiset
    #[test]
    fn p7_save_clear_load_restores_multiset(tuples in prop::collection::vec(arb_tuple(), 0..12)) {
        let test = TestStore::new();
        for t in &tuples {
            test.store.write(t.clone()).unwrap();
        }

        test.store.save().unwrap();
        test.store.clear().unwrap();
        test.store.load().unwrap();

        let mut restored = Vec::new();
        for arity in 0..4 {
            restored.extend(test.store.read_all(&Template::any(arity)).unwrap());
        }
        prop_assert_eq!(sorted(restored), sorted(tuples));
    }
}

/// P4: racing blocked takers get one tuple between them; racing readers all get it
#[test]
fn p4_racing_takers_and_readers() {
    let space = space();
    let token: CancelToken = space.cancel_token();
    let barrier = Arc::new(Barrier::new(9));
    let took = Arc::new(AtomicUsize::new(0));
    let read = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for i in 0..8 {
        let space = space.clone();
        let token = token.clone();
        let barrier = Arc::clone(&barrier);
        let took = Arc::clone(&took);
        let read = Arc::clone(&read);
        handles.push(thread::spawn(move || {
            barrier.wait();
            if i % 2 == 0 {
                if space.take_until(&int_string(), &token).is_ok() {
                    took.fetch_add(1, Ordering::SeqCst);
                }
            } else if space.read_until(&int_string(), &token).is_ok() {
                read.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }

    barrier.wait();
    let_waiters_park();
    space.write(tuple![1, "race"]).unwrap();
    let_waiters_park();
    token.cancel();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(took.load(Ordering::SeqCst), 1);
    // Readers woken before the take see the tuple; later ones are cancelled
    assert!(read.load(Ordering::SeqCst) <= 4);
    assert!(space.is_empty().unwrap());
}

/// P4: with only readers racing, every one receives a copy
#[test]
fn p4_racing_readers_all_receive() {
    let space = space();
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let space = space.clone();
            thread::spawn(move || space.read(&int_string()).unwrap())
        })
        .collect();

    let_waiters_park();
    space.write(tuple![2, "shared"]).unwrap();
    for h in handles {
        assert_eq!(h.join().unwrap(), tuple![2, "shared"]);
    }
    assert_eq!(space.len().unwrap(), 1);
}

/// P5: an immediate take with a match fires before returning, exactly once
#[test]
fn p5_immediate_take_with_existing_match() {
    let space = space();
    space.write(tuple![1, "a"]).unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);

    space
        .event_register(EventMode::Take, EventTiming::Immediate, int_string(), move |t| {
            sink.lock().push(t);
            Ok(())
        })
        .unwrap();

    assert_eq!(*calls.lock(), vec![tuple![1, "a"]]);
    assert!(space.is_empty().unwrap());

    space.write(tuple![2, "b"]).unwrap();
    assert_eq!(calls.lock().len(), 1);
    assert_eq!(space.len().unwrap(), 1);
}

/// P5: an immediate take without a match fires on the next matching write only
#[test]
fn p5_immediate_take_without_match_waits_for_write() {
    let space = space();
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);

    space
        .event_register(EventMode::Take, EventTiming::Immediate, int_string(), move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    space.write(tuple!["no", "match"]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    space.write(tuple![1, "a"]).unwrap();
    space.write(tuple![2, "b"]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(space.read_all(&int_string()).unwrap(), vec![tuple![2, "b"]]);
}

/// P6: read registrations never remove the tuple, whatever the timing
#[test]
fn p6_read_registration_never_removes() {
    let space = space();
    space.write(tuple![1, "existing"]).unwrap();

    for timing in [EventTiming::Immediate, EventTiming::Future] {
        space
            .event_register(EventMode::Read, timing, int_string(), |_| Ok(()))
            .unwrap();
    }
    space.write(tuple![2, "new"]).unwrap();

    assert_eq!(space.len().unwrap(), 2);
    assert_eq!(space.stats().unwrap().callbacks_fired, 2);
    assert_eq!(space.count(&template![1, "existing"]).unwrap(), 1);
}
