//! Snapshot persistence through the public API

use crate::common::*;
use linda::{
    tuple, Error, PersistentTupleSpace, SpaceConfig, TupleSpace, ValueType, CONFIG_FILE_NAME,
};
use std::thread;

#[test]
fn test_restart_restores_contents() {
    let test = TestStore::new();
    test.store.write(tuple![1, "a"]).unwrap();
    test.store.write(tuple!["x", 4]).unwrap();
    test.store.write(tuple![true, tuple![1.5, b"blob".to_vec()]]).unwrap();
    test.store.shutdown();

    let reopened = test.reopen();
    assert_eq!(reopened.load().unwrap(), Some(3));
    assert_eq!(reopened.try_read(&int_string()).unwrap(), Some(tuple![1, "a"]));
    assert_eq!(reopened.try_read(&string_int()).unwrap(), Some(tuple!["x", 4]));
    assert_eq!(
        reopened
            .try_read(&linda::template![ValueType::Bool, ValueType::Tuple])
            .unwrap(),
        Some(tuple![true, tuple![1.5, b"blob".to_vec()]])
    );
}

#[test]
fn test_save_overwrites_previous_snapshot() {
    let test = TestStore::new();
    test.store.write(tuple![1, "a"]).unwrap();
    test.store.save().unwrap();

    test.store.take(&int_string()).unwrap();
    test.store.write(tuple![2, "b"]).unwrap();
    test.store.write(tuple![3, "c"]).unwrap();
    let info = test.store.save().unwrap();
    assert_eq!(info.tuple_count, 2);

    let reopened = test.reopen();
    reopened.load().unwrap();
    assert_eq!(
        reopened.read_all(&int_string()).unwrap(),
        vec![tuple![2, "b"], tuple![3, "c"]]
    );
}

#[test]
fn test_save_to_and_load_from_explicit_paths() {
    let test = TestStore::new();
    let other = test.dir.path().join("elsewhere.snap");
    test.store.write(tuple![5, "e"]).unwrap();
    test.store.save_to(&other).unwrap();

    assert!(!test.store.snapshot_path().exists());
    let fresh = PersistentTupleSpace::with_space(TupleSpace::new(), test.dir.path().join("unused"));
    assert_eq!(fresh.load_from(&other).unwrap(), Some(1));
    assert_eq!(fresh.len().unwrap(), 1);
}

#[test]
fn test_truncated_snapshot_is_surfaced() {
    let test = TestStore::new();
    for i in 0..10 {
        test.store.write(tuple![i, "t"]).unwrap();
    }
    test.store.save().unwrap();

    let path = test.store.snapshot_path().to_path_buf();
    let data = std::fs::read(&path).unwrap();
    std::fs::write(&path, &data[..data.len() / 2]).unwrap();

    let reopened = test.reopen();
    assert!(matches!(reopened.load(), Err(Error::Corruption(_))));
    assert!(reopened.is_empty().unwrap());
}

#[test]
fn test_restore_satisfies_blocked_readers() {
    let test = TestStore::new();
    test.store.write(tuple![true, "restored"]).unwrap();
    test.store.save().unwrap();

    let target = test.reopen();
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let space = target.space().clone();
            thread::spawn(move || space.read(&bool_string()).unwrap())
        })
        .collect();

    let_waiters_park();
    target.load().unwrap();
    for r in readers {
        assert_eq!(r.join().unwrap(), tuple![true, "restored"]);
    }
}

#[test]
fn test_open_from_config_file() {
    let test = TestStore::new();
    test.store.write(tuple![1, "a"]).unwrap();
    test.store.save().unwrap();

    let config_path = test.dir.path().join(CONFIG_FILE_NAME);
    SpaceConfig {
        snapshot_path: test.store.snapshot_path().to_path_buf(),
        max_arity: 2,
        ..SpaceConfig::default()
    }
    .write_to_file(&config_path)
    .unwrap();

    let config = SpaceConfig::from_file(&config_path).unwrap();
    let opened = PersistentTupleSpace::open(&config).unwrap();
    assert_eq!(opened.len().unwrap(), 1);
    assert_eq!(opened.limits().max_arity, 2);
    assert!(opened.write(tuple![1, 2, 3]).unwrap_err().is_invalid_input());
}

#[test]
fn test_open_rejects_invalid_config() {
    let config = SpaceConfig {
        max_arity: 0,
        ..SpaceConfig::default()
    };
    assert!(matches!(
        PersistentTupleSpace::open(&config),
        Err(Error::Config(_))
    ));
}
