//! Tests for Engine
//!
//! These tests verify:
//! - Lifecycle (init / terminate / re-init)
//! - write / read / delete / show semantics and output format
//! - Sorted READ output and sink writing
//! - Backups: file contents and replay
//! - Concurrent writers never lose updates

use std::fs;
use std::sync::Arc;
use std::thread;

use kvjobs::config::{BucketStrategy, Config};
use kvjobs::engine::Engine;
use kvjobs::job::{parse_pair_line, reserve_backup_path};
use kvjobs::KvsError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn quiet_config() -> Config {
    Config::builder().echo_console(false).build()
}

fn setup_engine() -> Engine {
    Engine::open(quiet_config()).unwrap()
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn keys(items: &[&str]) -> Vec<String> {
    items.iter().map(|k| k.to_string()).collect()
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_new_engine_is_uninitialized() {
    let engine = Engine::new(quiet_config());
    assert!(!engine.is_initialized());
}

#[test]
fn test_init_twice_fails() {
    let engine = setup_engine();
    assert!(matches!(engine.init(), Err(KvsError::AlreadyInitialized)));
}

#[test]
fn test_terminate_without_init_fails() {
    let engine = Engine::new(quiet_config());
    assert!(matches!(engine.terminate(), Err(KvsError::NotInitialized)));
}

#[test]
fn test_operations_after_terminate_fail() {
    let engine = setup_engine();
    engine.terminate().unwrap();

    assert!(matches!(engine.write(&pairs(&[("a", "1")])), Err(KvsError::NotInitialized)));
    assert!(matches!(engine.read(&keys(&["a"]), None), Err(KvsError::NotInitialized)));
    assert!(matches!(engine.delete(&keys(&["a"]), None), Err(KvsError::NotInitialized)));
    assert!(matches!(engine.show(None), Err(KvsError::NotInitialized)));

    let temp = TempDir::new().unwrap();
    let target = temp.path().join("x.bck");
    assert!(matches!(engine.backup(&target), Err(KvsError::NotInitialized)));
    assert!(matches!(engine.terminate(), Err(KvsError::NotInitialized)));
}

#[test]
fn test_reinit_after_terminate_is_empty() {
    let engine = setup_engine();
    engine.write(&pairs(&[("a", "1")])).unwrap();
    engine.terminate().unwrap();

    engine.init().unwrap();

    assert!(engine.is_empty());
    assert_eq!(engine.read(&keys(&["a"]), None).unwrap(), "[(a,KVSERROR)]");
}

// =============================================================================
// Write / Read Tests
// =============================================================================

#[test]
fn test_write_then_read() {
    let engine = setup_engine();

    engine.write(&pairs(&[("key", "value")])).unwrap();

    assert_eq!(engine.read(&keys(&["key"]), None).unwrap(), "[(key,value)]");
}

#[test]
fn test_read_returns_last_written_value() {
    let engine = setup_engine();

    engine.write(&pairs(&[("k", "1")])).unwrap();
    engine.write(&pairs(&[("k", "2")])).unwrap();
    engine.write(&pairs(&[("k", "3"), ("k", "4")])).unwrap();

    assert_eq!(engine.read(&keys(&["k"]), None).unwrap(), "[(k,4)]");
}

#[test]
fn test_read_sorts_keys() {
    let engine = setup_engine();

    engine.write(&pairs(&[("b", "2"), ("a", "1")])).unwrap();

    assert_eq!(engine.read(&keys(&["b", "a"]), None).unwrap(), "[(a,1)(b,2)]");
}

#[test]
fn test_read_marks_missing_keys() {
    let engine = setup_engine();
    engine.write(&pairs(&[("c", "3")])).unwrap();

    let output = engine.read(&keys(&["d", "c", "a"]), None).unwrap();

    assert_eq!(output, "[(a,KVSERROR)(c,3)(d,KVSERROR)]");
}

#[test]
fn test_write_reports_dropped_keys() {
    let engine = setup_engine();

    let stored = engine.write(&pairs(&[("ok", "1"), ("#bad", "2")])).unwrap();

    assert_eq!(stored, 1);
    assert_eq!(engine.len(), 1);
}

#[test]
fn test_read_writes_line_to_sink() {
    let engine = setup_engine();
    engine.write(&pairs(&[("a", "1")])).unwrap();

    let mut sink: Vec<u8> = Vec::new();
    engine.read(&keys(&["a", "b"]), Some(&mut sink)).unwrap();

    assert_eq!(String::from_utf8(sink).unwrap(), "[(a,1)(b,KVSERROR)]\n");
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_existing_key_is_silent() {
    let engine = setup_engine();
    engine.write(&pairs(&[("a", "1")])).unwrap();

    let mut sink: Vec<u8> = Vec::new();
    let output = engine.delete(&keys(&["a"]), Some(&mut sink)).unwrap();

    assert_eq!(output, "");
    assert!(sink.is_empty());
    assert_eq!(engine.read(&keys(&["a"]), None).unwrap(), "[(a,KVSERROR)]");
}

#[test]
fn test_delete_missing_key_is_reported() {
    let engine = setup_engine();
    engine.write(&pairs(&[("a", "1")])).unwrap();

    let mut sink: Vec<u8> = Vec::new();
    let output = engine.delete(&keys(&["z", "a", "q"]), Some(&mut sink)).unwrap();

    assert_eq!(output, "[(z,KVSMISSING)(q,KVSMISSING)]");
    assert_eq!(String::from_utf8(sink).unwrap(), "[(z,KVSMISSING)(q,KVSMISSING)]\n");
    assert!(engine.is_empty());
}

// =============================================================================
// Show Tests
// =============================================================================

#[test]
fn test_show_bucket_order() {
    let engine = setup_engine();
    engine.write(&pairs(&[("z", "3"), ("m", "2"), ("a", "1")])).unwrap();

    let mut sink: Vec<u8> = Vec::new();
    engine.show(Some(&mut sink)).unwrap();

    assert_eq!(String::from_utf8(sink).unwrap(), "(a, 1)\n(m, 2)\n(z, 3)\n");
}

#[test]
fn test_show_newest_first_within_bucket() {
    let engine = setup_engine();
    engine.write(&pairs(&[("ab", "1")])).unwrap();
    engine.write(&pairs(&[("ac", "2")])).unwrap();
    engine.write(&pairs(&[("b", "3")])).unwrap();

    let mut sink: Vec<u8> = Vec::new();
    engine.show(Some(&mut sink)).unwrap();

    assert_eq!(String::from_utf8(sink).unwrap(), "(ac, 2)\n(ab, 1)\n(b, 3)\n");
}

#[test]
fn test_show_empty_table_writes_nothing() {
    let engine = setup_engine();

    let mut sink: Vec<u8> = Vec::new();
    engine.show(Some(&mut sink)).unwrap();

    assert!(sink.is_empty());
}

// =============================================================================
// Backup Tests
// =============================================================================

#[test]
fn test_backup_writes_snapshot_file() {
    let temp = TempDir::new().unwrap();
    let engine = setup_engine();
    engine.write(&pairs(&[("b", "2"), ("a", "1")])).unwrap();

    let target = temp.path().join("snap.bck");
    engine.backup(&target).unwrap();
    engine.backups().wait_all();

    assert_eq!(fs::read_to_string(&target).unwrap(), "(a, 1)\n(b, 2)\n");
}

#[test]
fn test_backup_is_point_in_time() {
    let temp = TempDir::new().unwrap();
    let engine = setup_engine();
    engine.write(&pairs(&[("a", "1")])).unwrap();

    let target = temp.path().join("snap.bck");
    engine.backup(&target).unwrap();
    engine.write(&pairs(&[("b", "2")])).unwrap();
    engine.backups().wait_all();

    assert_eq!(fs::read_to_string(&target).unwrap(), "(a, 1)\n");
}

#[test]
fn test_backup_replay_reproduces_pairs() {
    let temp = TempDir::new().unwrap();
    let engine = setup_engine();
    let written: Vec<(String, String)> = (0..30)
        .map(|i| (format!("k{}", i), format!("v{}", i)))
        .chain((0..10).map(|i| (format!("{}x", i), format!("d{}", i))))
        .collect();
    engine.write(&written).unwrap();

    let job = temp.path().join("replay.job");
    let target = reserve_backup_path(&job).unwrap();
    engine.backup(&target).unwrap();
    engine.terminate().unwrap();

    let restored: Vec<(String, String)> = fs::read_to_string(&target)
        .unwrap()
        .lines()
        .map(|line| parse_pair_line(line).unwrap())
        .collect();

    let fresh = setup_engine();
    fresh.write(&restored).unwrap();

    let mut original = written.clone();
    original.sort();
    let mut replayed = fresh.snapshot().unwrap();
    replayed.sort();
    assert_eq!(original, replayed);
}

#[test]
fn test_terminate_waits_for_backups() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder().echo_console(false).max_backups(3).build();
    let engine = Engine::open(config).unwrap();
    engine.write(&pairs(&[("a", "1")])).unwrap();

    let targets: Vec<_> = (0..3).map(|i| temp.path().join(format!("t{}.bck", i))).collect();
    for target in &targets {
        engine.backup(target).unwrap();
    }
    engine.terminate().unwrap();

    assert_eq!(engine.backups().in_flight(), 0);
    for target in &targets {
        assert_eq!(fs::read_to_string(target).unwrap(), "(a, 1)\n");
    }
}

#[test]
fn test_terminate_racing_backups_leaves_none_in_flight() {
    let temp = TempDir::new().unwrap();
    let job = temp.path().join("race.job");
    let config = Config::builder().echo_console(false).max_backups(4).build();
    let engine = Arc::new(Engine::new(config));

    for _ in 0..20 {
        engine.init().unwrap();
        engine.write(&pairs(&[("a", "1")])).unwrap();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let job = job.clone();
                thread::spawn(move || loop {
                    let target = reserve_backup_path(&job).unwrap();
                    match engine.backup(&target) {
                        Ok(_) => {}
                        Err(KvsError::NotInitialized) => break,
                        Err(e) => panic!("unexpected error: {}", e),
                    }
                })
            })
            .collect();

        thread::sleep(std::time::Duration::from_millis(5));
        engine.terminate().unwrap();
        assert_eq!(engine.backups().in_flight(), 0);

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(engine.backups().in_flight(), 0);
    }
}

#[test]
fn test_backup_reaps_finished_snapshots_first() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder().echo_console(false).max_backups(3).build();
    let engine = Engine::open(config).unwrap();
    engine.write(&pairs(&[("a", "1")])).unwrap();

    engine.backup(&temp.path().join("one.bck")).unwrap();
    engine.backup(&temp.path().join("two.bck")).unwrap();
    thread::sleep(std::time::Duration::from_millis(200));

    engine.backup(&temp.path().join("three.bck")).unwrap();

    // The two finished snapshots were joined before the new one was admitted
    assert!(engine.backups().in_flight() <= 1);
    engine.terminate().unwrap();
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_disjoint_keys() {
    let engine = Arc::new(setup_engine());
    let mut handles = Vec::new();

    for t in 0..8 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..100 {
                let key = format!("t{}k{}", t, i);
                engine.write(&[(key, format!("{}", i))]).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.len(), 800);
    for t in 0..8 {
        let requested: Vec<String> = (0..100).map(|i| format!("t{}k{}", t, i)).collect();
        let output = engine.read(&requested, None).unwrap();
        assert!(!output.contains("KVSERROR"));
    }
}

#[test]
fn test_write_batch_is_atomic_for_readers() {
    let engine = Arc::new(setup_engine());
    engine.write(&pairs(&[("x", "0"), ("y", "0")])).unwrap();

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 1..=500 {
                let v = i.to_string();
                engine.write(&pairs(&[("x", v.as_str()), ("y", v.as_str())])).unwrap();
            }
        })
    };

    for _ in 0..500 {
        let snapshot = engine.snapshot().unwrap();
        let x = snapshot.iter().find(|(k, _)| k == "x").map(|(_, v)| v.clone());
        let y = snapshot.iter().find(|(k, _)| k == "y").map(|(_, v)| v.clone());
        assert_eq!(x, y);
    }
    writer.join().unwrap();
}

#[test]
fn test_fnv_engine_accepts_symbols() {
    let config = Config::builder()
        .echo_console(false)
        .bucket_strategy(BucketStrategy::Fnv1a)
        .build();
    let engine = Engine::open(config).unwrap();

    engine.write(&pairs(&[("_a", "1"), ("-b", "2")])).unwrap();

    assert_eq!(engine.read(&keys(&["_a", "-b"]), None).unwrap(), "[(-b,2)(_a,1)]");
}
