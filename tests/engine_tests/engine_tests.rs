//! Tests for Engine
//!
//! These tests verify:
//! - Basic set/get/delete operations
//! - Rotation keeps every key retrievable
//! - Compaction keeps the live key set and shrinks the footprint to it
//! - Restart rebuilds the index from the segments
//! - Torn tails are dropped from the active segment on open
//! - Concurrent access patterns
//! - Engine lifecycle (open/close) and configuration errors

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use logkv::config::{Config, SyncStrategy};
use logkv::engine::Engine;
use logkv::record::{encode_live, HEADER_SIZE};
use logkv::segment::{SegmentReader, ACTIVE_FILENAME};
use logkv::{KvStore, LogKvError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path(), 1024 * 1024).unwrap();
    (temp_dir, engine)
}

fn setup_temp_engine_with_small_segments() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path(), 100).unwrap(); // Very small to force rotation
    (temp_dir, engine)
}

fn reopen(path: &Path, max_bytes: u64) -> Engine {
    Engine::open_path(path, max_bytes).unwrap()
}

/// Total bytes of every .log file in the directory
fn footprint(dir: &Path) -> u64 {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".log"))
        .map(|e| e.metadata().unwrap().len())
        .sum()
}

/// Every (key, tombstone) record across all .log files in the directory
fn all_records(dir: &Path) -> Vec<(Vec<u8>, bool)> {
    let mut records = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().map_or(false, |ext| ext == "log") {
            for record in SegmentReader::open(&path).unwrap() {
                let record = record.unwrap();
                records.push((record.key, record.header.tombstone));
            }
        }
    }
    records
}

fn log_file_count(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .ends_with(".log")
        })
        .count()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let config = Config::builder().data_dir(&data_dir).build();
    let engine = Engine::open(config).unwrap();

    assert!(data_dir.exists());
    assert!(data_dir.join(ACTIVE_FILENAME).exists());
    assert_eq!(engine.segment_count(), 1);
    assert!(engine.is_empty());
}

#[test]
fn test_engine_set_get() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"hello", b"world").unwrap();
    let result = engine.get(b"hello").unwrap();

    assert_eq!(result, Some(b"world".to_vec()));
}

#[test]
fn test_engine_text_is_stored_as_utf8() {
    let (_temp, engine) = setup_temp_engine();

    engine.set("clé", "värde ✓").unwrap();

    assert_eq!(engine.get("clé").unwrap(), Some("värde ✓".as_bytes().to_vec()));
    assert_eq!(engine.get("clé".as_bytes()).unwrap(), Some("värde ✓".as_bytes().to_vec()));
}

#[test]
fn test_engine_get_nonexistent_key() {
    let (_temp, engine) = setup_temp_engine();

    let result = engine.get(b"nonexistent").unwrap();

    assert_eq!(result, None);
}

#[test]
fn test_engine_set_overwrite() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"key", b"value1").unwrap();
    engine.set(b"key", b"value2").unwrap();

    let result = engine.get(b"key").unwrap();
    assert_eq!(result, Some(b"value2".to_vec()));
    assert_eq!(engine.len(), 1);
}

#[test]
fn test_engine_delete() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"key", b"value").unwrap();
    assert_eq!(engine.get(b"key").unwrap(), Some(b"value".to_vec()));

    engine.delete(b"key").unwrap();
    assert_eq!(engine.get(b"key").unwrap(), None);
    assert!(!engine.contains_key(b"key"));
}

#[test]
fn test_engine_delete_nonexistent_key_appends_tombstone() {
    let (_temp, engine) = setup_temp_engine();

    // Should not error, and still writes a record
    engine.delete(b"nonexistent").unwrap();

    assert_eq!(engine.get(b"nonexistent").unwrap(), None);
    assert_eq!(engine.active_segment_size(), (HEADER_SIZE + 11) as u64);
}

#[test]
fn test_engine_empty_key_and_value() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"", b"empty key").unwrap();
    engine.set(b"empty value", b"").unwrap();

    assert_eq!(engine.get(b"").unwrap(), Some(b"empty key".to_vec()));
    assert_eq!(engine.get(b"empty value").unwrap(), Some(Vec::new()));
}

#[test]
fn test_engine_binary_values() {
    let (_temp, engine) = setup_temp_engine();
    let value: Vec<u8> = (0..=255u8).collect();

    engine.set([0u8, 1, 2], &value).unwrap();

    assert_eq!(engine.get([0u8, 1, 2]).unwrap(), Some(value));
}

#[test]
fn test_engine_multiple_keys() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"key1", b"value1").unwrap();
    engine.set(b"key2", b"value2").unwrap();
    engine.set(b"key3", b"value3").unwrap();

    assert_eq!(engine.get(b"key1").unwrap(), Some(b"value1".to_vec()));
    assert_eq!(engine.get(b"key2").unwrap(), Some(b"value2".to_vec()));
    assert_eq!(engine.get(b"key3").unwrap(), Some(b"value3".to_vec()));
    assert_eq!(engine.len(), 3);
}

// =============================================================================
// Rotation Tests
// =============================================================================

#[test]
fn test_engine_rotation_creates_sealed_segments() {
    let (temp, engine) = setup_temp_engine_with_small_segments();

    for i in 0..20 {
        engine
            .set(format!("key{:02}", i), format!("value{:02}", i))
            .unwrap();
    }

    assert!(engine.segment_count() > 1);
    assert!(temp.path().join("segment-00001.log").exists());
    assert!(engine.active_segment_size() <= 100);
    assert_eq!(log_file_count(temp.path()), engine.segment_count());

    for i in 0..20 {
        assert_eq!(
            engine.get(format!("key{:02}", i)).unwrap(),
            Some(format!("value{:02}", i).into_bytes())
        );
    }
}

#[test]
fn test_engine_rotation_resets_active_segment() {
    let temp_dir = TempDir::new().unwrap();
    // Each record is 9 + 4 + 40 = 53 bytes, so the second one rotates
    let engine = Engine::open_path(temp_dir.path(), 100).unwrap();
    let value = [b'x'; 40];

    engine.set(b"key1", value).unwrap();
    assert_eq!(engine.active_segment_size(), 53);
    assert!(engine.sealed_segment_ids().is_empty());

    engine.set(b"key2", value).unwrap();
    assert_eq!(engine.active_segment_size(), 53);
    assert_eq!(engine.sealed_segment_ids().len(), 1);

    assert_eq!(engine.get(b"key1").unwrap(), Some(value.to_vec()));
    assert_eq!(engine.get(b"key2").unwrap(), Some(value.to_vec()));
}

#[test]
fn test_engine_oversized_record_is_accepted() {
    let (_temp, engine) = setup_temp_engine_with_small_segments();
    let big = vec![7u8; 1000];

    engine.set(b"small", b"v").unwrap();
    engine.set(b"big", &big).unwrap();
    engine.set(b"after", b"v").unwrap();

    assert_eq!(engine.get(b"big").unwrap(), Some(big));
    assert_eq!(engine.get(b"small").unwrap(), Some(b"v".to_vec()));
    assert_eq!(engine.get(b"after").unwrap(), Some(b"v".to_vec()));
}

// =============================================================================
// Compaction Tests
// =============================================================================

#[test]
fn test_engine_compact_preserves_live_keys() {
    let (temp, engine) = setup_temp_engine_with_small_segments();

    for i in 0..30 {
        engine.set(format!("key{}", i % 10), format!("v{}", i)).unwrap();
    }
    for i in 0..3 {
        engine.delete(format!("key{}", i)).unwrap();
    }

    let mut before = Vec::new();
    for i in 0..10 {
        before.push(engine.get(format!("key{}", i)).unwrap());
    }

    let stats = engine.compact().unwrap();

    for (i, expected) in before.iter().enumerate() {
        assert_eq!(&engine.get(format!("key{}", i)).unwrap(), expected);
    }
    assert_eq!(stats.live_records, 7);
    assert_eq!(engine.len(), 7);
    assert_eq!(engine.segment_count(), 2);
    assert_eq!(engine.active_segment_size(), 0);
    assert_eq!(log_file_count(temp.path()), 2);
}

#[test]
fn test_engine_compact_footprint_is_live_set() {
    let (temp, engine) = setup_temp_engine_with_small_segments();

    engine.set(b"a", b"old").unwrap();
    engine.set(b"a", b"new").unwrap();
    engine.set(b"b", b"keep").unwrap();
    engine.set(b"c", b"gone").unwrap();
    engine.delete(b"c").unwrap();
    engine.delete(b"never-set").unwrap();

    let stats = engine.compact().unwrap();

    let expected = (HEADER_SIZE + 1 + 3) + (HEADER_SIZE + 1 + 4);
    assert_eq!(stats.bytes_written, expected as u64);
    assert_eq!(footprint(temp.path()), expected as u64);

    let mut records = all_records(temp.path());
    records.sort();
    assert_eq!(records, vec![(b"a".to_vec(), false), (b"b".to_vec(), false)]);
}

#[test]
fn test_engine_compact_scenario() {
    let (temp, engine) = setup_temp_engine();

    engine.set("a", "1").unwrap();
    assert_eq!(engine.get("a").unwrap(), Some(b"1".to_vec()));
    engine.set("a", "2").unwrap();
    assert_eq!(engine.get("a").unwrap(), Some(b"2".to_vec()));
    engine.delete("a").unwrap();
    assert_eq!(engine.get("a").unwrap(), None);

    engine.compact().unwrap();

    assert_eq!(engine.get("a").unwrap(), None);
    assert!(all_records(temp.path()).iter().all(|(key, _)| key != b"a"));
}

#[test]
fn test_engine_compact_empty_store() {
    let (temp, engine) = setup_temp_engine();

    let stats = engine.compact().unwrap();

    assert_eq!(stats.live_records, 0);
    assert_eq!(stats.bytes_written, 0);
    assert_eq!(footprint(temp.path()), 0);
    assert!(engine.is_empty());
}

#[test]
fn test_engine_writes_after_compaction() {
    let (temp, engine) = setup_temp_engine_with_small_segments();

    for i in 0..10 {
        engine.set(format!("k{}", i), b"before").unwrap();
    }
    engine.compact().unwrap();
    for i in 5..15 {
        engine.set(format!("k{}", i), b"after").unwrap();
    }

    for i in 0..5 {
        assert_eq!(engine.get(format!("k{}", i)).unwrap(), Some(b"before".to_vec()));
    }
    for i in 5..15 {
        assert_eq!(engine.get(format!("k{}", i)).unwrap(), Some(b"after".to_vec()));
    }

    engine.close().unwrap();
    let engine = reopen(temp.path(), 100);
    assert_eq!(engine.len(), 15);
    assert_eq!(engine.get(b"k7").unwrap(), Some(b"after".to_vec()));
}

#[test]
fn test_engine_segment_ids_never_reused() {
    let (_temp, engine) = setup_temp_engine_with_small_segments();

    for i in 0..10 {
        engine.set(format!("k{}", i), b"0123456789").unwrap();
    }
    let before = engine.sealed_segment_ids();
    let highest = *before.last().unwrap();

    let stats = engine.compact().unwrap();

    assert!(stats.segment_id > highest);
    assert_eq!(engine.sealed_segment_ids(), vec![stats.segment_id]);
}

// =============================================================================
// Restart Tests
// =============================================================================

#[test]
fn test_engine_restart_durability() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = reopen(temp_dir.path(), 100);
        for i in 0..25 {
            engine.set(format!("key{}", i), format!("value{}", i)).unwrap();
        }
        engine.set(b"key3", b"rewritten").unwrap();
        engine.delete(b"key4").unwrap();
        engine.close().unwrap();
    }

    let engine = reopen(temp_dir.path(), 100);

    assert_eq!(engine.len(), 24);
    assert_eq!(engine.get(b"key3").unwrap(), Some(b"rewritten".to_vec()));
    assert_eq!(engine.get(b"key4").unwrap(), None);
    for i in (0..25).filter(|i| *i != 3 && *i != 4) {
        assert_eq!(
            engine.get(format!("key{}", i)).unwrap(),
            Some(format!("value{}", i).into_bytes())
        );
    }
}

#[test]
fn test_engine_restart_after_compaction() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = reopen(temp_dir.path(), 100);
        for i in 0..10 {
            engine.set(format!("key{}", i), b"x").unwrap();
        }
        engine.delete(b"key0").unwrap();
        engine.compact().unwrap();
        engine.set(b"key1", b"y").unwrap();
        engine.close().unwrap();
    }

    let engine = reopen(temp_dir.path(), 100);

    assert_eq!(engine.len(), 9);
    assert_eq!(engine.get(b"key0").unwrap(), None);
    assert_eq!(engine.get(b"key1").unwrap(), Some(b"y".to_vec()));
    assert_eq!(engine.get(b"key9").unwrap(), Some(b"x".to_vec()));
}

#[test]
fn test_engine_restart_without_close() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = reopen(temp_dir.path(), 1024);
        engine.set(b"key", b"value").unwrap();
        // Dropped without close
    }

    let engine = reopen(temp_dir.path(), 1024);
    assert_eq!(engine.get(b"key").unwrap(), Some(b"value".to_vec()));
}

#[test]
fn test_engine_torn_tail_is_dropped_on_open() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = reopen(temp_dir.path(), 1024);
        engine.set(b"a", b"1").unwrap();
        engine.set(b"b", b"2").unwrap();
        engine.close().unwrap();
    }

    // Simulate a crash part way through a third append
    {
        let partial = encode_live(b"c", b"333").unwrap();
        let mut file = OpenOptions::new()
            .append(true)
            .open(temp_dir.path().join(ACTIVE_FILENAME))
            .unwrap();
        file.write_all(&partial[..HEADER_SIZE + 1]).unwrap();
    }

    {
        let engine = reopen(temp_dir.path(), 1024);
        assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(engine.get(b"c").unwrap(), None);
        assert_eq!(engine.active_segment_size(), ((HEADER_SIZE + 2) * 2) as u64);

        engine.set(b"d", b"4").unwrap();
        engine.close().unwrap();
    }

    // The append after the torn tail must survive the next replay
    let engine = reopen(temp_dir.path(), 1024);
    assert_eq!(engine.get(b"d").unwrap(), Some(b"4".to_vec()));
    assert_eq!(engine.len(), 3);
}

// =============================================================================
// Consistency Tests
// =============================================================================

#[test]
fn test_engine_get_reports_index_inconsistency() {
    let temp_dir = TempDir::new().unwrap();
    let engine = reopen(temp_dir.path(), 1024);
    engine.set(b"key", b"value").unwrap();

    // Rewrite the record in place with a tombstone of the same length
    let mut forged = encode_live(b"key", b"value").unwrap().to_vec();
    forged[8] = 1;
    fs::write(temp_dir.path().join(ACTIVE_FILENAME), &forged).unwrap();

    let err = engine.get(b"key").unwrap_err();
    assert!(matches!(err, LogKvError::IndexInconsistency(_)));

    let err = engine.compact().unwrap_err();
    assert!(matches!(err, LogKvError::IndexInconsistency(_)));
}

#[test]
fn test_engine_failed_compaction_keeps_store_usable() {
    let temp_dir = TempDir::new().unwrap();
    let engine = reopen(temp_dir.path(), 1024);
    engine.set(b"key", b"value").unwrap();

    let mut forged = encode_live(b"key", b"value").unwrap().to_vec();
    forged[8] = 1;
    fs::write(temp_dir.path().join(ACTIVE_FILENAME), &forged).unwrap();

    assert!(engine.compact().is_err());
    // The abandoned output segment is gone; only the active file remains
    assert_eq!(log_file_count(temp_dir.path()), 1);

    engine.set(b"other", b"value").unwrap();
    assert_eq!(engine.get(b"other").unwrap(), Some(b"value".to_vec()));
}

#[test]
fn test_engine_compaction_with_failed_removal_keeps_newest_writes() {
    let temp_dir = TempDir::new().unwrap();
    let engine = reopen(temp_dir.path(), 32);

    // Each record is 14 bytes: two fit, the third rotates segment 1 out
    engine.set(b"k", b"aaaa").unwrap();
    engine.set(b"k", b"bbbb").unwrap();
    engine.set(b"k", b"cccc").unwrap();
    assert_eq!(engine.sealed_segment_ids().len(), 1);

    // A directory under the sealed name makes its removal fail
    let stale = temp_dir.path().join("segment-00001.log");
    fs::remove_file(&stale).unwrap();
    fs::create_dir(&stale).unwrap();

    assert!(engine.compact().is_err());
    assert_eq!(engine.get(b"k").unwrap(), Some(b"cccc".to_vec()));

    engine.set(b"k", b"new").unwrap();
    engine.set(b"z", vec![b'z'; 40]).unwrap();

    let sealed = engine.sealed_segment_ids();
    assert!(sealed.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(engine.get(b"k").unwrap(), Some(b"new".to_vec()));
    drop(engine);

    let engine = reopen(temp_dir.path(), 32);
    assert_eq!(engine.get(b"k").unwrap(), Some(b"new".to_vec()));
    assert_eq!(engine.get(b"z").unwrap(), Some(vec![b'z'; 40]));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_engine_concurrent_readers() {
    let (_temp, engine) = setup_temp_engine();
    for i in 0..50 {
        engine.set(format!("key{}", i), format!("value{}", i)).unwrap();
    }
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..50 {
                    assert_eq!(
                        engine.get(format!("key{}", i)).unwrap(),
                        Some(format!("value{}", i).into_bytes())
                    );
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_engine_concurrent_writers_and_compaction() {
    let (_temp, engine) = setup_temp_engine_with_small_segments();
    let engine = Arc::new(engine);

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..25 {
                    engine
                        .set(format!("t{}-k{}", t, i), format!("v{}", i))
                        .unwrap();
                    assert_eq!(
                        engine.get(format!("t{}-k{}", t, i)).unwrap(),
                        Some(format!("v{}", i).into_bytes())
                    );
                }
            })
        })
        .collect();

    let compactor = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..5 {
                engine.compact().unwrap();
            }
        })
    };

    for handle in writers {
        handle.join().unwrap();
    }
    compactor.join().unwrap();

    assert_eq!(engine.len(), 100);
    for t in 0..4 {
        for i in 0..25 {
            assert_eq!(
                engine.get(format!("t{}-k{}", t, i)).unwrap(),
                Some(format!("v{}", i).into_bytes())
            );
        }
    }
}

// =============================================================================
// Lifecycle & Configuration Tests
// =============================================================================

#[test]
fn test_engine_rejects_zero_segment_bound() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_active_segment_bytes(0)
        .build();

    let result = Engine::open(config);

    assert!(matches!(result, Err(LogKvError::Config(_))));
}

#[test]
fn test_engine_every_write_sync_strategy() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .sync_strategy(SyncStrategy::EveryWrite)
        .build();

    let engine = Engine::open(config).unwrap();
    engine.set(b"key", b"value").unwrap();

    assert_eq!(engine.config().sync_strategy, SyncStrategy::EveryWrite);
    assert_eq!(engine.get(b"key").unwrap(), Some(b"value".to_vec()));
}

#[test]
fn test_engine_default_config() {
    let config = Config::default();

    assert_eq!(config.max_active_segment_bytes, 64 * 1024 * 1024);
    assert_eq!(config.sync_strategy, SyncStrategy::OsFlush);
}

#[test]
fn test_engine_through_kv_store_trait() {
    fn exercise<S: KvStore>(store: S) {
        store.set(b"k", b"v").unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
        store.delete(b"k").unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);
        store.close().unwrap();
    }

    let (_temp, engine) = setup_temp_engine();
    exercise(engine);
}

#[test]
fn test_engine_data_dir_accessor() {
    let (temp, engine) = setup_temp_engine();

    assert_eq!(engine.data_dir(), temp.path());
}
