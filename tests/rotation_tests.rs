//! Tests for rotation and background compression through the Store
//!
//! These tests verify:
//! - Keys stay readable across rotation boundaries
//! - Index entries follow records into sealed segments
//! - Sealed segments end up compressed once the store closes
//! - Interrupted compression is finished on the next open
//! - Lookups in compressed segments are served from the segment cache

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use segkv::record::{encode_framed, Command};
use segkv::segment::{SealedSegment, SegmentId};
use segkv::{Config, Store};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn rotating_config(dir: &Path, flush_threshold: usize, rotation_threshold: u64) -> Config {
    Config::builder()
        .data_dir(dir)
        .flush_threshold(flush_threshold)
        .rotation_threshold(rotation_threshold)
        .compression_queue_capacity(2)
        .build()
}

fn write_raw_sealed(dir: &Path, timestamp: u64, commands: &[Command]) -> SealedSegment {
    let segment = SealedSegment::raw(dir, timestamp);
    let mut data = Vec::new();
    for command in commands {
        data.extend_from_slice(&encode_framed(command).unwrap());
    }
    fs::write(segment.path(), data).unwrap();
    segment
}

// =============================================================================
// Rotation Safety Tests
// =============================================================================

#[test]
fn test_every_flush_rotates_and_keys_stay_readable() {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open(rotating_config(temp_dir.path(), 1, 1)).unwrap();

    for i in 0..10 {
        store.set(&format!("k{}", i), &format!("v{}", i)).unwrap();
        assert_eq!(store.active_segment_len(), 0);

        // Everything written so far is still readable, whether its segment
        // has been compressed yet or not
        for j in 0..=i {
            assert_eq!(
                store.get(&format!("k{}", j)).unwrap(),
                Some(format!("v{}", j))
            );
        }
    }

    assert_eq!(store.rotation_count(), 10);
    for i in 0..10 {
        let entry = store.index_entry(&format!("k{}", i)).unwrap();
        assert!(matches!(entry.segment, SegmentId::Sealed(_)));
    }

    store.close().unwrap();

    let sealed = store.sealed_segments().unwrap();
    assert_eq!(sealed.len(), 10);
    assert!(sealed.iter().all(SealedSegment::is_compressed));
    let timestamps: Vec<_> = sealed.iter().map(SealedSegment::timestamp).collect();
    let mut sorted = timestamps.clone();
    sorted.dedup();
    assert_eq!(sorted.len(), 10, "timestamps must be unique");
}

#[test]
fn test_values_survive_rotation_and_restart() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = Store::open(rotating_config(temp_dir.path(), 3, 256)).unwrap();
        for i in 0..60 {
            store.set(&format!("key{}", i % 20), &format!("round{}", i / 20)).unwrap();
        }
        store.remove("key0").unwrap();
        assert!(store.rotation_count() > 0);
        store.close().unwrap();
    }

    let store = Store::open(rotating_config(temp_dir.path(), 3, 256)).unwrap();
    assert_eq!(store.get("key0").unwrap(), None);
    for i in 1..20 {
        assert_eq!(
            store.get(&format!("key{}", i)).unwrap(),
            Some("round2".to_string())
        );
    }
    assert!(store.recovery_report().segments_replayed > 1);
}

#[test]
fn test_pending_memtable_survives_rotation() {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open(rotating_config(temp_dir.path(), 3, 1)).unwrap();

    store.set("a", "1").unwrap();
    store.set("b", "2").unwrap();
    store.set("c", "3").unwrap(); // flush + rotate
    store.set("d", "4").unwrap(); // stays buffered

    assert_eq!(store.rotation_count(), 1);
    assert_eq!(store.memtable_len(), 1);
    assert!(store.index_entry("d").is_none());
    assert!(matches!(
        store.index_entry("a").unwrap().segment,
        SegmentId::Sealed(_)
    ));
    for (key, value) in [("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")] {
        assert_eq!(store.get(key).unwrap(), Some(value.to_string()));
    }
}

#[test]
fn test_new_seals_are_newer_than_existing_ones() {
    let temp_dir = TempDir::new().unwrap();
    // A sealed segment stamped far in the future
    let future = u64::MAX / 2;
    write_raw_sealed(temp_dir.path(), future, &[Command::set("k", "old")]);

    let store = Store::open(rotating_config(temp_dir.path(), 1, 1)).unwrap();
    store.set("k", "new").unwrap();
    store.close().unwrap();

    let sealed = store.sealed_segments().unwrap();
    assert_eq!(sealed.len(), 2);
    assert_eq!(sealed[0].timestamp(), future);
    assert!(sealed[1].timestamp() > future);

    let store = Store::open(rotating_config(temp_dir.path(), 1, 1)).unwrap();
    assert_eq!(store.get("k").unwrap(), Some("new".to_string()));
}

#[test]
fn test_lookups_in_compressed_segments_are_cached() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .flush_threshold(1)
        .rotation_threshold(1)
        .sealed_cache_segments(2)
        .build();
    let store = Store::open(config).unwrap();
    for i in 0..3 {
        store.set(&format!("k{}", i), &format!("v{}", i)).unwrap();
    }
    let timestamps: Vec<_> = (0..3)
        .map(|i| match store.index_entry(&format!("k{}", i)).unwrap().segment {
            SegmentId::Sealed(timestamp) => timestamp,
            SegmentId::Active => panic!("k{} not rotated", i),
        })
        .collect();

    // Wait until every raw copy is gone and lookups must inflate the gzip
    let deadline = Instant::now() + Duration::from_secs(10);
    while timestamps
        .iter()
        .any(|ts| SealedSegment::raw(temp_dir.path(), *ts).path().exists())
    {
        assert!(Instant::now() < deadline, "compression did not finish");
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(store.cached_segments(), 0);

    for i in 0..3 {
        assert_eq!(store.get(&format!("k{}", i)).unwrap(), Some(format!("v{}", i)));
    }
    assert_eq!(store.cached_segments(), 2);

    // Evicted and cached segments read the same
    for i in (0..3).rev() {
        assert_eq!(store.get(&format!("k{}", i)).unwrap(), Some(format!("v{}", i)));
    }
    assert_eq!(store.cached_segments(), 2);
}

// =============================================================================
// Compression Recovery Tests
// =============================================================================

#[test]
fn test_leftover_raw_segment_is_compressed_on_open() {
    let temp_dir = TempDir::new().unwrap();
    let raw = write_raw_sealed(temp_dir.path(), 1, &[Command::set("k", "v")]);

    let store = Store::open(rotating_config(temp_dir.path(), 2, 1024)).unwrap();
    assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
    store.close().unwrap();

    assert!(!raw.path().exists());
    assert!(SealedSegment::compressed(temp_dir.path(), 1).path().exists());
}

#[test]
fn test_interrupted_compression_is_cleaned_up() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();

    // Timestamp 1: finished compressing but the raw copy was never deleted
    let raw = write_raw_sealed(dir, 1, &[Command::set("a", "1")]);
    segkv::compression::compress_segment(&raw, 6).unwrap();
    let raw = write_raw_sealed(dir, 1, &[Command::set("a", "1")]);
    // Timestamp 2: crashed halfway through writing the gzip
    write_raw_sealed(dir, 2, &[Command::set("b", "2")]);
    let staging = dir.join("data.table.2.gz.tmp");
    fs::write(&staging, b"half a gzip stream").unwrap();

    let store = Store::open(rotating_config(dir, 2, 1024)).unwrap();

    assert!(!raw.path().exists());
    assert_eq!(store.get("a").unwrap(), Some("1".to_string()));
    assert_eq!(store.get("b").unwrap(), Some("2".to_string()));

    store.close().unwrap();
    assert!(!staging.exists());
    let sealed = store.sealed_segments().unwrap();
    assert_eq!(sealed.len(), 2);
    assert!(sealed.iter().all(SealedSegment::is_compressed));
}
