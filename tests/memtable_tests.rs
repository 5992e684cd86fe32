//! Tests for MemTable
//!
//! These tests verify:
//! - Last writer wins per key
//! - Drain yields key order and empties the table
//! - Restore after a failed flush keeps newer commands

use segkv::memtable::MemTable;
use segkv::Command;

#[test]
fn test_put_returns_pending_count() {
    let mut memtable = MemTable::new();

    assert_eq!(memtable.put(Command::set("a", "1")), 1);
    assert_eq!(memtable.put(Command::set("b", "2")), 2);
    // Overwrite does not grow the table
    assert_eq!(memtable.put(Command::set("a", "3")), 2);
}

#[test]
fn test_last_writer_wins() {
    let mut memtable = MemTable::new();

    memtable.put(Command::set("k", "old"));
    memtable.put(Command::set("k", "new"));
    assert_eq!(memtable.get("k"), Some(&Command::set("k", "new")));

    memtable.put(Command::remove("k"));
    assert_eq!(memtable.get("k"), Some(&Command::remove("k")));
    assert!(memtable.contains_key("k"));
    assert!(memtable.get("other").is_none());
}

#[test]
fn test_drain_is_sorted_and_empties() {
    let mut memtable = MemTable::new();
    for key in ["delta", "alpha", "charlie", "bravo"] {
        memtable.put(Command::set(key, key.to_uppercase()));
    }

    let drained = memtable.drain();

    let keys: Vec<_> = drained.iter().map(Command::key).collect();
    assert_eq!(keys, vec!["alpha", "bravo", "charlie", "delta"]);
    assert!(memtable.is_empty());
    assert_eq!(memtable.len(), 0);
}

#[test]
fn test_restore_keeps_newer_entries() {
    let mut memtable = MemTable::new();
    memtable.put(Command::set("a", "1"));
    memtable.put(Command::set("b", "2"));
    let batch = memtable.drain();

    memtable.put(Command::remove("a"));
    memtable.restore(batch);

    assert_eq!(memtable.len(), 2);
    assert_eq!(memtable.get("a"), Some(&Command::remove("a")));
    assert_eq!(memtable.get("b"), Some(&Command::set("b", "2")));
}

#[test]
fn test_iter_follows_key_order() {
    let mut memtable = MemTable::new();
    memtable.put(Command::set("z", "1"));
    memtable.put(Command::remove("m"));
    memtable.put(Command::set("a", "2"));

    let keys: Vec<_> = memtable.iter().map(Command::key).collect();
    assert_eq!(keys, vec!["a", "m", "z"]);
}
