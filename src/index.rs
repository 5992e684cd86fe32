//! Index
//!
//! In-memory map from key to the on-disk location of its latest durable
//! record. Never persisted: replay rebuilds it on every open.

use std::collections::HashMap;

use crate::segment::{RecordLocation, SegmentId};

/// Location of a key's latest durable record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub segment: SegmentId,
    /// Offset of the record body (past the length prefix)
    pub offset: u64,
    /// Length of the record body
    pub len: u32,
}

impl IndexEntry {
    pub fn new(segment: SegmentId, location: RecordLocation) -> Self {
        Self {
            segment,
            offset: location.offset,
            len: location.len,
        }
    }
}

/// Key → location map
///
/// Entries are written only once a record is on disk, so every entry is
/// readable. There is no eviction.
#[derive(Debug, Default)]
pub struct Index {
    entries: HashMap<String, IndexEntry>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest location of `key`, replacing any older one
    pub fn set(&mut self, key: impl Into<String>, entry: IndexEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<IndexEntry> {
        self.entries.get(key).copied()
    }

    pub fn remove(&mut self, key: &str) -> Option<IndexEntry> {
        self.entries.remove(key)
    }

    /// Re-point every entry in `from` at `to`, keeping offsets
    ///
    /// Only valid when `to` is a byte-for-byte copy of `from`. Returns the
    /// number of entries moved.
    pub fn retarget(&mut self, from: SegmentId, to: SegmentId) -> usize {
        let mut moved = 0;
        for entry in self.entries.values_mut() {
            if entry.segment == from {
                entry.segment = to;
                moved += 1;
            }
        }
        moved
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(segment: SegmentId, offset: u64) -> IndexEntry {
        IndexEntry::new(segment, RecordLocation { offset, len: 10 })
    }

    #[test]
    fn set_overwrites_previous_location() {
        let mut index = Index::new();
        index.set("k", at(SegmentId::Active, 4));
        index.set("k", at(SegmentId::Active, 40));

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("k").unwrap().offset, 40);
    }

    #[test]
    fn remove_forgets_key() {
        let mut index = Index::new();
        index.set("k", at(SegmentId::Active, 4));

        assert!(index.remove("k").is_some());
        assert!(index.get("k").is_none());
        assert!(index.remove("k").is_none());
    }

    #[test]
    fn retarget_moves_only_matching_segment() {
        let mut index = Index::new();
        index.set("old", at(SegmentId::Sealed(1), 4));
        index.set("a", at(SegmentId::Active, 4));
        index.set("b", at(SegmentId::Active, 30));

        let moved = index.retarget(SegmentId::Active, SegmentId::Sealed(2));

        assert_eq!(moved, 2);
        assert_eq!(index.get("a").unwrap(), at(SegmentId::Sealed(2), 4));
        assert_eq!(index.get("b").unwrap(), at(SegmentId::Sealed(2), 30));
        assert_eq!(index.get("old").unwrap(), at(SegmentId::Sealed(1), 4));
    }
}
