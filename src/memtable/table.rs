//! MemTable implementation
//!
//! BTreeMap-based buffer of pending commands.

use std::collections::BTreeMap;

use crate::record::Command;

/// In-memory table of pending mutations
#[derive(Debug, Default)]
pub struct MemTable {
    entries: BTreeMap<String, Command>,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a command under its key, replacing any pending one
    ///
    /// Returns the number of pending entries afterwards.
    pub fn put(&mut self, command: Command) -> usize {
        self.entries.insert(command.key().to_owned(), command);
        self.entries.len()
    }

    /// Pending command for `key`, if any
    pub fn get(&self, key: &str) -> Option<&Command> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take every pending command in key order, leaving the table empty
    pub fn drain(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    /// Put back a drained batch after a failed flush
    ///
    /// Keys buffered since the drain keep their newer command.
    pub fn restore(&mut self, batch: Vec<Command>) {
        for command in batch {
            self.entries
                .entry(command.key().to_owned())
                .or_insert(command);
        }
    }

    /// Iterate pending commands in key order
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.entries.values()
    }
}
