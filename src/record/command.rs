//! Command definitions
//!
//! A single mutation as buffered in the MemTable and stored in segments.

use serde::{Deserialize, Serialize};

/// A mutation of one key
///
/// Variant order is part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Associate a value with a key
    Set { key: String, value: String },

    /// Remove a key
    Remove { key: String },
}

impl Command {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Command::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn remove(key: impl Into<String>) -> Self {
        Command::Remove { key: key.into() }
    }

    /// The key this command affects
    pub fn key(&self) -> &str {
        match self {
            Command::Set { key, .. } | Command::Remove { key } => key,
        }
    }

    /// The value carried by a `Set`, `None` for a `Remove`
    pub fn value(&self) -> Option<&str> {
        match self {
            Command::Set { value, .. } => Some(value),
            Command::Remove { .. } => None,
        }
    }

    /// Resolve the command into the value a reader should observe
    pub fn into_value(self) -> Option<String> {
        match self {
            Command::Set { value, .. } => Some(value),
            Command::Remove { .. } => None,
        }
    }
}
