//! Configuration for SegKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, SegKvError};

/// Main configuration for a SegKV store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── data.table                 (active segment)
    ///     ├── data.table.<millis>        (sealed, awaiting compression)
    ///     └── data.table.<millis>.gz     (sealed and compressed)
    pub data_dir: PathBuf,

    /// When to fsync the active segment
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Number of buffered mutations that triggers a flush
    pub flush_threshold: usize,

    // -------------------------------------------------------------------------
    // Rotation Configuration
    // -------------------------------------------------------------------------
    /// Active segment size (bytes) above which it is sealed and reset
    pub rotation_threshold: u64,

    /// Sealed segments that may wait for the compression worker before
    /// rotation blocks
    pub compression_queue_capacity: usize,

    /// Gzip level, 0 (store) to 9 (best)
    pub compression_level: u32,

    // -------------------------------------------------------------------------
    // Read Path Configuration
    // -------------------------------------------------------------------------
    /// Decompressed `.gz` segments kept in memory for lookups (0 to disable)
    pub sealed_cache_segments: usize,
}

/// Active segment sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every flush (safest, slowest)
    EveryFlush,

    /// fsync after N flushes; `close()` always syncs
    EveryNFlushes { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./segkv_data"),
            sync_strategy: SyncStrategy::EveryFlush,
            flush_threshold: 1024,
            rotation_threshold: 4 * 1024 * 1024, // 4 MB
            compression_queue_capacity: 8,
            compression_level: 6,
            sealed_cache_segments: 4,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the store cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.flush_threshold == 0 {
            return Err(SegKvError::Config(
                "flush_threshold must be at least 1".to_string(),
            ));
        }
        if self.rotation_threshold == 0 {
            return Err(SegKvError::Config(
                "rotation_threshold must be at least 1 byte".to_string(),
            ));
        }
        if self.compression_queue_capacity == 0 {
            return Err(SegKvError::Config(
                "compression_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.compression_level > 9 {
            return Err(SegKvError::Config(format!(
                "compression_level must be 0..=9, got {}",
                self.compression_level
            )));
        }
        if let SyncStrategy::EveryNFlushes { count: 0 } = self.sync_strategy {
            return Err(SegKvError::Config(
                "EveryNFlushes count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all segments)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the active segment sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the number of buffered mutations that triggers a flush
    pub fn flush_threshold(mut self, entries: usize) -> Self {
        self.config.flush_threshold = entries;
        self
    }

    /// Set the active segment size (in bytes) that triggers rotation
    pub fn rotation_threshold(mut self, bytes: u64) -> Self {
        self.config.rotation_threshold = bytes;
        self
    }

    /// Set how many sealed segments may queue for compression
    pub fn compression_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.compression_queue_capacity = capacity;
        self
    }

    /// Set the gzip compression level
    pub fn compression_level(mut self, level: u32) -> Self {
        self.config.compression_level = level;
        self
    }

    /// Set how many decompressed sealed segments lookups may cache
    pub fn sealed_cache_segments(mut self, segments: usize) -> Self {
        self.config.sealed_cache_segments = segments;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
