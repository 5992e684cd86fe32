//! Rotation Manager
//!
//! Bounds the active segment: once it reaches the rotation threshold it is
//! sealed into a timestamped copy, the index is re-pointed at that copy,
//! the active segment is reset, and the copy is queued for compression.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::compression::{self, CompressionWorker};
use crate::config::Config;
use crate::error::Result;
use crate::index::Index;
use crate::segment::{SealedSegment, SegmentFile, SegmentId};

/// Decides when to rotate and performs the rotation
pub struct Rotator {
    data_dir: PathBuf,
    threshold: u64,

    /// Timestamp of the newest sealed segment; new seals are strictly newer
    last_timestamp: u64,

    rotations: u64,
    worker: CompressionWorker,
}

impl Rotator {
    /// Create a rotator and start its compression worker
    ///
    /// `last_timestamp` is the newest sealed segment found on disk (0 if
    /// none), so replay order survives a clock that moved backwards.
    pub fn new(data_dir: &Path, config: &Config, last_timestamp: u64) -> Result<Self> {
        let worker = CompressionWorker::spawn(
            config.compression_queue_capacity,
            config.compression_level,
        )?;

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            threshold: config.rotation_threshold,
            last_timestamp,
            rotations: 0,
            worker,
        })
    }

    /// Queue sealed segments left uncompressed by a previous run
    pub fn resume_pending(&self) -> Result<usize> {
        compression::resume_pending(&self.data_dir, &self.worker)
    }

    pub fn should_rotate(&self, active_len: u64) -> bool {
        active_len >= self.threshold
    }

    /// Rotate if the active segment has outgrown the threshold
    pub fn maybe_rotate(
        &mut self,
        active: &mut SegmentFile,
        index: &mut Index,
    ) -> Result<Option<SealedSegment>> {
        if !self.should_rotate(active.len()) {
            return Ok(None);
        }
        self.rotate(active, index).map(Some)
    }

    /// Seal, re-point, reset, then queue for compression
    ///
    /// The index is re-pointed before the active segment is truncated, so
    /// no entry ever refers to an offset that no longer exists.
    pub fn rotate(
        &mut self,
        active: &mut SegmentFile,
        index: &mut Index,
    ) -> Result<SealedSegment> {
        let timestamp = self.next_timestamp();
        let sealed_len = active.len();

        let sealed = active.seal(timestamp)?;
        self.last_timestamp = timestamp;

        let moved = index.retarget(SegmentId::Active, sealed.id());
        active.truncate_to_empty()?;
        self.rotations += 1;

        tracing::debug!(
            timestamp,
            bytes = sealed_len,
            entries_moved = moved,
            "active segment rotated"
        );

        // The raw copy stays readable and is picked up again on next open.
        if let Err(e) = self.worker.submit(sealed.clone()) {
            tracing::warn!(
                path = %sealed.path().display(),
                error = %e,
                "could not queue sealed segment for compression"
            );
        }

        Ok(sealed)
    }

    fn next_timestamp(&self) -> u64 {
        epoch_millis().max(self.last_timestamp.saturating_add(1))
    }

    /// Stop the compression worker after it finishes queued work
    pub fn shutdown(&mut self) {
        self.worker.shutdown();
    }

    pub fn rotations(&self) -> u64 {
        self.rotations
    }
}

/// Milliseconds since the Unix epoch
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
