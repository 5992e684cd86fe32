//! Recovery
//!
//! Rebuilds the MemTable and Index by replaying every segment on open.
//!
//! ## Replay Order
//! 1. Sealed segments, oldest timestamp first (decompressed in memory)
//! 2. The active segment last
//!
//! Later records overwrite earlier ones, which gives last-writer-wins across
//! segment boundaries. A segment that cannot be read is skipped; a corrupt
//! record abandons the rest of its segment only. Neither stops the open.

use std::fs;
use std::io;
use std::path::Path;

use bytes::Bytes;

use crate::config::SyncStrategy;
use crate::error::Result;
use crate::index::{Index, IndexEntry};
use crate::memtable::MemTable;
use crate::segment::{
    SealedSegment, SegmentFile, SegmentId, SegmentIterator, SegmentRecord, ACTIVE_SEGMENT_NAME,
};

/// Outcome of a replay
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Segments that yielded at least one record
    pub segments_replayed: usize,

    /// Segments that were unreadable or empty
    pub segments_skipped: usize,

    /// Segments whose replay stopped at a corrupt record
    pub corrupt_segments: usize,

    /// Records applied across all segments
    pub records_recovered: u64,

    /// Newest sealed segment timestamp seen
    pub last_sealed_timestamp: Option<u64>,

    /// Offset of the first bad frame in the active segment, if any
    pub active_corrupt_at: Option<u64>,

    /// Whether the active segment was cut back to its last good record
    pub active_truncated: bool,
}

/// Replays segments in chronological order
pub struct Recovery;

impl Recovery {
    /// Rebuild `memtable` and `index` from everything in `data_dir`
    ///
    /// A corrupt tail in the active segment is cut off afterwards so new
    /// appends are not stranded behind it.
    pub fn replay(
        data_dir: &Path,
        memtable: &mut MemTable,
        index: &mut Index,
    ) -> Result<RecoveryReport> {
        let mut report = Self::walk(data_dir, |segment, record| {
            index.set(
                record.command.key(),
                IndexEntry::new(segment, record.location),
            );
            memtable.put(record.command.clone());
        })?;

        if let Some(valid_len) = report.active_corrupt_at {
            let path = data_dir.join(ACTIVE_SEGMENT_NAME);
            let preserved = data_dir.join(format!(
                "{}.corrupt.{}",
                ACTIVE_SEGMENT_NAME,
                crate::rotation::epoch_millis()
            ));
            fs::copy(&path, &preserved)?;

            SegmentFile::open(&path, SyncStrategy::EveryFlush)?.truncate_to(valid_len)?;
            report.active_truncated = true;

            tracing::warn!(
                path = %path.display(),
                preserved = %preserved.display(),
                valid_len,
                "truncated corrupt tail of active segment"
            );
        }

        tracing::info!(
            segments_replayed = report.segments_replayed,
            segments_skipped = report.segments_skipped,
            corrupt_segments = report.corrupt_segments,
            records_recovered = report.records_recovered,
            "replay complete"
        );

        Ok(report)
    }

    /// Check every segment without building any state or touching files
    pub fn verify(data_dir: &Path) -> Result<RecoveryReport> {
        Self::walk(data_dir, |_, _| {})
    }

    /// Visit every decodable record in replay order
    ///
    /// Fails only if the directory itself cannot be listed.
    pub fn walk<F>(data_dir: &Path, mut visit: F) -> Result<RecoveryReport>
    where
        F: FnMut(SegmentId, &SegmentRecord),
    {
        let mut report = RecoveryReport::default();

        let sealed = SealedSegment::list(data_dir)?;
        report.last_sealed_timestamp = sealed.last().map(SealedSegment::timestamp);
        tracing::debug!(sealed = sealed.len(), "replay order established");

        for segment in &sealed {
            let records = match segment.iter() {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(
                        path = %segment.path().display(),
                        error = %e,
                        "skipping unreadable segment"
                    );
                    report.segments_skipped += 1;
                    continue;
                }
            };
            if records.segment_len() == 0 {
                tracing::warn!(path = %segment.path().display(), "skipping empty segment");
                report.segments_skipped += 1;
                continue;
            }

            Self::replay_segment(segment.id(), segment.path(), records, &mut report, &mut visit);
        }

        let active_path = data_dir.join(ACTIVE_SEGMENT_NAME);
        let active = match fs::read(&active_path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!(
                    path = %active_path.display(),
                    error = %e,
                    "skipping unreadable active segment"
                );
                report.segments_skipped += 1;
                return Ok(report);
            }
        };

        if !active.is_empty() {
            let records = SegmentIterator::new(Bytes::from(active));
            report.active_corrupt_at = Self::replay_segment(
                SegmentId::Active,
                &active_path,
                records,
                &mut report,
                &mut visit,
            );
        }

        Ok(report)
    }

    /// Apply one segment; returns the offset of the bad frame if it stopped early
    fn replay_segment<F>(
        segment: SegmentId,
        path: &Path,
        mut records: SegmentIterator,
        report: &mut RecoveryReport,
        visit: &mut F,
    ) -> Option<u64>
    where
        F: FnMut(SegmentId, &SegmentRecord),
    {
        let mut applied = 0u64;
        let mut corrupt_at = None;

        while let Some(record) = records.next() {
            match record {
                Ok(record) => {
                    visit(segment, &record);
                    applied += 1;
                }
                Err(e) => {
                    let offset = records.position();
                    tracing::warn!(
                        path = %path.display(),
                        offset,
                        error = %e,
                        "corrupt record, abandoning rest of segment"
                    );
                    report.corrupt_segments += 1;
                    corrupt_at = Some(offset);
                }
            }
        }

        tracing::debug!(%segment, records = applied, "segment replayed");
        report.records_recovered += applied;
        if applied > 0 {
            report.segments_replayed += 1;
        } else if corrupt_at.is_some() {
            report.segments_skipped += 1;
        }

        corrupt_at
    }
}
