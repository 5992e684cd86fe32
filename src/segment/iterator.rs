//! Segment Iterator
//!
//! Sequential decoding of every framed record in a segment.

use bytes::{Buf, Bytes};

use crate::error::{Result, SegKvError};
use crate::record::{self, Command, LENGTH_PREFIX_SIZE, MAX_RECORD_SIZE};

use super::RecordLocation;

/// A decoded record and where its body starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRecord {
    pub location: RecordLocation,
    pub command: Command,
}

/// Iterator over the records of a segment held in memory
///
/// Yields records in file order. The first truncated or undecodable frame
/// is yielded as an error and ends the iteration.
pub struct SegmentIterator {
    data: Bytes,
    /// Offset of the next frame
    position: usize,
    failed: bool,
}

impl SegmentIterator {
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            position: 0,
            failed: false,
        }
    }

    /// Offset of the next frame; after an error, offset of the bad frame
    pub fn position(&self) -> u64 {
        self.position as u64
    }

    /// Total bytes in the segment
    pub fn segment_len(&self) -> u64 {
        self.data.len() as u64
    }

    fn fail(&mut self, reason: String) -> Option<Result<SegmentRecord>> {
        self.failed = true;
        Some(Err(SegKvError::CorruptRecord(reason)))
    }
}

impl Iterator for SegmentIterator {
    type Item = Result<SegmentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.position >= self.data.len() {
            return None;
        }

        let remaining = &self.data[self.position..];
        if remaining.len() < LENGTH_PREFIX_SIZE {
            return self.fail(format!(
                "truncated length prefix at offset {}",
                self.position
            ));
        }

        let body_len = (&remaining[..LENGTH_PREFIX_SIZE]).get_u32();
        if body_len > MAX_RECORD_SIZE {
            return self.fail(format!(
                "record length {} at offset {} exceeds maximum {}",
                body_len, self.position, MAX_RECORD_SIZE
            ));
        }

        let body_start = self.position + LENGTH_PREFIX_SIZE;
        let body_end = body_start + body_len as usize;
        if body_end > self.data.len() {
            return self.fail(format!(
                "truncated record at offset {}: need {} bytes, have {}",
                self.position,
                body_len,
                self.data.len() - body_start
            ));
        }

        match record::decode(&self.data[body_start..body_end]) {
            Ok(command) => {
                self.position = body_end;
                Some(Ok(SegmentRecord {
                    location: RecordLocation {
                        offset: body_start as u64,
                        len: body_len,
                    },
                    command,
                }))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
