//! Sealed Segments
//!
//! Read-only copies of the active segment, named by creation time, either
//! raw (`data.table.<millis>`) or gzip-compressed (`data.table.<millis>.gz`).

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use flate2::read::GzDecoder;
use lru::LruCache;
use parking_lot::Mutex;

use crate::error::{Result, SegKvError};

use super::{SegmentId, SegmentIterator, ACTIVE_SEGMENT_NAME, COMPRESSED_EXTENSION};

/// A sealed segment on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSegment {
    timestamp: u64,
    path: PathBuf,
    compressed: bool,
}

impl SealedSegment {
    /// Raw (not yet compressed) segment stamped `timestamp` in `dir`
    pub fn raw(dir: &Path, timestamp: u64) -> Self {
        Self {
            timestamp,
            path: dir.join(format!("{}.{}", ACTIVE_SEGMENT_NAME, timestamp)),
            compressed: false,
        }
    }

    /// Compressed segment stamped `timestamp` in `dir`
    pub fn compressed(dir: &Path, timestamp: u64) -> Self {
        Self {
            timestamp,
            path: dir.join(format!(
                "{}.{}.{}",
                ACTIVE_SEGMENT_NAME, timestamp, COMPRESSED_EXTENSION
            )),
            compressed: true,
        }
    }

    /// Recognize a sealed segment from its file name
    ///
    /// "data.table.1718236800123"    → raw
    /// "data.table.1718236800123.gz" → compressed
    /// anything else (including in-progress ".gz.tmp" files) → None
    pub fn parse(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let rest = name.strip_prefix(ACTIVE_SEGMENT_NAME)?.strip_prefix('.')?;

        let (digits, compressed) = match rest.strip_suffix(COMPRESSED_EXTENSION) {
            Some(stem) => (stem.strip_suffix('.')?, true),
            None => (rest, false),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let timestamp = digits.parse().ok()?;

        Some(Self {
            timestamp,
            path: path.to_path_buf(),
            compressed,
        })
    }

    /// Every sealed segment file in `dir`, in both forms, unordered
    pub fn scan(dir: &Path) -> Result<Vec<Self>> {
        let mut segments = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(segment) = Self::parse(&path) {
                segments.push(segment);
            }
        }
        Ok(segments)
    }

    /// Sealed segments in replay order (oldest first)
    ///
    /// When a timestamp exists both raw and compressed, the compressed copy
    /// wins: it is only renamed into place once complete.
    pub fn list(dir: &Path) -> Result<Vec<Self>> {
        let mut by_timestamp: BTreeMap<u64, Self> = BTreeMap::new();

        for segment in Self::scan(dir)? {
            let keep_existing = by_timestamp
                .get(&segment.timestamp)
                .map_or(false, |existing| existing.compressed);
            if !keep_existing {
                by_timestamp.insert(segment.timestamp, segment);
            }
        }

        Ok(by_timestamp.into_values().collect())
    }

    /// Read a record body from whichever form of segment `timestamp` exists
    ///
    /// The raw copy is tried first; the compression worker only deletes it
    /// after the compressed copy is complete.
    pub fn read_record(dir: &Path, timestamp: u64, offset: u64, len: u32) -> Result<Bytes> {
        match Self::raw(dir, timestamp).read_at(offset, len) {
            Err(SegKvError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                Self::compressed(dir, timestamp).read_at(offset, len)
            }
            other => other,
        }
    }

    /// Full decompressed content
    pub fn read_all(&self) -> Result<Bytes> {
        let mut buf = Vec::new();
        if self.compressed {
            let mut decoder = GzDecoder::new(BufReader::new(File::open(&self.path)?));
            decoder.read_to_end(&mut buf)?;
        } else {
            File::open(&self.path)?.read_to_end(&mut buf)?;
        }
        Ok(Bytes::from(buf))
    }

    /// Scan every record of the segment
    pub fn iter(&self) -> Result<SegmentIterator> {
        Ok(SegmentIterator::new(self.read_all()?))
    }

    /// Read `len` bytes at `offset` of the decompressed content
    pub fn read_at(&self, offset: u64, len: u32) -> Result<Bytes> {
        let mut buf = vec![0u8; len as usize];
        let file = File::open(&self.path)?;

        let read = if self.compressed {
            let mut decoder = GzDecoder::new(BufReader::new(file));
            let skipped = io::copy(&mut (&mut decoder).take(offset), &mut io::sink())?;
            if skipped < offset {
                return Err(self.out_of_range(offset, len));
            }
            decoder.read_exact(&mut buf)
        } else {
            let mut file = file;
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf)
        };

        match read {
            Ok(()) => Ok(Bytes::from(buf)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(self.out_of_range(offset, len))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn out_of_range(&self, offset: u64, len: u32) -> SegKvError {
        SegKvError::corrupt(format!(
            "record [{}, {}) lies beyond the end of {}",
            offset,
            offset + len as u64,
            self.path.display()
        ))
    }

    /// Size of the file on disk (compressed size for `.gz`)
    pub fn file_size(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    pub fn id(&self) -> SegmentId {
        SegmentId::Sealed(self.timestamp)
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }
}

/// Decompressed content of recently read `.gz` segments, keyed by timestamp
///
/// Sealed segments never change once written and timestamps are never
/// reused, so entries need no invalidation. Raw segments bypass the cache:
/// a positional read on them is already cheap.
pub struct SealedCache {
    segments: Option<Mutex<LruCache<u64, Bytes>>>,
}

impl SealedCache {
    /// Cache up to `capacity` segments (0 to disable caching)
    pub fn new(capacity: usize) -> Self {
        Self {
            segments: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Same contract as `SealedSegment::read_record`
    pub fn read_record(&self, dir: &Path, timestamp: u64, offset: u64, len: u32) -> Result<Bytes> {
        match SealedSegment::raw(dir, timestamp).read_at(offset, len) {
            Err(SegKvError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                self.read_compressed(dir, timestamp, offset, len)
            }
            other => other,
        }
    }

    fn read_compressed(&self, dir: &Path, timestamp: u64, offset: u64, len: u32) -> Result<Bytes> {
        let segment = SealedSegment::compressed(dir, timestamp);
        let Some(cache) = &self.segments else {
            return segment.read_at(offset, len);
        };

        let cached = cache.lock().get(&timestamp).cloned();
        let content = match cached {
            Some(content) => content,
            None => {
                let content = segment.read_all()?;
                tracing::trace!(timestamp, bytes = content.len(), "cached sealed segment");
                cache.lock().put(timestamp, content.clone());
                content
            }
        };

        let end = offset + len as u64;
        if end > content.len() as u64 {
            return Err(segment.out_of_range(offset, len));
        }
        Ok(content.slice(offset as usize..end as usize))
    }

    /// Segments currently held in memory
    pub fn len(&self) -> usize {
        self.segments.as_ref().map_or(0, |cache| cache.lock().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
