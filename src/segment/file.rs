//! Active Segment
//!
//! The single append-only segment receiving flushes.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;

use crate::config::SyncStrategy;
use crate::error::{Result, SegKvError};
use crate::record::{encode_framed, Command, LENGTH_PREFIX_SIZE};

use super::{RecordLocation, SealedSegment, SegmentIterator};

/// Append-only segment file
///
/// ## Concurrency:
/// - Appends and truncation need `&mut self`; the store's write lock
///   provides that.
/// - `read_at` and `iter` take `&self` and go through a separate read handle
///   behind a mutex, so they never move the append cursor.
pub struct SegmentFile {
    path: PathBuf,

    /// Opened in append mode, every write lands at the end
    writer: File,

    /// Dedicated handle for positional reads
    reader: Mutex<File>,

    /// Bytes of valid data in the file
    len: u64,

    sync_strategy: SyncStrategy,
    writes_since_sync: usize,
}

impl SegmentFile {
    /// Open or create the segment at `path`
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let len = writer.metadata()?.len();
        let reader = File::open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            reader: Mutex::new(reader),
            len,
            sync_strategy,
            writes_since_sync: 0,
        })
    }

    /// Append one command, returning where its body landed
    pub fn append(&mut self, command: &Command) -> Result<RecordLocation> {
        let frame = encode_framed(command)?;
        let location = RecordLocation {
            offset: self.len + LENGTH_PREFIX_SIZE as u64,
            len: (frame.len() - LENGTH_PREFIX_SIZE) as u32,
        };

        self.write_buffer(&frame)?;
        Ok(location)
    }

    /// Append a batch of commands with a single write
    ///
    /// Locations are returned in the same order as the commands.
    pub fn append_batch<'a, I>(&mut self, commands: I) -> Result<Vec<RecordLocation>>
    where
        I: IntoIterator<Item = &'a Command>,
    {
        let mut buffer = BytesMut::new();
        let mut locations = Vec::new();

        for command in commands {
            let frame = encode_framed(command)?;
            locations.push(RecordLocation {
                offset: self.len + (buffer.len() + LENGTH_PREFIX_SIZE) as u64,
                len: (frame.len() - LENGTH_PREFIX_SIZE) as u32,
            });
            buffer.put_slice(&frame);
        }

        if !buffer.is_empty() {
            self.write_buffer(&buffer)?;
        }
        Ok(locations)
    }

    /// Write raw frames, rolling the file back if the write fails
    fn write_buffer(&mut self, buffer: &[u8]) -> Result<()> {
        if let Err(e) = self.writer.write_all(buffer) {
            if let Err(rollback) = self.writer.set_len(self.len) {
                tracing::error!(
                    path = %self.path.display(),
                    error = %rollback,
                    "failed to roll back partial append"
                );
            }
            return Err(e.into());
        }

        self.len += buffer.len() as u64;
        self.writes_since_sync += 1;

        match self.sync_strategy {
            SyncStrategy::EveryFlush => self.sync()?,
            SyncStrategy::EveryNFlushes { count } => {
                if self.writes_since_sync >= count {
                    self.sync()?;
                }
            }
        }

        Ok(())
    }

    /// Read `len` bytes starting at `offset`
    pub fn read_at(&self, offset: u64, len: u32) -> Result<Bytes> {
        let end = offset + len as u64;
        if end > self.len {
            return Err(SegKvError::corrupt(format!(
                "record [{}, {}) lies beyond the end of {} ({} bytes)",
                offset,
                end,
                self.path.display(),
                self.len
            )));
        }

        let mut buf = vec![0u8; len as usize];
        let mut reader = self.reader.lock();
        reader.seek(SeekFrom::Start(offset))?;
        reader.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    /// Scan every record from offset 0
    pub fn iter(&self) -> Result<SegmentIterator> {
        let mut buf = Vec::with_capacity(self.len as usize);
        let mut reader = self.reader.lock();
        reader.seek(SeekFrom::Start(0))?;
        (&mut *reader).take(self.len).read_to_end(&mut buf)?;
        Ok(SegmentIterator::new(Bytes::from(buf)))
    }

    /// Copy the current content into a read-only segment stamped `timestamp`
    ///
    /// The active segment itself is left untouched; callers reset it with
    /// `truncate_to_empty` once nothing refers to its offsets any more.
    pub fn seal(&self, timestamp: u64) -> Result<SealedSegment> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let sealed = SealedSegment::raw(dir, timestamp);

        fs::copy(&self.path, sealed.path())?;
        File::open(sealed.path())?.sync_all()?;
        super::sync_dir(dir)?;

        Ok(sealed)
    }

    /// Drop all content so the next append lands at offset 0
    pub fn truncate_to_empty(&mut self) -> Result<()> {
        self.truncate_to(0)
    }

    /// Cut the file back to `len` bytes (used to discard a corrupt tail)
    pub fn truncate_to(&mut self, len: u64) -> Result<()> {
        self.writer.set_len(len)?;
        self.writer.sync_all()?;
        self.len = len;
        self.writes_since_sync = 0;
        Ok(())
    }

    /// Force all appended data to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.sync_data()?;
        self.writes_since_sync = 0;
        Ok(())
    }

    /// Current size in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
