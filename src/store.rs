//! Store Module
//!
//! The public facade that coordinates every component.
//!
//! ## Responsibilities
//! - Replay existing segments before serving requests
//! - Buffer mutations and flush them once the threshold is reached
//! - Rotate the active segment when it outgrows its limit
//! - Resolve reads from the MemTable, then the Index
//! - Flush everything on close

use std::fs;
use std::path::Path;

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{Result, SegKvError};
use crate::index::{Index, IndexEntry};
use crate::memtable::MemTable;
use crate::record::{self, Command};
use crate::recovery::{Recovery, RecoveryReport};
use crate::rotation::Rotator;
use crate::segment::{SealedCache, SealedSegment, SegmentFile, SegmentId, ACTIVE_SEGMENT_NAME};

/// Lifecycle of a store
///
/// `open` performs initialization (replay) before it returns, so callers
/// only ever observe `Ready` or `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Ready,
    Closed,
}

/// An embeddable log-structured key-value store
///
/// ## Concurrency Model: one reader-writer lock
///
/// - **Reads** (`get`): read lock; many run in parallel.
/// - **Writes** (`set`/`remove`/`flush`/`close`): write lock, including the
///   flush and the rotation they may trigger, so Index offsets always match
///   segment content when a reader looks.
/// - **Compression**: a background thread working only on sealed files,
///   which nothing appends to again; it takes no lock.
///
/// A slow disk stalls every caller for the duration of a flush or rotation;
/// there is no timeout.
///
/// ## Shutdown
/// Call `close()` before the process exits. `Drop` closes as a fallback and
/// logs any error it cannot return.
pub struct Store {
    config: Config,
    recovery: RecoveryReport,
    inner: RwLock<StoreInner>,
}

/// Everything guarded by the store lock
struct StoreInner {
    state: StoreState,
    memtable: MemTable,
    index: Index,
    active: SegmentFile,
    rotator: Rotator,
    sealed_cache: SealedCache,
}

impl Store {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Validate config, create the data directory
    /// 2. Replay sealed segments then the active one
    /// 3. Open the active segment for appends
    /// 4. Start the compression worker and resume interrupted compression
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let data_dir = config.data_dir.clone();
        tracing::info!(data_dir = %data_dir.display(), "opening store");

        let mut memtable = MemTable::new();
        let mut index = Index::new();
        let recovery = Recovery::replay(&data_dir, &mut memtable, &mut index)?;

        let active =
            SegmentFile::open(&data_dir.join(ACTIVE_SEGMENT_NAME), config.sync_strategy)?;

        let rotator = Rotator::new(
            &data_dir,
            &config,
            recovery.last_sealed_timestamp.unwrap_or(0),
        )?;
        rotator.resume_pending()?;
        let sealed_cache = SealedCache::new(config.sealed_cache_segments);

        tracing::info!(
            pending = memtable.len(),
            indexed = index.len(),
            active_bytes = active.len(),
            "store ready"
        );

        Ok(Self {
            config,
            recovery,
            inner: RwLock::new(StoreInner {
                state: StoreState::Ready,
                memtable,
                index,
                active,
                rotator,
                sealed_cache,
            }),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Get the value of a key
    ///
    /// Search order:
    /// 1. MemTable (pending writes)
    /// 2. Index → positional read from the owning segment
    ///
    /// A `Remove` from either source means absent. A record that fails to
    /// decode is `CorruptRecord`, not absent.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let inner = self.inner.read();
        inner.ensure_ready()?;

        if let Some(command) = inner.memtable.get(key) {
            return Ok(command.value().map(str::to_owned));
        }

        let Some(entry) = inner.index.get(key) else {
            return Ok(None);
        };

        let command = inner.read_record(&self.config.data_dir, entry)?;
        if command.key() != key {
            return Err(SegKvError::corrupt(format!(
                "index entry for {:?} at {} offset {} holds key {:?}",
                key,
                entry.segment,
                entry.offset,
                command.key()
            )));
        }

        Ok(command.into_value())
    }

    /// Set a key to a value
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.apply(Command::set(key, value))
    }

    /// Remove a key (it need not exist)
    pub fn remove(&self, key: &str) -> Result<()> {
        self.apply(Command::remove(key))
    }

    /// Buffer a mutation, then flush and rotate as needed
    fn apply(&self, command: Command) -> Result<()> {
        let mut inner = self.inner.write();
        inner.ensure_ready()?;

        let pending = inner.memtable.put(command);
        if pending >= self.config.flush_threshold {
            inner.flush()?;
        }
        inner.maybe_rotate()?;

        Ok(())
    }

    /// Flush the MemTable regardless of its size
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.ensure_ready()?;

        inner.flush()?;
        inner.maybe_rotate()?;
        Ok(())
    }

    /// Close the store gracefully
    ///
    /// Flushes pending mutations, syncs the active segment and waits for
    /// queued compression. Calling it again is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.state == StoreState::Closed {
            return Ok(());
        }

        let flushed = inner.flush()?;
        inner.active.sync()?;
        inner.rotator.shutdown();
        inner.state = StoreState::Closed;

        tracing::info!(
            data_dir = %self.config.data_dir.display(),
            flushed,
            "store closed"
        );
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and tooling)
    // =========================================================================

    pub fn state(&self) -> StoreState {
        self.inner.read().state
    }

    pub fn is_closed(&self) -> bool {
        self.state() == StoreState::Closed
    }

    /// Number of mutations waiting to be flushed
    pub fn memtable_len(&self) -> usize {
        self.inner.read().memtable.len()
    }

    /// Durable location of a key, if it has one
    pub fn index_entry(&self, key: &str) -> Option<IndexEntry> {
        self.inner.read().index.get(key)
    }

    pub fn index_len(&self) -> usize {
        self.inner.read().index.len()
    }

    /// Current size of the active segment in bytes
    pub fn active_segment_len(&self) -> u64 {
        self.inner.read().active.len()
    }

    /// Rotations performed since open
    pub fn rotation_count(&self) -> u64 {
        self.inner.read().rotator.rotations()
    }

    /// Decompressed sealed segments held for lookups
    pub fn cached_segments(&self) -> usize {
        self.inner.read().sealed_cache.len()
    }

    /// Sealed segments currently on disk, oldest first
    pub fn sealed_segments(&self) -> Result<Vec<SealedSegment>> {
        SealedSegment::list(&self.config.data_dir)
    }

    /// What replay found when the store was opened
    pub fn recovery_report(&self) -> &RecoveryReport {
        &self.recovery
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!(
                data_dir = %self.config.data_dir.display(),
                error = %e,
                "failed to close store on drop"
            );
        }
    }
}

impl StoreInner {
    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            StoreState::Ready => Ok(()),
            StoreState::Closed => Err(SegKvError::StoreClosed),
        }
    }

    /// Write the MemTable to the active segment and index the results
    ///
    /// On failure the batch goes back into the MemTable. Returns the number
    /// of records written.
    fn flush(&mut self) -> Result<usize> {
        if self.memtable.is_empty() {
            return Ok(0);
        }

        let batch = self.memtable.drain();
        let locations = match self.active.append_batch(&batch) {
            Ok(locations) => locations,
            Err(e) => {
                tracing::warn!(records = batch.len(), error = %e, "flush failed");
                self.memtable.restore(batch);
                return Err(e);
            }
        };

        for (command, location) in batch.iter().zip(locations) {
            self.index.set(command.key(), IndexEntry::new(SegmentId::Active, location));
        }

        tracing::debug!(
            records = batch.len(),
            active_bytes = self.active.len(),
            "memtable flushed"
        );
        Ok(batch.len())
    }

    fn maybe_rotate(&mut self) -> Result<()> {
        self.rotator.maybe_rotate(&mut self.active, &mut self.index)?;
        Ok(())
    }

    fn read_record(&self, data_dir: &Path, entry: IndexEntry) -> Result<Command> {
        let body = match entry.segment {
            SegmentId::Active => self.active.read_at(entry.offset, entry.len)?,
            SegmentId::Sealed(timestamp) => {
                self.sealed_cache.read_record(data_dir, timestamp, entry.offset, entry.len)?
            }
        };
        record::decode(&body)
    }
}
