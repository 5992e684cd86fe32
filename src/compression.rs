//! Background Compression
//!
//! A single worker thread that gzips sealed segments off the request path.
//!
//! ## Crash Safety
//! ```text
//! data.table.<ts>          ──gzip──▶  data.table.<ts>.gz.tmp
//! data.table.<ts>.gz.tmp   ──fsync + rename──▶  data.table.<ts>.gz
//! data.table.<ts>          ──delete──▶  (gone)
//! ```
//! At every step at least one complete copy of the segment exists. On open,
//! `resume_pending` finishes whatever a crash interrupted.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Result, SegKvError};
use crate::segment::{sync_dir, SealedSegment, COMPRESSING_SUFFIX};

/// Counters shared with the worker thread
#[derive(Debug, Default)]
struct WorkerStats {
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Handle to the compression thread
///
/// The queue is bounded: `submit` blocks while it is full, which throttles
/// rotation instead of letting sealed files pile up in memory.
pub struct CompressionWorker {
    sender: Option<Sender<SealedSegment>>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<WorkerStats>,
}

impl CompressionWorker {
    /// Start the worker thread
    pub fn spawn(queue_capacity: usize, level: u32) -> Result<Self> {
        let (sender, receiver) = channel::bounded(queue_capacity);
        let stats = Arc::new(WorkerStats::default());
        let worker_stats = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name("segkv-compress".to_string())
            .spawn(move || run_worker(receiver, level, &worker_stats))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            stats,
        })
    }

    /// Queue a raw sealed segment, waiting if the queue is full
    pub fn submit(&self, segment: SealedSegment) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(SegKvError::WorkerUnavailable)?;

        match sender.try_send(segment) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(segment)) => {
                tracing::debug!(
                    timestamp = segment.timestamp(),
                    "compression queue full, waiting"
                );
                sender
                    .send(segment)
                    .map_err(|_| SegKvError::WorkerUnavailable)
            }
            Err(TrySendError::Disconnected(_)) => Err(SegKvError::WorkerUnavailable),
        }
    }

    /// Stop accepting work and wait for queued jobs to finish
    pub fn shutdown(&mut self) {
        drop(self.sender.take());

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("compression worker panicked");
            }
        }
    }

    /// Segments compressed successfully so far
    pub fn completed(&self) -> u64 {
        self.stats.completed.load(Ordering::Relaxed)
    }

    /// Segments whose compression failed (raw copy kept)
    pub fn failed(&self) -> u64 {
        self.stats.failed.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.sender.is_some()
    }
}

impl Drop for CompressionWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(receiver: Receiver<SealedSegment>, level: u32, stats: &WorkerStats) {
    tracing::debug!("compression worker started");

    for segment in receiver.iter() {
        match compress_segment(&segment, level) {
            Ok(compressed) => {
                stats.completed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(path = %compressed.path().display(), "segment compressed");
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    path = %segment.path().display(),
                    error = %e,
                    "segment compression failed, keeping raw copy"
                );
            }
        }
    }

    tracing::debug!("compression worker stopped");
}

/// Gzip a raw sealed segment and delete the raw copy
///
/// The raw copy is removed only after the compressed one is durable and
/// renamed into place.
pub fn compress_segment(segment: &SealedSegment, level: u32) -> Result<SealedSegment> {
    if segment.is_compressed() {
        return Ok(segment.clone());
    }

    let dir = segment.path().parent().unwrap_or_else(|| Path::new("."));
    let target = SealedSegment::compressed(dir, segment.timestamp());
    let staging = staging_path(&target);

    let written = write_gzip(segment.path(), &staging, level)
        .and_then(|()| fs::rename(&staging, target.path()).map_err(SegKvError::from))
        .and_then(|()| sync_dir(dir));

    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(&staging) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %staging.display(),
                    error = %cleanup,
                    "failed to remove staging file"
                );
            }
        }
        return Err(SegKvError::Compression(format!("{}: {}", segment.path().display(), e)));
    }

    if let Err(e) = fs::remove_file(segment.path()) {
        // The compressed copy takes precedence; the raw one goes on next open.
        tracing::warn!(
            path = %segment.path().display(),
            error = %e,
            "failed to remove raw segment"
        );
    }

    Ok(target)
}

fn write_gzip(source: &Path, staging: &Path, level: u32) -> Result<()> {
    let mut input = File::open(source)?;
    let output = BufWriter::new(File::create(staging)?);

    let mut encoder = GzEncoder::new(output, Compression::new(level));
    io::copy(&mut input, &mut encoder)?;

    let file = encoder
        .finish()?
        .into_inner()
        .map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

fn staging_path(target: &SealedSegment) -> PathBuf {
    let dir = target.path().parent().unwrap_or_else(|| Path::new("."));
    let raw = SealedSegment::raw(dir, target.timestamp());
    let mut name = raw.path().as_os_str().to_owned();
    name.push(COMPRESSING_SUFFIX);
    PathBuf::from(name)
}

/// Finish compression work interrupted by a crash
///
/// - removes half-written `.gz.tmp` files
/// - deletes raw copies whose `.gz` already exists
/// - queues the remaining raw copies
///
/// Returns the number of segments queued.
pub fn resume_pending(dir: &Path, worker: &CompressionWorker) -> Result<usize> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_staging = path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| name.ends_with(COMPRESSING_SUFFIX));

        if is_staging {
            tracing::debug!(path = %path.display(), "removing interrupted compression output");
            fs::remove_file(&path)?;
        }
    }

    let mut queued = 0;
    for segment in SealedSegment::scan(dir)? {
        if segment.is_compressed() {
            continue;
        }

        if SealedSegment::compressed(dir, segment.timestamp()).path().exists() {
            tracing::debug!(
                path = %segment.path().display(),
                "removing raw segment already compressed"
            );
            fs::remove_file(segment.path())?;
            continue;
        }

        worker.submit(segment)?;
        queued += 1;
    }

    if queued > 0 {
        tracing::info!(queued, "resumed compression of sealed segments");
    }
    Ok(queued)
}
