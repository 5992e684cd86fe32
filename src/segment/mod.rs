//! Segment Module
//!
//! Append-only log files holding framed `Command` records.
//!
//! ## Responsibilities
//! - Append framed records to the single active segment
//! - Positional reads for point lookups
//! - Sequential scans for replay
//! - Seal the active segment into a timestamped, read-only copy
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── data.table                  active segment (append-only)
//!   ├── data.table.1718236800123    sealed, waiting for compression
//!   └── data.table.1718236799000.gz sealed and gzip-compressed
//! ```
//!
//! Every segment, compressed or not, is a plain concatenation of
//! `[len: u32 BE][record body]` frames. Replay order is the timestamp order
//! of sealed segments followed by the active one; there is no manifest.
//!
//! Two stores over the same directory are not supported: nothing prevents
//! it, and the result is undefined.

mod file;
mod iterator;
mod sealed;

use std::fmt;
use std::fs::File;
use std::path::Path;

use crate::error::Result;

pub use file::SegmentFile;
pub use iterator::{SegmentIterator, SegmentRecord};
pub use sealed::{SealedCache, SealedSegment};

/// File name of the active segment inside the data directory
pub const ACTIVE_SEGMENT_NAME: &str = "data.table";

/// Extension of compressed sealed segments
pub const COMPRESSED_EXTENSION: &str = "gz";

/// Suffix of a compressed segment that is still being written
pub const COMPRESSING_SUFFIX: &str = ".gz.tmp";

/// Identifies the segment holding a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentId {
    /// The segment currently receiving flushes
    Active,

    /// A sealed segment, by creation time in epoch millis
    Sealed(u64),
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentId::Active => write!(f, "active"),
            SegmentId::Sealed(timestamp) => write!(f, "sealed@{}", timestamp),
        }
    }
}

/// Where a record body lives inside a segment
///
/// `offset` points just past the length prefix; `len` is the body length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLocation {
    pub offset: u64,
    pub len: u32,
}

/// Persist directory entries (creates, renames, unlinks) made inside `dir`
///
/// An empty path (the parent of a bare file name) means the current directory.
pub fn sync_dir(dir: &Path) -> Result<()> {
    let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
    File::open(dir)?.sync_all()?;
    Ok(())
}
