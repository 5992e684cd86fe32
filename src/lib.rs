//! # SegKV
//!
//! An embeddable, single-node, log-structured key-value store with:
//! - An in-memory MemTable buffering writes until a flush threshold
//! - An append-only active segment of length-prefixed records
//! - An in-memory Index of byte offsets for point lookups
//! - Size-based rotation with background gzip compression
//! - Crash recovery by replaying every segment on open
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                               │
//! │              (one RwLock: readers ∥, writers ⟂)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────┐
//!          │            │                 │
//!          ▼            ▼                 ▼
//!   ┌─────────────┐ ┌─────────────┐ ┌─────────────┐
//!   │  MemTable   │ │    Index    │ │   Rotator   │
//!   │ (BTreeMap)  │ │ key→offset  │ │ seal+reset  │
//!   └──────┬──────┘ └──────▲──────┘ └──────┬──────┘
//!          │ flush         │                │ queue (bounded)
//!          ▼               │                ▼
//!   ┌─────────────────────────────┐  ┌─────────────────┐
//!   │   data.table (active)       │  │ compression     │
//!   │   data.table.<ms>[.gz]      │◀─│ worker thread   │
//!   └─────────────────────────────┘  └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use segkv::{Config, Store};
//!
//! # fn main() -> segkv::Result<()> {
//! let store = Store::open(Config::builder().data_dir("./data").build())?;
//! store.set("a", "1")?;
//! assert_eq!(store.get("a")?, Some("1".to_string()));
//! store.remove("a")?;
//! store.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod segment;
pub mod index;
pub mod memtable;
pub mod recovery;
pub mod compression;
pub mod rotation;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, SegKvError};
pub use config::{Config, SyncStrategy};
pub use record::Command;
pub use store::{Store, StoreState};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of SegKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
