//! MemTable Module
//!
//! In-memory buffer of mutations not yet flushed to the active segment.
//!
//! ## Responsibilities
//! - Hold the latest pending `Command` per key (last writer wins)
//! - Answer reads before the index is consulted
//! - Count pending mutations for the flush trigger
//! - Hand out its content in key order on flush
//!
//! ## Data Structure Choice
//! A plain BTreeMap without its own lock: the store's single RwLock
//! already serializes every mutation, and `drain` takes `&mut self`, so
//! no `put` can interleave with a flush. Key order is kept for future
//! range scans.

mod table;

pub use table::MemTable;
