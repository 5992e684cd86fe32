//! Record Module
//!
//! Mutations and their on-disk encoding.
//!
//! ## Record Format
//! ```text
//! ┌──────────────┬──────────────┬──────────────────────────────┐
//! │ Len (4, BE)  │ CRC32 (4, BE)│  bincode(Command)            │
//! └──────────────┴──────────────┴──────────────────────────────┘
//!                 └──────────── record body (Len bytes) ───────┘
//! ```
//!
//! The bincode payload starts with the variant index as a little-endian
//! u32 (`0` = Set, `1` = Remove) followed by u64-length-prefixed UTF-8
//! strings. The checksum covers the payload only.

mod command;
mod codec;

pub use command::Command;
pub use codec::{
    decode, encode, encode_framed, CHECKSUM_SIZE, LENGTH_PREFIX_SIZE, MAX_RECORD_SIZE,
};
