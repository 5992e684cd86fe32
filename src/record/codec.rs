//! Record codec
//!
//! Encoding and decoding of a single framed `Command`.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::Command;
use crate::error::{Result, SegKvError};

/// Size of the big-endian length prefix in front of every record body
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of the CRC32 at the start of a record body
pub const CHECKSUM_SIZE: usize = 4;

/// Largest record body accepted (64 MB)
///
/// A length prefix above this is treated as corruption rather than an
/// allocation request.
pub const MAX_RECORD_SIZE: u32 = 64 * 1024 * 1024;

/// Encode a command into a record body (no length prefix)
///
/// Format: crc32 (4) + bincode payload
pub fn encode(command: &Command) -> Result<Bytes> {
    let payload =
        bincode::serialize(command).map_err(|e| SegKvError::Serialization(e.to_string()))?;

    if CHECKSUM_SIZE + payload.len() > MAX_RECORD_SIZE as usize {
        return Err(SegKvError::Serialization(format!(
            "Record too large: {} bytes (max {})",
            CHECKSUM_SIZE + payload.len(),
            MAX_RECORD_SIZE
        )));
    }

    let mut body = BytesMut::with_capacity(CHECKSUM_SIZE + payload.len());
    body.put_u32(crc32fast::hash(&payload));
    body.put_slice(&payload);
    Ok(body.freeze())
}

/// Encode a command with its 4-byte big-endian length prefix
pub fn encode_framed(command: &Command) -> Result<Bytes> {
    let body = encode(command)?;

    let mut frame = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    frame.put_u32(body.len() as u32);
    frame.put_slice(&body);
    Ok(frame.freeze())
}

/// Decode a record body (without its length prefix)
pub fn decode(body: &[u8]) -> Result<Command> {
    if body.len() < CHECKSUM_SIZE {
        return Err(SegKvError::corrupt(format!(
            "record body of {} bytes is shorter than its checksum",
            body.len()
        )));
    }

    let mut cursor = body;
    let expected = cursor.get_u32();
    let payload = cursor;

    let actual = crc32fast::hash(payload);
    if actual != expected {
        return Err(SegKvError::corrupt(format!(
            "checksum mismatch: stored 0x{:08x}, computed 0x{:08x}",
            expected, actual
        )));
    }

    bincode::deserialize(payload)
        .map_err(|e| SegKvError::corrupt(format!("undecodable payload: {}", e)))
}
