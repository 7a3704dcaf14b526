//! Record codec
//!
//! Encoding and decoding of record frames.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{LogKvError, Result};

use super::{HEADER_SIZE, LIVE, TOMBSTONE};

/// Decoded fixed-size header of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub key_len: u32,
    pub val_len: u32,
    pub tombstone: bool,
}

impl RecordHeader {
    /// Full byte span of the frame: header + key + value
    pub fn record_len(&self) -> u64 {
        HEADER_SIZE as u64 + self.key_len as u64 + self.val_len as u64
    }
}

/// Outcome of decoding a header from the front of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Header(RecordHeader),

    /// Fewer than `HEADER_SIZE` bytes remain
    EndOfStream,
}

/// Encode a record frame (`value = None` means tombstone)
///
/// Fails if the key or value does not fit the u32 length fields; lengths are
/// never truncated.
pub fn encode(key: &[u8], value: Option<&[u8]>) -> Result<Bytes> {
    let key_len = length_field("key", key.len())?;
    let (val_len, tomb) = match value {
        Some(v) => (length_field("value", v.len())?, LIVE),
        None => (0, TOMBSTONE),
    };

    let mut frame = BytesMut::with_capacity(HEADER_SIZE + key.len() + val_len as usize);
    frame.put_u32(key_len);
    frame.put_u32(val_len);
    frame.put_u8(tomb);
    frame.put_slice(key);
    if let Some(v) = value {
        frame.put_slice(v);
    }

    Ok(frame.freeze())
}

/// Encode a live key/value record
pub fn encode_live(key: &[u8], value: &[u8]) -> Result<Bytes> {
    encode(key, Some(value))
}

/// Encode a tombstone for `key`
pub fn encode_tombstone(key: &[u8]) -> Result<Bytes> {
    encode(key, None)
}

/// Decode the header at the front of `bytes`
///
/// Only the first `HEADER_SIZE` bytes are inspected; whether the key and value
/// that follow are complete is the caller's concern.
pub fn decode_header(bytes: &[u8]) -> Decoded {
    if bytes.len() < HEADER_SIZE {
        return Decoded::EndOfStream;
    }

    let mut buf = &bytes[..HEADER_SIZE];
    let key_len = buf.get_u32();
    let val_len = buf.get_u32();
    let tombstone = buf.get_u8() == TOMBSTONE;

    Decoded::Header(RecordHeader {
        key_len,
        val_len,
        tombstone,
    })
}

fn length_field(field: &'static str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| LogKvError::RecordTooLarge { field, len })
}
