//! Record Module
//!
//! The fixed binary frame for one log record. Every mutation of the store is
//! exactly one record appended to a segment.
//!
//! ## Frame Format
//! ```text
//! ┌──────────────┬──────────────┬─────────┬──────────┬────────────┐
//! │ KeyLen (4)   │ ValLen (4)   │ Tomb(1) │ Key      │ Value      │
//! │ u32 BE       │ u32 BE       │ 0 | 1   │ KeyLen B │ ValLen B   │
//! └──────────────┴──────────────┴─────────┴──────────┴────────────┘
//! ```
//!
//! Tombstones carry an empty value. There is no checksum: a frame whose
//! header is present but whose key/value bytes are missing is a torn write,
//! and readers treat it exactly like the end of the segment.

mod codec;

pub use codec::{decode_header, encode, encode_live, encode_tombstone, Decoded, RecordHeader};

/// Header size: KeyLen (4) + ValLen (4) + Tombstone (1) = 9 bytes
pub const HEADER_SIZE: usize = 9;

/// Tombstone byte of a live record
pub(crate) const LIVE: u8 = 0;

/// Tombstone byte of a deletion marker
pub(crate) const TOMBSTONE: u8 = 1;
