//! Index Module
//!
//! In-memory map from key to the location of its latest live record.
//!
//! ## Responsibilities
//! - Answer every `get` without touching the disk for the lookup itself
//! - Hold at most one entry per key; the last writer wins
//! - Forget keys as soon as their tombstone is applied
//! - Rebuild from scratch by replaying every segment at open
//!
//! ## Data Structure Choice
//! A `HashMap` keyed by raw key bytes. No ordering is needed: the store
//! supports no range queries, and compaction may write keys in any order.

mod table;

pub use table::Index;

use crate::segment::SegmentId;

/// Where a live record lives on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub segment_id: SegmentId,

    /// Offset of the first header byte
    pub offset: u64,

    /// Full frame length; bookkeeping only, not checked on read
    pub record_len: u64,
}

/// Counters collected while replaying segments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Segments replayed
    pub segments: usize,

    /// Complete records applied (live and tombstone)
    pub records: u64,

    /// Tombstones among `records`
    pub tombstones: u64,

    /// Segments that ended in a partial record
    pub torn_segments: usize,

    /// Length of the complete-record prefix of the active segment
    pub active_valid_len: u64,

    /// Whether the active segment itself ended in a partial record
    pub active_torn: bool,
}
