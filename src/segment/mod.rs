//! Segment Module
//!
//! The on-disk half of the store: a directory of append-only log files.
//!
//! ## Responsibilities
//! - Own the single active segment handle and append frames to it
//! - Seal the active segment when it grows past the configured bound
//! - Enumerate segments in creation order for replay (active last)
//! - Write the output segment of a compaction and retire everything else
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── segment-00001.log   sealed, id 1
//!   ├── segment-00002.log   sealed, id 2
//!   └── active.log          active, id 3 (the id it will be sealed under)
//! ```
//!
//! Ordering never relies on comparing file names as strings. Sealed ids are
//! parsed into integers and the active segment is always replayed last.

mod reader;
mod store;
mod writer;

use std::fmt;
use std::path::{Path, PathBuf};

pub use reader::{read_record_at, ReplayedRecord, SegmentReader, StoredRecord};
pub use store::SegmentStore;
pub use writer::{SealedSegment, SegmentWriter};

/// Reserved file name of the active segment
pub const ACTIVE_FILENAME: &str = "active.log";

/// Prefix of sealed segment file names
const SEALED_PREFIX: &str = "segment-";

/// Extension shared by every segment file
const SEGMENT_EXTENSION: &str = ".log";

/// Logical segment identifier, assigned in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(pub u64);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a segment still accepts appends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Sealed,
    Active,
}

/// A segment as seen by replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHandle {
    pub id: SegmentId,
    pub kind: SegmentKind,
    pub path: PathBuf,
}

/// "segment-00042.log" for id 42
pub fn sealed_filename(id: SegmentId) -> String {
    format!("{}{:05}{}", SEALED_PREFIX, id.0, SEGMENT_EXTENSION)
}

/// "segment-00042.log" → Some(42); anything else → None
pub fn parse_sealed_id(file_name: &str) -> Option<SegmentId> {
    let digits = file_name
        .strip_prefix(SEALED_PREFIX)?
        .strip_suffix(SEGMENT_EXTENSION)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(SegmentId)
}

pub(crate) fn sealed_path(dir: &Path, id: SegmentId) -> PathBuf {
    dir.join(sealed_filename(id))
}

pub(crate) fn active_path(dir: &Path) -> PathBuf {
    dir.join(ACTIVE_FILENAME)
}
