//! Index implementation
//!
//! HashMap-based key directory plus startup replay.

use std::collections::hash_map;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::Result;
use crate::segment::{SegmentKind, SegmentReader, SegmentStore};

use super::{Location, ReplayStats};

/// Key → location of the most recent live record
#[derive(Debug, Default)]
pub struct Index {
    entries: HashMap<Vec<u8>, Location>,
}

impl Index {
    /// Create a new empty Index
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `key` at `location`, replacing any previous entry
    pub fn put(&mut self, key: Vec<u8>, location: Location) -> Option<Location> {
        self.entries.insert(key, location)
    }

    /// Forget `key`; a no-op if it is absent
    pub fn remove(&mut self, key: &[u8]) -> Option<Location> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &[u8]) -> Option<&Location> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate every live key and its location, in no particular order
    pub fn iter(&self) -> hash_map::Iter<'_, Vec<u8>, Location> {
        self.entries.iter()
    }

    /// Rebuild an index from scratch by replaying `store`
    ///
    /// Segments are visited in the store's replay order (sealed by id, active
    /// last) and records in append order within each, so later writes win. A
    /// partial record ends replay of its segment without an error.
    pub fn rebuild(store: &SegmentStore) -> Result<(Self, ReplayStats)> {
        let mut index = Self::new();
        let mut stats = ReplayStats::default();

        for segment in store.list_segments_for_replay() {
            let mut reader = SegmentReader::open(&segment.path)?;
            let mut applied = 0u64;

            for record in reader.by_ref() {
                let record = record?;
                if record.header.tombstone {
                    index.remove(&record.key);
                    stats.tombstones += 1;
                } else {
                    index.put(
                        record.key,
                        Location {
                            segment_id: segment.id,
                            offset: record.offset,
                            record_len: record.header.record_len(),
                        },
                    );
                }
                applied += 1;
            }

            if reader.is_torn() {
                warn!(
                    segment = %segment.id,
                    valid_len = reader.valid_len(),
                    file_len = reader.file_len(),
                    "ignoring partial record at segment tail"
                );
                stats.torn_segments += 1;
            }

            if segment.kind == SegmentKind::Active {
                stats.active_valid_len = reader.valid_len();
                stats.active_torn = reader.is_torn();
            }

            debug!(segment = %segment.id, kind = ?segment.kind, records = applied, "replayed segment");
            stats.records += applied;
            stats.segments += 1;
        }

        Ok((index, stats))
    }
}
