//! Engine Module
//!
//! The public storage engine that coordinates the segment store and index.
//!
//! ## Responsibilities
//! - Rebuild the index by replaying every segment on open
//! - Append one record per `set`/`delete`, then update the index
//! - Serve `get` from the index plus one direct read
//! - Compact the live key set into a single fresh segment

use std::path::Path;

use parking_lot::RwLock;
use tracing::info;

use crate::config::Config;
use crate::error::{LogKvError, Result};
use crate::index::{Index, Location};
use crate::record;
use crate::segment::{read_record_at, SegmentId, SegmentStore, SegmentWriter, StoredRecord};
use crate::store::KvStore;

/// The main storage engine
///
/// ## Lifecycle
/// An `Engine` value exists only while the store is open: `open` replays the
/// segments before returning and `close` consumes the engine.
///
/// ## Concurrency Model
/// All state sits behind one `RwLock`:
/// - `set`, `delete` and `compact` take the write lock, so appends and the
///   rewrite are serialized
/// - `get` holds the read lock for its lookup and its disk read, so it never
///   observes a compaction half way through
pub struct Engine {
    /// Engine configuration
    config: Config,

    state: RwLock<EngineState>,
}

/// Segment store and index, always mutated together
struct EngineState {
    store: SegmentStore,
    index: Index,
}

/// What a compaction did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionStats {
    /// Id of the segment now holding every live record
    pub segment_id: SegmentId,

    /// Live records rewritten
    pub live_records: u64,

    /// Size of the compacted segment
    pub bytes_written: u64,

    /// Segment files retired, the previous active one included
    pub segments_removed: usize,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create the data directory and active segment
    /// 2. Replay all segments to rebuild the index
    /// 3. Drop a torn tail from the active segment
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let mut store = SegmentStore::open(&config)?;
        let (index, stats) = Index::rebuild(&store)?;

        if stats.active_torn {
            store.truncate_active(stats.active_valid_len)?;
        }

        info!(
            data_dir = %config.data_dir.display(),
            segments = stats.segments,
            records = stats.records,
            tombstones = stats.tombstones,
            torn_segments = stats.torn_segments,
            live_keys = index.len(),
            "engine opened"
        );

        Ok(Self {
            config,
            state: RwLock::new(EngineState { store, index }),
        })
    }

    /// Open with a directory and segment bound (convenience method)
    pub fn open_path(path: impl AsRef<Path>, max_active_segment_bytes: u64) -> Result<Self> {
        let config = Config::builder()
            .data_dir(path.as_ref())
            .max_active_segment_bytes(max_active_segment_bytes)
            .build();
        Self::open(config)
    }

    /// Store `value` under `key`
    ///
    /// Text keys and values are stored as their UTF-8 bytes.
    pub fn set(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        let key = key.as_ref();
        let frame = record::encode_live(key, value.as_ref())?;

        let mut state = self.state.write();
        let location = state.append(&frame)?;
        state.index.put(key.to_vec(), location);

        Ok(())
    }

    /// Get the latest value of `key`, or None if it was never set or deleted
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        let key = key.as_ref();
        let state = self.state.read();

        let location = match state.index.get(key) {
            Some(location) => *location,
            None => return Ok(None),
        };

        let record = state.read_live(key, &location)?;
        Ok(Some(record.value))
    }

    /// Delete `key`
    ///
    /// Always appends a tombstone, even when the key is absent.
    pub fn delete(&self, key: impl AsRef<[u8]>) -> Result<()> {
        let key = key.as_ref();
        let frame = record::encode_tombstone(key)?;

        let mut state = self.state.write();
        state.append(&frame)?;
        state.index.remove(key);

        Ok(())
    }

    /// Rewrite the live key set into one new segment and drop all others
    pub fn compact(&self) -> Result<CompactionStats> {
        let mut state = self.state.write();
        let stats = state.compact()?;

        info!(
            segment = %stats.segment_id,
            live_records = stats.live_records,
            bytes = stats.bytes_written,
            removed = stats.segments_removed,
            "compaction completed"
        );

        Ok(stats)
    }

    /// Close the engine gracefully
    ///
    /// Syncs the active segment to disk. The index is discarded.
    pub fn close(self) -> Result<()> {
        let mut state = self.state.into_inner();
        state.store.sync()?;
        info!(data_dir = %self.config.data_dir.display(), "engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.state.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().index.is_empty()
    }

    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        self.state.read().index.contains_key(key.as_ref())
    }

    /// Number of segment files, the active one included
    pub fn segment_count(&self) -> usize {
        self.state.read().store.segment_count()
    }

    /// Sealed segment ids, oldest first
    pub fn sealed_segment_ids(&self) -> Vec<SegmentId> {
        self.state.read().store.sealed_ids().to_vec()
    }

    /// Bytes in the active segment
    pub fn active_segment_size(&self) -> u64 {
        self.state.read().store.active_size()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl EngineState {
    /// Rotate if needed, append, and report where the frame landed
    fn append(&mut self, frame: &[u8]) -> Result<Location> {
        let record_len = frame.len() as u64;
        self.store.rotate_if_needed(record_len)?;
        let offset = self.store.append(frame)?;

        Ok(Location {
            segment_id: self.store.active_id(),
            offset,
            record_len,
        })
    }

    /// Read the live record the index promises for `key`
    fn read_live(&self, key: &[u8], location: &Location) -> Result<StoredRecord> {
        let path = self.store.path_of(location.segment_id).ok_or_else(|| {
            LogKvError::IndexInconsistency(format!(
                "key {:?} points at missing segment {}",
                String::from_utf8_lossy(key),
                location.segment_id
            ))
        })?;

        let record = read_record_at(&path, location.offset)?;

        if record.header.tombstone {
            return Err(LogKvError::IndexInconsistency(format!(
                "tombstone at segment {} offset {} for indexed key {:?}",
                location.segment_id,
                location.offset,
                String::from_utf8_lossy(key)
            )));
        }
        if record.key != key {
            return Err(LogKvError::IndexInconsistency(format!(
                "record at segment {} offset {} belongs to another key",
                location.segment_id, location.offset
            )));
        }

        Ok(record)
    }

    fn compact(&mut self) -> Result<CompactionStats> {
        let mut writer = self.store.begin_compaction()?;

        let index = match self.write_snapshot(&mut writer) {
            Ok(index) => index,
            Err(e) => {
                writer.abandon();
                return Err(e);
            }
        };

        let sealed = writer.finish()?;

        // The new index only references the compacted segment, which is durable
        self.index = index;
        let segments_removed = self.store.finish_compaction(sealed.id)?;

        Ok(CompactionStats {
            segment_id: sealed.id,
            live_records: sealed.record_count,
            bytes_written: sealed.size,
            segments_removed,
        })
    }

    /// Copy every indexed record into `writer`, returning the index for it
    fn write_snapshot(&self, writer: &mut SegmentWriter) -> Result<Index> {
        let mut index = Index::new();

        for (key, location) in self.index.iter() {
            let record = self.read_live(key, location)?;
            let frame = record::encode_live(key, &record.value)?;
            let offset = writer.append(&frame)?;

            index.put(
                key.clone(),
                Location {
                    segment_id: writer.id(),
                    offset,
                    record_len: frame.len() as u64,
                },
            );
        }

        Ok(index)
    }
}

impl KvStore for Engine {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        Engine::set(self, key, value)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Engine::get(self, key)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        Engine::delete(self, key)
    }

    fn close(self) -> Result<()> {
        Engine::close(self)
    }
}
