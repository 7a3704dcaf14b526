//! Segment Store
//!
//! Owns the active segment handle and the list of sealed segments.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{Config, SyncStrategy};
use crate::error::Result;

use super::{
    active_path, parse_sealed_id, sealed_path, SegmentHandle, SegmentId, SegmentKind,
    SegmentWriter, ACTIVE_FILENAME,
};

/// Manages the segment files of one store directory
///
/// ## Identity
/// The active segment already owns the id it will be sealed under, so sealing
/// is a rename and index entries pointing at it stay valid. Ids come from a
/// counter that only moves forward, compaction included.
pub struct SegmentStore {
    /// Directory holding every segment file
    dir: PathBuf,

    max_active_bytes: u64,

    sync_strategy: SyncStrategy,

    /// Exclusive append handle of `active.log`
    active: File,

    active_id: SegmentId,

    /// Bytes in the active segment
    active_size: u64,

    /// Sealed segment ids, oldest first
    sealed: Vec<SegmentId>,

    /// Next id the counter will hand out
    next_id: u64,
}

impl SegmentStore {
    /// Open or create the segment directory described by `config`
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Discover sealed segments and sort them by id
    /// 3. Open (or create) the active segment for appends
    pub fn open(config: &Config) -> Result<Self> {
        let dir = config.data_dir.clone();
        fs::create_dir_all(&dir)?;

        let mut sealed = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            match parse_sealed_id(&name) {
                Some(id) => sealed.push(id),
                None if name == ACTIVE_FILENAME => {}
                None => debug!(file = %name, "ignoring foreign file in data directory"),
            }
        }
        sealed.sort();

        let active_id = SegmentId(sealed.last().map(|id| id.0 + 1).unwrap_or(1));
        let active = open_active(&dir)?;
        let active_size = active.metadata()?.len();

        debug!(
            dir = %dir.display(),
            sealed = sealed.len(),
            active_id = %active_id,
            active_size,
            "segment store opened"
        );

        Ok(Self {
            dir,
            max_active_bytes: config.max_active_segment_bytes,
            sync_strategy: config.sync_strategy,
            active,
            active_id,
            active_size,
            sealed,
            next_id: active_id.0 + 1,
        })
    }

    // =========================================================================
    // Append Path
    // =========================================================================

    /// Append a frame to the active segment, returning its starting offset
    ///
    /// The write is handed to the OS before returning. A failed write is
    /// rolled back so no partial frame is left in front of later appends.
    pub fn append(&mut self, frame: &[u8]) -> Result<u64> {
        let offset = self.active_size;

        if let Err(e) = self.write_active(frame) {
            if let Err(rollback) = self.active.set_len(offset) {
                warn!(offset, error = %rollback, "failed to roll back partial append");
            }
            return Err(e);
        }

        self.active_size += frame.len() as u64;
        Ok(offset)
    }

    fn write_active(&mut self, frame: &[u8]) -> Result<()> {
        self.active.write_all(frame)?;
        self.active.flush()?;
        if self.sync_strategy == SyncStrategy::EveryWrite {
            self.active.sync_data()?;
        }
        Ok(())
    }

    /// Seal the active segment if `incoming` more bytes would overflow it
    ///
    /// An empty active segment is never sealed, so one oversized record
    /// lands alone in its segment instead of producing an empty file.
    pub fn rotate_if_needed(&mut self, incoming: u64) -> Result<bool> {
        if self.active_size == 0 || self.active_size + incoming <= self.max_active_bytes {
            return Ok(false);
        }
        self.seal_active()?;
        Ok(true)
    }

    /// Rename the active segment to its sealed name and start a new one
    fn seal_active(&mut self) -> Result<()> {
        let sealed_id = self.active_id;
        let from = active_path(&self.dir);
        let to = sealed_path(&self.dir, sealed_id);

        self.active.flush()?;
        fs::rename(&from, &to)?;

        let fresh = match open_active(&self.dir) {
            Ok(file) => file,
            Err(e) => {
                // Put the old file back so appends never land in a sealed segment
                if let Err(undo) = fs::rename(&to, &from) {
                    warn!(error = %undo, "failed to restore active segment after rotation error");
                }
                return Err(e);
            }
        };

        // The old handle is closed here, as the new one replaces it
        self.active = fresh;
        self.sealed.push(sealed_id);
        self.active_id = self.allocate_id();
        self.active_size = 0;

        info!(sealed = %sealed_id, active = %self.active_id, "rotated active segment");
        Ok(())
    }

    /// Cut the active segment back to `len` bytes (drops a torn tail)
    pub fn truncate_active(&mut self, len: u64) -> Result<()> {
        if len >= self.active_size {
            return Ok(());
        }
        self.active.set_len(len)?;
        self.active.sync_data()?;
        warn!(from = self.active_size, to = len, "truncated torn tail of active segment");
        self.active_size = len;
        Ok(())
    }

    // =========================================================================
    // Replay
    // =========================================================================

    /// Segments in replay order: sealed by ascending id, then the active one
    pub fn list_segments_for_replay(&self) -> Vec<SegmentHandle> {
        let mut handles: Vec<SegmentHandle> = self
            .sealed
            .iter()
            .map(|&id| SegmentHandle {
                id,
                kind: SegmentKind::Sealed,
                path: sealed_path(&self.dir, id),
            })
            .collect();

        handles.push(SegmentHandle {
            id: self.active_id,
            kind: SegmentKind::Active,
            path: active_path(&self.dir),
        });

        handles
    }

    // =========================================================================
    // Compaction
    // =========================================================================

    /// Reserve a fresh sealed id and open a writer for it
    pub fn begin_compaction(&mut self) -> Result<SegmentWriter> {
        let id = self.new_sealed_id();
        SegmentWriter::create(&sealed_path(&self.dir, id), id)
    }

    /// Retire every segment except `compacted` and start an empty active one
    ///
    /// Must only be called once the compacted segment is durable. The
    /// compacted segment is registered and the active segment moves to an id
    /// above it before any file is removed, so a removal failing part way
    /// leaves only stale segments that replay ahead of the snapshot. Returns
    /// the number of segment files retired.
    pub fn finish_compaction(&mut self, compacted: SegmentId) -> Result<usize> {
        self.sealed.push(compacted);

        // Leftover records in the old active file are no newer than the
        // snapshot, so replaying them after it converges on the same state
        self.active_id = self.allocate_id();
        self.active.set_len(0)?;
        self.active.sync_all()?;
        self.active_size = 0;
        let mut removed = 1;

        while self.sealed[0] != compacted {
            fs::remove_file(sealed_path(&self.dir, self.sealed[0]))?;
            self.sealed.remove(0);
            removed += 1;
        }

        debug!(compacted = %compacted, removed, active = %self.active_id, "retired old segments");
        Ok(removed)
    }

    /// Hand out the next unused sealed id
    pub fn new_sealed_id(&mut self) -> SegmentId {
        self.allocate_id()
    }

    fn allocate_id(&mut self) -> SegmentId {
        let id = SegmentId(self.next_id);
        self.next_id += 1;
        id
    }

    // =========================================================================
    // Lookup & Accessors
    // =========================================================================

    /// Path of a live segment, or None if no such segment exists
    pub fn path_of(&self, id: SegmentId) -> Option<PathBuf> {
        if id == self.active_id {
            Some(active_path(&self.dir))
        } else if self.sealed.binary_search(&id).is_ok() {
            Some(sealed_path(&self.dir, id))
        } else {
            None
        }
    }

    /// fsync the active segment
    pub fn sync(&mut self) -> Result<()> {
        self.active.flush()?;
        self.active.sync_all()?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn active_id(&self) -> SegmentId {
        self.active_id
    }

    pub fn active_size(&self) -> u64 {
        self.active_size
    }

    pub fn max_active_bytes(&self) -> u64 {
        self.max_active_bytes
    }

    /// Sealed segment ids, oldest first
    pub fn sealed_ids(&self) -> &[SegmentId] {
        &self.sealed
    }

    /// Number of segments including the active one
    pub fn segment_count(&self) -> usize {
        self.sealed.len() + 1
    }
}

fn open_active(dir: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(active_path(dir))?;
    Ok(file)
}
