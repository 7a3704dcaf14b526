//! Segment Writer
//!
//! Writes a brand-new sealed segment in one pass (compaction output).

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{LogKvError, Result};

use super::SegmentId;

/// Metadata of a finished segment
#[derive(Debug, Clone)]
pub struct SealedSegment {
    pub id: SegmentId,
    pub path: PathBuf,
    pub record_count: u64,
    /// File size in bytes
    pub size: u64,
}

/// Buffered writer for a fresh segment file
///
/// Nothing is durable until [`SegmentWriter::finish`] returns; a writer that
/// is abandoned removes its partial file.
pub struct SegmentWriter {
    id: SegmentId,
    path: PathBuf,
    writer: BufWriter<File>,
    /// Offset at which the next frame starts
    current_offset: u64,
    record_count: u64,
}

impl SegmentWriter {
    /// Create the segment file, replacing any leftover with the same name
    pub fn create(path: &Path, id: SegmentId) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            id,
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            current_offset: 0,
            record_count: 0,
        })
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Append an encoded frame, returning the offset it starts at
    pub fn append(&mut self, frame: &[u8]) -> Result<u64> {
        let offset = self.current_offset;
        self.writer.write_all(frame)?;
        self.current_offset += frame.len() as u64;
        self.record_count += 1;
        Ok(offset)
    }

    /// Flush and fsync the segment
    ///
    /// On failure the partial file is removed, like [`SegmentWriter::abandon`].
    pub fn finish(self) -> Result<SealedSegment> {
        let Self {
            id,
            path,
            writer,
            current_offset,
            record_count,
        } = self;

        if let Err(e) = flush_and_sync(writer) {
            discard(&path);
            return Err(e);
        }

        Ok(SealedSegment {
            id,
            path,
            record_count,
            size: current_offset,
        })
    }

    /// Drop the partial segment from disk
    pub fn abandon(self) {
        let Self { path, writer, .. } = self;
        drop(writer);
        discard(&path);
    }
}

fn flush_and_sync(writer: BufWriter<File>) -> Result<()> {
    let file = writer.into_inner().map_err(|e| LogKvError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to remove unfinished segment");
    }
}
