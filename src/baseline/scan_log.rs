//! Scan-log store

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::Result;
use crate::record;
use crate::segment::{read_record_at, SegmentReader};
use crate::store::KvStore;

/// File name of the single log
pub const SCAN_LOG_FILENAME: &str = "naive.log";

/// Appends records to one log file and keeps no index
///
/// Every `get` replays the whole file: the last record for the key decides,
/// and a tombstone means not found.
pub struct ScanLogStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl ScanLogStore {
    /// Open or create the store directory and its log file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(path.as_ref())?;
        let log_path = path.as_ref().join(SCAN_LOG_FILENAME);

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            path: log_path,
            file: Mutex::new(file),
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, frame: &[u8]) -> Result<()> {
        let mut file = self.file.lock();
        file.write_all(frame)?;
        file.flush()?;
        Ok(())
    }
}

impl KvStore for ScanLogStore {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.append(&record::encode_live(key, value)?)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        // Hold the writer lock so the scan sees whole records only
        let _file = self.file.lock();

        let mut latest: Option<(u64, bool)> = None;
        for entry in SegmentReader::open(&self.path)? {
            let entry = entry?;
            if entry.key == key {
                latest = Some((entry.offset, entry.header.tombstone));
            }
        }

        match latest {
            Some((offset, false)) => Ok(Some(read_record_at(&self.path, offset)?.value)),
            _ => Ok(None),
        }
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.append(&record::encode_tombstone(key)?)
    }

    fn close(self) -> Result<()> {
        self.file.into_inner().sync_all()?;
        Ok(())
    }
}
