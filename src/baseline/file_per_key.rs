//! File-per-key store

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::store::KvStore;

/// Stores each key's value as a whole file in one directory
///
/// File names are the lowercase hex of the key bytes, so any key maps to a
/// valid, unique file name.
pub struct FilePerKeyStore {
    dir: PathBuf,
}

impl FilePerKeyStore {
    /// Open or create the store directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(path.as_ref())?;
        Ok(Self {
            dir: path.as_ref().to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &[u8]) -> PathBuf {
        self.dir.join(hex_name(key))
    }
}

impl KvStore for FilePerKeyStore {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        fs::write(self.key_path(key), value)?;
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match fs::read(self.key_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

fn hex_name(key: &[u8]) -> String {
    // The empty key still needs a non-empty file name
    if key.is_empty() {
        return "_".to_string();
    }
    key.iter().map(|b| format!("{:02x}", b)).collect()
}
