//! The key-value contract shared by the engine and the baseline stores.

use crate::error::Result;

/// Byte-oriented key-value store
///
/// Text crosses this boundary as UTF-8 bytes.
pub trait KvStore {
    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Latest value of `key`; `Ok(None)` when absent or deleted
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Remove `key`; deleting an absent key succeeds
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Release the store's resources
    fn close(self) -> Result<()>
    where
        Self: Sized;
}
