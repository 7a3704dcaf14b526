//! Configuration for LogKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{LogKvError, Result};

/// Default bound on the active segment before it is sealed (64 MiB)
pub const DEFAULT_MAX_ACTIVE_SEGMENT_BYTES: u64 = 64 * 1024 * 1024;

/// Main configuration for a LogKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding every segment file
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── segment-00001.log   (sealed)
    ///     ├── segment-00002.log   (sealed)
    ///     └── active.log          (open for appends)
    pub data_dir: PathBuf,

    /// Size bound of the active segment; checked before every append
    pub max_active_segment_bytes: u64,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// What happens after each append
    pub sync_strategy: SyncStrategy,
}

/// Append durability strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStrategy {
    /// Hand the bytes to the OS after every append, never fsync
    #[default]
    OsFlush,

    /// fsync the active segment after every append (safest, slowest)
    EveryWrite,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            max_active_segment_bytes: DEFAULT_MAX_ACTIVE_SEGMENT_BYTES,
            sync_strategy: SyncStrategy::OsFlush,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_active_segment_bytes == 0 {
            return Err(LogKvError::Config(
                "max_active_segment_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the active segment size bound (in bytes)
    pub fn max_active_segment_bytes(mut self, bytes: u64) -> Self {
        self.config.max_active_segment_bytes = bytes;
        self
    }

    /// Set the append sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
