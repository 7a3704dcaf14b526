//! Baseline Stores
//!
//! Two deliberately simple stores with the same contract as the engine,
//! used only as benchmark comparators:
//! - [`FilePerKeyStore`]: one file per key, no log at all
//! - [`ScanLogStore`]: the engine's record log without an index, so every
//!   `get` scans the whole file

mod file_per_key;
mod scan_log;

pub use file_per_key::FilePerKeyStore;
pub use scan_log::{ScanLogStore, SCAN_LOG_FILENAME};
