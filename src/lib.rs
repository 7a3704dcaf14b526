//! # LogKV
//!
//! A log-structured key-value store with:
//! - Append-only segment files; values are never overwritten in place
//! - An in-memory hash index pointing at each key's latest live record
//! - Size-bounded segment rotation
//! - Tombstone deletes and compaction of the live key set
//! - Index reconstruction by replay on every open
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 CLI / Benchmark Harness                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  set / get / delete / compact / close
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! │             (RwLock: writers exclusive)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Index    │          │  Segments   │
//!   │  (HashMap)  │          │ active.log  │
//!   └─────────────┘          │ segment-N   │
//!                            └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │   Record    │
//!                           │   Codec     │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod segment;
pub mod index;
pub mod engine;
pub mod store;
pub mod baseline;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LogKvError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::{CompactionStats, Engine};
pub use store::KvStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LogKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
