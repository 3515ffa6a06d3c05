//! # CaskDB
//!
//! An embedded, crash-resilient key-value store built on a log-structured
//! (Bitcask-style) design:
//! - Append-only data files with CRC-32C checksummed records
//! - In-memory ordered key directory pointing at the latest value of each key
//! - Size-based rotation of the active file into read-only archives
//! - Merge (compaction) of archives, with hint files for fast recovery
//! - Single-process directory lock, reader/writer lock within the process
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Database                              │
//! │        open / close / get / put / delete / keys / merge      │
//! │                 (RwLock over all open state)                 │
//! └──────┬───────────────────┬───────────────────┬──────────────┘
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ KeyDirectory│     │  DataFiles  │     │   DirLock   │
//! │  (BTreeMap) │     │ active.db + │     │  lock.pid   │
//! └─────────────┘     │ archive.N.db│     └─────────────┘
//!                     └──────┬──────┘
//!                            │ merge writes
//!                            ▼
//!                     ┌─────────────┐
//!                     │  HintFiles  │
//!                     │  hint.N.db  │
//!                     └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use caskdb::Database;
//!
//! # fn main() -> caskdb::Result<()> {
//! let db = Database::open_path("./my_data")?;
//! db.put(b"a", &[1])?;
//! db.put(b"b", &[2])?;
//! db.delete(b"a")?;
//!
//! assert_eq!(db.get(b"a")?, None);
//! assert_eq!(db.keys()?.collect::<Vec<_>>(), vec![b"b".to_vec()]);
//! db.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod format;
pub mod keydir;
pub mod storage;
pub mod database;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CaskError, Result};
pub use config::{Config, SyncStrategy};
pub use database::{DataFileInfo, Database, Keys};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of CaskDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
