//! Configuration for CaskDB
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{CaskError, Result};

/// Main configuration for a CaskDB instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Default data directory, used by `Database::open_with`
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── active.db        (writable log)
    ///     ├── archive.<id>.db  (sealed logs)
    ///     ├── hint.<id>.db     (index snapshots written by merge)
    ///     └── lock.pid         (owning process id)
    pub data_dir: PathBuf,

    /// Size (in bytes) the active file may reach before it is rotated
    /// into the archive set
    pub active_file_size_limit: u64,

    /// How often appended records are fsynced
    pub sync_strategy: SyncStrategy,

    /// Replay hint files during recovery instead of scanning their data files
    pub use_hint_files: bool,

    // -------------------------------------------------------------------------
    // Concurrency Configuration
    // -------------------------------------------------------------------------
    /// Reader lock acquisition timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Writer lock acquisition timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// Data file sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Hand every append to the OS, never fsync explicitly
    Never,

    /// fsync after every append (safest, slowest)
    EveryWrite,

    /// fsync after N appends (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./caskdb_data"),
            active_file_size_limit: 10 * 1024 * 1024, // 10 MiB
            sync_strategy: SyncStrategy::Never,
            use_hint_files: true,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
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
        if self.active_file_size_limit == 0 {
            return Err(CaskError::Config(
                "active_file_size_limit must be greater than zero".to_string(),
            ));
        }
        if let SyncStrategy::EveryNEntries { count: 0 } = self.sync_strategy {
            return Err(CaskError::Config(
                "EveryNEntries sync count must be greater than zero".to_string(),
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
    /// Set the default data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the active file rotation threshold (in bytes)
    pub fn active_file_size_limit(mut self, size: u64) -> Self {
        self.config.active_file_size_limit = size;
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Enable or disable hint file replay during recovery
    pub fn use_hint_files(mut self, enabled: bool) -> Self {
        self.config.use_hint_files = enabled;
        self
    }

    /// Set the reader lock timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the writer lock timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
