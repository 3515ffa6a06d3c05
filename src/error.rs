//! Error types for CaskDB
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using CaskError
pub type Result<T> = std::result::Result<T, CaskError>;

/// Unified error type for CaskDB operations
#[derive(Debug, Error)]
pub enum CaskError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // On-disk Layout Errors
    // -------------------------------------------------------------------------
    /// Directory/file naming or header id does not match what is expected
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// Checksum mismatch or truncated record found while reading a file
    #[error("Corruption detected in file {file_id} at offset {offset}: {reason}")]
    Corruption {
        file_id: u32,
        offset: u64,
        reason: String,
    },

    // -------------------------------------------------------------------------
    // File Mode Errors
    // -------------------------------------------------------------------------
    #[error("File {file_id} is not writable")]
    NotWritable { file_id: u32 },

    #[error("File {file_id} is not open for reading")]
    NotReadable { file_id: u32 },

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("Key of {0} bytes exceeds the maximum key size")]
    KeyTooLarge(usize),

    #[error("Value of {0} bytes exceeds the maximum value size")]
    ValueTooLarge(usize),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    /// Another live process owns the data directory
    #[error("Lock conflict: data directory is held by process {pid}")]
    LockConflict { pid: u32 },

    #[error("Timed out after {timeout_ms}ms waiting for the {lock} lock")]
    ConcurrencyTimeout { lock: &'static str, timeout_ms: u64 },

    // -------------------------------------------------------------------------
    // State / Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Database is not open")]
    NotOpen,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CaskError {
    /// Build a corruption error for `file_id` at byte `offset`
    pub(crate) fn corruption(file_id: u32, offset: u64, reason: impl Into<String>) -> Self {
        CaskError::Corruption {
            file_id,
            offset,
            reason: reason.into(),
        }
    }
}
