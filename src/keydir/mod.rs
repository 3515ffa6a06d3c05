//! Key Directory Module
//!
//! In-memory index from key to the location of its most recent record.
//!
//! ## Responsibilities
//! - Hold exactly one pointer per key: the one with the greatest timestamp
//! - Resolve timestamp ties in favour of the most recently added pointer
//! - Ordered iteration (unsigned lexicographic) for key listing and merge
//!
//! ## Data Structure Choice
//! BTreeMap keyed by owned byte vectors. `Vec<u8>` orders bytes unsigned
//! and shorter-is-less, so iteration order never depends on insertion order.
//! The directory has no lock of its own; the Database's RwLock guards it.

mod directory;

pub use directory::KeyDirectory;

use crate::format::RECORD_PREFIX_SIZE;

/// Location of one record's value on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPointer {
    pub key: Vec<u8>,
    /// Id of the data file holding the record
    pub file_id: u32,
    /// Length of the value; zero marks a tombstone
    pub value_size: u32,
    /// Absolute byte offset of the value within its data file
    pub value_position: u64,
    pub timestamp: i64,
}

impl RecordPointer {
    pub fn is_tombstone(&self) -> bool {
        self.value_size == 0
    }

    /// Absolute byte offset of the record (its checksum field)
    pub fn record_offset(&self) -> u64 {
        self.value_position
            .saturating_sub((RECORD_PREFIX_SIZE + self.key.len()) as u64)
    }

    /// Size of the full encoded record this pointer refers to
    pub fn record_len(&self) -> u64 {
        (RECORD_PREFIX_SIZE + self.key.len()) as u64 + self.value_size as u64
    }
}
