//! KeyDirectory implementation
//!
//! BTreeMap-based index with last-writer-wins replacement.

use std::collections::BTreeMap;
use std::ops::Bound;

use super::RecordPointer;

/// Ordered map from key bytes to the latest record pointer
#[derive(Debug, Default)]
pub struct KeyDirectory {
    entries: BTreeMap<Vec<u8>, RecordPointer>,
}

impl KeyDirectory {
    /// Create a new empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `pointer` unless the existing entry for its key is strictly newer
    ///
    /// Returns true if the directory now holds `pointer`.
    pub fn add(&mut self, pointer: RecordPointer) -> bool {
        match self.entries.get_mut(pointer.key.as_slice()) {
            Some(existing) if existing.timestamp > pointer.timestamp => false,
            Some(existing) => {
                *existing = pointer;
                true
            }
            None => {
                self.entries.insert(pointer.key.clone(), pointer);
                true
            }
        }
    }

    /// Latest pointer for `key`, tombstones included
    pub fn find(&self, key: &[u8]) -> Option<&RecordPointer> {
        self.entries.get(key)
    }

    /// Remove the entry for `pointer.key` only if it is the exact same
    /// record (same file and value position)
    pub fn remove_exact(&mut self, pointer: &RecordPointer) -> bool {
        let matches = self.entries.get(pointer.key.as_slice()).is_some_and(|existing| {
            existing.file_id == pointer.file_id
                && existing.value_position == pointer.value_position
        });
        if matches {
            self.entries.remove(pointer.key.as_slice());
        }
        matches
    }

    /// Drop every entry whose pointer does not satisfy `keep`
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&RecordPointer) -> bool,
    {
        self.entries.retain(|_, pointer| keep(pointer));
    }

    /// All pointers in key order, tombstones included
    pub fn all(&self) -> impl Iterator<Item = &RecordPointer> {
        self.entries.values()
    }

    /// Keys of non-tombstoned entries, in key order
    pub fn live_keys(&self) -> impl Iterator<Item = &[u8]> {
        self.entries
            .values()
            .filter(|p| !p.is_tombstone())
            .map(|p| p.key.as_slice())
    }

    /// First non-tombstoned entry strictly after `after` (or the first one
    /// overall when `after` is None)
    pub fn next_live(&self, after: Option<&[u8]>) -> Option<&RecordPointer> {
        let lower = match after {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        self.entries
            .range::<[u8], _>((lower, Bound::Unbounded))
            .map(|(_, pointer)| pointer)
            .find(|pointer| !pointer.is_tombstone())
    }

    /// Number of keys, tombstones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of non-tombstoned keys
    pub fn live_len(&self) -> usize {
        self.entries.values().filter(|p| !p.is_tombstone()).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
