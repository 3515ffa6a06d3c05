//! Data directory naming conventions.

use std::path::{Path, PathBuf};

use crate::error::{CaskError, Result};

/// The single writable log
pub const ACTIVE_FILE_NAME: &str = "active.db";

/// Advisory cross-process lock holding the owner's pid
pub const LOCK_FILE_NAME: &str = "lock.pid";

const ARCHIVE_PREFIX: &str = "archive.";
const HINT_PREFIX: &str = "hint.";
const MERGE_PREFIX: &str = "merge.";
const DB_SUFFIX: &str = ".db";

/// What a file in the data directory is, judged by its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Active,
    Archive(u32),
    Hint(u32),
    /// Unsealed output of an interrupted merge
    Merge(u32),
    Lock,
}

impl FileKind {
    /// Classify a directory entry name
    ///
    /// Returns `Ok(None)` for files the store does not own, and
    /// `InvalidLayout` for names that use a store prefix with a bad id.
    pub fn classify(name: &str) -> Result<Option<Self>> {
        if name == ACTIVE_FILE_NAME {
            return Ok(Some(FileKind::Active));
        }
        if name == LOCK_FILE_NAME {
            return Ok(Some(FileKind::Lock));
        }

        let prefixed: [(&str, fn(u32) -> FileKind); 3] = [
            (ARCHIVE_PREFIX, FileKind::Archive),
            (HINT_PREFIX, FileKind::Hint),
            (MERGE_PREFIX, FileKind::Merge),
        ];
        for (prefix, kind) in prefixed {
            if let Some(rest) = name.strip_prefix(prefix) {
                return parse_id(name, rest).map(|id| Some(kind(id)));
            }
        }
        Ok(None)
    }
}

/// "42.db" → 42
fn parse_id(name: &str, rest: &str) -> Result<u32> {
    rest.strip_suffix(DB_SUFFIX)
        .and_then(|id| id.parse::<u32>().ok())
        .ok_or_else(|| CaskError::InvalidLayout(format!("unexpected file name '{}'", name)))
}

pub fn active_path(dir: &Path) -> PathBuf {
    dir.join(ACTIVE_FILE_NAME)
}

pub fn archive_path(dir: &Path, file_id: u32) -> PathBuf {
    dir.join(format!("{}{}{}", ARCHIVE_PREFIX, file_id, DB_SUFFIX))
}

pub fn hint_path(dir: &Path, file_id: u32) -> PathBuf {
    dir.join(format!("{}{}{}", HINT_PREFIX, file_id, DB_SUFFIX))
}

pub fn merge_path(dir: &Path, file_id: u32) -> PathBuf {
    dir.join(format!("{}{}{}", MERGE_PREFIX, file_id, DB_SUFFIX))
}

pub fn lock_path(dir: &Path) -> PathBuf {
    dir.join(LOCK_FILE_NAME)
}
