//! Database Module
//!
//! The orchestrator that owns one data directory.
//!
//! ## Responsibilities
//! - Discover files and rebuild the key directory on open
//! - Append writes to the active file and rotate it when it grows too large
//! - Serve reads from whichever file a pointer names
//! - Compact archived files (merge) and reset the store (clear)
//! - Hold the directory lock for as long as the store is open

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::config::{Config, SyncStrategy};
use crate::error::{CaskError, Result};
use crate::format::{now_millis, Record};
use crate::keydir::{KeyDirectory, RecordPointer};
use crate::storage::{layout, DataFile, DirLock, FileKind, HintFile};

/// An embedded log-structured key-value store
///
/// ## Concurrency Model: one RwLock over the whole open state
///
/// - **Reader section** (`get`, `keys`, `list_data_files`, `key_count`):
///   shared, may overlap with other readers. Reader acquisition is
///   recursive, so a thread iterating `keys()` may call `get()`.
/// - **Writer section** (`open`, `close`, `put`, `delete`,
///   `merge_archives`, `clear`): exclusive against everything.
///
/// Both sides give up after the configured timeout with
/// `ConcurrencyTimeout`. Merge runs inside a single writer acquisition, so
/// reads block for the whole compaction.
///
/// Cross-process exclusion is the directory lock's job and is only checked
/// at open.
pub struct Database {
    config: Config,

    /// `None` while closed
    state: RwLock<Option<OpenState>>,
}

/// Everything that exists only while a directory is open
struct OpenState {
    dir: PathBuf,
    lock: Option<DirLock>,

    /// The single writable log
    active: DataFile,

    /// Sealed logs by file id
    archives: BTreeMap<u32, DataFile>,

    keydir: KeyDirectory,

    next_file_id: u32,

    /// Largest timestamp handed out or recovered so far
    last_timestamp: i64,
}

/// Summary of one data file, as reported by `list_data_files`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFileInfo {
    pub file_id: u32,
    pub path: PathBuf,
    /// Bytes, header included
    pub size: u64,
    /// Creation time, unix milliseconds
    pub created: i64,
    /// True only for the active file
    pub writable: bool,
}

impl Database {
    /// Create a closed database with the given config
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: RwLock::new(None),
        }
    }

    /// Create a database and open `config.data_dir`
    pub fn open_with(config: Config) -> Result<Self> {
        let dir = config.data_dir.clone();
        let db = Self::new(config);
        db.open(&dir)?;
        Ok(db)
    }

    /// Open `path` with default config (convenience method)
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let db = Self::new(Config::default());
        db.open(path)?;
        Ok(db)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open (or create) the data directory at `path`
    ///
    /// An already-open instance is closed first.
    ///
    /// Steps:
    /// 1. Reject a path that is a plain file
    /// 2. Create the directory if needed and take the directory lock
    /// 3. Discover archives, open or create the active file
    /// 4. Rebuild the key directory from hint files or full scans
    pub fn open(&self, path: impl AsRef<Path>) -> Result<()> {
        self.config.validate()?;
        let mut guard = self.write_state()?;
        if let Some(previous) = guard.take() {
            previous.shutdown()?;
        }
        *guard = Some(self.open_state(path.as_ref())?);
        Ok(())
    }

    /// Close the store: release files, the key directory and the lock
    ///
    /// No-op if already closed.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.write_state()?;
        match guard.take() {
            Some(state) => state.shutdown(),
            None => Ok(()),
        }
    }

    fn open_state(&self, dir: &Path) -> Result<OpenState> {
        if dir.is_file() {
            return Err(CaskError::InvalidLayout(format!(
                "{} is a file, expected a directory",
                dir.display()
            )));
        }
        fs::create_dir_all(dir)?;

        let lock = DirLock::acquire(dir)?;
        match self.load(dir) {
            Ok(mut state) => {
                info!(
                    dir = %dir.display(),
                    active = state.active.file_id(),
                    archives = state.archives.len(),
                    keys = state.keydir.len(),
                    "opened database"
                );
                state.lock = Some(lock);
                Ok(state)
            }
            Err(e) => {
                if let Err(release_err) = lock.release() {
                    warn!(error = %release_err, "failed to release lock after open error");
                }
                Err(e)
            }
        }
    }

    /// Discover files and rebuild the key directory (lock already held)
    fn load(&self, dir: &Path) -> Result<OpenState> {
        let mut archive_ids = Vec::new();
        let mut interrupted_merges = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            match FileKind::classify(name)? {
                Some(FileKind::Archive(id)) => archive_ids.push(id),
                Some(FileKind::Merge(id)) => interrupted_merges.push(id),
                _ => {}
            }
        }

        for id in interrupted_merges {
            warn!(file_id = id, "removing output of an interrupted merge");
            fs::remove_file(layout::merge_path(dir, id))?;
            HintFile::delete(dir, id)?;
        }

        // Archives ascending by id
        archive_ids.sort_unstable();
        let mut next_file_id = 1u32;
        let mut archives = BTreeMap::new();
        for id in archive_ids {
            let file = DataFile::open(&layout::archive_path(dir, id), id, false)?;
            next_file_id = next_file_id.max(successor(id)?);
            archives.insert(id, file);
        }

        // Active file: keep its embedded id, or take the next unused one
        let active_path = layout::active_path(dir);
        let active_id = match fs::metadata(&active_path) {
            Ok(meta) if meta.len() > 0 => DataFile::read_header(&active_path)?.file_id,
            _ => next_file_id,
        };
        if archives.contains_key(&active_id) {
            return Err(CaskError::InvalidLayout(format!(
                "active file id {} is also used by an archive",
                active_id
            )));
        }
        let mut active = DataFile::open(&active_path, active_id, true)?;
        active.set_sync_strategy(self.config.sync_strategy);
        next_file_id = next_file_id.max(successor(active_id)?);

        let mut state = OpenState {
            dir: dir.to_path_buf(),
            lock: None,
            active,
            archives,
            keydir: KeyDirectory::new(),
            next_file_id,
            last_timestamp: i64::MIN,
        };
        state.rebuild_directory(self.config.use_hint_files)?;
        Ok(state)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Store `value` under `key`
    ///
    /// An empty value is stored as a tombstone.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write(key, Some(value))
    }

    /// Delete `key` by writing a tombstone
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.write(key, None)
    }

    /// Append a record for `key`; `None` writes a tombstone
    ///
    /// Steps:
    /// 1. Append to the active file
    /// 2. Point the key directory at the new record
    /// 3. Rotate the active file if it is now over the size limit
    pub fn write(&self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        let mut guard = self.write_state()?;
        let state = guard.as_mut().ok_or(CaskError::NotOpen)?;

        let timestamp = state.next_timestamp();
        let record = Record::new(key.to_vec(), value.unwrap_or_default().to_vec(), timestamp)?;
        let pointer = state.active.append(record)?;
        state.keydir.add(pointer);

        if state.active.size() > self.config.active_file_size_limit {
            state.rotate(self.config.sync_strategy)?;
        }
        Ok(())
    }

    /// Compact every archived file into one
    ///
    /// Keeps only the latest non-tombstoned version of each key found in
    /// the archives; the active file is untouched. No-op with fewer than
    /// two archives.
    pub fn merge_archives(&self) -> Result<()> {
        let mut guard = self.write_state()?;
        let state = guard.as_mut().ok_or(CaskError::NotOpen)?;
        state.merge()
    }

    /// Delete every data and hint file, then reopen the directory empty
    pub fn clear(&self) -> Result<()> {
        let mut guard = self.write_state()?;
        let state = guard.take().ok_or(CaskError::NotOpen)?;
        let dir = state.dir.clone();
        state.destroy()?;
        info!(dir = %dir.display(), "cleared database");
        *guard = Some(self.open_state(&dir)?);
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get the value for `key`
    ///
    /// Returns `Ok(None)` for missing keys, tombstones and empty values.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let guard = self.read_state()?;
        let state = guard.as_ref().ok_or(CaskError::NotOpen)?;

        let pointer = match state.keydir.find(key) {
            Some(pointer) if !pointer.is_tombstone() => pointer,
            _ => return Ok(None),
        };

        let value = match state.file(pointer.file_id) {
            Some(file) => file.read_value(pointer)?,
            None => {
                warn!(file_id = pointer.file_id, "key points into a file that is not open");
                None
            }
        };
        Ok(value.filter(|v| !v.is_empty()))
    }

    /// Live keys in unsigned lexicographic order
    ///
    /// The iterator holds the reader lock until it is dropped: writers
    /// (put/delete/merge/clear/close) wait, or time out, while it is alive.
    pub fn keys(&self) -> Result<Keys<'_>> {
        let guard = self.read_state()?;
        if guard.is_none() {
            return Err(CaskError::NotOpen);
        }
        Ok(Keys {
            guard,
            cursor: None,
        })
    }

    /// Number of live (non-tombstoned) keys
    pub fn key_count(&self) -> Result<usize> {
        let guard = self.read_state()?;
        let state = guard.as_ref().ok_or(CaskError::NotOpen)?;
        Ok(state.keydir.live_len())
    }

    /// The active file followed by the archives, ascending by id
    pub fn list_data_files(&self) -> Result<Vec<DataFileInfo>> {
        let guard = self.read_state()?;
        let state = guard.as_ref().ok_or(CaskError::NotOpen)?;
        Ok(std::iter::once(&state.active)
            .chain(state.archives.values())
            .map(|file| DataFileInfo {
                file_id: file.file_id(),
                path: file.path().to_path_buf(),
                size: file.size(),
                created: file.created(),
                writable: file.is_writable(),
            })
            .collect())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn is_open(&self) -> Result<bool> {
        Ok(self.read_state()?.is_some())
    }

    /// Directory of the open store
    pub fn path(&self) -> Result<PathBuf> {
        let guard = self.read_state()?;
        let state = guard.as_ref().ok_or(CaskError::NotOpen)?;
        Ok(state.dir.clone())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Lock Helpers
    // =========================================================================

    fn read_state(&self) -> Result<RwLockReadGuard<'_, Option<OpenState>>> {
        let timeout_ms = self.config.read_timeout_ms;
        self.state
            .try_read_recursive_for(Duration::from_millis(timeout_ms))
            .ok_or(CaskError::ConcurrencyTimeout {
                lock: "reader",
                timeout_ms,
            })
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, Option<OpenState>>> {
        let timeout_ms = self.config.write_timeout_ms;
        self.state
            .try_write_for(Duration::from_millis(timeout_ms))
            .ok_or(CaskError::ConcurrencyTimeout {
                lock: "writer",
                timeout_ms,
            })
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Some(state) = self.state.get_mut().take() {
            if let Err(e) = state.shutdown() {
                warn!(error = %e, "failed to close database cleanly");
            }
        }
    }
}

impl OpenState {
    /// Data file with `file_id`, active or archived
    fn file(&self, file_id: u32) -> Option<&DataFile> {
        if self.active.file_id() == file_id {
            Some(&self.active)
        } else {
            self.archives.get(&file_id)
        }
    }

    fn allocate_file_id(&mut self) -> Result<u32> {
        let id = self.next_file_id;
        self.next_file_id = successor(id)?;
        Ok(id)
    }

    /// Wall-clock milliseconds, bumped so every write gets a strictly
    /// larger timestamp than anything already in the store
    fn next_timestamp(&mut self) -> i64 {
        let timestamp = now_millis().max(self.last_timestamp.saturating_add(1));
        self.last_timestamp = timestamp;
        timestamp
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    /// Replay archives ascending by id, then the active file
    fn rebuild_directory(&mut self, use_hint_files: bool) -> Result<()> {
        self.keydir.clear();
        let dir = self.dir.clone();

        for file in self
            .archives
            .values_mut()
            .chain(std::iter::once(&mut self.active))
        {
            let file_id = file.file_id();
            let mut count = 0usize;

            if use_hint_files && HintFile::exists(&dir, file_id) {
                let mut hint = HintFile::open(&dir, file_id)?;
                for pointer in hint.scan()? {
                    let pointer = pointer?;
                    self.last_timestamp = self.last_timestamp.max(pointer.timestamp);
                    self.keydir.add(pointer);
                    count += 1;
                }
                debug!(file_id, pointers = count, "replayed hint file");
            } else {
                for pointer in file.scan()? {
                    let pointer = pointer?;
                    self.last_timestamp = self.last_timestamp.max(pointer.timestamp);
                    self.keydir.add(pointer);
                    count += 1;
                }
                debug!(file_id, records = count, "scanned data file");
            }
        }
        Ok(())
    }

    // =========================================================================
    // Rotation
    // =========================================================================

    /// Seal the active file into the archive set and start a new one
    fn rotate(&mut self, sync_strategy: SyncStrategy) -> Result<()> {
        let sealed_id = self.active.file_id();
        self.active.archive()?;

        let new_id = self.allocate_file_id()?;
        let mut fresh = DataFile::open(&layout::active_path(&self.dir), new_id, true)?;
        fresh.set_sync_strategy(sync_strategy);

        let sealed = std::mem::replace(&mut self.active, fresh);
        self.archives.insert(sealed_id, sealed);
        info!(archived = sealed_id, active = new_id, "rotated active file");
        Ok(())
    }

    // =========================================================================
    // Merge
    // =========================================================================

    fn merge(&mut self) -> Result<()> {
        if self.archives.len() < 2 {
            debug!(archives = self.archives.len(), "nothing to merge");
            return Ok(());
        }
        let started = Instant::now();
        let old_ids: Vec<u32> = self.archives.keys().copied().collect();

        // Pass 1: the latest version of every key across the old archives
        let mut latest: BTreeMap<Vec<u8>, RecordPointer> = BTreeMap::new();
        let mut scanned = 0usize;
        for file in self.archives.values_mut() {
            for pointer in file.scan()? {
                let pointer = pointer?;
                scanned += 1;
                match latest.get(pointer.key.as_slice()) {
                    Some(current) if merge_rank(current) >= merge_rank(&pointer) => {}
                    _ => {
                        latest.insert(pointer.key.clone(), pointer);
                    }
                }
            }
        }

        // Pass 2: copy live records into a new file with a hint alongside
        let merge_id = self.allocate_file_id()?;
        let (merged, rewritten) = match self.write_merge_output(merge_id, &latest) {
            Ok(output) => output,
            Err(e) => {
                self.discard_merge_output(merge_id);
                return Err(e);
            }
        };

        // Pass 3: swap the file set and repoint the directory
        self.keydir
            .retain(|pointer| old_ids.binary_search(&pointer.file_id).is_err());
        let kept = rewritten.len();
        for pointer in rewritten {
            self.keydir.add(pointer);
        }
        self.archives.insert(merge_id, merged);

        for id in &old_ids {
            if let Some(file) = self.archives.remove(id) {
                file.delete()?;
            }
        }

        info!(
            merged_files = old_ids.len(),
            scanned,
            kept,
            file_id = merge_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "merged archives"
        );
        Ok(())
    }

    /// Write `merge.<id>.db` and its hint, then seal it as `archive.<id>.db`
    fn write_merge_output(
        &self,
        merge_id: u32,
        latest: &BTreeMap<Vec<u8>, RecordPointer>,
    ) -> Result<(DataFile, Vec<RecordPointer>)> {
        let mut merged = DataFile::open(&layout::merge_path(&self.dir, merge_id), merge_id, true)?;
        let mut hint = HintFile::create(&self.dir, merge_id)?;
        let mut rewritten = Vec::with_capacity(latest.len());

        for pointer in latest.values().filter(|p| !p.is_tombstone()) {
            let source = self.archives.get(&pointer.file_id).ok_or_else(|| {
                CaskError::InvalidLayout(format!("archive {} vanished during merge", pointer.file_id))
            })?;
            let record = source.read_record(pointer)?;
            let moved = merged.append(record)?;
            hint.append(&moved)?;
            rewritten.push(moved);
        }

        // The hint must be complete before the merge file becomes an archive
        hint.finish()?;
        merged.archive()?;
        Ok((merged, rewritten))
    }

    /// Best-effort removal of a failed merge's files
    fn discard_merge_output(&self, merge_id: u32) {
        for path in [
            layout::merge_path(&self.dir, merge_id),
            layout::archive_path(&self.dir, merge_id),
        ] {
            if path.exists() {
                if let Err(e) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "failed to remove merge output");
                }
            }
        }
        if let Err(e) = HintFile::delete(&self.dir, merge_id) {
            warn!(file_id = merge_id, error = %e, "failed to remove merge hint file");
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Sync and close every file, then release the directory lock
    fn shutdown(self) -> Result<()> {
        let OpenState {
            dir,
            lock,
            mut active,
            archives,
            ..
        } = self;

        let synced = active.sync();
        drop(active);
        drop(archives);

        let released = match lock {
            Some(lock) => lock.release(),
            None => Ok(()),
        };
        info!(dir = %dir.display(), "closed database");
        synced.and(released)
    }

    /// Delete every data file (and its hint), then release the lock
    fn destroy(self) -> Result<()> {
        let OpenState {
            lock,
            active,
            archives,
            ..
        } = self;

        active.delete()?;
        for (_, file) in archives {
            file.delete()?;
        }
        match lock {
            Some(lock) => lock.release(),
            None => Ok(()),
        }
    }
}

/// Ordering of competing versions during merge: newest timestamp wins,
/// file id then position break ties so scan order never matters
fn merge_rank(pointer: &RecordPointer) -> (i64, u32, u64) {
    (pointer.timestamp, pointer.file_id, pointer.value_position)
}

fn successor(file_id: u32) -> Result<u32> {
    file_id
        .checked_add(1)
        .ok_or_else(|| CaskError::InvalidLayout("file id space exhausted".to_string()))
}

/// Lazy iterator over live keys, holding the reader lock while alive
pub struct Keys<'a> {
    guard: RwLockReadGuard<'a, Option<OpenState>>,
    /// Last key yielded
    cursor: Option<Vec<u8>>,
}

impl<'a> Iterator for Keys<'a> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let state = self.guard.as_ref()?;
        let key = state.keydir.next_live(self.cursor.as_deref())?.key.clone();
        self.cursor = Some(key.clone());
        Some(key)
    }
}
