//! Data File
//!
//! One append-only log: header, records, validated sequential scan and
//! positioned value reads.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::SyncStrategy;
use crate::error::{CaskError, Result};
use crate::format::{FileHeader, Record, FILE_HEADER_SIZE};
use crate::keydir::RecordPointer;

use super::{layout, HintFile};

/// A single log file, either writable (active) or sealed (archived)
///
/// ## Concurrency:
/// - Appends, scans and archival take `&mut self` (Database writer section)
/// - `read_value`/`read_record` take `&self`; the handle sits behind a
///   Mutex so positioned reads can run from the reader section
pub struct DataFile {
    path: PathBuf,
    header: FileHeader,
    file: Mutex<File>,
    writable: bool,
    /// Tracked byte length, header included
    size: u64,
    sync_strategy: SyncStrategy,
    /// Appends since the last fsync
    unsynced: usize,
}

impl DataFile {
    /// Open a data file, creating it with a fresh header if it is empty
    ///
    /// An empty file may only be initialised when `writable`. An existing
    /// header must carry `expected_file_id`.
    pub fn open(path: &Path, expected_file_id: u32, writable: bool) -> Result<Self> {
        let mut file = if writable {
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)?
        } else {
            File::open(path)?
        };

        let len = file.metadata()?.len();
        let header = if len == 0 {
            if !writable {
                return Err(CaskError::InvalidLayout(format!(
                    "data file {} has no header",
                    path.display()
                )));
            }
            let header = FileHeader::new(expected_file_id);
            file.write_all(&header.encode())?;
            file.sync_all()?;
            debug!(file_id = expected_file_id, path = %path.display(), "created data file");
            header
        } else {
            let header = Self::read_header_from(&mut file, path, len)?;
            if header.file_id != expected_file_id {
                return Err(CaskError::InvalidLayout(format!(
                    "data file {} has id {} but {} was expected",
                    path.display(),
                    header.file_id,
                    expected_file_id
                )));
            }
            header
        };

        Ok(Self {
            path: path.to_path_buf(),
            header,
            file: Mutex::new(file),
            writable,
            size: len.max(FILE_HEADER_SIZE),
            sync_strategy: SyncStrategy::Never,
            unsynced: 0,
        })
    }

    /// Read the header of an existing data file without opening it for use
    pub fn read_header(path: &Path) -> Result<FileHeader> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        Self::read_header_from(&mut file, path, len)
    }

    fn read_header_from(file: &mut File, path: &Path, len: u64) -> Result<FileHeader> {
        if len < FILE_HEADER_SIZE {
            return Err(CaskError::InvalidLayout(format!(
                "data file {} is shorter than its header ({} bytes)",
                path.display(),
                len
            )));
        }
        file.seek(SeekFrom::Start(0))?;
        Ok(FileHeader::read_from(file)?)
    }

    /// Set how appends are fsynced
    pub fn set_sync_strategy(&mut self, strategy: SyncStrategy) {
        self.sync_strategy = strategy;
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Seal `record` with its checksum and append it at end-of-file
    ///
    /// Returns a pointer to the appended value.
    pub fn append(&mut self, mut record: Record) -> Result<RecordPointer> {
        if !self.writable {
            return Err(CaskError::NotWritable {
                file_id: self.file_id(),
            });
        }

        record.seal();
        let bytes = record.encode();

        let file = self.file.get_mut();
        let offset = file.seek(SeekFrom::End(0))?;
        file.write_all(&bytes)?;
        file.flush()?;

        self.size = offset + bytes.len() as u64;
        self.maybe_sync()?;

        let value_position = offset + record.value_offset() as u64;
        let value_size = record.value_size();
        Ok(RecordPointer {
            key: record.key,
            file_id: self.header.file_id,
            value_size,
            value_position,
            timestamp: record.timestamp,
        })
    }

    fn maybe_sync(&mut self) -> Result<()> {
        self.unsynced += 1;
        let due = match self.sync_strategy {
            SyncStrategy::Never => false,
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if due {
            self.sync()?;
        }
        Ok(())
    }

    /// fsync everything written so far
    pub fn sync(&mut self) -> Result<()> {
        self.file.get_mut().sync_all()?;
        self.unsynced = 0;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Validated single pass over every record after the header
    ///
    /// The scan borrows the file mutably, so a second scan cannot start
    /// while one is alive. The first checksum failure ends the scan.
    pub fn scan(&mut self) -> Result<DataFileScan<'_>> {
        let file_id = self.file_id();
        let end = self.size;
        let file = self.file.get_mut();
        file.seek(SeekFrom::Start(FILE_HEADER_SIZE))?;

        Ok(DataFileScan {
            reader: BufReader::new(file),
            file_id,
            position: FILE_HEADER_SIZE,
            end,
            failed: false,
        })
    }

    /// Read the value `pointer` refers to
    ///
    /// Returns `Ok(None)` when the pointer belongs to another file.
    pub fn read_value(&self, pointer: &RecordPointer) -> Result<Option<Vec<u8>>> {
        if pointer.file_id != self.file_id() {
            return Ok(None);
        }
        self.check_bounds(pointer.value_position, pointer.value_size as u64)?;

        let mut value = vec![0u8; pointer.value_size as usize];
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(pointer.value_position))?;
        file.read_exact(&mut value)?;
        Ok(Some(value))
    }

    /// Read and re-validate the whole record `pointer` refers to
    pub fn read_record(&self, pointer: &RecordPointer) -> Result<Record> {
        if pointer.file_id != self.file_id() {
            return Err(CaskError::InvalidLayout(format!(
                "pointer into file {} used against file {}",
                pointer.file_id,
                self.file_id()
            )));
        }
        let offset = pointer.record_offset();
        let len = pointer.record_len();
        self.check_bounds(offset, len)?;

        let mut bytes = vec![0u8; len as usize];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut bytes)?;
        }

        let record = Record::read_from(&mut bytes.as_slice(), self.file_id(), offset)?;
        record.validate(self.file_id(), offset)?;
        if record.key != pointer.key {
            return Err(CaskError::corruption(
                self.file_id(),
                offset,
                "record key does not match its pointer",
            ));
        }
        Ok(record)
    }

    fn check_bounds(&self, offset: u64, len: u64) -> Result<()> {
        if offset < FILE_HEADER_SIZE || offset.saturating_add(len) > self.size {
            return Err(CaskError::corruption(
                self.file_id(),
                offset,
                format!("{} bytes at this offset lie outside the file", len),
            ));
        }
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Seal a writable file: rename it to `archive.<id>.db` and reopen it
    /// read-only. Already-sealed files are left alone.
    pub fn archive(&mut self) -> Result<()> {
        if !self.writable {
            return Ok(());
        }

        let archived = layout::archive_path(&self.dir(), self.file_id());
        self.file.get_mut().sync_all()?;
        fs::rename(&self.path, &archived)?;
        *self.file.get_mut() = File::open(&archived)?;

        info!(
            file_id = self.file_id(),
            size = self.size,
            path = %archived.display(),
            "archived data file"
        );
        self.path = archived;
        self.writable = false;
        self.unsynced = 0;
        Ok(())
    }

    /// Close and remove the file together with its paired hint file
    pub fn delete(self) -> Result<()> {
        let dir = self.dir();
        let file_id = self.file_id();
        let DataFile { path, file, .. } = self;
        drop(file);

        fs::remove_file(&path)?;
        HintFile::delete(&dir, file_id)?;
        debug!(file_id, path = %path.display(), "deleted data file");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn file_id(&self) -> u32 {
        self.header.file_id
    }

    /// Creation time, unix milliseconds
    pub fn created(&self) -> i64 {
        self.header.created
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding this file
    pub fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Tracked size in bytes, header included
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }
}

/// Sequential validated iteration over a data file's records
pub struct DataFileScan<'a> {
    reader: BufReader<&'a mut File>,
    file_id: u32,
    position: u64,
    end: u64,
    failed: bool,
}

impl<'a> DataFileScan<'a> {
    /// Byte offset of the next record
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl<'a> Iterator for DataFileScan<'a> {
    type Item = Result<RecordPointer>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.position >= self.end {
            return None;
        }

        let file_id = self.file_id;
        let offset = self.position;
        let record = match Record::read_from(&mut self.reader, file_id, offset)
            .and_then(|record| record.validate(file_id, offset).map(|_| record))
        {
            Ok(record) => record,
            Err(e) => {
                self.failed = true;
                return Some(Err(e));
            }
        };

        self.position += record.encoded_len() as u64;
        let value_position = offset + record.value_offset() as u64;
        let value_size = record.value_size();

        Some(Ok(RecordPointer {
            key: record.key,
            file_id,
            value_size,
            value_position,
            timestamp: record.timestamp,
        }))
    }
}
