//! Hint File
//!
//! Index snapshot paired 1:1 with a data file by id. Written once by merge,
//! replayed once at open to skip the checksummed scan of its data file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CaskError, Result};
use crate::format::{FileHeader, HintRecord, FILE_HEADER_SIZE};
use crate::keydir::RecordPointer;

use super::layout;

enum Mode {
    Write(BufWriter<File>),
    Read { reader: BufReader<File>, len: u64 },
}

/// A hint file opened either write-only (during merge) or read-only
/// (during recovery)
pub struct HintFile {
    path: PathBuf,
    header: FileHeader,
    mode: Mode,
}

impl HintFile {
    /// Create (or truncate) the hint file for `file_id` and write its header
    pub fn create(dir: &Path, file_id: u32) -> Result<Self> {
        let path = layout::hint_path(dir, file_id);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        let header = FileHeader::new(file_id);
        let mut writer = BufWriter::new(file);
        writer.write_all(&header.encode())?;

        Ok(Self {
            path,
            header,
            mode: Mode::Write(writer),
        })
    }

    /// Open an existing hint file for `file_id` and verify its header
    pub fn open(dir: &Path, file_id: u32) -> Result<Self> {
        let path = layout::hint_path(dir, file_id);
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        if len < FILE_HEADER_SIZE {
            return Err(CaskError::InvalidLayout(format!(
                "hint file {} is shorter than its header",
                path.display()
            )));
        }

        let mut reader = BufReader::new(file);
        let header = FileHeader::read_from(&mut reader)?;
        if header.file_id != file_id {
            return Err(CaskError::InvalidLayout(format!(
                "hint file {} has id {} but {} was expected",
                path.display(),
                header.file_id,
                file_id
            )));
        }

        Ok(Self {
            path,
            header,
            mode: Mode::Read { reader, len },
        })
    }

    /// Whether a hint file exists for `file_id`
    pub fn exists(dir: &Path, file_id: u32) -> bool {
        layout::hint_path(dir, file_id).is_file()
    }

    /// Remove the hint file for `file_id`; returns whether one existed
    pub fn delete(dir: &Path, file_id: u32) -> Result<bool> {
        match fs::remove_file(layout::hint_path(dir, file_id)) {
            Ok(()) => {
                debug!(file_id, "deleted hint file");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Append the hint record for `pointer`
    pub fn append(&mut self, pointer: &RecordPointer) -> Result<()> {
        match &mut self.mode {
            Mode::Write(writer) => {
                writer.write_all(&HintRecord::from(pointer).encode())?;
                Ok(())
            }
            Mode::Read { .. } => Err(CaskError::NotWritable {
                file_id: self.header.file_id,
            }),
        }
    }

    /// Single pass over the hint records, yielding the pointers they encode
    ///
    /// Checksums are not re-verified; the hint is trusted as written.
    pub fn scan(&mut self) -> Result<HintScan<'_>> {
        let file_id = self.header.file_id;
        match &mut self.mode {
            Mode::Read { reader, len } => {
                reader.seek(SeekFrom::Start(FILE_HEADER_SIZE))?;
                Ok(HintScan {
                    reader,
                    file_id,
                    position: FILE_HEADER_SIZE,
                    end: *len,
                    failed: false,
                })
            }
            Mode::Write(_) => Err(CaskError::NotReadable { file_id }),
        }
    }

    /// Flush and fsync a write-mode hint file, then close it
    pub fn finish(self) -> Result<()> {
        if let Mode::Write(writer) = self.mode {
            let file = writer.into_inner().map_err(|e| CaskError::Io(e.into_error()))?;
            file.sync_all()?;
        }
        Ok(())
    }

    pub fn file_id(&self) -> u32 {
        self.header.file_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Iterator over a hint file's records
pub struct HintScan<'a> {
    reader: &'a mut BufReader<File>,
    file_id: u32,
    position: u64,
    end: u64,
    failed: bool,
}

impl<'a> Iterator for HintScan<'a> {
    type Item = Result<RecordPointer>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.position >= self.end {
            return None;
        }

        match HintRecord::read_from(&mut *self.reader, self.file_id, self.position) {
            Ok(hint) => {
                self.position += hint.encoded_len() as u64;
                Some(Ok(hint.into_pointer(self.file_id)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
