//! File header shared by data files and hint files.

use std::io::{self, Read};

use bytes::{Buf, BufMut};

use super::now_millis;

/// Header size: FileId (4) + Created (8) = 12 bytes
pub const FILE_HEADER_SIZE: u64 = 12;

/// Identifies which log a data or hint file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub file_id: u32,
    /// Creation time, unix milliseconds
    pub created: i64,
}

impl FileHeader {
    /// Header for a file created now
    pub fn new(file_id: u32) -> Self {
        Self {
            file_id,
            created: now_millis(),
        }
    }

    pub fn encode(&self) -> [u8; FILE_HEADER_SIZE as usize] {
        let mut out = [0u8; FILE_HEADER_SIZE as usize];
        let mut buf = &mut out[..];
        buf.put_u32_le(self.file_id);
        buf.put_i64_le(self.created);
        out
    }

    pub fn decode(bytes: &[u8; FILE_HEADER_SIZE as usize]) -> Self {
        let mut buf = &bytes[..];
        let file_id = buf.get_u32_le();
        let created = buf.get_i64_le();
        Self { file_id, created }
    }

    /// Read exactly one header from `reader`
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut bytes = [0u8; FILE_HEADER_SIZE as usize];
        reader.read_exact(&mut bytes)?;
        Ok(Self::decode(&bytes))
    }
}
