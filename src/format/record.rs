//! Data file record codec and checksum.

use std::io::{self, Read};

use bytes::{Buf, BufMut};

use crate::error::{CaskError, Result};

/// Size of the checksum field that leads every record
pub const CHECKSUM_SIZE: usize = 4;

/// Fixed prefix: Checksum (4) + Timestamp (8) + KeySize (2) + ValueSize (4)
pub const RECORD_PREFIX_SIZE: usize = 18;

/// Largest key representable by the u16 key size field
pub const MAX_KEY_SIZE: usize = u16::MAX as usize;

/// Largest value representable by the i32 value size field
pub const MAX_VALUE_SIZE: usize = i32::MAX as usize;

/// CRC-32C of an encoded record, skipping its leading checksum field
pub fn checksum(encoded: &[u8]) -> u32 {
    crc32c::crc32c(encoded.get(CHECKSUM_SIZE..).unwrap_or(&[]))
}

/// One key/value entry as stored in a data file
///
/// An empty `value` is a tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub checksum: u32,
    /// Unix milliseconds at write time
    pub timestamp: i64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Record {
    /// Create an unsealed record (checksum 0); `seal` before writing
    pub fn new(key: Vec<u8>, value: Vec<u8>, timestamp: i64) -> Result<Self> {
        if key.len() > MAX_KEY_SIZE {
            return Err(CaskError::KeyTooLarge(key.len()));
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(CaskError::ValueTooLarge(value.len()));
        }
        Ok(Self {
            checksum: 0,
            timestamp,
            key,
            value,
        })
    }

    /// Tombstone record marking `key` as deleted
    pub fn tombstone(key: Vec<u8>, timestamp: i64) -> Result<Self> {
        Self::new(key, Vec::new(), timestamp)
    }

    pub fn key_size(&self) -> u16 {
        self.key.len() as u16
    }

    pub fn value_size(&self) -> u32 {
        self.value.len() as u32
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }

    /// Total encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        RECORD_PREFIX_SIZE + self.key.len() + self.value.len()
    }

    /// Offset of the value relative to the start of the record
    pub fn value_offset(&self) -> usize {
        RECORD_PREFIX_SIZE + self.key.len()
    }

    /// CRC-32C over every field after the checksum
    pub fn compute_checksum(&self) -> u32 {
        let mut prefix = [0u8; RECORD_PREFIX_SIZE - CHECKSUM_SIZE];
        let mut buf = &mut prefix[..];
        buf.put_i64_le(self.timestamp);
        buf.put_u16_le(self.key_size());
        buf.put_i32_le(self.value.len() as i32);

        let crc = crc32c::crc32c(&prefix);
        let crc = crc32c::crc32c_append(crc, &self.key);
        crc32c::crc32c_append(crc, &self.value)
    }

    /// Store the freshly computed checksum
    pub fn seal(&mut self) {
        self.checksum = self.compute_checksum();
    }

    pub fn is_valid(&self) -> bool {
        self.checksum == self.compute_checksum()
    }

    /// Fail with `Corruption` if the stored checksum does not match
    pub fn validate(&self, file_id: u32, offset: u64) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(CaskError::corruption(
                file_id,
                offset,
                format!(
                    "checksum mismatch: stored {:#010x}, computed {:#010x}",
                    self.checksum,
                    self.compute_checksum()
                ),
            ))
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.put_u32_le(self.checksum);
        buf.put_i64_le(self.timestamp);
        buf.put_u16_le(self.key_size());
        buf.put_i32_le(self.value.len() as i32);
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);
        buf
    }

    /// Decode one record from `reader`, which sits at byte `offset` of file
    /// `file_id`. The checksum is not verified here.
    ///
    /// Running out of bytes mid-record is reported as `Corruption`.
    pub fn read_from<R: Read>(reader: &mut R, file_id: u32, offset: u64) -> Result<Self> {
        let truncated = |e: io::Error| match e.kind() {
            io::ErrorKind::UnexpectedEof => CaskError::corruption(file_id, offset, "truncated record"),
            _ => CaskError::Io(e),
        };

        let mut prefix = [0u8; RECORD_PREFIX_SIZE];
        reader.read_exact(&mut prefix).map_err(truncated)?;

        let mut buf = &prefix[..];
        let checksum = buf.get_u32_le();
        let timestamp = buf.get_i64_le();
        let key_size = buf.get_u16_le() as usize;
        let value_size = buf.get_i32_le();

        if value_size < 0 {
            return Err(CaskError::corruption(
                file_id,
                offset,
                format!("negative value size {}", value_size),
            ));
        }

        let mut key = vec![0u8; key_size];
        reader.read_exact(&mut key).map_err(truncated)?;

        let mut value = vec![0u8; value_size as usize];
        reader.read_exact(&mut value).map_err(truncated)?;

        Ok(Self {
            checksum,
            timestamp,
            key,
            value,
        })
    }
}
