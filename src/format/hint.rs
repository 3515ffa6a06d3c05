//! Hint record codec: a record's index entry without its value.

use std::io::{self, Read};

use bytes::{Buf, BufMut};

use crate::error::{CaskError, Result};
use crate::keydir::RecordPointer;

/// Fixed prefix: Timestamp (8) + KeySize (2) + ValueSize (4) + ValuePosition (8)
pub const HINT_PREFIX_SIZE: usize = 22;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintRecord {
    pub timestamp: i64,
    pub value_size: u32,
    /// Absolute byte offset of the value inside the paired data file
    pub value_position: u64,
    pub key: Vec<u8>,
}

impl HintRecord {
    pub fn encoded_len(&self) -> usize {
        HINT_PREFIX_SIZE + self.key.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.put_i64_le(self.timestamp);
        buf.put_u16_le(self.key.len() as u16);
        buf.put_i32_le(self.value_size as i32);
        buf.put_i64_le(self.value_position as i64);
        buf.put_slice(&self.key);
        buf
    }

    /// Decode one hint record from `reader`, which sits at byte `offset` of
    /// the hint file for `file_id`
    pub fn read_from<R: Read>(reader: &mut R, file_id: u32, offset: u64) -> Result<Self> {
        let truncated = |e: io::Error| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                CaskError::corruption(file_id, offset, "truncated hint record")
            }
            _ => CaskError::Io(e),
        };

        let mut prefix = [0u8; HINT_PREFIX_SIZE];
        reader.read_exact(&mut prefix).map_err(truncated)?;

        let mut buf = &prefix[..];
        let timestamp = buf.get_i64_le();
        let key_size = buf.get_u16_le() as usize;
        let value_size = buf.get_i32_le();
        let value_position = buf.get_i64_le();

        if value_size < 0 || value_position < 0 {
            return Err(CaskError::corruption(
                file_id,
                offset,
                format!(
                    "negative hint field (value size {}, position {})",
                    value_size, value_position
                ),
            ));
        }

        let mut key = vec![0u8; key_size];
        reader.read_exact(&mut key).map_err(truncated)?;

        Ok(Self {
            timestamp,
            value_size: value_size as u32,
            value_position: value_position as u64,
            key,
        })
    }

    /// Rebuild the pointer this hint was written from
    pub fn into_pointer(self, file_id: u32) -> RecordPointer {
        RecordPointer {
            key: self.key,
            file_id,
            value_size: self.value_size,
            value_position: self.value_position,
            timestamp: self.timestamp,
        }
    }
}

impl From<&RecordPointer> for HintRecord {
    fn from(pointer: &RecordPointer) -> Self {
        Self {
            timestamp: pointer.timestamp,
            value_size: pointer.value_size,
            value_position: pointer.value_position,
            key: pointer.key.clone(),
        }
    }
}
