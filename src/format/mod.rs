//! Record Format Module
//!
//! Fixed binary layouts shared by data files and hint files. Pure
//! encode/decode plus the record checksum; no file handling lives here.
//!
//! All integers are fixed-width little-endian, no padding.
//!
//! ## File Header (12 bytes, first bytes of every data and hint file)
//! ```text
//! ┌──────────────┬──────────────┐
//! │ FileId: u32  │ Created: i64 │
//! └──────────────┴──────────────┘
//! ```
//!
//! ## Record (18-byte prefix + key + value)
//! ```text
//! ┌──────────┬───────────┬──────────┬────────────┬─────┬───────┐
//! │ CRC (4)  │ Ts: i64   │ KLen u16 │ VLen: i32  │ Key │ Value │
//! └──────────┴───────────┴──────────┴────────────┴─────┴───────┘
//!            └──────────── CRC-32C covers these bytes ──────────┘
//! ```
//! A zero-length value is a tombstone.
//!
//! ## Hint Record (22-byte prefix + key)
//! ```text
//! ┌───────────┬──────────┬────────────┬──────────────┬─────┐
//! │ Ts: i64   │ KLen u16 │ VLen: i32  │ ValPos: i64  │ Key │
//! └───────────┴──────────┴────────────┴──────────────┴─────┘
//! ```

mod header;
mod hint;
mod record;

use std::time::{SystemTime, UNIX_EPOCH};

pub use header::{FileHeader, FILE_HEADER_SIZE};
pub use hint::{HintRecord, HINT_PREFIX_SIZE};
pub use record::{checksum, Record, CHECKSUM_SIZE, MAX_KEY_SIZE, MAX_VALUE_SIZE, RECORD_PREFIX_SIZE};

/// Current wall-clock time as unix milliseconds
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
