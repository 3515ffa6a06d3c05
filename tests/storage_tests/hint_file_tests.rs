//! Tests for HintFile
//!
//! These tests verify:
//! - Write-only mode writes a header, then hint records
//! - Read-only mode checks the header id and replays pointers
//! - Mode violations (append to reader, scan of writer)
//! - Existence and cleanup helpers

use std::fs;
use std::path::PathBuf;

use caskdb::format::{FILE_HEADER_SIZE, HINT_PREFIX_SIZE};
use caskdb::keydir::RecordPointer;
use caskdb::storage::{layout, HintFile};
use caskdb::CaskError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_path_buf();
    (temp_dir, path)
}

fn pointer(key: &[u8], file_id: u32, position: u64, size: u32, timestamp: i64) -> RecordPointer {
    RecordPointer {
        key: key.to_vec(),
        file_id,
        value_size: size,
        value_position: position,
        timestamp,
    }
}

// =============================================================================
// Write Tests
// =============================================================================

#[test]
fn test_create_writes_header_only() {
    let (_temp, dir) = setup_temp_dir();

    HintFile::create(&dir, 3).unwrap().finish().unwrap();

    let path = layout::hint_path(&dir, 3);
    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len() as u64, FILE_HEADER_SIZE);
    assert_eq!(&bytes[0..4], &3u32.to_le_bytes());
}

#[test]
fn test_append_writes_hint_records() {
    let (_temp, dir) = setup_temp_dir();
    let mut hint = HintFile::create(&dir, 3).unwrap();
    hint.append(&pointer(b"abc", 3, 33, 4, 10)).unwrap();
    hint.append(&pointer(b"d", 3, 58, 1, 11)).unwrap();
    hint.finish().unwrap();

    let len = fs::metadata(layout::hint_path(&dir, 3)).unwrap().len();
    assert_eq!(
        len,
        FILE_HEADER_SIZE + (HINT_PREFIX_SIZE as u64 + 3) + (HINT_PREFIX_SIZE as u64 + 1)
    );
}

#[test]
fn test_scan_of_write_mode_file_fails() {
    let (_temp, dir) = setup_temp_dir();
    let mut hint = HintFile::create(&dir, 5).unwrap();

    assert!(matches!(hint.scan(), Err(CaskError::NotReadable { file_id: 5 })));
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_scan_replays_pointers() {
    let (_temp, dir) = setup_temp_dir();
    let written = vec![
        pointer(b"alpha", 7, 35, 3, 100),
        pointer(b"beta", 7, 60, 12, 101),
        pointer(b"", 7, 90, 1, 102),
    ];
    let mut hint = HintFile::create(&dir, 7).unwrap();
    for p in &written {
        hint.append(p).unwrap();
    }
    hint.finish().unwrap();

    let mut hint = HintFile::open(&dir, 7).unwrap();
    let read: Vec<RecordPointer> = hint.scan().unwrap().map(|p| p.unwrap()).collect();

    assert_eq!(read, written);
    assert_eq!(hint.file_id(), 7);
}

#[test]
fn test_scan_twice_replays_again() {
    let (_temp, dir) = setup_temp_dir();
    let mut hint = HintFile::create(&dir, 1).unwrap();
    hint.append(&pointer(b"k", 1, 31, 1, 1)).unwrap();
    hint.finish().unwrap();

    let mut hint = HintFile::open(&dir, 1).unwrap();
    assert_eq!(hint.scan().unwrap().count(), 1);
    assert_eq!(hint.scan().unwrap().count(), 1);
}

#[test]
fn test_open_with_wrong_id_is_invalid_layout() {
    let (_temp, dir) = setup_temp_dir();
    HintFile::create(&dir, 2).unwrap().finish().unwrap();
    fs::rename(layout::hint_path(&dir, 2), layout::hint_path(&dir, 9)).unwrap();

    assert!(matches!(HintFile::open(&dir, 9), Err(CaskError::InvalidLayout(_))));
}

#[test]
fn test_append_to_read_mode_file_fails() {
    let (_temp, dir) = setup_temp_dir();
    HintFile::create(&dir, 4).unwrap().finish().unwrap();
    let mut hint = HintFile::open(&dir, 4).unwrap();

    let result = hint.append(&pointer(b"k", 4, 31, 1, 1));
    assert!(matches!(result, Err(CaskError::NotWritable { file_id: 4 })));
}

#[test]
fn test_truncated_hint_is_corruption() {
    let (_temp, dir) = setup_temp_dir();
    let mut hint = HintFile::create(&dir, 1).unwrap();
    hint.append(&pointer(b"key", 1, 33, 2, 1)).unwrap();
    hint.finish().unwrap();

    let path = layout::hint_path(&dir, 1);
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 1]).unwrap();

    let mut hint = HintFile::open(&dir, 1).unwrap();
    let results: Vec<_> = hint.scan().unwrap().collect();
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(CaskError::Corruption { .. })));
}

// =============================================================================
// Helper Tests
// =============================================================================

#[test]
fn test_exists_and_delete() {
    let (_temp, dir) = setup_temp_dir();
    assert!(!HintFile::exists(&dir, 1));
    assert!(!HintFile::delete(&dir, 1).unwrap());

    HintFile::create(&dir, 1).unwrap().finish().unwrap();
    assert!(HintFile::exists(&dir, 1));

    assert!(HintFile::delete(&dir, 1).unwrap());
    assert!(!HintFile::exists(&dir, 1));
}
