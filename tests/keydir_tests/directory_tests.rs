//! Tests for KeyDirectory
//!
//! These tests verify:
//! - Last-writer-wins by timestamp, ties go to the later add
//! - Unsigned lexicographic key order
//! - Live-key iteration skips tombstones
//! - Conditional removal and bulk retain

use caskdb::keydir::{KeyDirectory, RecordPointer};

// =============================================================================
// Helper Functions
// =============================================================================

fn ptr(key: &[u8], file_id: u32, position: u64, size: u32, timestamp: i64) -> RecordPointer {
    RecordPointer {
        key: key.to_vec(),
        file_id,
        value_size: size,
        value_position: position,
        timestamp,
    }
}

fn live(dir: &KeyDirectory) -> Vec<Vec<u8>> {
    dir.live_keys().map(|k| k.to_vec()).collect()
}

// =============================================================================
// Add/Find Tests
// =============================================================================

#[test]
fn test_new_directory_is_empty() {
    let dir = KeyDirectory::new();
    assert!(dir.is_empty());
    assert_eq!(dir.len(), 0);
    assert!(dir.find(b"missing").is_none());
    assert!(dir.next_live(None).is_none());
}

#[test]
fn test_add_and_find() {
    let mut dir = KeyDirectory::new();
    let p = ptr(b"key", 1, 100, 5, 10);

    assert!(dir.add(p.clone()));
    assert_eq!(dir.find(b"key"), Some(&p));
    assert_eq!(dir.len(), 1);
}

#[test]
fn test_newer_timestamp_replaces() {
    let mut dir = KeyDirectory::new();
    dir.add(ptr(b"key", 1, 100, 5, 10));

    assert!(dir.add(ptr(b"key", 2, 40, 7, 11)));

    let found = dir.find(b"key").unwrap();
    assert_eq!(found.file_id, 2);
    assert_eq!(found.timestamp, 11);
    assert_eq!(dir.len(), 1);
}

#[test]
fn test_older_timestamp_is_ignored() {
    let mut dir = KeyDirectory::new();
    dir.add(ptr(b"key", 2, 40, 7, 11));

    assert!(!dir.add(ptr(b"key", 1, 100, 5, 10)));
    assert_eq!(dir.find(b"key").unwrap().file_id, 2);
}

#[test]
fn test_equal_timestamp_goes_to_later_add() {
    let mut dir = KeyDirectory::new();
    dir.add(ptr(b"key", 1, 100, 5, 10));

    assert!(dir.add(ptr(b"key", 1, 200, 3, 10)));
    assert_eq!(dir.find(b"key").unwrap().value_position, 200);
}

#[test]
fn test_tombstone_is_stored_but_not_live() {
    let mut dir = KeyDirectory::new();
    dir.add(ptr(b"a", 1, 30, 1, 1));
    dir.add(ptr(b"a", 1, 60, 0, 2));

    assert!(dir.find(b"a").unwrap().is_tombstone());
    assert_eq!(dir.len(), 1);
    assert_eq!(dir.live_len(), 0);
    assert!(live(&dir).is_empty());
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_keys_are_unsigned_lexicographic() {
    let mut dir = KeyDirectory::new();
    let keys: [&[u8]; 6] = [b"\xff", b"b", b"", b"a\x00", b"a", b"\x7f"];
    for (i, key) in keys.iter().enumerate() {
        dir.add(ptr(key, 1, 100 + i as u64, 1, i as i64));
    }

    assert_eq!(
        live(&dir),
        vec![
            b"".to_vec(),
            b"\x7f".to_vec(),
            b"a".to_vec(),
            b"a\x00".to_vec(),
            b"b".to_vec(),
            b"\xff".to_vec(),
        ]
    );
}

#[test]
fn test_next_live_skips_tombstones() {
    let mut dir = KeyDirectory::new();
    dir.add(ptr(b"a", 1, 30, 1, 1));
    dir.add(ptr(b"b", 1, 60, 0, 2));
    dir.add(ptr(b"c", 1, 90, 1, 3));

    let first = dir.next_live(None).unwrap();
    assert_eq!(first.key, b"a".to_vec());

    let second = dir.next_live(Some(&b"a"[..])).unwrap();
    assert_eq!(second.key, b"c".to_vec());

    assert!(dir.next_live(Some(&b"c"[..])).is_none());
}

#[test]
fn test_next_live_after_absent_key() {
    let mut dir = KeyDirectory::new();
    dir.add(ptr(b"apple", 1, 30, 1, 1));
    dir.add(ptr(b"cherry", 1, 60, 1, 2));

    assert_eq!(dir.next_live(Some(&b"banana"[..])).unwrap().key, b"cherry".to_vec());
}

// =============================================================================
// Removal Tests
// =============================================================================

#[test]
fn test_remove_exact_matches_location() {
    let mut dir = KeyDirectory::new();
    let current = ptr(b"k", 3, 120, 4, 9);
    dir.add(current.clone());

    assert!(!dir.remove_exact(&ptr(b"k", 3, 80, 4, 9)));
    assert!(!dir.remove_exact(&ptr(b"k", 2, 120, 4, 9)));
    assert!(dir.find(b"k").is_some());

    assert!(dir.remove_exact(&current));
    assert!(dir.find(b"k").is_none());
}

#[test]
fn test_retain_by_file() {
    let mut dir = KeyDirectory::new();
    dir.add(ptr(b"a", 1, 30, 1, 1));
    dir.add(ptr(b"b", 2, 30, 1, 2));
    dir.add(ptr(b"c", 1, 60, 0, 3));
    dir.add(ptr(b"d", 3, 30, 1, 4));

    dir.retain(|p| p.file_id != 1);

    let remaining: Vec<Vec<u8>> = dir.all().map(|p| p.key.clone()).collect();
    assert_eq!(remaining, vec![b"b".to_vec(), b"d".to_vec()]);
}

#[test]
fn test_clear() {
    let mut dir = KeyDirectory::new();
    dir.add(ptr(b"a", 1, 30, 1, 1));
    dir.add(ptr(b"b", 1, 60, 1, 2));

    dir.clear();

    assert!(dir.is_empty());
    assert_eq!(dir.live_len(), 0);
}

// =============================================================================
// Pointer Tests
// =============================================================================

#[test]
fn test_pointer_record_geometry() {
    // 18-byte prefix + 3-byte key before the value
    let p = ptr(b"key", 1, 12 + 18 + 3, 5, 1);

    assert_eq!(p.record_offset(), 12);
    assert_eq!(p.record_len(), 18 + 3 + 5);
    assert!(!p.is_tombstone());
}
