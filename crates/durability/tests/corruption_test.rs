//! Index record corruption tests
//!
//! These tests verify that damaged records are reported, never skipped:
//! - CRC32 detects bit flips anywhere in a record
//! - Truncated and zero-length records are rejected
//! - One bad record fails the whole load
//! - Leftover temp files from an interrupted flush are ignored

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use tagstore_core::{Error, FileId, TagSet};
use tagstore_durability::{decode_tagset, encode_tagset, IndexStore, RecordError};
use tempfile::TempDir;

fn sample() -> TagSet {
    ["alpha", "bravo", "charlie"]
        .iter()
        .map(|n| (n.to_string(), FileId::new()))
        .collect()
}

fn flip_byte(path: &std::path::Path, offset: u64) {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    let mut buf = [0u8; 1];
    file.read_exact(&mut buf).unwrap();
    buf[0] ^= 0xFF;
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(&buf).unwrap();
    file.sync_all().unwrap();
}

#[test]
fn test_crc_detects_bit_flip_at_every_offset() {
    let bytes = encode_tagset(&sample());
    // Skip the magic: a flip there is reported as InvalidMagic instead.
    for offset in 4..bytes.len() {
        let mut damaged = bytes.clone();
        damaged[offset] ^= 0x01;
        let err = decode_tagset(&damaged).unwrap_err();
        assert!(
            matches!(err, RecordError::ChecksumMismatch { .. }),
            "offset {}: {:?}",
            offset,
            err
        );
    }
}

#[test]
fn test_bit_flip_on_disk_fails_load() {
    let temp_dir = TempDir::new().unwrap();
    let store = IndexStore::new(temp_dir.path());
    store.write("work", &sample()).unwrap();

    flip_byte(&store.record_path("work"), 20);

    let err = store.load_all().unwrap_err();
    assert!(matches!(err, Error::Integrity(_)), "{:?}", err);
}

#[test]
fn test_truncated_record_fails_load() {
    let temp_dir = TempDir::new().unwrap();
    let store = IndexStore::new(temp_dir.path());
    store.write("", &sample()).unwrap();

    let path = store.record_path("");
    let len = std::fs::metadata(&path).unwrap().len();
    OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(len - 7)
        .unwrap();

    assert!(matches!(store.load_all(), Err(Error::Integrity(_))));
}

#[test]
fn test_zero_length_record_fails_load() {
    let temp_dir = TempDir::new().unwrap();
    let store = IndexStore::new(temp_dir.path());
    std::fs::write(store.record_path("empty"), b"").unwrap();

    assert!(matches!(store.load_all(), Err(Error::Integrity(_))));
}

#[test]
fn test_one_bad_record_fails_whole_load() {
    let temp_dir = TempDir::new().unwrap();
    let store = IndexStore::new(temp_dir.path());
    for tag in ["a", "b", "c", "d"] {
        store.write(tag, &sample()).unwrap();
    }
    flip_byte(&store.record_path("c"), 5);

    assert!(matches!(store.load_all(), Err(Error::Integrity(_))));
}

#[test]
fn test_leftover_temp_file_is_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let store = IndexStore::new(temp_dir.path());
    let set = sample();
    store.write("work", &set).unwrap();

    let mut temp = store.record_path("work").into_os_string();
    temp.push(".tmp");
    std::fs::write(&temp, b"half a record").unwrap();

    let loaded = store.load_all().unwrap();
    assert_eq!(loaded, vec![("work".to_string(), set)]);
}

#[test]
fn test_rewrite_replaces_record_atomically() {
    let temp_dir = TempDir::new().unwrap();
    let store = IndexStore::new(temp_dir.path());
    store.write("work", &sample()).unwrap();

    let smaller: TagSet = [("only".to_string(), FileId::new())].into_iter().collect();
    store.write("work", &smaller).unwrap();
    store.sync_dir().unwrap();

    let loaded = store.load_all().unwrap();
    assert_eq!(loaded, vec![("work".to_string(), smaller)]);
    // no temp file survives a completed write
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
}
