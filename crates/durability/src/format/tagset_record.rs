//! Durable TagSet record format
//!
//! One record holds one TagSet. Filenames may contain any byte but the path
//! separator, so entries are length-prefixed rather than delimited.
//!
//! # Binary Format
//!
//! ```text
//! magic("TGSR", 4) + version(4) + entry_count(8)
//! + entry_count × [ name_len(4) + name(name_len) + file_id(16) ]
//! + crc32(4)
//! ```
//!
//! All integers are little-endian. The CRC covers every preceding byte.
//! Entries are written in filename order, so the same TagSet always
//! encodes to the same bytes.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use tagstore_core::{FileId, TagSet};

/// Magic bytes for TagSet records.
pub const TAGSET_RECORD_MAGIC: &[u8; 4] = b"TGSR";

/// Current format version for TagSet records.
pub const TAGSET_RECORD_VERSION: u32 = 1;

/// Size of magic + version + entry_count.
pub const TAGSET_RECORD_HEADER_SIZE: usize = 16;

/// Size of the trailing checksum.
const CRC_SIZE: usize = 4;

/// Serialize a TagSet into a self-checking record.
pub fn encode_tagset(set: &TagSet) -> Vec<u8> {
    let body_len: usize = set.iter().map(|(name, _)| 4 + name.len() + FileId::LEN).sum();
    let mut buf = Vec::with_capacity(TAGSET_RECORD_HEADER_SIZE + body_len + CRC_SIZE);

    buf.extend_from_slice(TAGSET_RECORD_MAGIC);
    buf.extend_from_slice(&TAGSET_RECORD_VERSION.to_le_bytes());
    buf.extend_from_slice(&(set.len() as u64).to_le_bytes());

    for (name, id) in set.iter() {
        buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(id.as_bytes());
    }

    let crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    buf
}

/// Deserialize a record, validating magic, version, checksum and every entry.
pub fn decode_tagset(data: &[u8]) -> Result<TagSet, RecordError> {
    let min = TAGSET_RECORD_HEADER_SIZE + CRC_SIZE;
    if data.len() < min {
        return Err(RecordError::TooShort {
            expected: min,
            actual: data.len(),
        });
    }

    if &data[0..4] != TAGSET_RECORD_MAGIC {
        return Err(RecordError::InvalidMagic);
    }

    let crc_offset = data.len() - CRC_SIZE;
    let mut trailer = &data[crc_offset..];
    let stored_crc = trailer.read_u32::<LittleEndian>()?;
    let computed_crc = crc32fast::hash(&data[..crc_offset]);
    if stored_crc != computed_crc {
        return Err(RecordError::ChecksumMismatch {
            stored: stored_crc,
            computed: computed_crc,
        });
    }

    let mut cursor = Cursor::new(&data[4..crc_offset]);
    let version = cursor.read_u32::<LittleEndian>()?;
    if version != TAGSET_RECORD_VERSION {
        return Err(RecordError::UnsupportedVersion(version));
    }

    let count = cursor.read_u64::<LittleEndian>()?;
    let mut set = TagSet::new();
    for _ in 0..count {
        let name_len = cursor.read_u32::<LittleEndian>()? as usize;
        let remaining = cursor.get_ref().len() as u64 - cursor.position();
        if name_len as u64 > remaining {
            return Err(RecordError::Truncated);
        }
        let mut name = vec![0u8; name_len];
        cursor.read_exact(&mut name)?;
        let name = String::from_utf8(name).map_err(|_| RecordError::InvalidFilename)?;
        if name.is_empty() || name.contains('/') {
            return Err(RecordError::InvalidFilename);
        }

        let mut id = [0u8; FileId::LEN];
        cursor.read_exact(&mut id)?;

        if set.insert(name.clone(), FileId::from_bytes(id)).is_some() {
            return Err(RecordError::DuplicateFilename(name));
        }
    }

    let consumed = cursor.position() as usize;
    if consumed != cursor.get_ref().len() {
        return Err(RecordError::TrailingBytes(cursor.get_ref().len() - consumed));
    }

    Ok(set)
}

/// Errors that can occur when decoding a TagSet record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Data too short to contain header and checksum.
    #[error("tagset record too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum size.
        expected: usize,
        /// Actual size.
        actual: usize,
    },

    /// Magic bytes do not match `TGSR`.
    #[error("invalid tagset record magic bytes")]
    InvalidMagic,

    /// Unsupported format version.
    #[error("unsupported tagset record version: {0}")]
    UnsupportedVersion(u32),

    /// CRC32 checksum mismatch.
    #[error("tagset record checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// CRC stored in the record.
        stored: u32,
        /// CRC computed from the data.
        computed: u32,
    },

    /// Entry runs past the end of the record.
    #[error("tagset record truncated")]
    Truncated,

    /// Filename is empty, not UTF-8, or contains a separator.
    #[error("tagset record holds an invalid filename")]
    InvalidFilename,

    /// Same filename appears twice.
    #[error("tagset record lists filename '{0}' twice")]
    DuplicateFilename(String),

    /// Bytes left over after the declared entries.
    #[error("tagset record has {0} trailing bytes")]
    TrailingBytes(usize),
}

impl From<std::io::Error> for RecordError {
    // Only reads past the end of an in-memory buffer reach here.
    fn from(_: std::io::Error) -> Self {
        RecordError::Truncated
    }
}

impl From<RecordError> for tagstore_core::Error {
    fn from(e: RecordError) -> Self {
        tagstore_core::Error::integrity(e.to_string())
    }
}
