//! On-disk byte formats for index records.
//!
//! Keeping serialization separate from operational logic (how records are
//! named, written and scanned) makes format evolution easier to manage.
//!
//! # Module Structure
//!
//! - `tagset_record`: one serialized TagSet per record
//! - `record_name`: tag name ↔ record filename mapping

pub mod record_name;
pub mod tagset_record;

pub use record_name::{
    parse_record_name, record_name, RecordName, RECORD_EXTENSION, TAG_RECORD_PREFIX,
    UNIVERSAL_RECORD_NAME,
};
pub use tagset_record::{
    decode_tagset, encode_tagset, RecordError, TAGSET_RECORD_HEADER_SIZE, TAGSET_RECORD_MAGIC,
    TAGSET_RECORD_VERSION,
};
