//! Tag name ↔ record filename mapping
//!
//! Tag names are arbitrary strings, so they are base64url-encoded (no
//! padding) into the record filename. The universal tag gets a fixed
//! sentinel name that no encoded tag can produce:
//!
//! ```text
//! ""        → all.tagset
//! "work"    → tag-d29yaw.tagset
//! ```
//!
//! `*.tmp` files are in-flight writes from an interrupted flush and are
//! skipped by the loader.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use tagstore_core::{validate_tag, Error, Result, UNIVERSAL_TAG};

/// Extension shared by every record
pub const RECORD_EXTENSION: &str = ".tagset";

/// Prefix of a non-universal tag record
pub const TAG_RECORD_PREFIX: &str = "tag-";

/// Record filename of the universal tag
pub const UNIVERSAL_RECORD_NAME: &str = "all.tagset";

/// Extension of an unfinished record write
pub const TEMP_EXTENSION: &str = ".tmp";

/// What a directory entry in the index subtree is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordName {
    /// A record for this tag
    Tag(String),
    /// Leftover temp file from an interrupted write
    Temp,
}

/// Record filename for `tag`
pub fn record_name(tag: &str) -> String {
    if tag == UNIVERSAL_TAG {
        return UNIVERSAL_RECORD_NAME.to_string();
    }
    format!(
        "{}{}{}",
        TAG_RECORD_PREFIX,
        URL_SAFE_NO_PAD.encode(tag.as_bytes()),
        RECORD_EXTENSION
    )
}

/// Classify an index directory entry
///
/// # Errors
/// `Error::Integrity` for a name that is neither a record nor a temp file,
/// or whose encoded tag does not decode to a valid tag.
pub fn parse_record_name(name: &str) -> Result<RecordName> {
    if name.ends_with(TEMP_EXTENSION) {
        return Ok(RecordName::Temp);
    }
    if name == UNIVERSAL_RECORD_NAME {
        return Ok(RecordName::Tag(UNIVERSAL_TAG.to_string()));
    }

    let malformed = || Error::integrity(format!("malformed index record name '{}'", name));

    let encoded = name
        .strip_prefix(TAG_RECORD_PREFIX)
        .and_then(|rest| rest.strip_suffix(RECORD_EXTENSION))
        .ok_or_else(malformed)?;
    let bytes = URL_SAFE_NO_PAD.decode(encoded).map_err(|_| malformed())?;
    let tag = String::from_utf8(bytes).map_err(|_| malformed())?;
    validate_tag(&tag).map_err(|_| malformed())?;
    Ok(RecordName::Tag(tag))
}
