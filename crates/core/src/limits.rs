//! Size limits for names
//!
//! Violations are reported as `InvalidArgument` before any side effect.
//!
//! Tags are bounded too: each tag names an index record on disk, and the
//! encoded record name (plus its temp suffix) must fit a 255-byte filename.

use crate::error::{Error, Result};

/// Maximum filename length in bytes
pub const MAX_FILENAME_LEN: usize = 255;

/// Maximum tag length in bytes
pub const MAX_TAG_LEN: usize = 180;

/// Validate a filename's length
pub fn validate_filename_len(filename: &str) -> Result<()> {
    if filename.len() > MAX_FILENAME_LEN {
        return Err(Error::invalid_argument(format!(
            "file name too long: {} bytes (max {})",
            filename.len(),
            MAX_FILENAME_LEN
        )));
    }
    Ok(())
}

/// Validate a tag's length
pub fn validate_tag_len(tag: &str) -> Result<()> {
    if tag.len() > MAX_TAG_LEN {
        return Err(Error::invalid_argument(format!(
            "tag too long: {} bytes (max {})",
            tag.len(),
            MAX_TAG_LEN
        )));
    }
    Ok(())
}
