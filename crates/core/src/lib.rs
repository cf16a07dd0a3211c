//! Core types for tagstore
//!
//! This crate defines the foundational types used throughout the system:
//! - FileId: Immutable 128-bit file identifier and shard selector
//! - TagSet: filename → FileId set for one tag, plus the query algebra
//! - TagPath: Parsed `/tag/.../filename` pseudo-path
//! - Limits: Filename and tag length bounds
//! - Error: Error taxonomy shared by every layer

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod path;
pub mod tagset;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use limits::{validate_filename_len, validate_tag_len, MAX_FILENAME_LEN, MAX_TAG_LEN};
pub use path::{validate_tag, TagPath};
pub use tagset::{difference, intersection, union, TagSet};
pub use types::FileId;

/// Reserved name of the universal tag ("every file in the store")
pub const UNIVERSAL_TAG: &str = "";
