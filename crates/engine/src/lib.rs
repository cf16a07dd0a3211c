//! Tag store engine
//!
//! This crate orchestrates the lower layers:
//! - TagIndex: in-memory tag → TagSet mapping with per-tag persistence
//! - TagStore: pseudo-path facade over the index and the object store
//! - TagFile: handle to an open file's content
//! - StoreConfig: shard count, durability and re-creation policies
//!
//! The engine is the only component that knows about both filenames and
//! physical slots.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod file;
pub mod index;
pub mod store;

pub use file::TagFile;
pub use index::TagIndex;
pub use store::config::{ConfigError, DurabilityMode, RecreatePolicy, StoreConfig, DEFAULT_SHARDS};
pub use store::TagStore;

pub use tagstore_core::{
    difference, intersection, union, Error, ErrorKind, FileId, Result, TagPath, TagSet,
    MAX_FILENAME_LEN, MAX_TAG_LEN, UNIVERSAL_TAG,
};
