//! Physical storage layer for tagstore
//!
//! This crate owns the on-disk layout of a store and the object subtree:
//! - StorePaths: the `db/` + `files/` directory structure
//! - ShardedObjectStore: FileId → slot placement across N shard directories
//!
//! It never sees filenames or tags, so the index format can change without
//! touching physical layout.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod paths;
pub mod sharded;

pub use paths::{StorePathError, StorePaths, INDEX_DIR, OBJECT_DIR};
pub use sharded::{discover_shard_count, ShardedObjectStore};
