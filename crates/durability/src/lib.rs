//! Durability layer for tagstore
//!
//! Persists the tag index as one self-checking record per tag:
//! - format: TagSet record encoding and tag ↔ record-name mapping
//! - index_store: scanning and atomically rewriting records on disk
//!
//! Per-tag records match the mutation granularity of the index: adding a
//! file to K tags rewrites K + 1 records, independent of how many tag
//! combinations exist.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod format;
pub mod index_store;

pub use format::{decode_tagset, encode_tagset, RecordError};
pub use index_store::IndexStore;
