//! Sharded object store
//!
//! Maps a `FileId` to exactly one physical slot under the object subtree.
//!
//! # Design
//!
//! - Shard = `id.shard_key() % N`, where `shard_key` is the first 8 id bytes
//!   read little-endian. Filenames and tags never influence placement.
//! - Slot = `files/<shard>/<id>` with the id in canonical hyphenated form.
//! - N = 1 + the largest numeric shard directory present. It is never
//!   stored; growing N would require moving every object and is unsupported.
//!
//! Identifiers are unique, so no cross-identifier locking is needed. Two
//! creates into the same shard directory rely on the filesystem's own
//! directory-level safety.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tagstore_core::{Error, FileId, Result};
use tracing::{debug, warn};

/// Identifier → physical slot mapping over N shard directories
#[derive(Debug, Clone)]
pub struct ShardedObjectStore {
    /// Object subtree root
    dir: PathBuf,
    /// Number of shards, fixed for the store's lifetime
    shard_count: u64,
}

impl ShardedObjectStore {
    /// Open the object subtree, discovering the shard count from disk
    ///
    /// # Errors
    /// `Error::Io` if the directory cannot be read, `Error::Integrity` if it
    /// contains no shard directories.
    pub fn discover(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let shard_count = discover_shard_count(&dir)?;
        if shard_count == 0 {
            return Err(Error::integrity(format!(
                "no shard directories under {}",
                dir.display()
            )));
        }
        Ok(Self { dir, shard_count })
    }

    /// Number of shards
    pub fn shard_count(&self) -> u64 {
        self.shard_count
    }

    /// Shard that holds `id`
    pub fn shard_of(&self, id: &FileId) -> u64 {
        id.shard_key() % self.shard_count
    }

    /// Physical location of `id`'s slot
    pub fn slot_path(&self, id: &FileId) -> PathBuf {
        self.dir
            .join(self.shard_of(id).to_string())
            .join(id.to_string())
    }

    /// Whether a slot exists for `id`
    pub fn exists(&self, id: &FileId) -> bool {
        self.slot_path(id).is_file()
    }

    /// Create a fresh slot for `id`, opened for reading and writing
    ///
    /// # Errors
    /// `Error::AlreadyExists` if the slot is already there. Identifiers are
    /// never reused, so this means the generator produced a duplicate.
    pub fn create(&self, id: &FileId) -> Result<File> {
        let path = self.slot_path(id);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => {
                    Error::already_exists(format!("object slot {}", id))
                }
                _ => Error::Io(e),
            })?;
        debug!(target: "tagstore::objects", %id, shard = self.shard_of(id), "Created object slot");
        Ok(file)
    }

    /// Open the existing slot for `id`, for reading and writing
    ///
    /// # Errors
    /// `Error::NotFound` if no slot exists.
    pub fn open(&self, id: &FileId) -> Result<File> {
        let path = self.slot_path(id);
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => Error::not_found(format!("object slot {}", id)),
                _ => Error::Io(e),
            })
    }

    /// Delete the slot for `id`
    ///
    /// # Errors
    /// `Error::NotFound` if no slot exists.
    pub fn remove(&self, id: &FileId) -> Result<()> {
        std::fs::remove_file(self.slot_path(id)).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::not_found(format!("object slot {}", id)),
            _ => Error::Io(e),
        })?;
        debug!(target: "tagstore::objects", %id, "Removed object slot");
        Ok(())
    }
}

/// Scan `dir` for numeric shard directories and return `1 + max`
///
/// Entries that are not canonical decimal names ("notes", "007", "+3")
/// are ignored. Gaps are tolerated but logged, since a
/// missing shard directory will fail every create that hashes into it.
pub fn discover_shard_count(dir: &Path) -> Result<u64> {
    let mut present = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(n) = entry
            .file_name()
            .to_str()
            .and_then(|s| s.parse::<u32>().ok().filter(|n| n.to_string() == s))
        {
            present.push(u64::from(n));
        }
    }

    let count = present.iter().max().map_or(0, |max| max + 1);
    if count as usize != present.len() {
        warn!(
            target: "tagstore::objects",
            dir = %dir.display(),
            shards = count,
            present = present.len(),
            "Shard directories are not contiguous"
        );
    }
    Ok(count)
}
