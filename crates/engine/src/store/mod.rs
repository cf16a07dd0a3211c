//! Tag store facade
//!
//! `TagStore` is the public surface: it turns pseudo-paths into Tag Index
//! queries and registrations, and identifiers into physical slots.
//!
//! ```text
//! open("/work/2024/report")
//!   → TagPath { tags: [work, 2024], filename: report }
//!   → TagIndex::resolve   (universal ∩ work ∩ 2024, then the filename)
//!   → ShardedObjectStore::open(id)
//!   → TagFile
//! ```
//!
//! Every argument check and index lookup happens before any physical I/O,
//! so a bad path or unknown tag never touches the object subtree.
//!
//! # Durability
//!
//! With `DurabilityMode::Always` every mutating call flushes the touched
//! tags before it returns. With `DurabilityMode::Deferred` changes reach disk
//! on `persist()`, `close()`, or (best effort) when the store is dropped.

pub mod config;

use std::path::Path;
use tagstore_core::{
    validate_filename_len, validate_tag, Error, FileId, Result, TagPath, TagSet,
};
use tagstore_durability::IndexStore;
use tagstore_storage::{ShardedObjectStore, StorePaths};
use tracing::{debug, info, warn};

use crate::file::TagFile;
use crate::index::TagIndex;
use config::{DurabilityMode, RecreatePolicy, StoreConfig};

/// A tag-indexed file store rooted at one directory
///
/// `TagStore` is `Send + Sync`; share it between threads with `Arc`.
#[derive(Debug)]
pub struct TagStore {
    paths: StorePaths,
    objects: ShardedObjectStore,
    index: TagIndex,
    config: StoreConfig,
}

impl TagStore {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a new store at `root` and open it
    ///
    /// Lays out `root/db`, `root/files` and `config.shards` shard
    /// directories. `root` itself may already exist.
    ///
    /// # Errors
    /// `Error::InvalidArgument` for an invalid config, `Error::AlreadyExists`
    /// if either subtree is already present.
    pub fn create_at(root: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let paths = StorePaths::from_root(root);
        if paths.index_dir().exists() || paths.object_dir().exists() {
            return Err(Error::already_exists(format!(
                "store at {}",
                paths.root().display()
            )));
        }

        paths.create_directories(u64::from(config.shards))?;
        info!(
            target: "tagstore::store",
            root = %paths.root().display(),
            shards = config.shards,
            "Created store"
        );

        Self::open_at(paths.root(), config)
    }

    /// Open an existing store at `root`
    ///
    /// The shard count comes from the shard directories on disk, never from
    /// `config`. The whole index is loaded into memory.
    ///
    /// # Errors
    /// `Error::NotFound` if `root` is not a store, `Error::Integrity` if the
    /// index records are corrupt or disagree.
    pub fn open_at(root: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let paths = StorePaths::from_root(root);
        paths.validate()?;

        let objects = ShardedObjectStore::discover(paths.object_dir())?;
        if objects.shard_count() != u64::from(config.shards) {
            warn!(
                target: "tagstore::store",
                configured = config.shards,
                discovered = objects.shard_count(),
                "Configured shard count ignored for an existing store"
            );
        }

        let index = TagIndex::load(IndexStore::new(paths.index_dir()))?;

        info!(
            target: "tagstore::store",
            root = %paths.root().display(),
            shards = objects.shard_count(),
            files = index.file_count(),
            durability = ?config.durability,
            "Opened store"
        );

        Ok(Self {
            paths,
            objects,
            index,
            config,
        })
    }

    /// Flush pending index changes and close the store
    pub fn close(self) -> Result<()> {
        let written = self.flush()?;
        info!(
            target: "tagstore::store",
            root = %self.paths.root().display(),
            records = written,
            "Closed store"
        );
        Ok(())
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Open the file named by `path`
    ///
    /// # Errors
    /// - `Error::InvalidArgument` for a malformed path
    /// - `Error::NotFound` for an unknown tag, a filename outside the
    ///   intersection of the path's tags, or a missing physical slot
    pub fn open(&self, path: &str) -> Result<TagFile> {
        let path = TagPath::parse(path)?;
        let id = self.index.resolve(path.tags(), path.filename())?;
        let file = self.objects.open(&id)?;
        debug!(target: "tagstore::store", path = %path, %id, "Opened file");
        Ok(TagFile::new(file, path.filename(), id))
    }

    /// Create a new, empty file at `path`, tagged with every tag in it
    ///
    /// If the filename already exists the configured `RecreatePolicy`
    /// applies: `Replace` moves the name to the new file, `Reject` fails with
    /// `Error::AlreadyExists`. A replaced file's slot is deleted by the first
    /// flush that succeeds afterwards.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` for a malformed path or a filename longer
    ///   than 255 bytes
    /// - `Error::AlreadyExists` under `Reject`
    /// - `Error::Io` if the slot or the index records cannot be written. If
    ///   only the flush failed, the file stays registered in memory and a
    ///   later `persist()` retries.
    pub fn create(&self, path: &str) -> Result<TagFile> {
        let path = TagPath::parse(path)?;
        validate_filename_len(path.filename())?;

        let policy = self.config.on_recreate;
        if policy == RecreatePolicy::Reject && self.index.contains_filename(path.filename()) {
            return Err(Error::already_exists(format!("file '{}'", path.filename())));
        }

        let id = FileId::new();
        let file = self.objects.create(&id)?;

        let displaced = match self
            .index
            .register_file(path.filename(), id, path.tags(), policy)
        {
            Ok(displaced) => displaced,
            Err(e) => {
                self.discard_slot(&id);
                return Err(e);
            }
        };

        self.flush_if_always()?;

        debug!(
            target: "tagstore::store",
            path = %path,
            %id,
            shard = self.objects.shard_of(&id),
            replaced = ?displaced,
            "Created file"
        );
        Ok(TagFile::new(file, path.filename(), id))
    }

    // ========================================================================
    // Tags
    // ========================================================================

    /// Files carrying every tag in `tags`
    ///
    /// # Errors
    /// `Error::NotFound` if any tag is unknown.
    pub fn lookup<S: AsRef<str>>(&self, tags: &[S]) -> Result<TagSet> {
        self.index.lookup(tags)
    }

    /// Add `tag` to the file `id`
    pub fn add_tag(&self, id: &FileId, tag: &str) -> Result<()> {
        validate_tag(tag)?;
        self.index.add_tag(id, tag)?;
        self.flush_if_always()
    }

    /// Remove `tag` from the file `id`; the tag stays known
    pub fn remove_tag(&self, id: &FileId, tag: &str) -> Result<()> {
        validate_tag(tag)?;
        self.index.remove_tag(id, tag)?;
        self.flush_if_always()
    }

    /// Replace every tag of the file `id` with `tags`
    pub fn set_tags<S: AsRef<str>>(&self, id: &FileId, tags: &[S]) -> Result<()> {
        for tag in tags {
            validate_tag(tag.as_ref())?;
        }
        self.index.set_tags(id, tags)?;
        self.flush_if_always()
    }

    /// Tags carried by the file `id`, sorted
    pub fn tags_of(&self, id: &FileId) -> Result<Vec<String>> {
        self.index.tags_of(id)
    }

    /// Every tag the store has seen, sorted
    pub fn known_tags(&self) -> Vec<String> {
        self.index.known_tags()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Flush pending index changes; returns the number of records written
    pub fn persist(&self) -> Result<usize> {
        self.flush()
    }

    /// Number of shard directories
    pub fn shard_count(&self) -> u64 {
        self.objects.shard_count()
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    /// Configuration the store was opened with
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Underlying object store
    pub fn objects(&self) -> &ShardedObjectStore {
        &self.objects
    }

    fn flush_if_always(&self) -> Result<()> {
        if self.config.durability == DurabilityMode::Always {
            self.flush()?;
        }
        Ok(())
    }

    /// Persist the index, then delete slots it no longer refers to
    fn flush(&self) -> Result<usize> {
        let written = self.index.persist()?;
        for id in self.index.take_collectable() {
            self.discard_slot(&id);
        }
        Ok(written)
    }

    fn discard_slot(&self, id: &FileId) {
        if let Err(e) = self.objects.remove(id) {
            warn!(
                target: "tagstore::store",
                %id,
                error = %e,
                "Failed to remove unreferenced object slot"
            );
        }
    }
}

impl Drop for TagStore {
    fn drop(&mut self) {
        if !self.index.is_dirty() {
            return;
        }
        if let Err(e) = self.flush() {
            warn!(
                target: "tagstore::store",
                root = %self.paths.root().display(),
                error = %e,
                "Failed to flush tag index on drop"
            );
        }
    }
}
