//! Store directory structure
//!
//! A store is a directory with two subtrees:
//!
//! ```text
//! store/
//! ├── db/              # Index records, one per tag
//! │   ├── all.tagset
//! │   ├── tag-d29yaw.tagset
//! │   └── ...
//! └── files/           # Object subtree, one directory per shard
//!     ├── 0/
//!     │   └── 3f2a...-...-...   # slot named by the FileId
//!     ├── 1/
//!     └── ...
//! ```
//!
//! The shard count is never written down; it is rediscovered from the
//! `files/` directory on every open.

use std::path::{Path, PathBuf};

/// Name of the index subtree
pub const INDEX_DIR: &str = "db";

/// Name of the object subtree
pub const OBJECT_DIR: &str = "files";

/// Store directory paths
#[derive(Debug, Clone)]
pub struct StorePaths {
    /// Root store directory
    root: PathBuf,
}

impl StorePaths {
    /// Create paths from root directory
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        StorePaths {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root store directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the index directory
    pub fn index_dir(&self) -> PathBuf {
        self.root.join(INDEX_DIR)
    }

    /// Get the object directory
    pub fn object_dir(&self) -> PathBuf {
        self.root.join(OBJECT_DIR)
    }

    /// Get one shard directory
    pub fn shard_dir(&self, shard: u64) -> PathBuf {
        self.object_dir().join(shard.to_string())
    }

    /// Check if a store exists at this path
    ///
    /// A store exists if both subtrees are present.
    pub fn exists(&self) -> bool {
        self.index_dir().is_dir() && self.object_dir().is_dir()
    }

    /// Create the full directory structure with `shards` shard directories
    ///
    /// The root may already exist; the two subtrees must not.
    pub fn create_directories(&self, shards: u64) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir(self.index_dir())?;
        std::fs::create_dir(self.object_dir())?;
        for shard in 0..shards {
            std::fs::create_dir(self.shard_dir(shard))?;
        }
        Ok(())
    }

    /// Validate that both subtrees exist
    pub fn validate(&self) -> Result<(), StorePathError> {
        if !self.root.exists() {
            return Err(StorePathError::NotFound {
                path: self.root.clone(),
            });
        }

        if !self.index_dir().is_dir() {
            return Err(StorePathError::MissingIndexDir {
                path: self.index_dir(),
            });
        }

        if !self.object_dir().is_dir() {
            return Err(StorePathError::MissingObjectDir {
                path: self.object_dir(),
            });
        }

        Ok(())
    }
}

/// Store path validation errors
#[derive(Debug, thiserror::Error)]
pub enum StorePathError {
    /// Store not found at path
    #[error("Store not found at {path}")]
    NotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// Missing index directory
    #[error("Missing index directory at {path}")]
    MissingIndexDir {
        /// Expected index directory path
        path: PathBuf,
    },

    /// Missing object directory
    #[error("Missing object directory at {path}")]
    MissingObjectDir {
        /// Expected object directory path
        path: PathBuf,
    },
}

impl From<StorePathError> for tagstore_core::Error {
    fn from(e: StorePathError) -> Self {
        tagstore_core::Error::not_found(e.to_string())
    }
}
