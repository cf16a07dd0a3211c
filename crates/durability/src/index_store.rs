//! Index record directory
//!
//! The index subtree holds one record per known tag. `IndexStore` scans it
//! at open and rewrites individual records on flush.
//!
//! Each record is written with write-temp + fsync + rename, followed by an
//! fsync of the directory, so a crash leaves either the old or the new
//! record in place, never a torn one.

use crate::format::{decode_tagset, encode_tagset, parse_record_name, record_name, RecordName};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tagstore_core::{Error, Result, TagSet};
use tracing::{debug, warn};

/// Reader/writer for the per-tag records in the index subtree
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    /// Use `dir` as the index subtree
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Index subtree path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `tag`
    pub fn record_path(&self, tag: &str) -> PathBuf {
        self.dir.join(record_name(tag))
    }

    /// Read every record in the directory
    ///
    /// Zero records is a valid (fresh) store. Temp files are skipped.
    ///
    /// # Errors
    /// `Error::Integrity` for a malformed record name or a corrupt payload,
    /// `Error::Io` if the directory or a record cannot be read.
    pub fn load_all(&self) -> Result<Vec<(String, TagSet)>> {
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let name = file_name.to_str().ok_or_else(|| {
                Error::integrity(format!(
                    "index record name {:?} is not valid UTF-8",
                    file_name
                ))
            })?;

            match parse_record_name(name)? {
                RecordName::Temp => {
                    warn!(
                        target: "tagstore::durability",
                        record = name,
                        "Skipping leftover temp record from an interrupted flush"
                    );
                }
                RecordName::Tag(tag) => {
                    let data = std::fs::read(entry.path())?;
                    let set = decode_tagset(&data).map_err(|e| {
                        Error::integrity(format!("index record '{}': {}", name, e))
                    })?;
                    debug!(target: "tagstore::durability", record = name, entries = set.len(), "Loaded index record");
                    records.push((tag, set));
                }
            }
        }
        Ok(records)
    }

    /// Durably replace the record for `tag` with `set`
    pub fn write(&self, tag: &str, set: &TagSet) -> Result<()> {
        let final_path = self.record_path(tag);
        let temp_path = temp_path_for(&final_path);

        let bytes = encode_tagset(set);

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&temp_path, &final_path)?;
        debug!(
            target: "tagstore::durability",
            path = %final_path.display(),
            entries = set.len(),
            bytes = bytes.len(),
            "Wrote index record"
        );
        Ok(())
    }

    /// Fsync the index directory so completed renames survive a crash
    pub fn sync_dir(&self) -> Result<()> {
        File::open(&self.dir)?.sync_all()?;
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}
