//! tagstore - a tag-indexed file store
//!
//! Files have no directory, only tags. A pseudo-path such as
//! `/work/2024/report.txt` reads as "the file `report.txt` among those
//! tagged both `work` and `2024`".
//!
//! # Quick Start
//!
//! ```no_run
//! use std::io::{Read, Write};
//! use tagstore::{StoreConfig, TagStore};
//!
//! # fn main() -> tagstore::Result<()> {
//! let store = TagStore::create_at("/tmp/my-store", StoreConfig::default())?;
//!
//! let mut file = store.create("/work/2024/report.txt")?;
//! file.write_all(b"quarterly numbers")?;
//!
//! let mut same = store.open("/2024/report.txt")?;
//! let mut text = String::new();
//! same.read_to_string(&mut text)?;
//!
//! let work = store.lookup(&["work"])?;
//! assert!(work.contains("report.txt"));
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `tagstore-core`: identifiers, TagSets and their algebra, path parsing
//! - `tagstore-storage`: directory layout and the sharded object store
//! - `tagstore-durability`: per-tag index records
//! - `tagstore-engine`: the tag index and the [`TagStore`] facade
//!
//! Only the engine surface is re-exported here.

pub use tagstore_engine::*;
