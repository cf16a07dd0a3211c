//! TagSets and the set algebra used to compose tag queries
//!
//! A `TagSet` maps filename → `FileId` and stands for "every file carrying
//! one tag" (or, for the universal tag, every file in the store). Queries are
//! answered by combining TagSets with the three operations below.
//!
//! All operations take one or more sets. Calling them with zero sets is a
//! programmer error and panics.
//!
//! ## Identifier rules
//!
//! - `intersection`: the identifier comes from the first set. A filename that
//!   survives the intersection but maps to different identifiers in different
//!   sets means the index is corrupt, and is reported as `Error::Integrity`.
//! - `union`: later sets overwrite earlier ones for the same filename. This
//!   is the only operation where a conflicting identifier is silently dropped.
//! - `difference`: symmetric difference folded left to right,
//!   `((S1 ∪ S2) \ (S1 ∩ S2))` then the same against S3, and so on.

use crate::error::{Error, Result};
use crate::types::FileId;
use std::collections::btree_map;
use std::collections::BTreeMap;

/// Set of (filename, identifier) pairs carrying one tag
///
/// Filenames are unique within a set. Iteration is in filename order so
/// serialized forms are deterministic; membership is the only semantic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    entries: BTreeMap<String, FileId>,
}

impl TagSet {
    /// Create an empty TagSet
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert or overwrite `filename → id`, returning the previous identifier
    pub fn insert(&mut self, filename: impl Into<String>, id: FileId) -> Option<FileId> {
        self.entries.insert(filename.into(), id)
    }

    /// Remove a filename, returning its identifier if it was present
    pub fn remove(&mut self, filename: &str) -> Option<FileId> {
        self.entries.remove(filename)
    }

    /// Identifier stored for `filename`
    pub fn get(&self, filename: &str) -> Option<FileId> {
        self.entries.get(filename).copied()
    }

    /// Whether `filename` is a member
    pub fn contains(&self, filename: &str) -> bool {
        self.entries.contains_key(filename)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in filename order
    pub fn iter(&self) -> impl Iterator<Item = (&str, FileId)> + '_ {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Iterate filenames in order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }
}

impl FromIterator<(String, FileId)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (String, FileId)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for TagSet {
    type Item = (String, FileId);
    type IntoIter = btree_map::IntoIter<String, FileId>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ============================================================================
// Algebra
// ============================================================================

/// Filenames present in every set, carrying the first set's identifiers
///
/// # Errors
/// `Error::Integrity` if a surviving filename maps to different identifiers
/// in different sets.
///
/// # Panics
/// If `sets` is empty.
pub fn intersection(sets: &[&TagSet]) -> Result<TagSet> {
    assert!(!sets.is_empty(), "intersection requires at least one set");
    let first = sets[0];

    // Drive the scan from the smallest set; the universal set is usually huge.
    let driver = sets
        .iter()
        .min_by_key(|s| s.len())
        .copied()
        .unwrap_or(first);

    let mut result = TagSet::new();
    for name in driver.names() {
        let Some(id) = first.get(name) else {
            continue;
        };
        if !sets[1..].iter().all(|set| set.contains(name)) {
            continue;
        }
        // Only surviving names are checked for divergence.
        if let Some(other) = sets[1..]
            .iter()
            .filter_map(|set| set.get(name))
            .find(|other| *other != id)
        {
            return Err(Error::integrity(format!(
                "filename '{}' maps to both {} and {}",
                name, id, other
            )));
        }
        result.insert(name, id);
    }
    Ok(result)
}

/// Filenames present in any set; later sets win on conflicting identifiers
///
/// # Panics
/// If `sets` is empty.
pub fn union(sets: &[&TagSet]) -> TagSet {
    assert!(!sets.is_empty(), "union requires at least one set");
    let mut result = TagSet::new();
    for set in sets {
        for (name, id) in set.iter() {
            result.insert(name, id);
        }
    }
    result
}

/// Symmetric difference folded left to right across all sets
///
/// # Panics
/// If `sets` is empty.
pub fn difference(sets: &[&TagSet]) -> TagSet {
    assert!(!sets.is_empty(), "difference requires at least one set");
    let mut acc = sets[0].clone();
    for &set in &sets[1..] {
        let mut next = union(&[&acc, set]);
        for name in acc.names() {
            if set.contains(name) {
                next.remove(name);
            }
        }
        acc = next;
    }
    acc
}
