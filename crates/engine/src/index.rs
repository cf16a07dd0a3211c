//! Tag index
//!
//! The authoritative tag → TagSet mapping, loaded fully into memory when the
//! store opens and the single source of truth while it stays open.
//!
//! # Invariants
//!
//! - The universal set (tag `""`) always exists.
//! - Every entry of every other set is present in the universal set with the
//!   same identifier.
//! - An identifier belongs to at most one filename.
//! - TagSets are created lazily and never deleted; removing a tag's last
//!   file leaves an empty set, so the tag keeps resolving.
//!
//! # Concurrency
//!
//! All state lives behind one `RwLock`. Every mutation, however many sets
//! it touches, runs under a single write-lock acquisition, so readers never
//! see half of a multi-set update. Flushes are serialized by a separate
//! mutex; each one takes its snapshot under a brief write lock and does the
//! I/O outside it.
//!
//! # Persistence
//!
//! One record per tag. Only tags changed since the last successful flush
//! are rewritten, in three phases separated by a directory fsync:
//!
//! 1. Tags that lost entries, trimmed to entries the on-disk universal set
//!    still holds.
//! 2. The universal set.
//! 3. Tags that gained entries, at their full in-memory contents.
//!
//! Every record on disk is a subset of the on-disk universal set after each
//! single rename, so a crash anywhere in a flush leaves a loadable index.
//! What a crash can lose is tag associations made since the last flush.
//!
//! Identifiers displaced by `register_file` become collectable only after
//! the flush that drops them from disk succeeds. A failed flush re-marks its
//! tags dirty and keeps its displaced identifiers pending; memory stays
//! authoritative and the caller may retry.

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap, HashSet};
use tagstore_core::{intersection, Error, FileId, Result, TagSet, UNIVERSAL_TAG};
use tagstore_durability::IndexStore;
use tracing::{debug, info};

use crate::store::config::RecreatePolicy;

#[derive(Debug, Default)]
struct IndexState {
    /// tag → set; always holds the universal tag
    sets: HashMap<String, TagSet>,
    /// reverse map over the universal set
    by_id: HashMap<FileId, String>,
    /// tags changed since the last successful flush
    dirty: HashSet<String>,
    /// dirty tags that lost or rebound an entry
    shrunk: HashSet<String>,
    /// displaced identifiers not yet dropped from disk
    displaced: Vec<FileId>,
}

/// Empty fallback for `IndexState::universal`
static NO_FILES: TagSet = TagSet::new();

/// Dirty state taken by one flush
struct FlushSnapshot {
    dirty: HashSet<String>,
    shrunk: HashSet<String>,
    displaced: Vec<FileId>,
    universal: Option<TagSet>,
    tags: Vec<(String, TagSet)>,
}

/// Ordered record writes of one flush; a directory fsync follows each phase
type FlushPlan = Vec<Vec<(String, TagSet)>>;

impl IndexState {
    fn universal(&self) -> &TagSet {
        // Present from construction onward.
        self.sets.get(UNIVERSAL_TAG).unwrap_or(&NO_FILES)
    }

    fn insert(&mut self, tag: &str, filename: &str, id: FileId) {
        let set = self.sets.entry(tag.to_string()).or_default();
        match set.insert(filename, id) {
            Some(old) if old == id => {}
            Some(_) => {
                self.dirty.insert(tag.to_string());
                self.shrunk.insert(tag.to_string());
            }
            None => {
                self.dirty.insert(tag.to_string());
            }
        }
    }

    /// Remove `filename` from `tag` if it maps to `id` there
    fn remove(&mut self, tag: &str, filename: &str, id: FileId) -> bool {
        let Some(set) = self.sets.get_mut(tag) else {
            return false;
        };
        if set.get(filename) != Some(id) {
            return false;
        }
        set.remove(filename);
        self.dirty.insert(tag.to_string());
        self.shrunk.insert(tag.to_string());
        true
    }

    /// Remove every trace of `id` from every set
    fn detach(&mut self, filename: &str, id: FileId) {
        let tags: Vec<String> = self
            .sets
            .iter()
            .filter(|(_, set)| set.get(filename) == Some(id))
            .map(|(tag, _)| tag.clone())
            .collect();
        for tag in tags {
            self.remove(&tag, filename, id);
        }
        self.by_id.remove(&id);
    }

    fn filename_of(&self, id: &FileId) -> Result<&str> {
        self.by_id
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| Error::not_found(format!("file {}", id)))
    }

    fn tags_of(&self, filename: &str, id: FileId) -> Vec<String> {
        let tags: BTreeSet<&str> = self
            .sets
            .iter()
            .filter(|(tag, set)| tag.as_str() != UNIVERSAL_TAG && set.get(filename) == Some(id))
            .map(|(tag, _)| tag.as_str())
            .collect();
        tags.into_iter().map(str::to_string).collect()
    }

    /// Check every invariant; used on load
    fn verify(&mut self) -> Result<()> {
        self.sets.entry(UNIVERSAL_TAG.to_string()).or_default();

        let mut by_id = HashMap::with_capacity(self.universal().len());
        for (name, id) in self.universal().iter() {
            if let Some(other) = by_id.insert(id, name.to_string()) {
                return Err(Error::integrity(format!(
                    "identifier {} is claimed by both '{}' and '{}'",
                    id, other, name
                )));
            }
        }

        let universal = self.universal();
        for (tag, set) in &self.sets {
            if tag == UNIVERSAL_TAG {
                continue;
            }
            for (name, id) in set.iter() {
                match universal.get(name) {
                    Some(u) if u == id => {}
                    Some(u) => {
                        return Err(Error::integrity(format!(
                            "tag '{}' maps '{}' to {} but the universal set has {}",
                            tag, name, id, u
                        )));
                    }
                    None => {
                        return Err(Error::integrity(format!(
                            "tag '{}' lists '{}' which the universal set does not",
                            tag, name
                        )));
                    }
                }
            }
        }

        self.by_id = by_id;
        Ok(())
    }
}

/// In-memory tag index backed by per-tag durable records
#[derive(Debug)]
pub struct TagIndex {
    state: RwLock<IndexState>,
    records: IndexStore,
    /// Universal set as last written to disk; held for the whole flush
    flushed: Mutex<TagSet>,
    /// Displaced identifiers whose removal is durable
    collectable: Mutex<Vec<FileId>>,
}

impl TagIndex {
    /// Rebuild the index from every record in `records`
    ///
    /// A directory with no records yields an empty index.
    ///
    /// # Errors
    /// `Error::Integrity` for a malformed record name, a corrupt record, or
    /// records that disagree with each other.
    pub fn load(records: IndexStore) -> Result<Self> {
        let mut state = IndexState::default();
        for (tag, set) in records.load_all()? {
            state.sets.insert(tag, set);
        }
        state.verify()?;

        info!(
            target: "tagstore::index",
            dir = %records.dir().display(),
            tags = state.sets.len() - 1,
            files = state.universal().len(),
            "Tag index loaded"
        );

        let flushed = state.universal().clone();
        Ok(Self {
            state: RwLock::new(state),
            records,
            flushed: Mutex::new(flushed),
            collectable: Mutex::new(Vec::new()),
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Files carrying every tag in `tags`
    ///
    /// The result is the intersection of the universal set with each
    /// requested tag's set. An empty-but-known tag is a hit with an empty
    /// result.
    ///
    /// # Errors
    /// `Error::NotFound` if any tag has never been seen.
    pub fn lookup<S: AsRef<str>>(&self, tags: &[S]) -> Result<TagSet> {
        let state = self.state.read();
        let sets = collect_sets(&state, tags)?;
        intersection(&sets)
    }

    /// Identifier of `filename` among the files carrying every tag in `tags`
    ///
    /// Same result as `lookup(tags).get(filename)`, computed by intersecting
    /// only the one candidate entry.
    ///
    /// # Errors
    /// `Error::NotFound` for an unknown tag (checked first) or a filename
    /// outside the intersection.
    pub fn resolve<S: AsRef<str>>(&self, tags: &[S], filename: &str) -> Result<FileId> {
        let state = self.state.read();
        let mut candidate = TagSet::new();
        let mut sets = collect_sets(&state, tags)?;

        if let Some(id) = state.universal().get(filename) {
            candidate.insert(filename, id);
        }
        sets[0] = &candidate;

        intersection(&sets)?
            .get(filename)
            .ok_or_else(|| Error::not_found(format!("file '{}'", filename)))
    }

    /// Whether any file is named `filename`
    pub fn contains_filename(&self, filename: &str) -> bool {
        self.state.read().universal().contains(filename)
    }

    /// Filename registered for `id`
    pub fn filename_of(&self, id: &FileId) -> Result<String> {
        self.state.read().filename_of(id).map(str::to_string)
    }

    /// Non-universal tags carried by `id`, sorted
    pub fn tags_of(&self, id: &FileId) -> Result<Vec<String>> {
        let state = self.state.read();
        let filename = state.filename_of(id)?;
        Ok(state.tags_of(filename, *id))
    }

    /// Every non-universal tag ever seen, sorted
    pub fn known_tags(&self) -> Vec<String> {
        let state = self.state.read();
        let mut tags: Vec<String> = state
            .sets
            .keys()
            .filter(|t| t.as_str() != UNIVERSAL_TAG)
            .cloned()
            .collect();
        tags.sort();
        tags
    }

    /// Number of files in the universal set
    pub fn file_count(&self) -> usize {
        self.state.read().universal().len()
    }

    /// Every (tag, filename, identifier) triple, sorted
    ///
    /// The universal set is reported under the empty tag.
    pub fn triples(&self) -> Vec<(String, String, FileId)> {
        let state = self.state.read();
        let mut out: Vec<(String, String, FileId)> = state
            .sets
            .iter()
            .flat_map(|(tag, set)| {
                set.iter()
                    .map(move |(name, id)| (tag.clone(), name.to_string(), id))
            })
            .collect();
        out.sort();
        out
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Register `filename → id` in the universal set and in each tag's set
    ///
    /// Tag sets are created on first use. Re-registering the same
    /// (filename, id, tag) triple changes nothing.
    ///
    /// If `filename` already belongs to a different identifier, `policy`
    /// decides: `Replace` detaches the old identifier from every set and
    /// returns it, `Reject` fails. A replaced identifier is handed out again
    /// by `take_collectable` once a flush has dropped it from disk.
    ///
    /// # Errors
    /// `Error::AlreadyExists` under `Reject`, or if `id` is already
    /// registered under another filename.
    pub fn register_file<S: AsRef<str>>(
        &self,
        filename: &str,
        id: FileId,
        tags: &[S],
        policy: RecreatePolicy,
    ) -> Result<Option<FileId>> {
        let mut state = self.state.write();

        if let Some(existing) = state.by_id.get(&id) {
            if existing != filename {
                return Err(Error::already_exists(format!(
                    "identifier {} already names '{}'",
                    id, existing
                )));
            }
        }

        let mut displaced = None;
        if let Some(old) = state.universal().get(filename) {
            if old != id {
                match policy {
                    RecreatePolicy::Reject => {
                        return Err(Error::already_exists(format!("file '{}'", filename)));
                    }
                    RecreatePolicy::Replace => {
                        state.detach(filename, old);
                        state.displaced.push(old);
                        displaced = Some(old);
                    }
                }
            }
        }

        state.insert(UNIVERSAL_TAG, filename, id);
        for tag in tags {
            state.insert(tag.as_ref(), filename, id);
        }
        state.by_id.insert(id, filename.to_string());

        debug!(
            target: "tagstore::index",
            filename,
            %id,
            tags = tags.len(),
            replaced = ?displaced,
            "Registered file"
        );
        Ok(displaced)
    }

    /// Add `tag` to the file `id`; idempotent
    ///
    /// # Errors
    /// `Error::NotFound` if `id` is unknown, `Error::InvalidArgument` for the
    /// universal tag.
    pub fn add_tag(&self, id: &FileId, tag: &str) -> Result<()> {
        reject_universal(tag)?;
        let mut state = self.state.write();
        let filename = state.filename_of(id)?.to_string();
        state.insert(tag, &filename, *id);
        Ok(())
    }

    /// Remove `tag` from the file `id`
    ///
    /// The universal set is never touched and the tag's set survives even if
    /// it becomes empty. Removing a tag the file does not carry is a no-op.
    ///
    /// # Errors
    /// `Error::NotFound` if `id` or `tag` is unknown, `Error::InvalidArgument`
    /// for the universal tag.
    pub fn remove_tag(&self, id: &FileId, tag: &str) -> Result<()> {
        reject_universal(tag)?;
        let mut state = self.state.write();
        let filename = state.filename_of(id)?.to_string();
        if !state.sets.contains_key(tag) {
            return Err(Error::not_found(format!("tag '{}'", tag)));
        }
        state.remove(tag, &filename, *id);
        Ok(())
    }

    /// Replace every non-universal tag of `id` with `tags`, atomically
    pub fn set_tags<S: AsRef<str>>(&self, id: &FileId, tags: &[S]) -> Result<()> {
        for tag in tags {
            reject_universal(tag.as_ref())?;
        }
        let mut state = self.state.write();
        let filename = state.filename_of(id)?.to_string();

        let wanted: HashSet<&str> = tags.iter().map(AsRef::as_ref).collect();
        for current in state.tags_of(&filename, *id) {
            if !wanted.contains(current.as_str()) {
                state.remove(&current, &filename, *id);
            }
        }
        for tag in tags {
            state.insert(tag.as_ref(), &filename, *id);
        }
        Ok(())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Whether any tag has unflushed changes
    pub fn is_dirty(&self) -> bool {
        !self.state.read().dirty.is_empty()
    }

    /// Flush every changed tag's record; returns how many tags were flushed
    pub fn persist(&self) -> Result<usize> {
        let mut flushed = self.flushed.lock();

        let snapshot = self.take_snapshot();
        if snapshot.dirty.is_empty() {
            self.collectable.lock().extend(snapshot.displaced);
            return Ok(0);
        }

        let plan = plan_flush(&flushed, snapshot.universal, snapshot.tags, &snapshot.shrunk);
        if let Err(e) = self.write_plan(&plan) {
            let mut state = self.state.write();
            state.dirty.extend(snapshot.dirty);
            state.shrunk.extend(snapshot.shrunk);
            state.displaced.extend(snapshot.displaced);
            return Err(e);
        }

        if let Some((_, universal)) = plan
            .into_iter()
            .flatten()
            .find(|(tag, _)| tag == UNIVERSAL_TAG)
        {
            *flushed = universal;
        }
        self.collectable.lock().extend(snapshot.displaced);

        debug!(target: "tagstore::index", tags = snapshot.dirty.len(), "Index flushed");
        Ok(snapshot.dirty.len())
    }

    /// Drain identifiers whose slots nothing on disk or in memory refers to
    pub fn take_collectable(&self) -> Vec<FileId> {
        std::mem::take(&mut *self.collectable.lock())
    }

    fn take_snapshot(&self) -> FlushSnapshot {
        let mut state = self.state.write();
        let dirty = std::mem::take(&mut state.dirty);
        let shrunk = std::mem::take(&mut state.shrunk);
        let displaced = std::mem::take(&mut state.displaced);

        let universal = if dirty.contains(UNIVERSAL_TAG) {
            Some(state.universal().clone())
        } else {
            None
        };
        let mut tags: Vec<(String, TagSet)> = dirty
            .iter()
            .filter(|tag| tag.as_str() != UNIVERSAL_TAG)
            .filter_map(|tag| state.sets.get(tag).map(|set| (tag.clone(), set.clone())))
            .collect();
        tags.sort_by(|a, b| a.0.cmp(&b.0));

        FlushSnapshot {
            dirty,
            shrunk,
            displaced,
            universal,
            tags,
        }
    }

    fn write_plan(&self, plan: &FlushPlan) -> Result<()> {
        for phase in plan {
            for (tag, set) in phase {
                self.records.write(tag, set)?;
            }
            self.records.sync_dir()?;
        }
        Ok(())
    }
}

/// Order the record writes of one flush
///
/// `flushed` is the universal set currently on disk. Tags in `shrunk` go
/// first, trimmed to entries `flushed` still holds; if trimming removed
/// anything they are written again, in full, after the universal set.
fn plan_flush(
    flushed: &TagSet,
    universal: Option<TagSet>,
    tags: Vec<(String, TagSet)>,
    shrunk: &HashSet<String>,
) -> FlushPlan {
    let mut before = Vec::new();
    let mut after = Vec::new();

    for (tag, set) in tags {
        if !shrunk.contains(&tag) {
            after.push((tag, set));
            continue;
        }
        let trimmed: TagSet = set
            .iter()
            .filter(|(name, id)| flushed.get(name) == Some(*id))
            .map(|(name, id)| (name.to_string(), id))
            .collect();
        if trimmed == set {
            before.push((tag, set));
        } else {
            before.push((tag.clone(), trimmed));
            after.push((tag, set));
        }
    }

    let mut plan = Vec::with_capacity(3);
    if !before.is_empty() {
        plan.push(before);
    }
    if let Some(universal) = universal {
        plan.push(vec![(UNIVERSAL_TAG.to_string(), universal)]);
    }
    if !after.is_empty() {
        plan.push(after);
    }
    plan
}

fn reject_universal(tag: &str) -> Result<()> {
    if tag == UNIVERSAL_TAG {
        return Err(Error::invalid_argument(
            "the universal tag cannot be added or removed",
        ));
    }
    Ok(())
}

/// Universal set followed by the set of every requested tag
fn collect_sets<'a, S: AsRef<str>>(state: &'a IndexState, tags: &[S]) -> Result<Vec<&'a TagSet>> {
    let mut sets = Vec::with_capacity(tags.len() + 1);
    sets.push(state.universal());
    for tag in tags {
        let tag = tag.as_ref();
        let set = state
            .sets
            .get(tag)
            .ok_or_else(|| Error::not_found(format!("tag '{}'", tag)))?;
        sets.push(set);
    }
    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn empty_index() -> (TempDir, TagIndex) {
        let dir = TempDir::new().unwrap();
        let index = TagIndex::load(IndexStore::new(dir.path())).unwrap();
        (dir, index)
    }

    fn register(index: &TagIndex, name: &str, tags: &[&str]) -> FileId {
        let id = FileId::new();
        index
            .register_file(name, id, tags, RecreatePolicy::Replace)
            .unwrap();
        id
    }

    // ========================================
    // Load
    // ========================================

    #[test]
    fn test_load_fresh_directory() {
        let (_dir, index) = empty_index();
        assert_eq!(index.file_count(), 0);
        assert!(index.known_tags().is_empty());
        assert!(!index.is_dirty());
        assert!(index.lookup::<&str>(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_load_rejects_tag_entry_missing_from_universal() {
        let dir = TempDir::new().unwrap();
        let records = IndexStore::new(dir.path());
        let mut work = TagSet::new();
        work.insert("orphan", FileId::new());
        records.write("work", &work).unwrap();

        let err = TagIndex::load(records).unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }

    #[test]
    fn test_load_rejects_divergent_identifier() {
        let dir = TempDir::new().unwrap();
        let records = IndexStore::new(dir.path());
        let mut all = TagSet::new();
        all.insert("f", FileId::new());
        let mut work = TagSet::new();
        work.insert("f", FileId::new());
        records.write("", &all).unwrap();
        records.write("work", &work).unwrap();

        let err = TagIndex::load(records).unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }

    #[test]
    fn test_load_rejects_shared_identifier() {
        let dir = TempDir::new().unwrap();
        let records = IndexStore::new(dir.path());
        let id = FileId::new();
        let mut all = TagSet::new();
        all.insert("a", id);
        all.insert("b", id);
        records.write("", &all).unwrap();

        let err = TagIndex::load(records).unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }

    // ========================================
    // Lookup
    // ========================================

    #[test]
    fn test_lookup_intersects_tags() {
        let (_dir, index) = empty_index();
        let a = register(&index, "a", &["x", "y"]);
        let _b = register(&index, "b", &["x"]);
        let _c = register(&index, "c", &[]);

        let result = index.lookup(&["x", "y"]).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.get("a"), Some(a));

        assert_eq!(index.lookup(&["x"]).unwrap().len(), 2);
        assert_eq!(index.lookup::<&str>(&[]).unwrap().len(), 3);
    }

    #[test]
    fn test_lookup_unknown_tag_is_not_found() {
        let (_dir, index) = empty_index();
        register(&index, "a", &["x"]);
        let err = index.lookup(&["x", "never"]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_lookup_empty_but_known_tag_is_hit() {
        let (_dir, index) = empty_index();
        let id = register(&index, "a", &["x"]);
        index.remove_tag(&id, "x").unwrap();

        let result = index.lookup(&["x"]).unwrap();
        assert!(result.is_empty());
        assert_eq!(index.known_tags(), vec!["x".to_string()]);
    }

    #[test]
    fn test_resolve() {
        let (_dir, index) = empty_index();
        let id = register(&index, "a", &["x", "y"]);
        register(&index, "b", &["y"]);

        assert_eq!(index.resolve(&["x"], "a").unwrap(), id);
        assert_eq!(index.resolve(&["y", "x"], "a").unwrap(), id);
        assert_eq!(index.resolve::<&str>(&[], "a").unwrap(), id);
        assert!(index.resolve(&["x"], "b").unwrap_err().is_not_found());
        assert!(index.resolve(&["x"], "zzz").unwrap_err().is_not_found());
        assert!(index.resolve(&["nope"], "a").unwrap_err().is_not_found());
    }

    // ========================================
    // Register
    // ========================================

    #[test]
    fn test_register_is_idempotent() {
        let (_dir, index) = empty_index();
        let id = FileId::new();
        index
            .register_file("a", id, &["x"], RecreatePolicy::Reject)
            .unwrap();
        index.persist().unwrap();

        let again = index
            .register_file("a", id, &["x"], RecreatePolicy::Reject)
            .unwrap();
        assert_eq!(again, None);
        assert!(!index.is_dirty());
        assert_eq!(index.triples().len(), 2);
    }

    #[test]
    fn test_register_replace_detaches_old_identifier() {
        let (_dir, index) = empty_index();
        let old = register(&index, "report", &["work"]);
        let new = FileId::new();
        let displaced = index
            .register_file("report", new, &["home"], RecreatePolicy::Replace)
            .unwrap();

        assert_eq!(displaced, Some(old));
        assert_eq!(index.resolve(&["home"], "report").unwrap(), new);
        assert!(index.lookup(&["work"]).unwrap().is_empty());
        assert!(index.resolve(&["work"], "report").unwrap_err().is_not_found());
        assert!(index.filename_of(&old).unwrap_err().is_not_found());
    }

    #[test]
    fn test_register_reject_leaves_state_untouched() {
        let (_dir, index) = empty_index();
        let old = register(&index, "report", &["work"]);
        let before = index.triples();

        let err = index
            .register_file("report", FileId::new(), &["home"], RecreatePolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert_eq!(index.triples(), before);
        assert_eq!(index.resolve(&["work"], "report").unwrap(), old);
    }

    #[test]
    fn test_register_rejects_reused_identifier() {
        let (_dir, index) = empty_index();
        let id = register(&index, "a", &[]);
        let err = index
            .register_file("b", id, &[] as &[&str], RecreatePolicy::Replace)
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    // ========================================
    // Tag mutation
    // ========================================

    #[test]
    fn test_add_and_remove_tag() {
        let (_dir, index) = empty_index();
        let id = register(&index, "a", &["x"]);

        index.add_tag(&id, "y").unwrap();
        index.add_tag(&id, "y").unwrap();
        assert_eq!(index.tags_of(&id).unwrap(), vec!["x", "y"]);

        index.remove_tag(&id, "x").unwrap();
        assert_eq!(index.tags_of(&id).unwrap(), vec!["y"]);
        // still in the universal set
        assert_eq!(index.resolve::<&str>(&[], "a").unwrap(), id);
        // removing again is a no-op
        index.remove_tag(&id, "x").unwrap();
    }

    #[test]
    fn test_tag_mutation_errors() {
        let (_dir, index) = empty_index();
        let id = register(&index, "a", &["x"]);

        assert!(index.remove_tag(&id, "never").unwrap_err().is_not_found());
        assert!(index.add_tag(&FileId::new(), "x").unwrap_err().is_not_found());
        assert!(matches!(
            index.remove_tag(&id, ""),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            index.add_tag(&id, ""),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_set_tags() {
        let (_dir, index) = empty_index();
        let id = register(&index, "a", &["x", "y"]);

        index.set_tags(&id, &["y", "z"]).unwrap();
        assert_eq!(index.tags_of(&id).unwrap(), vec!["y", "z"]);
        assert!(index.lookup(&["x"]).unwrap().is_empty());

        index.set_tags::<&str>(&id, &[]).unwrap();
        assert!(index.tags_of(&id).unwrap().is_empty());
        assert_eq!(index.file_count(), 1);
    }

    // ========================================
    // Persistence
    // ========================================

    #[test]
    fn test_persist_roundtrip() {
        let dir = TempDir::new().unwrap();
        let index = TagIndex::load(IndexStore::new(dir.path())).unwrap();
        register(&index, "a", &["x", "y"]);
        register(&index, "b", &["y"]);
        let id = register(&index, "c", &["z"]);
        index.remove_tag(&id, "z").unwrap();

        assert_eq!(index.persist().unwrap(), 4);
        assert_eq!(index.persist().unwrap(), 0);

        let reloaded = TagIndex::load(IndexStore::new(dir.path())).unwrap();
        assert_eq!(reloaded.triples(), index.triples());
        assert_eq!(reloaded.known_tags(), vec!["x", "y", "z"]);
        assert!(reloaded.lookup(&["z"]).unwrap().is_empty());
    }

    #[test]
    fn test_persist_writes_only_dirty_tags() {
        let (_dir, index) = empty_index();
        let id = register(&index, "a", &["x", "y"]);
        index.persist().unwrap();

        index.add_tag(&id, "z").unwrap();
        assert_eq!(index.persist().unwrap(), 1);
    }

    #[test]
    fn test_failed_persist_keeps_memory_and_retries() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("db");
        std::fs::create_dir(&db).unwrap();
        let index = TagIndex::load(IndexStore::new(&db)).unwrap();
        register(&index, "a", &["x"]);

        std::fs::remove_dir(&db).unwrap();
        assert!(index.persist().is_err());
        assert!(index.is_dirty());
        assert_eq!(index.file_count(), 1);

        std::fs::create_dir(&db).unwrap();
        assert_eq!(index.persist().unwrap(), 2);
        assert!(!index.is_dirty());
    }

    // ========================================
    // Crash ordering
    // ========================================

    /// Load `base` records overlaid with `writes`, in order, from a fresh dir
    fn load_overlay<'a>(
        base: &'a [(String, TagSet)],
        writes: impl IntoIterator<Item = &'a (String, TagSet)>,
    ) -> Result<Vec<(String, String, FileId)>> {
        let dir = TempDir::new().unwrap();
        let records = IndexStore::new(dir.path());
        for (tag, set) in base.iter().chain(writes) {
            records.write(tag, set).unwrap();
        }
        TagIndex::load(records).map(|index| index.triples())
    }

    /// Records of a pending flush, in the order `persist` would write them
    fn pending_plan(index: &TagIndex) -> FlushPlan {
        let flushed = index.flushed.lock();
        let snapshot = index.take_snapshot();
        plan_flush(&flushed, snapshot.universal, snapshot.tags, &snapshot.shrunk)
    }

    #[test]
    fn test_every_crash_point_of_replace_flush_loads() {
        let dir = TempDir::new().unwrap();
        let index = TagIndex::load(IndexStore::new(dir.path())).unwrap();
        register(&index, "report", &["work", "shared"]);
        register(&index, "other", &["work"]);
        index.persist().unwrap();
        let on_disk = IndexStore::new(dir.path()).load_all().unwrap();

        index
            .register_file("report", FileId::new(), &["home", "shared"], RecreatePolicy::Replace)
            .unwrap();
        register(&index, "fresh", &["work"]);
        let expected = index.triples();
        let plan = pending_plan(&index);

        // Renames inside one phase may land in any combination; every
        // earlier phase is complete and fsynced.
        let mut completed: Vec<(String, TagSet)> = Vec::new();
        for (p, phase) in plan.iter().enumerate() {
            for mask in 0u32..(1 << phase.len()) {
                let partial = phase
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << *i) != 0)
                    .map(|(_, write)| write);
                let loaded = load_overlay(&on_disk, completed.iter().chain(partial));
                assert!(loaded.is_ok(), "phase {} mask {:b}: {:?}", p, mask, loaded);
            }
            completed.extend(phase.iter().cloned());
        }

        assert_eq!(load_overlay(&on_disk, &completed).unwrap(), expected);
    }

    #[test]
    fn test_shrunk_tags_are_written_before_universal() {
        let dir = TempDir::new().unwrap();
        let index = TagIndex::load(IndexStore::new(dir.path())).unwrap();
        register(&index, "report", &["work"]);
        index.persist().unwrap();

        let new = FileId::new();
        index
            .register_file("report", new, &["home"], RecreatePolicy::Replace)
            .unwrap();
        let plan = pending_plan(&index);
        let order: Vec<Vec<&str>> = plan
            .iter()
            .map(|phase| phase.iter().map(|(tag, _)| tag.as_str()).collect())
            .collect();
        assert_eq!(order, vec![vec!["work"], vec![""], vec!["home"]]);
        assert!(plan[0][0].1.is_empty());
    }

    #[test]
    fn test_grown_tags_need_one_write() {
        let (_dir, index) = empty_index();
        register(&index, "a", &["x"]);
        let plan = pending_plan(&index);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0][0].0, "");
        assert_eq!(plan[1][0].0, "x");
    }

    // ========================================
    // Displaced identifiers
    // ========================================

    #[test]
    fn test_displaced_identifier_collectable_after_flush() {
        let (_dir, index) = empty_index();
        let old = register(&index, "f", &["t"]);
        index.persist().unwrap();
        register(&index, "f", &["t"]);

        assert!(index.take_collectable().is_empty());
        index.persist().unwrap();
        assert_eq!(index.take_collectable(), vec![old]);
        assert!(index.take_collectable().is_empty());
    }

    #[test]
    fn test_displaced_identifier_survives_failed_flush() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("db");
        std::fs::create_dir(&db).unwrap();
        let index = TagIndex::load(IndexStore::new(&db)).unwrap();
        let old = register(&index, "f", &[]);
        index.persist().unwrap();
        register(&index, "f", &[]);

        let saved = dir.path().join("db.saved");
        std::fs::rename(&db, &saved).unwrap();
        assert!(index.persist().is_err());
        assert!(index.take_collectable().is_empty());

        std::fs::rename(&saved, &db).unwrap();
        index.persist().unwrap();
        assert_eq!(index.take_collectable(), vec![old]);
    }
}
