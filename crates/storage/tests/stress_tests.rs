//! Object store stress tests
//!
//! Many threads creating slots at once, all hashing into a small number of
//! shard directories.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::sync::{Arc, Barrier};
use std::thread;
use tagstore_core::FileId;
use tagstore_storage::{ShardedObjectStore, StorePaths};
use tempfile::TempDir;

const THREADS: usize = 8;
const SLOTS_PER_THREAD: usize = 50;

#[test]
fn test_concurrent_creates_into_shared_shards() {
    let temp_dir = TempDir::new().unwrap();
    let paths = StorePaths::from_root(temp_dir.path());
    paths.create_directories(2).unwrap();
    let store = Arc::new(ShardedObjectStore::discover(paths.object_dir()).unwrap());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..SLOTS_PER_THREAD)
                    .map(|_| {
                        let id = FileId::new();
                        let mut file = store.create(&id).unwrap();
                        file.write_all(id.as_bytes()).unwrap();
                        id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: Vec<FileId> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let unique: HashSet<FileId> = ids.iter().copied().collect();
    assert_eq!(unique.len(), THREADS * SLOTS_PER_THREAD);

    for id in &ids {
        let mut content = Vec::new();
        store.open(id).unwrap().read_to_end(&mut content).unwrap();
        assert_eq!(content.as_slice(), id.as_bytes());
    }

    let on_disk: usize = (0..2)
        .map(|s| std::fs::read_dir(paths.shard_dir(s)).unwrap().count())
        .sum();
    assert_eq!(on_disk, ids.len());
}

#[test]
fn test_rediscovery_keeps_placement() {
    let temp_dir = TempDir::new().unwrap();
    let paths = StorePaths::from_root(temp_dir.path());
    paths.create_directories(7).unwrap();

    let ids: Vec<FileId> = (0..20).map(|_| FileId::new()).collect();
    {
        let store = ShardedObjectStore::discover(paths.object_dir()).unwrap();
        for id in &ids {
            store.create(id).unwrap();
        }
    }

    let store = ShardedObjectStore::discover(paths.object_dir()).unwrap();
    assert_eq!(store.shard_count(), 7);
    for id in &ids {
        assert!(store.exists(id));
        assert_eq!(store.shard_of(id), id.shard_key() % 7);
    }
}
