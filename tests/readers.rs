//! Several readers over one archive: shared handles across threads and
//! independent archives that open and close on their own.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::thread;

use alembic_core::prelude::*;
use common::init_tracing;

const NUM_OBJECTS: usize = 8;
const NUM_FRAMES: usize = 24;

fn write_scene(path: &Path) {
    let archive = OArchive::create(path).expect("create");
    let ts = archive
        .add_time_sampling(TimeSampling::uniform(1.0 / 24.0, 0.0).unwrap())
        .unwrap();
    let top = archive.top().unwrap();
    for o in 0..NUM_OBJECTS {
        let props = top.create_child(&format!("obj{}", o)).unwrap().properties();
        let p = props.create_array("P", DataType::VEC3F, ts).unwrap();
        for f in 0..NUM_FRAMES {
            let pts: Vec<Vec3> = (0..o + 1).map(|i| Vec3::new(o as f32, f as f32, i as f32)).collect();
            p.set_values(&pts).unwrap();
        }
    }
    archive.close().expect("close");
}

fn check_object(archive: &IArchive, o: usize) {
    let p = archive
        .find_object(&format!("/obj{}", o))
        .unwrap()
        .properties()
        .unwrap()
        .array("P")
        .unwrap();
    assert_eq!(p.num_samples(), NUM_FRAMES);
    for f in 0..NUM_FRAMES {
        let pts: Vec<Vec3> = p.get_values(f).unwrap();
        assert_eq!(pts.len(), o + 1);
        assert!(pts.iter().enumerate().all(|(i, v)| *v == Vec3::new(o as f32, f as f32, i as f32)));
    }
}

#[test]
fn test_two_readers_same_file() {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("scene.abcb");
    write_scene(&path);

    let first = IArchive::open(&path).unwrap();
    let second = IArchive::open_with(&path, ReadOptions::new().use_mmap(false)).unwrap();
    assert_eq!(first.top().unwrap().num_children(), NUM_OBJECTS);
    assert_eq!(second.top().unwrap().num_children(), NUM_OBJECTS);

    check_object(&first, 3);
    check_object(&second, 3);

    // Caches are per archive.
    let second_cache = second.cache_size();
    check_object(&first, 5);
    assert_eq!(second.cache_size(), second_cache);

    first.close();
    assert!(!first.is_open());
    assert_eq!(first.cache_size(), 0);
    assert_eq!(first.top().unwrap_err().kind(), ErrorKind::InvalidState);

    assert!(second.is_open());
    for o in 0..NUM_OBJECTS {
        check_object(&second, o);
    }
}

#[test]
fn test_close_invalidates_existing_handles() {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("handles.abcb");
    write_scene(&path);

    let archive = IArchive::open(&path).unwrap();
    let other = IArchive::open(&path).unwrap();
    let obj = archive.find_object("/obj2").unwrap();
    let p = obj.properties().unwrap().array("P").unwrap();
    let _ = p.get_sample(0).unwrap();

    archive.close();
    archive.close();

    // Cached structure stays readable, data access does not.
    assert_eq!(obj.name(), "obj2");
    assert_eq!(p.num_samples(), NUM_FRAMES);
    assert_eq!(p.get_sample(0).unwrap_err().kind(), ErrorKind::InvalidState);
    assert_eq!(p.get_sample(1).unwrap_err().kind(), ErrorKind::InvalidState);
    assert_eq!(obj.properties().unwrap_err().kind(), ErrorKind::InvalidState);
    assert_eq!(obj.child_by_name("x").unwrap_err().kind(), ErrorKind::NotFound);

    check_object(&other, 2);
}

#[test]
fn test_shared_archive_across_threads() {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("threads.abcb");
    write_scene(&path);

    let archive = IArchive::open(&path).unwrap();
    let handles: Vec<_> = (0..NUM_OBJECTS)
        .map(|o| {
            let archive = archive.clone();
            thread::spawn(move || check_object(&archive, o))
        })
        .collect();
    for handle in handles {
        handle.join().expect("reader thread");
    }
    assert!(archive.cache_size() > 0);
}

#[test]
fn test_independent_archives_across_threads() {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = Arc::new(dir.path().join("independent.abcb"));
    write_scene(&path);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let path = Arc::clone(&path);
            thread::spawn(move || {
                let archive = IArchive::open(path.as_path()).unwrap();
                for o in (t..NUM_OBJECTS).step_by(2) {
                    check_object(&archive, o);
                }
                if t % 2 == 0 {
                    archive.close();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("reader thread");
    }

    let archive = IArchive::open(path.as_path()).unwrap();
    check_object(&archive, NUM_OBJECTS - 1);
}

#[test]
fn test_memory_readers_see_committed_snapshot() {
    init_tracing();
    let store = alembic_core::backend::MemoryStore::new("snapshot");
    {
        let archive = OArchive::in_memory(&store, WriteOptions::default()).unwrap();
        archive.top().unwrap().create_child("v1").unwrap();
        archive.close().unwrap();
    }
    let old = IArchive::open_memory(&store, ReadOptions::default()).unwrap();
    {
        let archive = OArchive::in_memory(&store, WriteOptions::default()).unwrap();
        archive.top().unwrap().create_child("v2").unwrap();
        archive.close().unwrap();
    }
    let new = IArchive::open_memory(&store, ReadOptions::default()).unwrap();

    assert!(old.find_object("/v1").is_ok());
    assert!(old.find_object("/v2").is_err());
    assert!(new.find_object("/v2").is_ok());
    assert!(new.find_object("/v1").is_err());
    old.close();
    assert!(new.is_open());
}
