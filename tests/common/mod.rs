//! Shared helpers for integration tests.

#![allow(dead_code)]

use alembic_core::backend::MemoryStore;
use alembic_core::prelude::*;
use tracing_subscriber::EnvFilter;

/// Install a test subscriber controlled by `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Write an archive into a fresh memory store and hand it back for reading.
pub fn memory_roundtrip(name: &str, build: impl FnOnce(&OArchive) -> Result<()>) -> (MemoryStore, IArchive) {
    let store = MemoryStore::new(name);
    let archive = OArchive::in_memory(&store, WriteOptions::default()).expect("open memory writer");
    build(&archive).expect("build archive");
    archive.close().expect("close archive");
    let reader = IArchive::open_memory(&store, ReadOptions::default()).expect("open memory reader");
    (store, reader)
}

/// Deterministic bytes for a fixed-width data type.
pub fn pattern_bytes(data_type: DataType, num_points: usize, seed: u8) -> Vec<u8> {
    let len = num_points * data_type.num_bytes();
    if data_type.pod == PlainOldDataType::Boolean {
        return (0..len).map(|i| ((i + seed as usize) % 2) as u8).collect();
    }
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}
