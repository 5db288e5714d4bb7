//! In-process store.
//!
//! A [`MemoryStore`] is a shared target: clone it to hand the same target
//! to a writer and, after the writer finishes, to any number of readers.
//! Readers see an immutable snapshot of the last committed archive.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::{
    ChunkRef, FormatMarker, ObjectRef, ParentRef, PropertyRef, SampleRecord, StoreIndex, StoreReader,
    StoreWriter,
};
use crate::config::ExistingPolicy;
use crate::core::{ChunkKey, MetaData, ObjectHeader, PropertyHeader, TimeSamplingRegistry};
use crate::util::{Error, Result};

/// Version of the in-memory image layout.
const MEMORY_VERSION: u16 = 1;

struct MemoryImage {
    index: StoreIndex,
    chunks: Vec<Arc<[u8]>>,
}

#[derive(Default)]
struct MemorySlot {
    committed: Option<Arc<MemoryImage>>,
    writer_busy: bool,
}

/// Shared in-memory archive target.
#[derive(Clone)]
pub struct MemoryStore {
    name: Arc<str>,
    slot: Arc<RwLock<MemorySlot>>,
}

impl MemoryStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            slot: Arc::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once a writer has finished an archive here.
    pub fn exists(&self) -> bool {
        self.slot.read().committed.is_some()
    }

    /// Number of physical chunks in the committed archive.
    pub fn num_chunks(&self) -> usize {
        self.slot
            .read()
            .committed
            .as_ref()
            .map_or(0, |image| image.chunks.len())
    }

    /// Total payload bytes in the committed archive.
    pub fn stored_bytes(&self) -> usize {
        self.slot
            .read()
            .committed
            .as_ref()
            .map_or(0, |image| image.chunks.iter().map(|c| c.len()).sum())
    }

    /// Claim the target for writing.
    ///
    /// Fails with `WriterBusy` while another writer is open and with
    /// `TargetExists` under [`ExistingPolicy::FailOnExisting`].
    pub fn open_writer(&self, policy: ExistingPolicy) -> Result<MemoryWriter> {
        let mut slot = self.slot.write();
        if slot.writer_busy {
            return Err(Error::WriterBusy(self.name.to_string()));
        }
        if policy == ExistingPolicy::FailOnExisting && slot.committed.is_some() {
            return Err(Error::TargetExists(self.name.to_string()));
        }
        slot.writer_busy = true;
        tracing::debug!(target_name = %self.name, "memory store opened for write");
        Ok(MemoryWriter {
            store: self.clone(),
            index: StoreIndex::new(),
            chunks: Vec::new(),
            dedup: HashMap::new(),
            finished: false,
        })
    }

    /// Open a snapshot of the committed archive.
    pub fn open_reader(&self) -> Result<MemoryReader> {
        let image = self
            .slot
            .read()
            .committed
            .clone()
            .ok_or_else(|| Error::invalid_format(format!("memory store '{}' holds no archive", self.name)))?;
        Ok(MemoryReader { image })
    }
}

/// Writer half of a [`MemoryStore`].
pub struct MemoryWriter {
    store: MemoryStore,
    index: StoreIndex,
    chunks: Vec<Arc<[u8]>>,
    dedup: HashMap<ChunkKey, ChunkRef>,
    finished: bool,
}

impl MemoryWriter {
    fn check_open(&self) -> Result<()> {
        if self.finished {
            return Err(Error::Closed(self.store.name.to_string()));
        }
        Ok(())
    }
}

impl StoreWriter for MemoryWriter {
    fn target(&self) -> &str {
        &self.store.name
    }

    fn write_chunk(&mut self, key: &ChunkKey, payload: &[u8]) -> Result<ChunkRef> {
        self.check_open()?;
        if payload.is_empty() {
            return Ok(ChunkRef::EMPTY);
        }
        if let Some(existing) = self.dedup.get(key) {
            tracing::trace!(digest = %key.digest, "memory store dedup hit");
            return Ok(*existing);
        }
        self.chunks.push(Arc::from(payload));
        let chunk = ChunkRef(self.chunks.len() as u64);
        self.dedup.insert(*key, chunk);
        Ok(chunk)
    }

    fn begin_object(&mut self, parent: ObjectRef, header: &ObjectHeader) -> Result<ObjectRef> {
        self.check_open()?;
        self.index.add_object(parent, header.clone())
    }

    fn begin_property(&mut self, parent: ParentRef, header: &PropertyHeader) -> Result<PropertyRef> {
        self.check_open()?;
        self.index.add_property(parent, header.clone())
    }

    fn record_sample(&mut self, property: PropertyRef, record: &SampleRecord) -> Result<()> {
        self.check_open()?;
        self.index.push_sample(property, record.clone())
    }

    fn write_time_samplings(&mut self, registry: &TimeSamplingRegistry) -> Result<()> {
        self.check_open()?;
        self.index.time_samplings = registry.clone();
        Ok(())
    }

    fn write_archive_metadata(&mut self, meta_data: &MetaData) -> Result<()> {
        self.check_open()?;
        self.index.archive_metadata = meta_data.clone();
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.check_open()?;
        self.finished = true;
        let image = MemoryImage {
            index: std::mem::take(&mut self.index),
            chunks: std::mem::take(&mut self.chunks),
        };
        tracing::debug!(
            target_name = %self.store.name,
            chunks = image.chunks.len(),
            objects = image.index.objects.len(),
            "memory store committed"
        );
        self.store.slot.write().committed = Some(Arc::new(image));
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.store.slot.write().writer_busy = false;
    }
}

/// Reader half of a [`MemoryStore`]: an immutable snapshot.
pub struct MemoryReader {
    image: Arc<MemoryImage>,
}

impl StoreReader for MemoryReader {
    fn format(&self) -> FormatMarker {
        FormatMarker {
            kind: "memory",
            version: MEMORY_VERSION,
        }
    }

    fn read_chunk(&self, chunk: ChunkRef) -> Result<Vec<u8>> {
        if chunk.is_empty() {
            return Ok(Vec::new());
        }
        self.image
            .chunks
            .get(chunk.0 as usize - 1)
            .map(|c| c.to_vec())
            .ok_or_else(|| Error::invalid_format(format!("chunk {} not in store", chunk.0)))
    }

    fn index(&self) -> &StoreIndex {
        &self.image.index
    }
}
