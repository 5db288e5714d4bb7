//! Bundle file writer.
//!
//! Chunks stream to `<target>.partial` as they are written. `finish` appends
//! the index, flips the frozen flag, syncs, and renames the partial file
//! over the target, so readers never observe a half-written bundle.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::codec::encode_index;
use super::compression::compress;
use super::format::*;
use super::stream::OStream;
use crate::backend::{ChunkRef, ObjectRef, ParentRef, PropertyRef, SampleRecord, StoreIndex, StoreWriter};
use crate::config::ExistingPolicy;
use crate::core::{ChunkKey, MetaData, ObjectHeader, PropertyHeader, TimeSamplingRegistry};
use crate::util::{Error, Result};

/// Absolute paths currently held by a writer in this process.
static ACTIVE_TARGETS: Mutex<Vec<PathBuf>> = parking_lot::const_mutex(Vec::new());

/// Registration in [`ACTIVE_TARGETS`], released on drop.
struct TargetClaim {
    path: PathBuf,
}

impl TargetClaim {
    fn acquire(path: &Path) -> Result<Self> {
        let mut active = ACTIVE_TARGETS.lock();
        if active.iter().any(|p| p == path) {
            return Err(Error::WriterBusy(path.display().to_string()));
        }
        active.push(path.to_path_buf());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for TargetClaim {
    fn drop(&mut self) {
        ACTIVE_TARGETS.lock().retain(|p| p != &self.path);
    }
}

/// Resolve `path` to an absolute path without requiring the file to exist.
fn absolute_target(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::invalid_argument(format!("'{}' does not name a file", path.display())))?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.canonicalize()?,
        _ => std::env::current_dir()?,
    };
    Ok(parent.join(file_name))
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map(OsString::from).unwrap_or_default();
    name.push(".partial");
    target.with_file_name(name)
}

/// Writes a single-file bundle store.
pub struct BundleWriter {
    name: String,
    target: PathBuf,
    partial: PathBuf,
    stream: Option<OStream>,
    compression: u32,
    index: StoreIndex,
    dedup: HashMap<ChunkKey, ChunkRef>,
    finished: bool,
    _claim: TargetClaim,
}

impl BundleWriter {
    /// Start a bundle at `path`.
    ///
    /// `compression` is a zlib level; `None` or `Some(0)` stores chunks raw.
    pub fn create(path: impl AsRef<Path>, policy: ExistingPolicy, compression: Option<u32>) -> Result<Self> {
        let target = absolute_target(path.as_ref())?;
        let claim = TargetClaim::acquire(&target)?;

        if policy == ExistingPolicy::FailOnExisting && target.exists() {
            return Err(Error::TargetExists(target.display().to_string()));
        }

        let partial = partial_path(&target);
        let stream = OStream::create(&partial)?;

        // From here on Drop removes the partial file on any error.
        let mut writer = Self {
            name: path.as_ref().display().to_string(),
            target,
            partial,
            stream: Some(stream),
            compression: compression.unwrap_or(0).min(9),
            index: StoreIndex::new(),
            dedup: HashMap::new(),
            finished: false,
            _claim: claim,
        };
        writer.write_header()?;

        tracing::debug!(target_path = %writer.target.display(), ?policy, ?compression, "bundle opened for write");
        Ok(writer)
    }

    /// Unfrozen header with a zero index position, flushed so an unwritable
    /// target fails here rather than at finish.
    fn write_header(&mut self) -> Result<()> {
        let stream = self.stream()?;
        stream.write_bytes(BUNDLE_MAGIC)?;
        stream.write_u8(NOT_FROZEN_FLAG)?;
        stream.write_u16(CURRENT_VERSION)?;
        stream.write_u64(0)?;
        stream.flush()
    }

    /// Final path of the bundle.
    pub fn path(&self) -> &Path {
        &self.target
    }

    /// Number of distinct chunks written so far.
    pub fn num_chunks(&self) -> usize {
        self.dedup.len()
    }

    fn stream(&mut self) -> Result<&mut OStream> {
        self.stream.as_mut().ok_or_else(|| Error::Closed(self.name.clone()))
    }
}

impl StoreWriter for BundleWriter {
    fn target(&self) -> &str {
        &self.name
    }

    fn write_chunk(&mut self, key: &ChunkKey, payload: &[u8]) -> Result<ChunkRef> {
        self.stream()?;
        if payload.is_empty() {
            return Ok(ChunkRef::EMPTY);
        }
        if let Some(existing) = self.dedup.get(key) {
            tracing::trace!(digest = %key.digest, pos = existing.0, "bundle dedup hit");
            return Ok(*existing);
        }

        let compression = self.compression;
        let stream = self.stream()?;
        let pos = stream.pos();
        match compress(payload, compression)? {
            Some(packed) => {
                stream.write_u8(ENCODING_ZLIB)?;
                stream.write_u64(packed.len() as u64)?;
                stream.write_bytes(&packed)?;
            }
            None => {
                stream.write_u8(ENCODING_RAW)?;
                stream.write_u64(payload.len() as u64)?;
                stream.write_bytes(payload)?;
            }
        }

        let chunk = ChunkRef(pos);
        self.dedup.insert(*key, chunk);
        tracing::trace!(digest = %key.digest, pos, bytes = payload.len(), "bundle chunk written");
        Ok(chunk)
    }

    fn begin_object(&mut self, parent: ObjectRef, header: &ObjectHeader) -> Result<ObjectRef> {
        self.stream()?;
        self.index.add_object(parent, header.clone())
    }

    fn begin_property(&mut self, parent: ParentRef, header: &PropertyHeader) -> Result<PropertyRef> {
        self.stream()?;
        self.index.add_property(parent, header.clone())
    }

    fn record_sample(&mut self, property: PropertyRef, record: &SampleRecord) -> Result<()> {
        self.stream()?;
        self.index.push_sample(property, record.clone())
    }

    fn write_time_samplings(&mut self, registry: &TimeSamplingRegistry) -> Result<()> {
        self.stream()?;
        self.index.time_samplings = registry.clone();
        Ok(())
    }

    fn write_archive_metadata(&mut self, meta_data: &MetaData) -> Result<()> {
        self.stream()?;
        self.index.archive_metadata = meta_data.clone();
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let mut stream = self.stream.take().ok_or_else(|| Error::Closed(self.name.clone()))?;

        let index_pos = stream.pos();
        let index_bytes = encode_index(&self.index);
        stream.write_bytes(&index_bytes)?;

        stream.seek(FROZEN_OFFSET as u64)?;
        stream.write_u8(FROZEN_FLAG)?;
        stream.write_u16(CURRENT_VERSION)?;
        stream.write_u64(index_pos)?;
        stream.sync()?;
        drop(stream);

        fs::rename(&self.partial, &self.target)?;
        self.finished = true;

        tracing::debug!(
            target_path = %self.target.display(),
            chunks = self.dedup.len(),
            objects = self.index.objects.len(),
            properties = self.index.properties.len(),
            index_bytes = index_bytes.len(),
            "bundle finished"
        );
        Ok(())
    }
}

impl Drop for BundleWriter {
    fn drop(&mut self) {
        if !self.finished {
            self.stream = None;
            if let Err(e) = fs::remove_file(&self.partial) {
                tracing::debug!(path = %self.partial.display(), error = %e, "could not remove partial bundle");
            }
        }
    }
}
