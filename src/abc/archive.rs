//! Output and input archives.
//!
//! An archive binds an object tree, a time sampling registry and a
//! backend store. Writers persist everything at [`OArchive::close`];
//! readers validate the store when opened and share one sample cache
//! between all handles of the archive.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use super::object::{IObject, OObject};
use super::writer::{SharedWriter, WriterCore};
use crate::backend::bundle::{BundleReader, BundleWriter};
use crate::backend::{FormatMarker, MemoryStore, ObjectRef, StoreReader, StoreWriter};
use crate::config::{ReadOptions, WriteOptions, ALEMBIC_VERSION_KEY, APP_NAME_KEY, DESCRIPTION_KEY};
use crate::core::{MetaData, ReadArraySampleCache, TimeSampling, TimeSamplingRegistry};
use crate::util::{Error, Result};

// ============================================================================
// OArchive
// ============================================================================

/// Output archive.
///
/// Dropping an open archive closes it; a failure at that point can only be
/// logged, so call [`close`](Self::close) to observe it.
pub struct OArchive {
    core: SharedWriter,
}

impl OArchive {
    /// Create a bundle file at `path` with default options.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with(path, WriteOptions::default())
    }

    /// Create a bundle file at `path`.
    pub fn create_with(path: impl AsRef<Path>, options: WriteOptions) -> Result<Self> {
        let writer = BundleWriter::create(path, options.existing, options.compression)?;
        Ok(Self::with_backend(Box::new(writer), &options))
    }

    /// Write into an in-process store.
    pub fn in_memory(store: &MemoryStore, options: WriteOptions) -> Result<Self> {
        let writer = store.open_writer(options.existing)?;
        Ok(Self::with_backend(Box::new(writer), &options))
    }

    /// Write through any [`StoreWriter`].
    pub fn with_backend(backend: Box<dyn StoreWriter>, options: &WriteOptions) -> Self {
        let core = WriterCore::new(backend, options.archive_meta_data());
        tracing::debug!(name = %core.name(), "archive opened for write");
        Self { core: core.shared() }
    }

    pub fn name(&self) -> String {
        self.core.lock().name().to_string()
    }

    /// True until [`close`](Self::close).
    pub fn is_open(&self) -> bool {
        self.core.lock().is_open()
    }

    /// The top object of the archive.
    pub fn top(&self) -> Result<OObject> {
        self.core.lock().check_open()?;
        Ok(OObject::new(Arc::clone(&self.core), 0))
    }

    /// Register a time sampling and return its id. Equal descriptors share one id.
    pub fn add_time_sampling(&self, ts: TimeSampling) -> Result<u32> {
        let mut core = self.core.lock();
        let id = core.registry_mut()?.add(ts);
        tracing::debug!(id, "time sampling registered");
        Ok(id)
    }

    pub fn time_sampling(&self, id: u32) -> Result<TimeSampling> {
        self.core.lock().registry().get(id).cloned()
    }

    pub fn num_time_samplings(&self) -> usize {
        self.core.lock().registry().len()
    }

    /// Largest sample count written so far against time sampling `id`.
    pub fn max_num_samples_for_time_sampling(&self, id: u32) -> Option<u64> {
        self.core.lock().registry().max_samples(id)
    }

    /// Finish the archive. Closing twice is a no-op; any other operation
    /// after close fails with an `InvalidState` error.
    pub fn close(&self) -> Result<()> {
        self.core.lock().close()
    }
}

impl Drop for OArchive {
    fn drop(&mut self) {
        let mut core = self.core.lock();
        if core.is_open() {
            if let Err(e) = core.close() {
                tracing::warn!(name = %core.name(), error = %e, "archive dropped without close and failed to finish");
            }
        }
    }
}

impl fmt::Debug for OArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.lock();
        f.debug_struct("OArchive")
            .field("name", &core.name())
            .field("open", &core.is_open())
            .finish()
    }
}

// ============================================================================
// IArchive
// ============================================================================

/// State shared by every handle of one input archive.
pub(crate) struct ReaderCore {
    name: String,
    format: FormatMarker,
    store: RwLock<Option<Box<dyn StoreReader>>>,
    registry: TimeSamplingRegistry,
    archive_meta_data: MetaData,
    pub(crate) cache: ReadArraySampleCache,
    pub(crate) options: ReadOptions,
}

impl ReaderCore {
    /// Run `f` against the store, failing once the archive is closed.
    pub(crate) fn with_store<T>(&self, f: impl FnOnce(&dyn StoreReader) -> Result<T>) -> Result<T> {
        let guard = self.store.read();
        let store = guard.as_deref().ok_or_else(|| Error::Closed(self.name.clone()))?;
        f(store)
    }

    pub(crate) fn check_open(&self) -> Result<()> {
        self.with_store(|_| Ok(()))
    }

    pub(crate) fn registry(&self) -> &TimeSamplingRegistry {
        &self.registry
    }
}

/// Input archive.
///
/// Cloning is cheap and shares the store and the sample cache. Archives are
/// `Send + Sync`, so handles can be read from several threads. Independent
/// archives opened on the same target each own their own cache.
#[derive(Clone)]
pub struct IArchive {
    core: Arc<ReaderCore>,
}

impl IArchive {
    /// Open a bundle file with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, ReadOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let reader = BundleReader::open(path, options.use_mmap)?;
        Ok(Self::from_reader(Box::new(reader), path.display().to_string(), options))
    }

    /// Open the archive last committed to an in-process store.
    pub fn open_memory(store: &MemoryStore, options: ReadOptions) -> Result<Self> {
        let reader = store.open_reader()?;
        Ok(Self::from_reader(Box::new(reader), store.name().to_string(), options))
    }

    /// Read through any [`StoreReader`]. The store is expected to have
    /// validated itself when it was opened.
    pub fn from_reader(reader: Box<dyn StoreReader>, name: impl Into<String>, options: ReadOptions) -> Self {
        let name = name.into();
        let format = reader.format();
        let registry = reader.time_samplings().clone();
        let archive_meta_data = reader.archive_metadata().clone();
        tracing::debug!(
            name = %name,
            %format,
            time_samplings = registry.len(),
            cache_bytes = options.cache_bytes,
            "archive opened for read"
        );
        Self {
            core: Arc::new(ReaderCore {
                name,
                format,
                store: RwLock::new(Some(reader)),
                registry,
                archive_meta_data,
                cache: ReadArraySampleCache::new(options.cache_bytes),
                options,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Marker of the store this archive was read from.
    pub fn format(&self) -> FormatMarker {
        self.core.format
    }

    pub fn is_open(&self) -> bool {
        self.core.check_open().is_ok()
    }

    /// Release the store. Closing twice is a no-op. Other archives opened on
    /// the same target are unaffected.
    pub fn close(&self) {
        if self.core.store.write().take().is_some() {
            self.core.cache.clear();
            tracing::debug!(name = %self.core.name, "archive closed");
        }
    }

    /// The top object of the archive.
    pub fn top(&self) -> Result<IObject> {
        IObject::open(Arc::clone(&self.core), ObjectRef::ROOT)
    }

    /// Find an object by full path, e.g. `/world/geo`.
    pub fn find_object(&self, path: &str) -> Result<IObject> {
        let mut current = self.top()?;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current = current
                .child_by_name(part)
                .map_err(|_| Error::ObjectNotFound(path.to_string()))?;
        }
        Ok(current)
    }

    pub fn archive_metadata(&self) -> Result<&MetaData> {
        self.core.check_open()?;
        Ok(&self.core.archive_meta_data)
    }

    /// Application that wrote the archive, if recorded.
    pub fn app_name(&self) -> Result<Option<&str>> {
        Ok(self.archive_metadata()?.get(APP_NAME_KEY))
    }

    pub fn description(&self) -> Result<Option<&str>> {
        Ok(self.archive_metadata()?.get(DESCRIPTION_KEY))
    }

    /// Library version string recorded by the writer.
    pub fn alembic_version(&self) -> Result<Option<&str>> {
        Ok(self.archive_metadata()?.get(ALEMBIC_VERSION_KEY))
    }

    pub fn num_time_samplings(&self) -> Result<usize> {
        self.core.check_open()?;
        Ok(self.core.registry().len())
    }

    pub fn time_sampling(&self, id: u32) -> Result<&TimeSampling> {
        self.core.check_open()?;
        self.core.registry().get(id)
    }

    /// Largest sample count any property holds on time sampling `id`.
    pub fn max_num_samples_for_time_sampling(&self, id: u32) -> Result<Option<u64>> {
        self.core.check_open()?;
        Ok(self.core.registry().max_samples(id))
    }

    /// Bytes currently held by the sample cache.
    pub fn cache_size(&self) -> usize {
        self.core.cache.size()
    }
}

impl fmt::Debug for IArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IArchive")
            .field("name", &self.name())
            .field("open", &self.is_open())
            .field("cache_size", &self.cache_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ErrorKind;

    #[test]
    fn test_memory_lifecycle() {
        let store = MemoryStore::new("lifecycle");
        let archive = OArchive::in_memory(&store, WriteOptions::new().app_name("unit")).unwrap();
        let top = archive.top().unwrap();
        top.create_child("a").unwrap();
        archive.close().unwrap();
        archive.close().unwrap();
        assert!(!archive.is_open());
        assert_eq!(top.create_child("b").unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(archive.top().unwrap_err().kind(), ErrorKind::InvalidState);

        let reader = IArchive::open_memory(&store, ReadOptions::default()).unwrap();
        assert_eq!(reader.format().kind, "memory");
        assert_eq!(reader.app_name().unwrap(), Some("unit"));
        assert!(reader.alembic_version().unwrap().is_some());
        assert_eq!(reader.top().unwrap().num_children(), 1);
        reader.close();
        reader.close();
        assert_eq!(reader.top().unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(reader.archive_metadata().unwrap_err().kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_drop_closes_writer() {
        let store = MemoryStore::new("dropped");
        {
            let archive = OArchive::in_memory(&store, WriteOptions::default()).unwrap();
            archive.top().unwrap().create_child("x").unwrap();
        }
        assert!(store.exists());
        let reader = IArchive::open_memory(&store, ReadOptions::default()).unwrap();
        assert!(reader.find_object("/x").is_ok());
        assert_eq!(reader.find_object("/y").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_debug_output() {
        let store = MemoryStore::new("debugged");
        let archive = OArchive::in_memory(&store, WriteOptions::default()).unwrap();
        let props = archive.top().unwrap().create_child("obj").unwrap().properties();
        let s = props.create_scalar("s", crate::util::DataType::INT32, 0).unwrap();
        s.set_value(1i32).unwrap();
        assert!(format!("{:?}", archive).contains("debugged"));
        assert!(format!("{:?}", s).contains("num_samples: 1"));
        assert!(format!("{:?}", props).contains("properties: 1"));
        archive.close().unwrap();
        assert!(format!("{:?}", archive).contains("open: false"));

        let reader = IArchive::open_memory(&store, ReadOptions::default()).unwrap();
        assert!(format!("{:?}", reader).contains("open: true"));
        reader.close();
        assert!(format!("{:?}", reader).contains("open: false"));
    }

    #[test]
    fn test_archives_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IArchive>();
    }
}
