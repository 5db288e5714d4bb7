//! Archive options.
//!
//! [`WriteOptions`] and [`ReadOptions`] are plain builders; every field has
//! a default so `WriteOptions::default()` is a complete configuration.

use crate::core::{MetaData, ReadArraySampleCache};

/// What to do when the write target already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExistingPolicy {
    /// Refuse to open, reporting `TargetExists`.
    FailOnExisting,
    /// Replace the existing target.
    #[default]
    Overwrite,
}

/// Archive metadata key for the writing application.
pub const APP_NAME_KEY: &str = "_ai_Application";
/// Archive metadata key for the user description.
pub const DESCRIPTION_KEY: &str = "_ai_Description";
/// Archive metadata key for the library version that wrote the archive.
pub const ALEMBIC_VERSION_KEY: &str = "_ai_AlembicVersion";

/// Options for opening an archive for writing.
#[derive(Clone, Debug, Default)]
pub struct WriteOptions {
    pub existing: ExistingPolicy,
    /// zlib level (0-9) for chunk payloads, `None` stores them raw.
    pub compression: Option<u32>,
    pub app_name: Option<String>,
    pub description: Option<String>,
    /// Extra archive metadata written alongside the keys above.
    pub meta_data: MetaData,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn existing(mut self, policy: ExistingPolicy) -> Self {
        self.existing = policy;
        self
    }

    /// Shorthand for `existing(ExistingPolicy::FailOnExisting)`.
    pub fn fail_on_existing(self) -> Self {
        self.existing(ExistingPolicy::FailOnExisting)
    }

    /// Compression level, clamped to 9.
    pub fn compression(mut self, level: u32) -> Self {
        self.compression = Some(level.min(9));
        self
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn meta_data(mut self, meta_data: MetaData) -> Self {
        self.meta_data = meta_data;
        self
    }

    /// Archive metadata as it will be stored.
    pub(crate) fn archive_meta_data(&self) -> MetaData {
        let mut md = MetaData::new();
        if let Some(app) = &self.app_name {
            md.set(APP_NAME_KEY, app.as_str());
        }
        if let Some(desc) = &self.description {
            md.set(DESCRIPTION_KEY, desc.as_str());
        }
        md.set(ALEMBIC_VERSION_KEY, crate::library_version());
        md.append_unique(&self.meta_data);
        md
    }
}

/// Options for opening an archive for reading.
#[derive(Clone, Debug)]
pub struct ReadOptions {
    /// Byte budget of the per-archive sample cache; 0 disables caching.
    pub cache_bytes: usize,
    /// Map bundle files into memory instead of reading through a file handle.
    pub use_mmap: bool,
    /// Recompute each fetched sample's key and fail on mismatch.
    pub verify_digests: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            cache_bytes: ReadArraySampleCache::DEFAULT_BYTES,
            use_mmap: true,
            verify_digests: false,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_bytes(mut self, bytes: usize) -> Self {
        self.cache_bytes = bytes;
        self
    }

    pub fn use_mmap(mut self, enabled: bool) -> Self {
        self.use_mmap = enabled;
        self
    }

    pub fn verify_digests(mut self, enabled: bool) -> Self {
        self.verify_digests = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_defaults() {
        let opts = WriteOptions::default();
        assert_eq!(opts.existing, ExistingPolicy::Overwrite);
        assert_eq!(opts.compression, None);
        let md = opts.archive_meta_data();
        assert!(md.get(ALEMBIC_VERSION_KEY).is_some());
        assert!(md.get(APP_NAME_KEY).is_none());
    }

    #[test]
    fn test_write_builder() {
        let opts = WriteOptions::new()
            .fail_on_existing()
            .compression(42)
            .app_name("unit")
            .description("desc")
            .meta_data(MetaData::new().with("_ai_Application", "ignored").with("fps", "24"));
        assert_eq!(opts.existing, ExistingPolicy::FailOnExisting);
        assert_eq!(opts.compression, Some(9));
        let md = opts.archive_meta_data();
        assert_eq!(md.get(APP_NAME_KEY), Some("unit"));
        assert_eq!(md.get(DESCRIPTION_KEY), Some("desc"));
        assert_eq!(md.get("fps"), Some("24"));
    }

    #[test]
    fn test_read_defaults() {
        let opts = ReadOptions::default().verify_digests(true);
        assert_eq!(opts.cache_bytes, 64 * 1024 * 1024);
        assert!(opts.use_mmap);
        assert!(opts.verify_digests);
    }
}
