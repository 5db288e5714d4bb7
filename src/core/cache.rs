//! Read-side sample cache.
//!
//! Each reader archive owns one cache. Entries are keyed by content
//! ([`ChunkKey`]) and shape, so deduplicated samples read through
//! different properties share one decoded buffer.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{ArraySample, ChunkKey};
use crate::util::Dimensions;

/// Cache entry identity.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct SampleCacheKey {
    pub chunk: ChunkKey,
    pub dims: Dimensions,
}

impl SampleCacheKey {
    pub fn new(chunk: ChunkKey, dims: Dimensions) -> Self {
        Self { chunk, dims }
    }
}

struct CachedSample {
    sample: Arc<ArraySample>,
    size: usize,
}

/// Thread-safe cache of decoded samples with a byte budget.
///
/// Uses `parking_lot::RwLock` for the map and an `AtomicUsize` for the
/// running size. When an insert would exceed the budget, about half of
/// the entries are evicted.
pub struct ReadArraySampleCache {
    cache: RwLock<HashMap<SampleCacheKey, CachedSample>>,
    max_size: usize,
    current_size: AtomicUsize,
}

impl ReadArraySampleCache {
    /// Default budget of 64 MiB.
    pub const DEFAULT_BYTES: usize = 64 * 1024 * 1024;

    pub fn new(max_size: usize) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            max_size,
            current_size: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn get(&self, key: &SampleCacheKey) -> Option<Arc<ArraySample>> {
        let hit = self.cache.read().get(key).map(|s| Arc::clone(&s.sample));
        tracing::trace!(digest = %key.chunk.digest, hit = hit.is_some(), "sample cache lookup");
        hit
    }

    /// Insert a decoded sample and return the shared handle to use.
    ///
    /// If another thread inserted the same key first, its entry wins.
    /// Samples larger than the whole budget are returned without caching.
    pub fn insert(&self, key: SampleCacheKey, sample: ArraySample) -> Arc<ArraySample> {
        let size = key.chunk.num_bytes as usize;
        let sample = Arc::new(sample);
        if size > self.max_size {
            return sample;
        }

        if self.current_size.load(Ordering::Relaxed) + size > self.max_size {
            self.evict_some();
        }

        let mut cache = self.cache.write();
        if let Some(existing) = cache.get(&key) {
            return Arc::clone(&existing.sample);
        }
        cache.insert(
            key,
            CachedSample {
                sample: Arc::clone(&sample),
                size,
            },
        );
        self.current_size.fetch_add(size, Ordering::Relaxed);
        sample
    }

    /// Evict approximately half of the cache.
    fn evict_some(&self) {
        let mut cache = self.cache.write();
        let keys: Vec<_> = cache.keys().cloned().collect();
        let evict_count = keys.len().div_ceil(2);

        let mut evicted_size = 0;
        for key in keys.into_iter().take(evict_count) {
            if let Some(entry) = cache.remove(&key) {
                evicted_size += entry.size;
            }
        }
        tracing::debug!(evicted = evict_count, bytes = evicted_size, "sample cache eviction");

        let _ = self.current_size.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
            Some(x.saturating_sub(evicted_size))
        });
    }

    pub fn clear(&self) {
        self.cache.write().clear();
        self.current_size.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently cached.
    #[inline]
    pub fn size(&self) -> usize {
        self.current_size.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Default for ReadArraySampleCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BYTES)
    }
}
