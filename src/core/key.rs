//! Sample keys: content digests used for deduplication and change detection.
//!
//! The digest is BLAKE3 over the stored payload (see
//! [`ArraySample::payload`]) truncated to 128 bits. An empty payload always
//! gets the all-zero digest.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::ArraySample;
use crate::util::{DataType, PlainOldDataType};

/// 128-bit content digest.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Digest(pub [u8; 16]);

impl Digest {
    /// Digest of an empty payload.
    pub const ZERO: Self = Self([0; 16]);

    /// Digest of `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::ZERO;
        }
        let hash = blake3::hash(bytes);
        let mut out = [0u8; 16];
        out.copy_from_slice(&hash.as_bytes()[..16]);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 16]
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

/// Identity of one sample's content.
///
/// Equality and hashing ignore `read_pod`: two keys are the same sample
/// when digest, payload size and written pod agree.
#[derive(Clone, Copy, Debug)]
pub struct SampleKey {
    pub digest: Digest,
    /// Size of the hashed payload in bytes.
    pub num_bytes: u64,
    /// Pod the sample was written with.
    pub orig_pod: PlainOldDataType,
    /// Pod the reader asked for.
    pub read_pod: PlainOldDataType,
}

impl SampleKey {
    /// Key of a stored payload written as `pod`.
    pub fn from_payload(payload: &[u8], pod: PlainOldDataType) -> Self {
        Self {
            digest: Digest::of(payload),
            num_bytes: payload.len() as u64,
            orig_pod: pod,
            read_pod: pod,
        }
    }

    /// Key of a sample, computed over its payload.
    pub fn of_sample(sample: &ArraySample) -> Self {
        Self::from_payload(&sample.payload(), sample.data_type().pod)
    }

    /// Same key viewed through another read pod.
    pub fn with_read_pod(mut self, read_pod: PlainOldDataType) -> Self {
        self.read_pod = read_pod;
        self
    }
}

impl PartialEq for SampleKey {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
            && self.num_bytes == other.num_bytes
            && self.orig_pod == other.orig_pod
    }
}

impl Eq for SampleKey {}

impl Hash for SampleKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.digest.hash(state);
        self.num_bytes.hash(state);
        self.orig_pod.hash(state);
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.digest, self.num_bytes, self.orig_pod)
    }
}

/// Storage identity of a chunk.
///
/// Adds the extent to the sample key so payloads written with different
/// element layouts never alias, even when their bytes coincide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub digest: Digest,
    pub num_bytes: u64,
    pub pod: PlainOldDataType,
    pub extent: u8,
}

impl ChunkKey {
    pub fn new(key: &SampleKey, data_type: DataType) -> Self {
        Self {
            digest: key.digest,
            num_bytes: key.num_bytes,
            pod: key.orig_pod,
            extent: data_type.extent,
        }
    }

    /// Key of the empty payload for a data type.
    pub fn empty(data_type: DataType) -> Self {
        Self {
            digest: Digest::ZERO,
            num_bytes: 0,
            pod: data_type.pod,
            extent: data_type.extent,
        }
    }

    pub fn data_type(&self) -> DataType {
        DataType::new(self.pod, self.extent)
    }

    pub fn sample_key(&self) -> SampleKey {
        SampleKey {
            digest: self.digest,
            num_bytes: self.num_bytes,
            orig_pod: self.pod,
            read_pod: self.pod,
        }
    }
}
