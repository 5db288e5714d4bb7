//! Storage backends.
//!
//! The object/property layer talks to storage only through [`StoreWriter`]
//! and [`StoreReader`]. Sample payloads travel as content-keyed chunks; the
//! tree structure travels as an index of objects, properties and sample
//! records that readers get back as a [`StoreIndex`].
//!
//! Two stores ship with the crate:
//! - [`MemoryStore`] - shared in-process target, handy for tests and tools
//! - [`bundle`] - single-file store with a validated header

pub mod bundle;
mod index;
mod memory;

pub use index::{ObjectEntry, PropertyEntry, StoreIndex};
pub use memory::{MemoryReader, MemoryStore, MemoryWriter};

use std::fmt;

use crate::core::{ChunkKey, MetaData, ObjectHeader, PropertyHeader, TimeSamplingRegistry};
use crate::util::{Dimensions, Result};

/// Location of a stored chunk. [`ChunkRef::EMPTY`] stands for the empty payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkRef(pub u64);

impl ChunkRef {
    pub const EMPTY: Self = Self(0);

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Index of an object in the store. The top object is [`ObjectRef::ROOT`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRef(pub u32);

impl ObjectRef {
    pub const ROOT: Self = Self(0);
}

/// Index of a property in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropertyRef(pub u32);

/// Where a new property hangs: directly in an object's top compound, or
/// inside a compound property.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParentRef {
    Object(ObjectRef),
    Compound(PropertyRef),
}

/// One sample of a scalar or array property as the store sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleRecord {
    pub chunk: ChunkRef,
    pub key: ChunkKey,
    pub dims: Dimensions,
}

/// Format identification checked when a store is opened for reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatMarker {
    /// Short store kind, e.g. `"bundle"` or `"memory"`.
    pub kind: &'static str,
    pub version: u16,
}

impl fmt::Display for FormatMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.kind, self.version)
    }
}

/// Write side of a store.
///
/// Nothing written is guaranteed durable before [`finish`](Self::finish).
pub trait StoreWriter: Send {
    /// Human readable target name for diagnostics.
    fn target(&self) -> &str;

    /// Store a payload. Equal keys return the ref of the first write
    /// without storing the bytes again; an empty payload is never stored.
    fn write_chunk(&mut self, key: &ChunkKey, payload: &[u8]) -> Result<ChunkRef>;

    /// Register a child object under `parent`.
    fn begin_object(&mut self, parent: ObjectRef, header: &ObjectHeader) -> Result<ObjectRef>;

    /// Register a property under an object's top compound or a compound property.
    fn begin_property(&mut self, parent: ParentRef, header: &PropertyHeader) -> Result<PropertyRef>;

    /// Append the next sample of a scalar or array property.
    fn record_sample(&mut self, property: PropertyRef, record: &SampleRecord) -> Result<()>;

    fn write_time_samplings(&mut self, registry: &TimeSamplingRegistry) -> Result<()>;

    fn write_archive_metadata(&mut self, meta_data: &MetaData) -> Result<()>;

    /// Durability point: persist the index and the format marker.
    fn finish(&mut self) -> Result<()>;
}

/// Read side of a store. Readers are shared across threads.
pub trait StoreReader: Send + Sync {
    /// Format marker found when the store was opened.
    fn format(&self) -> FormatMarker;

    /// Payload of a chunk. [`ChunkRef::EMPTY`] yields an empty payload.
    fn read_chunk(&self, chunk: ChunkRef) -> Result<Vec<u8>>;

    /// Validated tree index.
    fn index(&self) -> &StoreIndex;

    fn root(&self) -> ObjectRef {
        ObjectRef::ROOT
    }

    fn object_header(&self, obj: ObjectRef) -> Result<&ObjectHeader> {
        Ok(&self.index().object(obj)?.header)
    }

    fn property_header(&self, prop: PropertyRef) -> Result<&PropertyHeader> {
        Ok(&self.index().property(prop)?.header)
    }

    /// Children of an object in creation order.
    fn list_children(&self, parent: ObjectRef) -> Result<Vec<(String, ObjectRef)>> {
        let index = self.index();
        index
            .object(parent)?
            .children
            .iter()
            .map(|c| Ok((index.object(*c)?.header.name.clone(), *c)))
            .collect()
    }

    /// Properties directly under an object's top compound or a compound property.
    fn list_properties(&self, parent: ParentRef) -> Result<Vec<(String, PropertyRef)>> {
        let index = self.index();
        index
            .properties_of(parent)?
            .iter()
            .map(|p| Ok((index.property(*p)?.header.name.clone(), *p)))
            .collect()
    }

    /// Sample records of a scalar or array property.
    fn samples(&self, prop: PropertyRef) -> Result<&[SampleRecord]> {
        Ok(&self.index().property(prop)?.samples)
    }

    fn time_samplings(&self) -> &TimeSamplingRegistry {
        &self.index().time_samplings
    }

    fn archive_metadata(&self) -> &MetaData {
        &self.index().archive_metadata
    }
}
