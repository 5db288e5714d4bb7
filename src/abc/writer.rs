//! Write-side state shared by every handle of one output archive.
//!
//! Handles ([`OObject`](super::OObject), property writers) are cheap
//! `(core, node)` pairs. The core owns the backend, the time sampling
//! registry and an arena of nodes that enforces sibling name uniqueness
//! and tracks per-property sample state.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{ObjectRef, ParentRef, PropertyRef, SampleRecord, StoreWriter};
use crate::core::{
    ArraySample, ChunkKey, MetaData, ObjectHeader, PropertyHeader, PropertyType, SampleKey,
    TimeSamplingRegistry,
};
use crate::util::{Dimensions, Error, Result};

pub(crate) type SharedWriter = Arc<Mutex<WriterCore>>;

/// Object node id in the writer arena.
pub(crate) type ObjectId = usize;
/// Property node id in the writer arena.
pub(crate) type PropertyId = usize;

/// A compound that can hold properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CompoundId {
    /// The top compound of an object.
    Object(ObjectId),
    Property(PropertyId),
}

struct ObjectNode {
    store_ref: ObjectRef,
    header: ObjectHeader,
    children: Vec<ObjectId>,
    child_names: HashSet<String>,
    properties: Vec<PropertyId>,
    property_names: HashSet<String>,
}

struct PropertyNode {
    store_ref: PropertyRef,
    header: PropertyHeader,
    children: Vec<PropertyId>,
    child_names: HashSet<String>,
    track: SampleTrack,
}

/// Incremental sample bookkeeping for one scalar or array property.
#[derive(Debug)]
pub(crate) struct SampleTrack {
    pub num_samples: usize,
    first: Option<(ChunkKey, Dimensions)>,
    last: Option<SampleRecord>,
    pub constant: bool,
    pub scalar_like: bool,
}

impl Default for SampleTrack {
    fn default() -> Self {
        Self {
            num_samples: 0,
            first: None,
            last: None,
            constant: true,
            scalar_like: true,
        }
    }
}

impl SampleTrack {
    fn push(&mut self, record: SampleRecord) {
        match &self.first {
            None => self.first = Some((record.key, record.dims.clone())),
            Some((key, dims)) => {
                if *key != record.key || *dims != record.dims {
                    self.constant = false;
                }
            }
        }
        if record.dims.num_points() != 1 {
            self.scalar_like = false;
        }
        self.num_samples += 1;
        self.last = Some(record);
    }
}

pub(crate) struct WriterCore {
    name: String,
    backend: Option<Box<dyn StoreWriter>>,
    registry: TimeSamplingRegistry,
    archive_meta_data: MetaData,
    objects: Vec<ObjectNode>,
    properties: Vec<PropertyNode>,
}

/// Names of objects and properties are non-empty and contain no `/`.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument("empty name"));
    }
    if name.contains('/') {
        return Err(Error::invalid_argument(format!("name '{}' contains '/'", name)));
    }
    Ok(())
}

impl WriterCore {
    pub fn new(backend: Box<dyn StoreWriter>, archive_meta_data: MetaData) -> Self {
        let name = backend.target().to_string();
        Self {
            name,
            backend: Some(backend),
            registry: TimeSamplingRegistry::new(),
            archive_meta_data,
            objects: vec![ObjectNode {
                store_ref: ObjectRef::ROOT,
                header: ObjectHeader::top(MetaData::new()),
                children: Vec::new(),
                child_names: HashSet::new(),
                properties: Vec::new(),
                property_names: HashSet::new(),
            }],
            properties: Vec::new(),
        }
    }

    pub fn shared(self) -> SharedWriter {
        Arc::new(Mutex::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    fn backend(&mut self) -> Result<&mut Box<dyn StoreWriter>> {
        self.backend.as_mut().ok_or_else(|| Error::Closed(self.name.clone()))
    }

    pub fn check_open(&self) -> Result<()> {
        if self.backend.is_none() {
            return Err(Error::Closed(self.name.clone()));
        }
        Ok(())
    }

    pub fn registry(&self) -> &TimeSamplingRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> Result<&mut TimeSamplingRegistry> {
        self.check_open()?;
        Ok(&mut self.registry)
    }

    // -- objects --

    pub fn object_header(&self, id: ObjectId) -> &ObjectHeader {
        &self.objects[id].header
    }

    pub fn object_children(&self, id: ObjectId) -> &[ObjectId] {
        &self.objects[id].children
    }

    pub fn create_object(&mut self, parent: ObjectId, name: &str, meta_data: MetaData) -> Result<ObjectId> {
        self.check_open()?;
        validate_name(name)?;
        let parent_node = &self.objects[parent];
        if parent_node.child_names.contains(name) {
            return Err(Error::DuplicateName {
                parent: parent_node.header.full_name.clone(),
                name: name.to_string(),
            });
        }

        let header = ObjectHeader::child_of(&parent_node.header.full_name, name, meta_data);
        let parent_ref = parent_node.store_ref;
        let store_ref = self.backend()?.begin_object(parent_ref, &header)?;
        tracing::debug!(full_name = %header.full_name, "object created");

        let id = self.objects.len();
        let parent_node = &mut self.objects[parent];
        parent_node.children.push(id);
        parent_node.child_names.insert(name.to_string());
        self.objects.push(ObjectNode {
            store_ref,
            header,
            children: Vec::new(),
            child_names: HashSet::new(),
            properties: Vec::new(),
            property_names: HashSet::new(),
        });
        Ok(id)
    }

    // -- properties --

    pub fn property_header(&self, id: PropertyId) -> &PropertyHeader {
        &self.properties[id].header
    }

    pub fn track(&self, id: PropertyId) -> &SampleTrack {
        &self.properties[id].track
    }

    pub fn compound_children(&self, compound: CompoundId) -> &[PropertyId] {
        match compound {
            CompoundId::Object(o) => &self.objects[o].properties,
            CompoundId::Property(p) => &self.properties[p].children,
        }
    }

    /// Full name of the compound for diagnostics.
    fn compound_path(&self, compound: CompoundId) -> String {
        match compound {
            CompoundId::Object(o) => self.objects[o].header.full_name.clone(),
            CompoundId::Property(p) => format!("property '{}'", self.properties[p].header.name),
        }
    }

    pub fn create_property(&mut self, parent: CompoundId, header: PropertyHeader) -> Result<PropertyId> {
        self.check_open()?;
        validate_name(&header.name)?;

        if header.property_type != PropertyType::Compound {
            if let Some(dt) = header.data_type {
                dt.validate()?;
            }
            if let Some(ts) = header.time_sampling_index {
                self.registry.get(ts)?;
            }
        }

        let taken = match parent {
            CompoundId::Object(o) => self.objects[o].property_names.contains(&header.name),
            CompoundId::Property(p) => self.properties[p].child_names.contains(&header.name),
        };
        if taken {
            return Err(Error::DuplicateName {
                parent: self.compound_path(parent),
                name: header.name,
            });
        }

        let parent_ref = match parent {
            CompoundId::Object(o) => ParentRef::Object(self.objects[o].store_ref),
            CompoundId::Property(p) => ParentRef::Compound(self.properties[p].store_ref),
        };
        let store_ref = self.backend()?.begin_property(parent_ref, &header)?;
        tracing::debug!(
            name = %header.name,
            kind = %header.property_type,
            data_type = ?header.data_type,
            "property created"
        );

        let id = self.properties.len();
        let name = header.name.clone();
        match parent {
            CompoundId::Object(o) => {
                self.objects[o].properties.push(id);
                self.objects[o].property_names.insert(name);
            }
            CompoundId::Property(p) => {
                self.properties[p].children.push(id);
                self.properties[p].child_names.insert(name);
            }
        }
        self.properties.push(PropertyNode {
            store_ref,
            header,
            children: Vec::new(),
            child_names: HashSet::new(),
            track: SampleTrack::default(),
        });
        Ok(id)
    }

    /// Append the next sample of a scalar or array property.
    pub fn set_sample(&mut self, id: PropertyId, sample: &ArraySample) -> Result<()> {
        self.check_open()?;
        let header = &self.properties[id].header;
        let (Some(data_type), Some(ts)) = (header.data_type, header.time_sampling_index) else {
            return Err(Error::invalid_argument(format!("compound '{}' takes no samples", header.name)));
        };
        if sample.data_type() != data_type {
            return Err(Error::type_mismatch(data_type, sample.data_type()));
        }
        match header.property_type {
            PropertyType::Scalar if sample.num_points() != 1 => {
                return Err(Error::invalid_argument(format!(
                    "scalar property '{}' takes one point per sample, got {}",
                    header.name,
                    sample.dims()
                )));
            }
            PropertyType::Array if sample.dims().rank() == 0 => {
                return Err(Error::invalid_argument(format!(
                    "array property '{}' needs explicit dimensions",
                    header.name
                )));
            }
            _ => {}
        }

        let payload = sample.payload();
        let key = ChunkKey::new(&SampleKey::from_payload(&payload, data_type.pod), data_type);
        let store_ref = self.properties[id].store_ref;
        let backend = self.backend()?;
        let chunk = backend.write_chunk(&key, &payload)?;
        let record = SampleRecord {
            chunk,
            key,
            dims: sample.dims().clone(),
        };
        backend.record_sample(store_ref, &record)?;
        self.push_record(id, ts, record);
        Ok(())
    }

    /// Append the previous sample again without touching its data.
    pub fn set_from_previous(&mut self, id: PropertyId) -> Result<()> {
        self.check_open()?;
        let node = &self.properties[id];
        let (Some(record), Some(ts)) = (node.track.last.clone(), node.header.time_sampling_index) else {
            return Err(Error::NoSamples(node.header.name.clone()));
        };
        let store_ref = node.store_ref;
        self.backend()?.record_sample(store_ref, &record)?;
        self.push_record(id, ts, record);
        Ok(())
    }

    fn push_record(&mut self, id: PropertyId, ts: u32, record: SampleRecord) {
        tracing::trace!(property = %self.properties[id].header.name, digest = %record.key.digest, "sample recorded");
        let track = &mut self.properties[id].track;
        track.push(record);
        let count = track.num_samples as u64;
        self.registry.note_samples(ts, count);
    }

    /// Persist time samplings and metadata, then finish the backend.
    /// Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut backend) = self.backend.take() else {
            return Ok(());
        };
        backend.write_time_samplings(&self.registry)?;
        backend.write_archive_metadata(&self.archive_meta_data)?;
        backend.finish()?;
        tracing::debug!(
            name = %self.name,
            objects = self.objects.len(),
            properties = self.properties.len(),
            time_samplings = self.registry.len(),
            "archive closed"
        );
        Ok(())
    }
}
