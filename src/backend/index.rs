//! In-memory form of a store's tree index.
//!
//! Writers build a [`StoreIndex`] as objects and properties are created;
//! readers get one back from storage and [`validate`](StoreIndex::validate)
//! it before handing out refs.

use super::{ObjectRef, ParentRef, PropertyRef, SampleRecord};
use crate::core::{MetaData, ObjectHeader, PropertyHeader, PropertyType, TimeSamplingRegistry};
use crate::util::{DataType, Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectEntry {
    pub header: ObjectHeader,
    pub children: Vec<ObjectRef>,
    /// Properties of the object's top compound.
    pub properties: Vec<PropertyRef>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PropertyEntry {
    pub header: PropertyHeader,
    /// Child properties, compounds only.
    pub children: Vec<PropertyRef>,
    /// Sample records, scalar and array properties only.
    pub samples: Vec<SampleRecord>,
}

/// Objects, properties, time samplings and archive metadata of one store.
#[derive(Clone, Debug)]
pub struct StoreIndex {
    pub objects: Vec<ObjectEntry>,
    pub properties: Vec<PropertyEntry>,
    pub time_samplings: TimeSamplingRegistry,
    pub archive_metadata: MetaData,
}

impl StoreIndex {
    /// Index holding only the top object.
    pub fn new() -> Self {
        Self {
            objects: vec![ObjectEntry {
                header: ObjectHeader::top(MetaData::new()),
                children: Vec::new(),
                properties: Vec::new(),
            }],
            properties: Vec::new(),
            time_samplings: TimeSamplingRegistry::new(),
            archive_metadata: MetaData::new(),
        }
    }

    pub fn object(&self, obj: ObjectRef) -> Result<&ObjectEntry> {
        self.objects
            .get(obj.0 as usize)
            .ok_or_else(|| Error::invalid_format(format!("dangling object ref {}", obj.0)))
    }

    pub fn property(&self, prop: PropertyRef) -> Result<&PropertyEntry> {
        self.properties
            .get(prop.0 as usize)
            .ok_or_else(|| Error::invalid_format(format!("dangling property ref {}", prop.0)))
    }

    /// Properties directly under `parent`.
    pub fn properties_of(&self, parent: ParentRef) -> Result<&[PropertyRef]> {
        Ok(match parent {
            ParentRef::Object(obj) => &self.object(obj)?.properties,
            ParentRef::Compound(prop) => &self.property(prop)?.children,
        })
    }

    pub fn add_object(&mut self, parent: ObjectRef, header: ObjectHeader) -> Result<ObjectRef> {
        let child = ObjectRef(self.objects.len() as u32);
        self.objects
            .get_mut(parent.0 as usize)
            .ok_or_else(|| Error::invalid_argument(format!("unknown parent object {}", parent.0)))?
            .children
            .push(child);
        self.objects.push(ObjectEntry {
            header,
            children: Vec::new(),
            properties: Vec::new(),
        });
        Ok(child)
    }

    pub fn add_property(&mut self, parent: ParentRef, header: PropertyHeader) -> Result<PropertyRef> {
        let prop = PropertyRef(self.properties.len() as u32);
        let siblings = match parent {
            ParentRef::Object(obj) => self
                .objects
                .get_mut(obj.0 as usize)
                .map(|o| &mut o.properties),
            ParentRef::Compound(p) => self
                .properties
                .get_mut(p.0 as usize)
                .filter(|e| e.header.is_compound())
                .map(|e| &mut e.children),
        };
        siblings
            .ok_or_else(|| Error::invalid_argument(format!("unknown property parent {:?}", parent)))?
            .push(prop);
        self.properties.push(PropertyEntry {
            header,
            children: Vec::new(),
            samples: Vec::new(),
        });
        Ok(prop)
    }

    pub fn push_sample(&mut self, prop: PropertyRef, record: SampleRecord) -> Result<()> {
        let entry = self
            .properties
            .get_mut(prop.0 as usize)
            .filter(|e| !e.header.is_compound())
            .ok_or_else(|| Error::invalid_argument(format!("property {} takes no samples", prop.0)))?;
        entry.samples.push(record);
        Ok(())
    }

    /// Check structural consistency of an index read from storage.
    ///
    /// Children always have larger refs than their parent, which also rules
    /// out cycles. Every object and property has exactly one parent.
    pub fn validate(&self) -> Result<()> {
        let top = self.object(ObjectRef::ROOT)?;
        if top.header.full_name != "/" {
            return Err(Error::invalid_format("first object is not the top object"));
        }

        let mut object_parents = vec![0u32; self.objects.len()];
        let mut property_parents = vec![0u32; self.properties.len()];

        for (i, obj) in self.objects.iter().enumerate() {
            for child in &obj.children {
                if child.0 as usize <= i || child.0 as usize >= self.objects.len() {
                    return Err(Error::invalid_format(format!("bad child ref {} under object {}", child.0, i)));
                }
                object_parents[child.0 as usize] += 1;
            }
            for prop in &obj.properties {
                self.property(*prop)?;
                property_parents[prop.0 as usize] += 1;
            }
        }

        for (i, entry) in self.properties.iter().enumerate() {
            let header = &entry.header;
            for child in &entry.children {
                if child.0 as usize <= i || child.0 as usize >= self.properties.len() {
                    return Err(Error::invalid_format(format!("bad child ref {} under property {}", child.0, i)));
                }
                property_parents[child.0 as usize] += 1;
            }
            match header.property_type {
                PropertyType::Compound => {
                    if !entry.samples.is_empty() || header.data_type.is_some() {
                        return Err(Error::invalid_format(format!("compound '{}' carries samples", header.name)));
                    }
                }
                PropertyType::Scalar | PropertyType::Array => {
                    let (Some(dt), Some(ts)) = (header.data_type, header.time_sampling_index) else {
                        return Err(Error::invalid_format(format!("property '{}' lacks a type", header.name)));
                    };
                    if !dt.is_valid() || !self.time_samplings.contains(ts) || !entry.children.is_empty() {
                        return Err(Error::invalid_format(format!("property '{}' has a bad header", header.name)));
                    }
                    if entry.samples.iter().any(|s| s.key.data_type() != dt) {
                        return Err(Error::invalid_format(format!(
                            "property '{}' holds samples of another type",
                            header.name
                        )));
                    }
                    if let Some(i) = entry.samples.iter().position(|s| !record_fits(s, dt)) {
                        return Err(Error::invalid_format(format!(
                            "sample {} of property '{}' has dimensions {} that do not match its {} bytes",
                            i, header.name, entry.samples[i].dims, entry.samples[i].key.num_bytes
                        )));
                    }
                }
            }
        }

        if object_parents.iter().skip(1).any(|n| *n != 1) || property_parents.iter().any(|n| *n != 1) {
            return Err(Error::invalid_format("tree node with zero or several parents"));
        }
        Ok(())
    }
}

/// Shape and payload size of a record agree. Fixed-width pods must match
/// exactly; every string value takes at least its terminator.
fn record_fits(record: &SampleRecord, dt: DataType) -> bool {
    let Ok(num_bytes) = usize::try_from(record.key.num_bytes) else {
        return false;
    };
    if dt.is_string() {
        dt.checked_num_values(&record.dims)
            .and_then(|n| n.checked_mul(dt.pod.num_bytes()))
            .is_some_and(|min| min <= num_bytes)
    } else {
        dt.checked_num_bytes(&record.dims) == Some(num_bytes)
    }
}

impl Default for StoreIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChunkRef;
    use crate::core::ChunkKey;
    use crate::util::{Dimensions, ErrorKind};

    fn sample_index() -> (StoreIndex, PropertyRef) {
        let mut index = StoreIndex::new();
        let obj = index
            .add_object(ObjectRef::ROOT, ObjectHeader::child_of("/", "a", MetaData::new()))
            .unwrap();
        let geom = index
            .add_property(ParentRef::Object(obj), PropertyHeader::compound(".geom"))
            .unwrap();
        let p = index
            .add_property(ParentRef::Compound(geom), PropertyHeader::array("P", DataType::VEC3F, 0))
            .unwrap();
        (index, p)
    }

    #[test]
    fn test_build_and_validate() {
        let (mut index, p) = sample_index();
        let record = SampleRecord {
            chunk: ChunkRef::EMPTY,
            key: ChunkKey::empty(DataType::VEC3F),
            dims: Dimensions::d1(0),
        };
        index.push_sample(p, record).unwrap();
        index.validate().unwrap();
        assert_eq!(index.property(p).unwrap().samples.len(), 1);
        assert_eq!(index.object(ObjectRef::ROOT).unwrap().children, vec![ObjectRef(1)]);
    }

    #[test]
    fn test_compound_takes_no_samples() {
        let (mut index, _) = sample_index();
        let record = SampleRecord {
            chunk: ChunkRef::EMPTY,
            key: ChunkKey::empty(DataType::VEC3F),
            dims: Dimensions::d1(0),
        };
        assert!(index.push_sample(PropertyRef(0), record).is_err());
        assert!(index.add_property(ParentRef::Compound(PropertyRef(1)), PropertyHeader::compound("x")).is_err());
    }

    #[test]
    fn test_validate_rejects_cycles() {
        let (mut index, _) = sample_index();
        index.objects[1].children.push(ObjectRef(0));
        assert_eq!(index.validate().unwrap_err().kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn test_validate_rejects_type_drift() {
        let (mut index, p) = sample_index();
        index.properties[p.0 as usize].samples.push(SampleRecord {
            chunk: ChunkRef::EMPTY,
            key: ChunkKey::empty(DataType::INT32),
            dims: Dimensions::d1(0),
        });
        assert_eq!(index.validate().unwrap_err().kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn test_validate_rejects_shape_size_mismatch() {
        let (mut index, p) = sample_index();
        let mut key = ChunkKey::empty(DataType::VEC3F);
        key.num_bytes = 24;
        let record = |dims: Dimensions| SampleRecord {
            chunk: ChunkRef::EMPTY,
            key,
            dims,
        };
        index.push_sample(p, record(Dimensions::d1(2))).unwrap();
        index.validate().unwrap();

        index.properties[p.0 as usize].samples[0] = record(Dimensions::d1(3));
        assert_eq!(index.validate().unwrap_err().kind(), ErrorKind::InvalidFormat);

        index.properties[p.0 as usize].samples[0] = record(Dimensions::from_slice(&[1 << 33, 1 << 33]));
        assert_eq!(index.validate().unwrap_err().kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn test_validate_string_records_need_terminators() {
        let mut index = StoreIndex::new();
        let names = index
            .add_property(ParentRef::Object(ObjectRef::ROOT), PropertyHeader::array("names", DataType::STRING, 0))
            .unwrap();
        let mut key = ChunkKey::empty(DataType::STRING);
        key.num_bytes = 4;
        index.push_sample(names, SampleRecord { chunk: ChunkRef::EMPTY, key, dims: Dimensions::d1(4) }).unwrap();
        index.validate().unwrap();

        index.properties[names.0 as usize].samples[0].dims = Dimensions::d1(5);
        assert_eq!(index.validate().unwrap_err().kind(), ErrorKind::InvalidFormat);
    }
}
