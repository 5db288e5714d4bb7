//! Compound, scalar and array properties.
//!
//! Writer handles append samples in time order; every sample is keyed by
//! content and handed to the store, which keeps one copy per distinct key.
//! Reader handles resolve sample selectors through the property's time
//! sampling and fetch payloads through the archive's sample cache.

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;

use super::archive::ReaderCore;
use super::writer::{CompoundId, PropertyId, SharedWriter};
use crate::backend::{ParentRef, PropertyRef, SampleRecord};
use crate::core::{
    ArraySample, Digest, MetaData, PropertyHeader, PropertyType, SampleCacheKey, SampleInterp,
    SampleKey, SampleSelector, SchemaMatching, TimeSampling,
};
use crate::util::{
    convert_pod_buffer, Chrono, DataType, Dimensions, Error, PlainOldDataType, Result,
    SampleElement,
};

// ============================================================================
// Writers
// ============================================================================

/// Writer handle for a compound property.
#[derive(Clone)]
pub struct OCompoundProperty {
    core: SharedWriter,
    id: CompoundId,
}

impl OCompoundProperty {
    pub(crate) fn new(core: SharedWriter, id: CompoundId) -> Self {
        Self { core, id }
    }

    /// Header of this compound. An object's top compound is unnamed and
    /// shares the object's metadata.
    pub fn header(&self) -> PropertyHeader {
        let core = self.core.lock();
        match self.id {
            CompoundId::Object(o) => {
                PropertyHeader::compound("").with_meta_data(core.object_header(o).meta_data.clone())
            }
            CompoundId::Property(p) => core.property_header(p).clone(),
        }
    }

    pub fn num_properties(&self) -> usize {
        self.core.lock().compound_children(self.id).len()
    }

    pub fn property_header(&self, index: usize) -> Result<PropertyHeader> {
        let core = self.core.lock();
        let children = core.compound_children(self.id);
        let id = children.get(index).ok_or(Error::ChildOutOfBounds {
            index,
            count: children.len(),
        })?;
        Ok(core.property_header(*id).clone())
    }

    pub fn property_header_by_name(&self, name: &str) -> Option<PropertyHeader> {
        let core = self.core.lock();
        core.compound_children(self.id)
            .iter()
            .map(|id| core.property_header(*id))
            .find(|h| h.name == name)
            .cloned()
    }

    fn create(&self, header: PropertyHeader) -> Result<PropertyId> {
        self.core.lock().create_property(self.id, header)
    }

    /// Create a scalar property.
    ///
    /// Fails with `InvalidArgument` for an invalid data type or unknown
    /// time sampling id, and with `DuplicateName` on a sibling collision.
    pub fn create_scalar(&self, name: &str, data_type: DataType, time_sampling: u32) -> Result<OScalarProperty> {
        self.create_scalar_with(name, data_type, time_sampling, MetaData::new())
    }

    pub fn create_scalar_with(
        &self,
        name: &str,
        data_type: DataType,
        time_sampling: u32,
        meta_data: MetaData,
    ) -> Result<OScalarProperty> {
        let header = PropertyHeader::scalar(name, data_type, time_sampling).with_meta_data(meta_data);
        let id = self.create(header)?;
        Ok(OScalarProperty {
            core: Arc::clone(&self.core),
            id,
        })
    }

    /// Create an array property. Same checks as [`create_scalar`](Self::create_scalar).
    pub fn create_array(&self, name: &str, data_type: DataType, time_sampling: u32) -> Result<OArrayProperty> {
        self.create_array_with(name, data_type, time_sampling, MetaData::new())
    }

    pub fn create_array_with(
        &self,
        name: &str,
        data_type: DataType,
        time_sampling: u32,
        meta_data: MetaData,
    ) -> Result<OArrayProperty> {
        let header = PropertyHeader::array(name, data_type, time_sampling).with_meta_data(meta_data);
        let id = self.create(header)?;
        Ok(OArrayProperty {
            core: Arc::clone(&self.core),
            id,
        })
    }

    pub fn create_compound(&self, name: &str) -> Result<OCompoundProperty> {
        self.create_compound_with(name, MetaData::new())
    }

    pub fn create_compound_with(&self, name: &str, meta_data: MetaData) -> Result<OCompoundProperty> {
        let id = self.create(PropertyHeader::compound(name).with_meta_data(meta_data))?;
        Ok(Self::new(Arc::clone(&self.core), CompoundId::Property(id)))
    }
}

/// Methods shared by scalar and array writers.
macro_rules! sampled_writer_methods {
    () => {
        pub fn header(&self) -> PropertyHeader {
            self.core.lock().property_header(self.id).clone()
        }

        pub fn name(&self) -> String {
            self.core.lock().property_header(self.id).name.clone()
        }

        pub fn num_samples(&self) -> usize {
            self.core.lock().track(self.id).num_samples
        }

        /// True while every sample written so far shares one key and shape.
        pub fn is_constant(&self) -> bool {
            self.core.lock().track(self.id).constant
        }

        /// Append the next sample. Its pod and extent must match the
        /// property's data type exactly.
        pub fn set_sample(&self, sample: &ArraySample) -> Result<()> {
            self.core.lock().set_sample(self.id, sample)
        }

        /// Append a copy of the previous sample without storing data again.
        pub fn set_from_previous(&self) -> Result<()> {
            self.core.lock().set_from_previous(self.id)
        }
    };
}

/// Writer handle for a scalar property: one element per sample.
#[derive(Clone)]
pub struct OScalarProperty {
    core: SharedWriter,
    id: PropertyId,
}

impl OScalarProperty {
    sampled_writer_methods!();

    pub fn set_value<T: SampleElement>(&self, value: T) -> Result<()> {
        self.set_sample(&ArraySample::scalar(value))
    }

    /// Append one string value; the property must be `string` or `wstring`
    /// with extent 1.
    pub fn set_string(&self, value: &str) -> Result<()> {
        let data_type = self.header().data_type.unwrap_or(DataType::UNKNOWN);
        let sample = ArraySample::from_strings(data_type, Dimensions::scalar(), vec![value.to_string()])?;
        self.set_sample(&sample)
    }
}

/// Writer handle for an array property.
#[derive(Clone)]
pub struct OArrayProperty {
    core: SharedWriter,
    id: PropertyId,
}

impl OArrayProperty {
    sampled_writer_methods!();

    /// True while every sample written so far holds exactly one element.
    /// A property that never received a sample is scalar-like.
    pub fn is_scalar_like(&self) -> bool {
        self.core.lock().track(self.id).scalar_like
    }

    /// Append a one-dimensional sample.
    pub fn set_values<T: SampleElement>(&self, values: &[T]) -> Result<()> {
        self.set_sample(&ArraySample::from_slice(values))
    }

    /// Append a one-dimensional string sample. For extent `n` each element
    /// takes `n` consecutive strings.
    pub fn set_strings<S: AsRef<str>>(&self, values: &[S]) -> Result<()> {
        let data_type = self.header().data_type.unwrap_or(DataType::UNKNOWN);
        let extent = usize::from(data_type.extent.max(1));
        let strings = values.iter().map(|s| s.as_ref().to_string()).collect();
        let sample = ArraySample::from_strings(data_type, Dimensions::d1(values.len() / extent), strings)?;
        self.set_sample(&sample)
    }
}

impl fmt::Debug for OCompoundProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OCompoundProperty")
            .field("name", &self.header().name)
            .field("properties", &self.num_properties())
            .finish()
    }
}

macro_rules! impl_writer_debug {
    ($($ty:ident),*) => {
        $(
            impl fmt::Debug for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    let core = self.core.lock();
                    f.debug_struct(stringify!($ty))
                        .field("name", &core.property_header(self.id).name)
                        .field("data_type", &core.property_header(self.id).data_type)
                        .field("num_samples", &core.track(self.id).num_samples)
                        .finish()
                }
            }
        )*
    };
}

impl_writer_debug!(OScalarProperty, OArrayProperty);

// ============================================================================
// Readers
// ============================================================================

/// Reader handle for a compound property.
#[derive(Clone)]
pub struct ICompoundProperty {
    core: Arc<ReaderCore>,
    header: PropertyHeader,
    children: Vec<(String, PropertyRef)>,
}

impl ICompoundProperty {
    pub(crate) fn open(core: Arc<ReaderCore>, parent: ParentRef, header: PropertyHeader) -> Result<Self> {
        let children = core.with_store(|store| store.list_properties(parent))?;
        Ok(Self {
            core,
            header,
            children,
        })
    }

    pub fn header(&self) -> &PropertyHeader {
        &self.header
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn meta_data(&self) -> &MetaData {
        &self.header.meta_data
    }

    pub fn matches_schema(&self, title: &str) -> bool {
        self.header.matches_schema(title)
    }

    pub fn matches_schema_with(&self, title: &str, matching: SchemaMatching) -> bool {
        self.header.meta_data.matches_schema_with(title, matching)
    }

    pub fn num_properties(&self) -> usize {
        self.children.len()
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(name, _)| name.as_str())
    }

    fn child_ref(&self, index: usize) -> Result<PropertyRef> {
        self.children
            .get(index)
            .map(|(_, r)| *r)
            .ok_or(Error::ChildOutOfBounds {
                index,
                count: self.children.len(),
            })
    }

    fn child_ref_by_name(&self, name: &str) -> Option<PropertyRef> {
        self.children.iter().find(|(n, _)| n == name).map(|(_, r)| *r)
    }

    /// Header by position; an index past the end is `IndexOutOfRange`.
    pub fn property_header(&self, index: usize) -> Result<PropertyHeader> {
        let prop = self.child_ref(index)?;
        self.core.with_store(|store| Ok(store.property_header(prop)?.clone()))
    }

    /// Header by name, `None` when absent.
    pub fn property_header_by_name(&self, name: &str) -> Option<PropertyHeader> {
        let prop = self.child_ref_by_name(name)?;
        self.core
            .with_store(|store| Ok(store.property_header(prop)?.clone()))
            .ok()
    }

    pub fn property(&self, index: usize) -> Result<IProperty> {
        IProperty::open(Arc::clone(&self.core), self.child_ref(index)?)
    }

    /// Property by name; a missing name is `NotFound`.
    pub fn property_by_name(&self, name: &str) -> Result<IProperty> {
        let prop = self
            .child_ref_by_name(name)
            .ok_or_else(|| Error::PropertyNotFound(name.to_string()))?;
        IProperty::open(Arc::clone(&self.core), prop)
    }

    pub fn properties(&self) -> impl Iterator<Item = Result<IProperty>> + '_ {
        (0..self.children.len()).map(move |i| self.property(i))
    }

    /// Named scalar property; another kind is a `TypeMismatch`.
    pub fn scalar(&self, name: &str) -> Result<IScalarProperty> {
        match self.property_by_name(name)? {
            IProperty::Scalar(p) => Ok(p),
            other => Err(Error::type_mismatch(PropertyType::Scalar, other.property_type())),
        }
    }

    /// Named array property; another kind is a `TypeMismatch`.
    pub fn array(&self, name: &str) -> Result<IArrayProperty> {
        match self.property_by_name(name)? {
            IProperty::Array(p) => Ok(p),
            other => Err(Error::type_mismatch(PropertyType::Array, other.property_type())),
        }
    }

    /// Named compound property; another kind is a `TypeMismatch`.
    pub fn compound(&self, name: &str) -> Result<ICompoundProperty> {
        match self.property_by_name(name)? {
            IProperty::Compound(p) => Ok(p),
            other => Err(Error::type_mismatch(PropertyType::Compound, other.property_type())),
        }
    }
}

impl fmt::Debug for ICompoundProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ICompoundProperty")
            .field("name", &self.header.name)
            .field("properties", &self.children.len())
            .finish()
    }
}

/// Any reader property, dispatched on the header's property type.
#[derive(Clone, Debug)]
pub enum IProperty {
    Scalar(IScalarProperty),
    Array(IArrayProperty),
    Compound(ICompoundProperty),
}

impl IProperty {
    fn open(core: Arc<ReaderCore>, prop: PropertyRef) -> Result<Self> {
        let header = core.with_store(|store| Ok(store.property_header(prop)?.clone()))?;
        Ok(match header.property_type {
            PropertyType::Scalar => Self::Scalar(IScalarProperty {
                inner: SampledProperty::open(core, prop, header)?,
            }),
            PropertyType::Array => Self::Array(IArrayProperty {
                inner: SampledProperty::open(core, prop, header)?,
            }),
            PropertyType::Compound => Self::Compound(ICompoundProperty::open(core, ParentRef::Compound(prop), header)?),
        })
    }

    pub fn header(&self) -> &PropertyHeader {
        match self {
            Self::Scalar(p) => p.header(),
            Self::Array(p) => p.header(),
            Self::Compound(p) => p.header(),
        }
    }

    pub fn name(&self) -> &str {
        &self.header().name
    }

    pub fn property_type(&self) -> PropertyType {
        self.header().property_type
    }

    /// `None` unless this is a scalar property.
    pub fn as_scalar(&self) -> Option<&IScalarProperty> {
        match self {
            Self::Scalar(p) => Some(p),
            _ => None,
        }
    }

    /// `None` unless this is an array property.
    pub fn as_array(&self) -> Option<&IArrayProperty> {
        match self {
            Self::Array(p) => Some(p),
            _ => None,
        }
    }

    /// `None` unless this is a compound property.
    pub fn as_compound(&self) -> Option<&ICompoundProperty> {
        match self {
            Self::Compound(p) => Some(p),
            _ => None,
        }
    }
}

/// Shared state of scalar and array readers.
#[derive(Clone)]
struct SampledProperty {
    core: Arc<ReaderCore>,
    header: PropertyHeader,
    data_type: DataType,
    time_sampling_index: u32,
    time_sampling: TimeSampling,
    samples: Arc<[SampleRecord]>,
}

impl SampledProperty {
    fn open(core: Arc<ReaderCore>, prop: PropertyRef, header: PropertyHeader) -> Result<Self> {
        let (Some(data_type), Some(time_sampling_index)) = (header.data_type, header.time_sampling_index) else {
            return Err(Error::invalid_format(format!("property '{}' lacks a data type", header.name)));
        };
        let time_sampling = core.registry().get(time_sampling_index)?.clone();
        let samples: Arc<[SampleRecord]> = core.with_store(|store| Ok(Arc::from(store.samples(prop)?)))?;
        Ok(Self {
            core,
            header,
            data_type,
            time_sampling_index,
            time_sampling,
            samples,
        })
    }

    fn record(&self, index: usize) -> Result<&SampleRecord> {
        if self.samples.is_empty() {
            return Err(Error::NoSamples(self.header.name.clone()));
        }
        self.samples.get(index).ok_or(Error::SampleOutOfBounds {
            index,
            count: self.samples.len(),
        })
    }

    fn resolve(&self, selector: SampleSelector) -> Result<usize> {
        let n = self.samples.len();
        if n == 0 {
            return Err(Error::NoSamples(self.header.name.clone()));
        }
        let ts = &self.time_sampling;
        Ok(match selector {
            SampleSelector::Index(i) => i,
            SampleSelector::TimeFloor(t) => ts.floor_index(t, n).0,
            SampleSelector::TimeCeil(t) => ts.ceil_index(t, n).0,
            SampleSelector::TimeNear(t) => ts.near_index(t, n).0,
        })
    }

    fn interp(&self, time: Chrono) -> Result<SampleInterp> {
        if self.samples.is_empty() {
            return Err(Error::NoSamples(self.header.name.clone()));
        }
        Ok(self.time_sampling.interp(time, self.samples.len()))
    }

    fn is_constant(&self) -> bool {
        match self.samples.first() {
            None => true,
            Some(first) => self
                .samples
                .iter()
                .all(|r| r.key == first.key && r.dims == first.dims),
        }
    }

    fn is_scalar_like(&self) -> bool {
        self.samples.iter().all(|r| r.dims.num_points() == 1)
    }

    /// Decoded sample `index`, from the cache when possible.
    fn fetch(&self, index: usize) -> Result<Arc<ArraySample>> {
        let record = self.record(index)?;
        self.core.check_open()?;

        let cache_key = SampleCacheKey::new(record.key, record.dims.clone());
        if let Some(hit) = self.core.cache.get(&cache_key) {
            return Ok(hit);
        }

        let payload = self.core.with_store(|store| store.read_chunk(record.chunk))?;
        if payload.len() as u64 != record.key.num_bytes {
            return Err(Error::invalid_format(format!(
                "sample {} of '{}' holds {} bytes, key says {}",
                index,
                self.header.name,
                payload.len(),
                record.key.num_bytes
            )));
        }
        if self.core.options.verify_digests && Digest::of(&payload) != record.key.digest {
            return Err(Error::invalid_format(format!(
                "sample {} of '{}' does not match its digest",
                index, self.header.name
            )));
        }

        let sample = ArraySample::from_payload(self.data_type, record.dims.clone(), &payload)?;
        Ok(self.core.cache.insert(cache_key, sample))
    }

    fn fetch_as(&self, index: usize, pod: PlainOldDataType) -> Result<ArraySample> {
        let sample = self.fetch(index)?;
        if pod == self.data_type.pod {
            return Ok(sample.as_ref().clone());
        }
        let bytes = sample
            .as_bytes()
            .ok_or_else(|| Error::type_mismatch(self.data_type.pod, pod))?;
        let converted = convert_pod_buffer(bytes, self.data_type.pod, pod)?;
        ArraySample::from_bytes(DataType::new(pod, self.data_type.extent), sample.dims().clone(), converted)
    }

    fn key_as(&self, index: usize, pod: PlainOldDataType) -> Result<SampleKey> {
        let key = self.record(index)?.key.sample_key();
        let orig = self.data_type.pod;
        if pod != orig && (orig.is_string() || pod.is_string() || pod == PlainOldDataType::Unknown) {
            return Err(Error::type_mismatch(orig, pod));
        }
        Ok(key.with_read_pod(pod))
    }
}

/// Methods shared by scalar and array readers.
macro_rules! sampled_reader_methods {
    () => {
        pub fn header(&self) -> &PropertyHeader {
            &self.inner.header
        }

        pub fn name(&self) -> &str {
            &self.inner.header.name
        }

        pub fn data_type(&self) -> DataType {
            self.inner.data_type
        }

        pub fn time_sampling_index(&self) -> u32 {
            self.inner.time_sampling_index
        }

        pub fn time_sampling(&self) -> &TimeSampling {
            &self.inner.time_sampling
        }

        pub fn num_samples(&self) -> usize {
            self.inner.samples.len()
        }

        /// True when every sample shares one key and shape, or there are none.
        pub fn is_constant(&self) -> bool {
            self.inner.is_constant()
        }

        pub fn get_key(&self, index: usize) -> Result<SampleKey> {
            Ok(self.inner.record(index)?.key.sample_key())
        }

        /// Key of sample `index` as seen through `pod`.
        pub fn get_key_as(&self, index: usize, pod: PlainOldDataType) -> Result<SampleKey> {
            self.inner.key_as(index, pod)
        }

        pub fn get_dimensions(&self, index: usize) -> Result<Dimensions> {
            Ok(self.inner.record(index)?.dims.clone())
        }

        /// Index a selector resolves to. Time selectors clamp to the
        /// sampled range; plain indices are returned as given.
        pub fn sample_index(&self, selector: impl Into<SampleSelector>) -> Result<usize> {
            self.inner.resolve(selector.into())
        }

        pub fn sample_time(&self, index: usize) -> Result<Chrono> {
            self.inner.record(index)?;
            self.inner.time_sampling.sample_time(index)
        }

        /// Bracketing samples and weight for `time`.
        pub fn interp(&self, time: Chrono) -> Result<SampleInterp> {
            self.inner.interp(time)
        }

        /// Sample at `selector`. An index past the end is `IndexOutOfRange`;
        /// any read from a property without samples is `InvalidState`.
        pub fn get_sample(&self, selector: impl Into<SampleSelector>) -> Result<Arc<ArraySample>> {
            let index = self.inner.resolve(selector.into())?;
            self.inner.fetch(index)
        }

        /// Sample at `selector` converted to another numeric pod.
        pub fn get_sample_as(&self, selector: impl Into<SampleSelector>, pod: PlainOldDataType) -> Result<ArraySample> {
            let index = self.inner.resolve(selector.into())?;
            self.inner.fetch_as(index, pod)
        }
    };
}

/// Reader handle for a scalar property.
#[derive(Clone)]
pub struct IScalarProperty {
    inner: SampledProperty,
}

impl IScalarProperty {
    sampled_reader_methods!();

    pub fn get_value<T: SampleElement>(&self, selector: impl Into<SampleSelector>) -> Result<T> {
        self.get_sample(selector)?.value::<T>()
    }

    pub fn get_string(&self, selector: impl Into<SampleSelector>) -> Result<String> {
        let sample = self.get_sample(selector)?;
        sample
            .strings()
            .and_then(|s| s.first().cloned())
            .ok_or_else(|| Error::type_mismatch(PlainOldDataType::String, self.data_type()))
    }
}

/// Reader handle for an array property.
#[derive(Clone)]
pub struct IArrayProperty {
    inner: SampledProperty,
}

impl IArrayProperty {
    sampled_reader_methods!();

    /// True when every sample holds exactly one element. A property
    /// without samples is scalar-like; one zero-length sample is not.
    pub fn is_scalar_like(&self) -> bool {
        self.inner.is_scalar_like()
    }

    pub fn get_values<T: SampleElement>(&self, selector: impl Into<SampleSelector>) -> Result<Vec<T>> {
        self.get_sample(selector)?.values::<T>()
    }

    pub fn get_strings(&self, selector: impl Into<SampleSelector>) -> Result<Vec<String>> {
        let sample = self.get_sample(selector)?;
        sample
            .strings()
            .map(<[String]>::to_vec)
            .ok_or_else(|| Error::type_mismatch(PlainOldDataType::String, self.data_type()))
    }

    /// Fetch every sample, decoding in parallel.
    pub fn read_all_samples(&self) -> Result<Vec<Arc<ArraySample>>> {
        (0..self.num_samples())
            .into_par_iter()
            .map(|i| self.inner.fetch(i))
            .collect()
    }
}

macro_rules! impl_sampled_debug {
    ($($ty:ident),*) => {
        $(
            impl fmt::Debug for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($ty))
                        .field("name", &self.inner.header.name)
                        .field("data_type", &self.inner.data_type)
                        .field("num_samples", &self.inner.samples.len())
                        .finish()
                }
            }
        )*
    };
}

impl_sampled_debug!(IScalarProperty, IArrayProperty);
