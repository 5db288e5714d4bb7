//! Headers for objects and properties.
//!
//! A header is everything known about a node without touching its samples:
//! name, kind, data type, time sampling and metadata.

use std::fmt;

use super::{MetaData, SchemaMatching};
use crate::util::{DataType, SampleElement};

/// Header information for an object in the hierarchy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectHeader {
    /// Local name of this object.
    pub name: String,
    /// Slash separated path from the top object, e.g. `/root/parent/child`.
    pub full_name: String,
    /// Metadata containing schema info, etc.
    pub meta_data: MetaData,
}

impl ObjectHeader {
    /// Local name of the implicit top object of every archive.
    pub const TOP_NAME: &'static str = "ABC";

    pub fn new(name: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_name: full_name.into(),
            meta_data: MetaData::new(),
        }
    }

    /// Header of the top object.
    pub fn top(meta_data: MetaData) -> Self {
        Self {
            name: Self::TOP_NAME.to_string(),
            full_name: "/".to_string(),
            meta_data,
        }
    }

    /// Header for a child named `name` under `parent_full_name`.
    pub fn child_of(parent_full_name: &str, name: &str, meta_data: MetaData) -> Self {
        let full_name = if parent_full_name == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", parent_full_name, name)
        };
        Self {
            name: name.to_string(),
            full_name,
            meta_data,
        }
    }

    pub fn schema(&self) -> Option<&str> {
        self.meta_data.schema()
    }

    /// Strict schema probe on this header's metadata.
    pub fn matches_schema(&self, title: &str) -> bool {
        self.meta_data.matches_schema(title)
    }

    pub fn matches_schema_with(&self, title: &str, matching: SchemaMatching) -> bool {
        self.meta_data.matches_schema_with(title, matching)
    }
}

/// Type of property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PropertyType {
    /// Container for other properties.
    Compound = 0,
    /// One element (or a fixed small group) per sample.
    Scalar = 1,
    /// Array of elements per sample.
    Array = 2,
}

impl PropertyType {
    /// Storage tag of this type.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Compound),
            1 => Some(Self::Scalar),
            2 => Some(Self::Array),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Compound => "compound",
            Self::Scalar => "scalar",
            Self::Array => "array",
        })
    }
}

/// Header information for a property.
///
/// Compound properties carry neither a data type nor a time sampling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyHeader {
    /// Name, unique among its siblings.
    pub name: String,
    pub property_type: PropertyType,
    /// POD + extent, `None` for compounds.
    pub data_type: Option<DataType>,
    /// Registry id of the time sampling, `None` for compounds.
    pub time_sampling_index: Option<u32>,
    pub meta_data: MetaData,
}

impl PropertyHeader {
    /// Create a scalar property header.
    pub fn scalar(name: impl Into<String>, data_type: DataType, time_sampling_index: u32) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Scalar,
            data_type: Some(data_type),
            time_sampling_index: Some(time_sampling_index),
            meta_data: MetaData::new(),
        }
    }

    /// Create an array property header.
    pub fn array(name: impl Into<String>, data_type: DataType, time_sampling_index: u32) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Array,
            data_type: Some(data_type),
            time_sampling_index: Some(time_sampling_index),
            meta_data: MetaData::new(),
        }
    }

    /// Create a compound property header.
    pub fn compound(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Compound,
            data_type: None,
            time_sampling_index: None,
            meta_data: MetaData::new(),
        }
    }

    pub fn with_meta_data(mut self, meta_data: MetaData) -> Self {
        self.meta_data = meta_data;
        self
    }

    pub fn is_scalar(&self) -> bool {
        self.property_type == PropertyType::Scalar
    }

    pub fn is_array(&self) -> bool {
        self.property_type == PropertyType::Array
    }

    pub fn is_compound(&self) -> bool {
        self.property_type == PropertyType::Compound
    }

    /// Interpretation hint from metadata (e.g. "point", "vector", "normal").
    pub fn interpretation(&self) -> Option<&str> {
        self.meta_data.interpretation()
    }

    /// Strict schema probe, used by schema layers to recognize compounds.
    pub fn matches_schema(&self, title: &str) -> bool {
        self.is_compound() && self.meta_data.matches_schema(title)
    }

    /// True when this is a sampled property stored as `T`.
    pub fn matches_element<T: SampleElement>(&self) -> bool {
        !self.is_compound() && self.data_type == Some(T::DATA_TYPE)
    }

    /// [`matches_element`](Self::matches_element) plus an interpretation probe.
    ///
    /// An empty `interpretation` accepts any header of the right type.
    pub fn matches_typed<T: SampleElement>(&self, interpretation: &str) -> bool {
        self.matches_element::<T>()
            && (interpretation.is_empty() || self.interpretation() == Some(interpretation))
    }
}
