//! DataType - combines POD type with extent (values per logical element).

use super::{Dimensions, Error, PlainOldDataType, Result};
use std::fmt;

/// DataType describes how one logical element of a sample is stored.
///
/// It combines a [`PlainOldDataType`] with an extent: a Vec3f is Float32
/// with extent 3, a pair of labels is String with extent 2.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    /// The base plain old data type
    pub pod: PlainOldDataType,
    /// Number of POD values forming one element (1..=255)
    pub extent: u8,
}

impl DataType {
    /// Create a new DataType with given POD and extent.
    #[inline]
    pub const fn new(pod: PlainOldDataType, extent: u8) -> Self {
        Self { pod, extent }
    }

    /// Create a DataType with extent 1.
    #[inline]
    pub const fn scalar(pod: PlainOldDataType) -> Self {
        Self { pod, extent: 1 }
    }

    /// Size in bytes of one element for fixed-width pods.
    ///
    /// For strings this is only the terminator width times the extent;
    /// the real payload size depends on the string contents.
    #[inline]
    pub const fn num_bytes(&self) -> usize {
        self.pod.num_bytes() * self.extent as usize
    }

    /// Returns true if this is a known pod with a non-zero extent.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        !matches!(self.pod, PlainOldDataType::Unknown) && self.extent > 0
    }

    /// Returns true if the pod is `String` or `Wstring`.
    #[inline]
    pub const fn is_string(&self) -> bool {
        self.pod.is_string()
    }

    /// Fail with `InvalidArgument` unless [`is_valid`](Self::is_valid).
    pub fn validate(&self) -> Result<()> {
        if matches!(self.pod, PlainOldDataType::Unknown) {
            return Err(Error::invalid_argument("data type has an unknown pod"));
        }
        if self.extent == 0 {
            return Err(Error::invalid_argument(format!(
                "data type {} has a zero extent",
                self.pod
            )));
        }
        Ok(())
    }

    /// Number of pod values a sample of the given shape holds.
    #[inline]
    pub fn num_values(&self, dims: &Dimensions) -> usize {
        self.checked_num_values(dims).unwrap_or(usize::MAX)
    }

    /// Like [`num_values`](Self::num_values), `None` on overflow.
    pub fn checked_num_values(&self, dims: &Dimensions) -> Option<usize> {
        dims.checked_num_points()?.checked_mul(self.extent as usize)
    }

    /// Payload size of a fixed-width sample of the given shape, `None` on
    /// overflow. Strings have no fixed size and always give `None`.
    pub fn checked_num_bytes(&self, dims: &Dimensions) -> Option<usize> {
        if self.is_string() {
            return None;
        }
        self.checked_num_values(dims)?.checked_mul(self.pod.num_bytes())
    }

    /// Unknown/invalid DataType.
    pub const UNKNOWN: Self = Self::new(PlainOldDataType::Unknown, 0);

    // Scalars
    pub const BOOL: Self = Self::scalar(PlainOldDataType::Boolean);
    pub const UINT8: Self = Self::scalar(PlainOldDataType::Uint8);
    pub const INT8: Self = Self::scalar(PlainOldDataType::Int8);
    pub const UINT16: Self = Self::scalar(PlainOldDataType::Uint16);
    pub const INT16: Self = Self::scalar(PlainOldDataType::Int16);
    pub const UINT32: Self = Self::scalar(PlainOldDataType::Uint32);
    pub const INT32: Self = Self::scalar(PlainOldDataType::Int32);
    pub const UINT64: Self = Self::scalar(PlainOldDataType::Uint64);
    pub const INT64: Self = Self::scalar(PlainOldDataType::Int64);
    pub const FLOAT16: Self = Self::scalar(PlainOldDataType::Float16);
    pub const FLOAT32: Self = Self::scalar(PlainOldDataType::Float32);
    pub const FLOAT64: Self = Self::scalar(PlainOldDataType::Float64);
    pub const STRING: Self = Self::scalar(PlainOldDataType::String);
    pub const WSTRING: Self = Self::scalar(PlainOldDataType::Wstring);

    // Vectors
    pub const VEC2F: Self = Self::new(PlainOldDataType::Float32, 2);
    pub const VEC3F: Self = Self::new(PlainOldDataType::Float32, 3);
    pub const VEC4F: Self = Self::new(PlainOldDataType::Float32, 4);
    pub const VEC2D: Self = Self::new(PlainOldDataType::Float64, 2);
    pub const VEC3D: Self = Self::new(PlainOldDataType::Float64, 3);
    pub const VEC4D: Self = Self::new(PlainOldDataType::Float64, 4);
    pub const VEC2I: Self = Self::new(PlainOldDataType::Int32, 2);
    pub const VEC3I: Self = Self::new(PlainOldDataType::Int32, 3);
    pub const VEC4I: Self = Self::new(PlainOldDataType::Int32, 4);

    // Matrices, stored as extent = rows * cols
    pub const MAT33F: Self = Self::new(PlainOldDataType::Float32, 9);
    pub const MAT44F: Self = Self::new(PlainOldDataType::Float32, 16);
    pub const MAT33D: Self = Self::new(PlainOldDataType::Float64, 9);
    pub const MAT44D: Self = Self::new(PlainOldDataType::Float64, 16);

    // Quaternions (x, y, z, w)
    pub const QUATF: Self = Self::new(PlainOldDataType::Float32, 4);
    pub const QUATD: Self = Self::new(PlainOldDataType::Float64, 4);

    // Boxes (min + max)
    pub const BOX3F: Self = Self::new(PlainOldDataType::Float32, 6);
    pub const BOX3D: Self = Self::new(PlainOldDataType::Float64, 6);
}

impl Default for DataType {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extent == 1 {
            write!(f, "{}", self.pod.name())
        } else {
            write!(f, "{}[{}]", self.pod.name(), self.extent)
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl PartialOrd for DataType {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataType {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.pod.cmp(&other.pod).then(self.extent.cmp(&other.extent))
    }
}
