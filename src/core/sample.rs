//! Sample values and sample selection.
//!
//! An [`ArraySample`] is one time slice of a scalar or array property: a
//! typed buffer plus its [`Dimensions`]. Scalar values are array samples
//! of rank 0.

use std::borrow::Cow;

use crate::util::{
    element_name, Chrono, DataType, Dimensions, Error, PlainOldDataType, Result, SampleElement,
};

#[derive(Clone, Debug, PartialEq)]
enum SampleBuffer {
    /// Little-endian values of a fixed-width pod.
    Bytes(Vec<u8>),
    /// One entry per string value, `num_points * extent` of them.
    Strings(Vec<String>),
}

/// Immutable typed sample data.
#[derive(Clone, Debug, PartialEq)]
pub struct ArraySample {
    data_type: DataType,
    dims: Dimensions,
    buffer: SampleBuffer,
}

impl ArraySample {
    /// Build from raw little-endian bytes of a fixed-width pod.
    pub fn from_bytes(data_type: DataType, dims: Dimensions, bytes: Vec<u8>) -> Result<Self> {
        data_type.validate()?;
        if data_type.is_string() {
            return Err(Error::type_mismatch("fixed-width pod", data_type));
        }
        let expected = data_type.checked_num_bytes(&dims).ok_or_else(|| {
            Error::invalid_argument(format!("dimensions {} of {} overflow the address space", dims, data_type))
        })?;
        if bytes.len() != expected {
            return Err(Error::invalid_argument(format!(
                "{} bytes supplied for {} x {}, expected {}",
                bytes.len(),
                dims,
                data_type,
                expected
            )));
        }
        Ok(Self {
            data_type,
            dims,
            buffer: SampleBuffer::Bytes(bytes),
        })
    }

    /// One-dimensional sample from a typed slice.
    pub fn from_slice<T: SampleElement>(values: &[T]) -> Self {
        Self {
            data_type: T::DATA_TYPE,
            dims: Dimensions::d1(values.len()),
            buffer: SampleBuffer::Bytes(bytemuck::cast_slice(values).to_vec()),
        }
    }

    /// Typed slice with an explicit shape.
    pub fn from_slice_with_dims<T: SampleElement>(values: &[T], dims: Dimensions) -> Result<Self> {
        if dims.checked_num_points() != Some(values.len()) {
            return Err(Error::invalid_argument(format!(
                "{} elements do not fill dimensions {}",
                values.len(),
                dims
            )));
        }
        Ok(Self {
            data_type: T::DATA_TYPE,
            dims,
            buffer: SampleBuffer::Bytes(bytemuck::cast_slice(values).to_vec()),
        })
    }

    /// Rank-0 sample holding one element.
    pub fn scalar<T: SampleElement>(value: T) -> Self {
        Self {
            data_type: T::DATA_TYPE,
            dims: Dimensions::scalar(),
            buffer: SampleBuffer::Bytes(bytemuck::bytes_of(&value).to_vec()),
        }
    }

    /// String or wide string sample. `strings.len()` must equal
    /// `dims.num_points() * data_type.extent`; strings may not contain NUL.
    pub fn from_strings(data_type: DataType, dims: Dimensions, strings: Vec<String>) -> Result<Self> {
        data_type.validate()?;
        if !data_type.is_string() {
            return Err(Error::type_mismatch("string pod", data_type));
        }
        let expected = data_type.checked_num_values(&dims).ok_or_else(|| {
            Error::invalid_argument(format!("dimensions {} of {} overflow the address space", dims, data_type))
        })?;
        if strings.len() != expected {
            return Err(Error::invalid_argument(format!(
                "{} strings supplied for {} x {}, expected {}",
                strings.len(),
                dims,
                data_type,
                expected
            )));
        }
        if strings.iter().any(|s| s.contains('\0')) {
            return Err(Error::invalid_argument("string values may not contain NUL"));
        }
        Ok(Self {
            data_type,
            dims,
            buffer: SampleBuffer::Strings(strings),
        })
    }

    /// One-dimensional `string` sample of extent 1.
    pub fn from_strs<S: AsRef<str>>(values: &[S]) -> Result<Self> {
        Self::from_strings(
            DataType::STRING,
            Dimensions::d1(values.len()),
            values.iter().map(|s| s.as_ref().to_string()).collect(),
        )
    }

    /// One-dimensional `wstring` sample of extent 1.
    pub fn from_wstrs<S: AsRef<str>>(values: &[S]) -> Result<Self> {
        Self::from_strings(
            DataType::WSTRING,
            Dimensions::d1(values.len()),
            values.iter().map(|s| s.as_ref().to_string()).collect(),
        )
    }

    /// Rank-1 sample with zero points.
    pub fn empty(data_type: DataType) -> Self {
        let buffer = if data_type.is_string() {
            SampleBuffer::Strings(Vec::new())
        } else {
            SampleBuffer::Bytes(Vec::new())
        };
        Self {
            data_type,
            dims: Dimensions::d1(0),
            buffer,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    /// Number of elements (points).
    pub fn num_points(&self) -> usize {
        self.dims.num_points()
    }

    /// Number of pod values (`num_points * extent`).
    pub fn num_values(&self) -> usize {
        self.data_type.num_values(&self.dims)
    }

    /// True when this sample holds exactly one element.
    pub fn is_scalar_like(&self) -> bool {
        self.num_points() == 1
    }

    /// Raw bytes of a fixed-width sample, `None` for strings.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.buffer {
            SampleBuffer::Bytes(b) => Some(b),
            SampleBuffer::Strings(_) => None,
        }
    }

    /// String values, `None` for fixed-width samples.
    pub fn strings(&self) -> Option<&[String]> {
        match &self.buffer {
            SampleBuffer::Bytes(_) => None,
            SampleBuffer::Strings(s) => Some(s),
        }
    }

    /// Copy the elements out as `T`.
    ///
    /// `T` must have the sample's pod and an extent that divides the
    /// sample's extent, so `f32` reads a Vec3f sample as a flat list.
    pub fn values<T: SampleElement>(&self) -> Result<Vec<T>> {
        let want = T::DATA_TYPE;
        let compatible = want.pod == self.data_type.pod
            && want.extent > 0
            && self.data_type.extent % want.extent == 0;
        match &self.buffer {
            SampleBuffer::Bytes(bytes) if compatible => Ok(bytemuck::pod_collect_to_vec(bytes)),
            _ => Err(Error::type_mismatch(self.data_type, format!("{} ({})", want, element_name::<T>()))),
        }
    }

    /// First element as `T`.
    pub fn value<T: SampleElement>(&self) -> Result<T> {
        self.values::<T>()?
            .into_iter()
            .next()
            .ok_or(Error::SampleOutOfBounds { index: 0, count: 0 })
    }

    /// Byte stream that is hashed and stored for this sample.
    ///
    /// Fixed-width pods are stored as-is. Each string is followed by one
    /// NUL terminator: a byte for `string`, four bytes for `wstring`, whose
    /// code points are written as UTF-32LE.
    pub fn payload(&self) -> Cow<'_, [u8]> {
        match &self.buffer {
            SampleBuffer::Bytes(b) => Cow::Borrowed(b),
            SampleBuffer::Strings(strings) => {
                let mut out = Vec::new();
                for s in strings {
                    if self.data_type.pod == PlainOldDataType::Wstring {
                        for c in s.chars() {
                            out.extend_from_slice(&(c as u32).to_le_bytes());
                        }
                        out.extend_from_slice(&[0; 4]);
                    } else {
                        out.extend_from_slice(s.as_bytes());
                        out.push(0);
                    }
                }
                Cow::Owned(out)
            }
        }
    }

    /// Rebuild a sample from its stored payload.
    ///
    /// Any disagreement between payload and shape is a format error.
    pub fn from_payload(data_type: DataType, dims: Dimensions, payload: &[u8]) -> Result<Self> {
        if !data_type.is_string() {
            return Self::from_bytes(data_type, dims, payload.to_vec())
                .map_err(|e| Error::invalid_format(format!("stored sample: {}", e)));
        }

        let strings = match data_type.pod {
            PlainOldDataType::Wstring => decode_wstrings(payload)?,
            _ => decode_strings(payload)?,
        };
        let expected = data_type.checked_num_values(&dims).ok_or_else(|| {
            Error::invalid_format(format!("stored dimensions {} overflow the address space", dims))
        })?;
        if strings.len() != expected {
            return Err(Error::invalid_format(format!(
                "stored sample holds {} strings, header expects {}",
                strings.len(),
                expected
            )));
        }
        Ok(Self {
            data_type,
            dims,
            buffer: SampleBuffer::Strings(strings),
        })
    }
}

fn decode_strings(payload: &[u8]) -> Result<Vec<String>> {
    if payload.last().is_some_and(|b| *b != 0) {
        return Err(Error::invalid_format("string payload is not NUL terminated"));
    }
    let mut out = Vec::new();
    let mut start = 0;
    for (i, b) in payload.iter().enumerate() {
        if *b == 0 {
            out.push(String::from_utf8(payload[start..i].to_vec())?);
            start = i + 1;
        }
    }
    Ok(out)
}

fn decode_wstrings(payload: &[u8]) -> Result<Vec<String>> {
    if payload.len() % 4 != 0 {
        return Err(Error::invalid_format("wide string payload is not UTF-32 aligned"));
    }
    let mut out = Vec::new();
    let mut current = String::new();
    let mut terminated = true;
    for unit in payload.chunks_exact(4) {
        let code = u32::from_le_bytes([unit[0], unit[1], unit[2], unit[3]]);
        if code == 0 {
            out.push(std::mem::take(&mut current));
            terminated = true;
        } else {
            let c = char::from_u32(code)
                .ok_or_else(|| Error::invalid_format(format!("invalid code point {:#x}", code)))?;
            current.push(c);
            terminated = false;
        }
    }
    if !terminated {
        return Err(Error::invalid_format("wide string payload is not NUL terminated"));
    }
    Ok(out)
}

/// Sample selector for reading property samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SampleSelector {
    /// Select by exact index.
    Index(usize),
    /// Largest index whose time is <= the given time.
    TimeFloor(Chrono),
    /// Smallest index whose time is >= the given time.
    TimeCeil(Chrono),
    /// Index whose time is nearest; ties go to the later sample.
    TimeNear(Chrono),
}

impl SampleSelector {
    pub const fn first() -> Self {
        Self::Index(0)
    }

    pub const fn index(i: usize) -> Self {
        Self::Index(i)
    }

    pub const fn time_floor(t: Chrono) -> Self {
        Self::TimeFloor(t)
    }

    pub const fn time_ceil(t: Chrono) -> Self {
        Self::TimeCeil(t)
    }

    pub const fn time_near(t: Chrono) -> Self {
        Self::TimeNear(t)
    }
}

impl Default for SampleSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl From<usize> for SampleSelector {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<Chrono> for SampleSelector {
    fn from(time: Chrono) -> Self {
        Self::TimeNear(time)
    }
}

/// Bracketing samples for a query time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleInterp {
    /// Floor sample index.
    pub floor_index: usize,
    /// Ceil sample index.
    pub ceil_index: usize,
    /// Interpolation weight (0.0 = floor, 1.0 = ceil).
    pub alpha: f64,
}

impl SampleInterp {
    /// Query landed on (or was clamped to) one sample.
    pub fn exact(index: usize) -> Self {
        Self {
            floor_index: index,
            ceil_index: index,
            alpha: 0.0,
        }
    }

    pub fn lerp(floor: usize, ceil: usize, alpha: f64) -> Self {
        Self {
            floor_index: floor,
            ceil_index: ceil,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    pub fn is_exact(&self) -> bool {
        self.floor_index == self.ceil_index || self.alpha == 0.0
    }
}
