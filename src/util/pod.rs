//! Plain Old Data types - fundamental element kinds of every sample.

use bytemuck::{Pod, Zeroable};
use half::f16;
use std::fmt;

use super::{Error, Result};

/// Plain Old Data type enum - represents basic storage types.
///
/// Numeric kinds have a fixed size and little-endian binary representation.
/// `String` and `Wstring` are variable length: their payload is a sequence
/// of NUL-terminated code-unit runs (UTF-8 bytes or UTF-32 units).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PlainOldDataType {
    /// Boolean (stored as u8: 0 = false, non-zero = true)
    Boolean = 0,
    /// Unsigned 8-bit integer
    Uint8 = 1,
    /// Signed 8-bit integer
    Int8 = 2,
    /// Unsigned 16-bit integer
    Uint16 = 3,
    /// Signed 16-bit integer
    Int16 = 4,
    /// Unsigned 32-bit integer
    Uint32 = 5,
    /// Signed 32-bit integer
    Int32 = 6,
    /// Unsigned 64-bit integer
    Uint64 = 7,
    /// Signed 64-bit integer
    Int64 = 8,
    /// 16-bit floating point (IEEE 754 half precision)
    Float16 = 9,
    /// 32-bit floating point (IEEE 754 single precision)
    Float32 = 10,
    /// 64-bit floating point (IEEE 754 double precision)
    Float64 = 11,
    /// UTF-8 string
    String = 12,
    /// Wide string (UTF-32 code units in storage)
    Wstring = 13,
    /// Unknown/invalid type
    #[default]
    Unknown = 127,
}

impl PlainOldDataType {
    /// Number of POD types (excluding Unknown)
    pub const COUNT: usize = 14;

    /// Every known POD kind, in storage-tag order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Boolean,
        Self::Uint8,
        Self::Int8,
        Self::Uint16,
        Self::Int16,
        Self::Uint32,
        Self::Int32,
        Self::Uint64,
        Self::Int64,
        Self::Float16,
        Self::Float32,
        Self::Float64,
        Self::String,
        Self::Wstring,
    ];

    /// Returns the size in bytes of a single value of this type.
    ///
    /// For `String`/`Wstring` this is the width of one stored code unit
    /// (the NUL terminator has the same width).
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Boolean => 1,
            Self::Uint8 => 1,
            Self::Int8 => 1,
            Self::Uint16 => 2,
            Self::Int16 => 2,
            Self::Uint32 => 4,
            Self::Int32 => 4,
            Self::Uint64 => 8,
            Self::Int64 => 8,
            Self::Float16 => 2,
            Self::Float32 => 4,
            Self::Float64 => 8,
            Self::String => 1,
            Self::Wstring => 4,
            Self::Unknown => 0,
        }
    }

    /// Returns the name of this type as a string.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "bool_t",
            Self::Uint8 => "uint8_t",
            Self::Int8 => "int8_t",
            Self::Uint16 => "uint16_t",
            Self::Int16 => "int16_t",
            Self::Uint32 => "uint32_t",
            Self::Int32 => "int32_t",
            Self::Uint64 => "uint64_t",
            Self::Int64 => "int64_t",
            Self::Float16 => "float16_t",
            Self::Float32 => "float32_t",
            Self::Float64 => "float64_t",
            Self::String => "string",
            Self::Wstring => "wstring",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse POD type from its name string.
    pub fn from_name(name: &str) -> Self {
        match name {
            "bool_t" => Self::Boolean,
            "uint8_t" => Self::Uint8,
            "int8_t" => Self::Int8,
            "uint16_t" => Self::Uint16,
            "int16_t" => Self::Int16,
            "uint32_t" => Self::Uint32,
            "int32_t" => Self::Int32,
            "uint64_t" => Self::Uint64,
            "int64_t" => Self::Int64,
            "float16_t" => Self::Float16,
            "float32_t" => Self::Float32,
            "float64_t" => Self::Float64,
            "string" => Self::String,
            "wstring" => Self::Wstring,
            _ => Self::Unknown,
        }
    }

    /// Convert from the storage tag.
    pub const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Boolean,
            1 => Self::Uint8,
            2 => Self::Int8,
            3 => Self::Uint16,
            4 => Self::Int16,
            5 => Self::Uint32,
            6 => Self::Int32,
            7 => Self::Uint64,
            8 => Self::Int64,
            9 => Self::Float16,
            10 => Self::Float32,
            11 => Self::Float64,
            12 => Self::String,
            13 => Self::Wstring,
            _ => Self::Unknown,
        }
    }

    /// Storage tag of this type.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns true if this is a numeric type (int or float).
    #[inline]
    pub const fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Returns true if this is an integer type.
    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Uint8
                | Self::Int8
                | Self::Uint16
                | Self::Int16
                | Self::Uint32
                | Self::Int32
                | Self::Uint64
                | Self::Int64
        )
    }

    /// Returns true if this is a floating point type.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    /// Returns true if this is a string type.
    #[inline]
    pub const fn is_string(self) -> bool {
        matches!(self, Self::String | Self::Wstring)
    }
}

impl fmt::Display for PlainOldDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// === Read-pod conversion ===

/// Intermediate value used while converting between numeric pods.
#[derive(Clone, Copy)]
enum PodValue {
    Int(i128),
    Float(f64),
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

fn decode_value(pod: PlainOldDataType, bytes: &[u8]) -> PodValue {
    use PlainOldDataType as P;
    match pod {
        P::Boolean => PodValue::Int((bytes[0] != 0) as i128),
        P::Uint8 => PodValue::Int(bytes[0] as i128),
        P::Int8 => PodValue::Int(bytes[0] as i8 as i128),
        P::Uint16 => PodValue::Int(u16::from_le_bytes(le_array(bytes)) as i128),
        P::Int16 => PodValue::Int(i16::from_le_bytes(le_array(bytes)) as i128),
        P::Uint32 => PodValue::Int(u32::from_le_bytes(le_array(bytes)) as i128),
        P::Int32 => PodValue::Int(i32::from_le_bytes(le_array(bytes)) as i128),
        P::Uint64 => PodValue::Int(u64::from_le_bytes(le_array(bytes)) as i128),
        P::Int64 => PodValue::Int(i64::from_le_bytes(le_array(bytes)) as i128),
        P::Float16 => PodValue::Float(f16::from_le_bytes(le_array(bytes)).to_f64()),
        P::Float32 => PodValue::Float(f32::from_le_bytes(le_array(bytes)) as f64),
        P::Float64 => PodValue::Float(f64::from_le_bytes(le_array(bytes))),
        P::String | P::Wstring | P::Unknown => PodValue::Int(0),
    }
}

fn encode_value(pod: PlainOldDataType, value: PodValue, out: &mut Vec<u8>) {
    use PlainOldDataType as P;
    let (i, f) = match value {
        PodValue::Int(i) => (i, i as f64),
        PodValue::Float(f) => (f as i128, f),
    };
    match pod {
        P::Boolean => out.push(match value {
            PodValue::Int(i) => (i != 0) as u8,
            PodValue::Float(f) => (f != 0.0) as u8,
        }),
        P::Uint8 => out.push(i as u8),
        P::Int8 => out.push(i as i8 as u8),
        P::Uint16 => out.extend_from_slice(&(i as u16).to_le_bytes()),
        P::Int16 => out.extend_from_slice(&(i as i16).to_le_bytes()),
        P::Uint32 => out.extend_from_slice(&(i as u32).to_le_bytes()),
        P::Int32 => out.extend_from_slice(&(i as i32).to_le_bytes()),
        P::Uint64 => out.extend_from_slice(&(i as u64).to_le_bytes()),
        P::Int64 => out.extend_from_slice(&(i as i64).to_le_bytes()),
        P::Float16 => out.extend_from_slice(&f16::from_f64(f).to_le_bytes()),
        P::Float32 => out.extend_from_slice(&(f as f32).to_le_bytes()),
        P::Float64 => out.extend_from_slice(&f.to_le_bytes()),
        P::String | P::Wstring | P::Unknown => {}
    }
}

/// Convert a buffer of `from` values into a buffer of `to` values.
///
/// Integer narrowing wraps, float to integer truncates toward zero and
/// saturates. Only numeric and boolean pods can be converted.
pub fn convert_pod_buffer(
    bytes: &[u8],
    from: PlainOldDataType,
    to: PlainOldDataType,
) -> Result<Vec<u8>> {
    let convertible = |p: PlainOldDataType| p.is_numeric() || p == PlainOldDataType::Boolean;
    if !convertible(from) || !convertible(to) {
        return Err(Error::type_mismatch(from, to));
    }
    if from == to {
        return Ok(bytes.to_vec());
    }

    let width = from.num_bytes();
    if bytes.len() % width != 0 {
        return Err(Error::invalid_format(format!(
            "{} bytes is not a whole number of {} values",
            bytes.len(),
            from
        )));
    }

    let mut out = Vec::with_capacity(bytes.len() / width * to.num_bytes());
    for chunk in bytes.chunks_exact(width) {
        encode_value(to, decode_value(from, chunk), &mut out);
    }
    Ok(out)
}

// === POD Trait for type-safe conversions ===

/// Trait for primitive types that can be stored as Alembic POD data.
pub trait AlembicPod: Pod + Zeroable + Copy + Default {
    /// The corresponding PlainOldDataType enum value.
    const POD_TYPE: PlainOldDataType;

    /// Size of this type in bytes.
    const SIZE: usize = std::mem::size_of::<Self>();
}

macro_rules! impl_alembic_pod {
    ($($ty:ty => $pod:ident),* $(,)?) => {
        $(
            impl AlembicPod for $ty {
                const POD_TYPE: PlainOldDataType = PlainOldDataType::$pod;
            }
        )*
    };
}

impl_alembic_pod! {
    u8 => Uint8,
    i8 => Int8,
    u16 => Uint16,
    i16 => Int16,
    u32 => Uint32,
    i32 => Int32,
    u64 => Uint64,
    i64 => Int64,
    f16 => Float16,
    f32 => Float32,
    f64 => Float64,
}

/// Boolean type with guaranteed 1-byte storage.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Bool(u8);

impl Bool {
    pub const TRUE: Self = Self(1);
    pub const FALSE: Self = Self(0);

    #[inline]
    pub const fn new(v: bool) -> Self {
        Self(v as u8)
    }

    #[inline]
    pub const fn get(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Bool {
    #[inline]
    fn from(v: bool) -> Self {
        Self::new(v)
    }
}

impl From<Bool> for bool {
    #[inline]
    fn from(v: Bool) -> Self {
        v.get()
    }
}

impl fmt::Debug for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl AlembicPod for Bool {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Boolean;
}
