//! Time values and typed sample elements.
//!
//! [`SampleElement`] ties a Rust type to the [`DataType`] it is stored as,
//! so writers can hand over `&[Vec3]` and readers can get `Vec<Vec3>` back
//! without spelling out pods and extents.

pub use glam::{DMat3, DMat4, DQuat, DVec2, DVec3, DVec4, IVec2, IVec3, IVec4, Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

use bytemuck::Pod;
use half::f16;

use super::{AlembicPod, Bool, DataType, PlainOldDataType};

/// Chrono type - time value (seconds).
pub type Chrono = f64;

/// Two times closer than this are treated as the same sample time.
pub const CHRONO_EPSILON: Chrono = 1e-9;

/// A Rust type whose in-memory layout is exactly one stored element.
///
/// `size_of::<Self>()` must equal `DATA_TYPE.num_bytes()` and the layout
/// must be `DATA_TYPE.extent` consecutive little-endian pod values.
pub trait SampleElement: Pod {
    /// Data type this element is stored as.
    const DATA_TYPE: DataType;
}

impl<T: AlembicPod> SampleElement for T {
    const DATA_TYPE: DataType = DataType::scalar(T::POD_TYPE);
}

/// Fixed-size arrays become elements with extent `N` (N must not exceed 255).
impl<T: AlembicPod, const N: usize> SampleElement for [T; N] {
    const DATA_TYPE: DataType = DataType::new(T::POD_TYPE, N as u8);
}

macro_rules! impl_glam_element {
    ($($ty:ty => $pod:ident * $extent:expr),* $(,)?) => {
        $(
            impl SampleElement for $ty {
                const DATA_TYPE: DataType = DataType::new(PlainOldDataType::$pod, $extent);
            }
        )*
    };
}

impl_glam_element! {
    Vec2 => Float32 * 2,
    Vec3 => Float32 * 3,
    Vec4 => Float32 * 4,
    DVec2 => Float64 * 2,
    DVec3 => Float64 * 3,
    DVec4 => Float64 * 4,
    IVec2 => Int32 * 2,
    IVec3 => Int32 * 3,
    IVec4 => Int32 * 4,
    Mat3 => Float32 * 9,
    Mat4 => Float32 * 16,
    DMat3 => Float64 * 9,
    DMat4 => Float64 * 16,
    Quat => Float32 * 4,
    DQuat => Float64 * 4,
}

/// Name of the Rust element type, for diagnostics.
pub fn element_name<T: SampleElement>() -> &'static str {
    std::any::type_name::<T>()
}

// Compile-time layout checks for the hand-written impls.
const _: () = {
    assert!(std::mem::size_of::<Vec3>() == 12);
    assert!(std::mem::size_of::<Mat4>() == 64);
    assert!(std::mem::size_of::<DMat3>() == 72);
    assert!(std::mem::size_of::<Quat>() == 16);
    assert!(std::mem::size_of::<f16>() == 2);
    assert!(std::mem::size_of::<Bool>() == 1);
};
