//! Read/write object API.
//!
//! - [`OArchive`] / [`IArchive`] - archive lifecycle over a backend store
//! - [`OObject`] / [`IObject`] - hierarchical objects
//! - [`OCompoundProperty`] / [`ICompoundProperty`] - property containers
//! - [`OScalarProperty`] / [`IScalarProperty`] - one element per sample
//! - [`OArrayProperty`] / [`IArrayProperty`] - arrays with explicit dimensions
//! - [`IProperty`] - reader property dispatched on its type
//!
//! ## Example
//!
//! ```no_run
//! use alembic_core::prelude::*;
//!
//! # fn main() -> alembic_core::Result<()> {
//! let archive = OArchive::create("points.abcb")?;
//! let ts = archive.add_time_sampling(TimeSampling::uniform(1.0 / 24.0, 0.0)?)?;
//! let obj = archive.top()?.create_child("points")?;
//! let p = obj.properties().create_array("P", DataType::VEC3F, ts)?;
//! p.set_values(&[Vec3::ZERO, Vec3::ONE])?;
//! archive.close()?;
//!
//! let archive = IArchive::open("points.abcb")?;
//! let p = archive.find_object("/points")?.properties()?.array("P")?;
//! let pts: Vec<Vec3> = p.get_values(1.0 / 48.0)?;
//! # Ok(())
//! # }
//! ```

mod archive;
mod object;
mod property;
mod writer;

pub use archive::{IArchive, OArchive};
pub use object::{IObject, OObject};
pub use property::{
    IArrayProperty, ICompoundProperty, IProperty, IScalarProperty, OArrayProperty, OCompoundProperty,
    OScalarProperty,
};
