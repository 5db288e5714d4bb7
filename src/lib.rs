//! # Alembic Core
//!
//! The abstract object/property storage model of the Alembic (.abc)
//! interchange format: typed, time-sampled samples organized into a tree
//! of objects and compound properties, with content-keyed deduplication of
//! sample data and interpolation-ready time sampling.
//!
//! Original Alembic format and C++ library developed by Sony Pictures Imageworks
//! and Industrial Light & Magic. All rights to the original belong to the authors.
//! This is an independent Rust implementation of its core data model.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (POD, DataType, Dimensions, errors)
//! - [`core`] - Samples, keys, headers, metadata, time sampling
//! - [`backend`] - Storage contract, in-memory store and bundle files
//! - [`abc`] - Read/write API (IArchive, OArchive, objects, properties)
//! - [`config`] - Archive options
//!
//! ## Example
//!
//! ```
//! use alembic_core::prelude::*;
//! use alembic_core::backend::MemoryStore;
//!
//! # fn main() -> alembic_core::Result<()> {
//! let store = MemoryStore::new("scene");
//! let archive = OArchive::in_memory(&store, WriteOptions::default())?;
//! let geo = archive.top()?.create_child("geo")?;
//! let ids = geo.properties().create_array("ids", DataType::INT32, 0)?;
//! ids.set_values(&[1i32, 2, 3])?;
//! archive.close()?;
//!
//! let archive = IArchive::open_memory(&store, ReadOptions::default())?;
//! let ids = archive.find_object("/geo")?.properties()?.array("ids")?;
//! assert_eq!(ids.get_values::<i32>(0)?, vec![1, 2, 3]);
//! # Ok(())
//! # }
//! ```

pub mod abc;
pub mod backend;
pub mod config;
pub mod core;
pub mod util;

// Re-export commonly used types
pub use util::{DataType, Dimensions, Error, ErrorKind, PlainOldDataType, Result};

/// Full library version, including the build date.
pub fn library_version() -> String {
    format!(
        "Alembic Core {} (built {})",
        env!("CARGO_PKG_VERSION"),
        env!("ALEMBIC_CORE_BUILD_DATE")
    )
}

/// Library version number only.
pub fn library_version_short() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::abc::{
        IArchive, IArrayProperty, ICompoundProperty, IObject, IProperty, IScalarProperty, OArchive,
        OArrayProperty, OCompoundProperty, OObject, OScalarProperty,
    };
    pub use crate::config::{ExistingPolicy, ReadOptions, WriteOptions};
    pub use crate::core::{
        ArraySample, MetaData, PropertyHeader, PropertyType, SampleInterp, SampleKey, SampleSelector,
        TimeSampling,
    };
    pub use crate::util::{
        Bool, DataType, Dimensions, Error, ErrorKind, PlainOldDataType, Result, SampleElement, Vec2,
        Vec3, Vec4,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(library_version().starts_with("Alembic Core "));
        assert!(library_version().contains(library_version_short()));
    }
}
