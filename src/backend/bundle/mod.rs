//! Single-file bundle store.
//!
//! A bundle is a header, the sample chunks in the order they were first
//! written, and an index describing the object/property tree. The header
//! carries a frozen flag that is only set once the index is complete, so an
//! interrupted write never validates. See [`format`] for the layout.

pub mod format;

mod codec;
mod compression;
mod reader;
mod stream;
mod writer;

pub use reader::BundleReader;
pub use writer::BundleWriter;
