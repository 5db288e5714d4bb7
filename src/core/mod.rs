//! Core layer - the abstract storage model.
//!
//! This module provides:
//! - [`ArraySample`] - typed sample data, scalar samples are rank 0
//! - [`SampleKey`] / [`ChunkKey`] - content digests used for dedup
//! - [`TimeSampling`] / [`TimeSamplingRegistry`] - when samples were taken
//! - [`MetaData`] - Key-value metadata storage
//! - [`ObjectHeader`] / [`PropertyHeader`] - Headers for objects and properties
//! - [`SampleSelector`] / [`SampleInterp`] - Sample selection by index or time
//! - [`ReadArraySampleCache`] - per-reader decoded sample cache

mod time_sampling;
mod metadata;
mod header;
mod sample;
mod key;
mod cache;

pub use time_sampling::{TimeSampling, TimeSamplingRegistry, TimeSamplingType};
pub use metadata::{MetaData, SchemaMatching};
pub use header::{ObjectHeader, PropertyHeader, PropertyType};
pub use sample::{ArraySample, SampleInterp, SampleSelector};
pub use key::{ChunkKey, Digest, SampleKey};
pub use cache::{ReadArraySampleCache, SampleCacheKey};
