//! Binary encoding of the bundle index.
//!
//! All integers are little-endian. Strings are a `u32` byte length followed
//! by UTF-8. Counts are validated against the bytes that remain so a
//! corrupt count cannot trigger a huge allocation.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::format::NO_TIME_SAMPLING;
use crate::backend::{ChunkRef, ObjectEntry, ObjectRef, PropertyEntry, PropertyRef, SampleRecord, StoreIndex};
use crate::core::{
    ChunkKey, Digest, MetaData, ObjectHeader, PropertyHeader, PropertyType, TimeSampling,
    TimeSamplingRegistry,
};
use crate::util::{DataType, Dimensions, Error, PlainOldDataType, Result};

/// Serialize an index.
pub fn encode_index(index: &StoreIndex) -> Vec<u8> {
    let mut out = Vec::new();
    let mut enc = Encoder { out: &mut out };

    enc.u32(index.time_samplings.len() as u32);
    for (ts, max_samples) in index.time_samplings.parts() {
        let (tag, time_per_cycle, times) = ts.to_stored();
        enc.u8(tag);
        enc.f64(time_per_cycle);
        enc.u32(times.len() as u32);
        for t in times {
            enc.f64(t);
        }
        enc.u64(max_samples);
    }

    enc.str(&index.archive_metadata.serialize());

    enc.u32(index.objects.len() as u32);
    for obj in &index.objects {
        enc.str(&obj.header.name);
        enc.str(&obj.header.full_name);
        enc.str(&obj.header.meta_data.serialize());
        enc.refs(obj.children.iter().map(|c| c.0));
        enc.refs(obj.properties.iter().map(|p| p.0));
    }

    enc.u32(index.properties.len() as u32);
    for prop in &index.properties {
        let header = &prop.header;
        enc.str(&header.name);
        enc.u8(header.property_type.as_u8());
        let dt = header.data_type.unwrap_or(DataType::UNKNOWN);
        enc.u8(dt.pod.as_u8());
        enc.u8(dt.extent);
        enc.u32(header.time_sampling_index.unwrap_or(NO_TIME_SAMPLING));
        enc.str(&header.meta_data.serialize());
        enc.refs(prop.children.iter().map(|c| c.0));
        enc.u32(prop.samples.len() as u32);
        for sample in &prop.samples {
            enc.u64(sample.chunk.0);
            enc.bytes(sample.key.digest.as_bytes());
            enc.u64(sample.key.num_bytes);
            enc.u8(sample.dims.rank() as u8);
            for d in sample.dims.sizes() {
                enc.u64(*d);
            }
        }
    }

    out
}

/// Parse an index. Structure is not validated here, see [`StoreIndex::validate`].
pub fn decode_index(bytes: &[u8]) -> Result<StoreIndex> {
    let mut dec = Decoder {
        cur: Cursor::new(bytes),
    };

    let num_ts = dec.count(8 + 1 + 4 + 8)?;
    let mut parts = Vec::with_capacity(num_ts);
    for _ in 0..num_ts {
        let tag = dec.u8()?;
        let time_per_cycle = dec.f64()?;
        let num_times = dec.count(8)?;
        let times = (0..num_times).map(|_| dec.f64()).collect::<Result<Vec<_>>>()?;
        let max_samples = dec.u64()?;
        parts.push((TimeSampling::from_stored(tag, time_per_cycle, times)?, max_samples));
    }
    let time_samplings = TimeSamplingRegistry::from_parts(parts)?;

    let archive_metadata = MetaData::parse(&dec.string()?);

    let num_objects = dec.count(4 * 5)?;
    let mut objects = Vec::with_capacity(num_objects);
    for _ in 0..num_objects {
        let name = dec.string()?;
        let full_name = dec.string()?;
        let meta_data = MetaData::parse(&dec.string()?);
        let children = dec.refs()?.into_iter().map(ObjectRef).collect();
        let properties = dec.refs()?.into_iter().map(PropertyRef).collect();
        objects.push(ObjectEntry {
            header: ObjectHeader {
                name,
                full_name,
                meta_data,
            },
            children,
            properties,
        });
    }

    let num_props = dec.count(4 + 3 + 4 + 4 + 4 + 4)?;
    let mut properties = Vec::with_capacity(num_props);
    for _ in 0..num_props {
        let name = dec.string()?;
        let property_type = PropertyType::from_u8(dec.u8()?)
            .ok_or_else(|| Error::invalid_format(format!("bad property type for '{}'", name)))?;
        let data_type = DataType::new(PlainOldDataType::from_u8(dec.u8()?), dec.u8()?);
        let ts = dec.u32()?;
        let meta_data = MetaData::parse(&dec.string()?);
        let children = dec.refs()?.into_iter().map(PropertyRef).collect();

        let num_samples = dec.count(8 + 16 + 8 + 1)?;
        let mut samples = Vec::with_capacity(num_samples);
        for _ in 0..num_samples {
            let chunk = ChunkRef(dec.u64()?);
            let mut digest = [0u8; 16];
            dec.fill(&mut digest)?;
            let num_bytes = dec.u64()?;
            let rank = dec.u8()? as usize;
            let dims = (0..rank).map(|_| dec.u64()).collect::<Result<Vec<_>>>()?;
            samples.push(SampleRecord {
                chunk,
                key: ChunkKey {
                    digest: Digest(digest),
                    num_bytes,
                    pod: data_type.pod,
                    extent: data_type.extent,
                },
                dims: Dimensions::from(dims),
            });
        }

        let header = match property_type {
            PropertyType::Compound => PropertyHeader::compound(name),
            PropertyType::Scalar => PropertyHeader::scalar(name, data_type, ts),
            PropertyType::Array => PropertyHeader::array(name, data_type, ts),
        };
        properties.push(PropertyEntry {
            header: header.with_meta_data(meta_data),
            children,
            samples,
        });
    }

    if dec.remaining() != 0 {
        return Err(Error::invalid_format(format!("{} trailing bytes after index", dec.remaining())));
    }

    Ok(StoreIndex {
        objects,
        properties,
        time_samplings,
        archive_metadata,
    })
}

struct Encoder<'a> {
    out: &'a mut Vec<u8>,
}

// Writes into a Vec cannot fail.
impl Encoder<'_> {
    fn u8(&mut self, v: u8) {
        self.out.push(v);
    }

    fn u32(&mut self, v: u32) {
        let _ = self.out.write_u32::<LittleEndian>(v);
    }

    fn u64(&mut self, v: u64) {
        let _ = self.out.write_u64::<LittleEndian>(v);
    }

    fn f64(&mut self, v: f64) {
        let _ = self.out.write_f64::<LittleEndian>(v);
    }

    fn bytes(&mut self, v: &[u8]) {
        self.out.extend_from_slice(v);
    }

    fn str(&mut self, s: &str) {
        self.u32(s.len() as u32);
        self.bytes(s.as_bytes());
    }

    fn refs(&mut self, refs: impl ExactSizeIterator<Item = u32>) {
        self.u32(refs.len() as u32);
        for r in refs {
            self.u32(r);
        }
    }
}

struct Decoder<'a> {
    cur: Cursor<&'a [u8]>,
}

impl Decoder<'_> {
    fn remaining(&self) -> usize {
        let len = self.cur.get_ref().len() as u64;
        len.saturating_sub(self.cur.position()) as usize
    }

    fn truncated(_: std::io::Error) -> Error {
        Error::invalid_format("truncated index")
    }

    fn u8(&mut self) -> Result<u8> {
        self.cur.read_u8().map_err(Self::truncated)
    }

    fn u32(&mut self) -> Result<u32> {
        self.cur.read_u32::<LittleEndian>().map_err(Self::truncated)
    }

    fn u64(&mut self) -> Result<u64> {
        self.cur.read_u64::<LittleEndian>().map_err(Self::truncated)
    }

    fn f64(&mut self) -> Result<f64> {
        self.cur.read_f64::<LittleEndian>().map_err(Self::truncated)
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.cur.read_exact(buf).map_err(Self::truncated)
    }

    /// Element count, rejected if `min_size` bytes per element cannot fit.
    fn count(&mut self, min_size: usize) -> Result<usize> {
        let n = self.u32()? as usize;
        if n.saturating_mul(min_size) > self.remaining() {
            return Err(Error::invalid_format(format!("index count {} exceeds remaining bytes", n)));
        }
        Ok(n)
    }

    fn string(&mut self) -> Result<String> {
        let len = self.count(1)?;
        let mut buf = vec![0u8; len];
        self.fill(&mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    fn refs(&mut self) -> Result<Vec<u32>> {
        let n = self.count(4)?;
        (0..n).map(|_| self.u32()).collect()
    }
}
