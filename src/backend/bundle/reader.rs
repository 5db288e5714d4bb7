//! Bundle file reader.

use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use super::codec::decode_index;
use super::compression::decompress;
use super::format::*;
use super::stream::IStreams;
use crate::backend::{ChunkRef, FormatMarker, StoreIndex, StoreReader};
use crate::util::{Error, Result};

/// Read access to a finished bundle.
///
/// Opening validates the header and the whole index up front; chunk reads
/// are bounds-checked against the chunk region.
pub struct BundleReader {
    streams: IStreams,
    version: u16,
    index_pos: u64,
    index: StoreIndex,
}

impl BundleReader {
    pub fn open(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let streams = IStreams::open(path, use_mmap)?;
        let reader = Self::from_streams(streams);
        if let Err(e) = &reader {
            tracing::warn!(path = %path.display(), error = %e, "bundle failed validation");
        }
        reader
    }

    fn from_streams(streams: IStreams) -> Result<Self> {
        let size = streams.size();
        if size < HEADER_SIZE as u64 {
            return Err(Error::invalid_format(format!("{} byte file is too small for a bundle", size)));
        }

        let header = streams.read_bytes(0, HEADER_SIZE)?;
        let (version, index_pos) = parse_header(&header)?;
        if index_pos < MIN_CHUNK_POS || index_pos > size {
            return Err(Error::invalid_format(format!("index position {} outside file of {} bytes", index_pos, size)));
        }

        let index_bytes = streams.read_bytes(index_pos, (size - index_pos) as usize)?;
        let index = decode_index(&index_bytes)?;
        index.validate()?;

        for entry in &index.properties {
            for sample in &entry.samples {
                let pos = sample.chunk.0;
                if !sample.chunk.is_empty() && (pos < MIN_CHUNK_POS || pos >= index_pos) {
                    return Err(Error::invalid_format(format!(
                        "sample of '{}' points at {} outside the chunk region",
                        entry.header.name, pos
                    )));
                }
            }
        }

        tracing::debug!(
            version,
            size,
            mmap = streams.is_mmap(),
            objects = index.objects.len(),
            properties = index.properties.len(),
            "bundle opened for read"
        );

        Ok(Self {
            streams,
            version,
            index_pos,
            index,
        })
    }

    pub fn version(&self) -> u16 {
        self.version
    }
}

/// Validate magic, frozen flag and version; return (version, index position).
fn parse_header(header: &[u8]) -> Result<(u16, u64)> {
    if &header[..BUNDLE_MAGIC.len()] != BUNDLE_MAGIC {
        return Err(Error::invalid_format("bad bundle magic"));
    }
    if header[FROZEN_OFFSET] != FROZEN_FLAG {
        return Err(Error::invalid_format("bundle was never finished"));
    }
    let version = LittleEndian::read_u16(&header[VERSION_OFFSET..INDEX_POS_OFFSET]);
    if !is_supported_version(version) {
        return Err(Error::invalid_format(format!(
            "bundle version {} outside supported range {}..={}",
            version, MIN_READ_VERSION, CURRENT_VERSION
        )));
    }
    let index_pos = LittleEndian::read_u64(&header[INDEX_POS_OFFSET..HEADER_SIZE]);
    Ok((version, index_pos))
}

impl StoreReader for BundleReader {
    fn format(&self) -> FormatMarker {
        FormatMarker {
            kind: "bundle",
            version: self.version,
        }
    }

    fn read_chunk(&self, chunk: ChunkRef) -> Result<Vec<u8>> {
        if chunk.is_empty() {
            return Ok(Vec::new());
        }
        let pos = chunk.0;
        let data_pos = pos + CHUNK_HEADER_SIZE as u64;
        if pos < MIN_CHUNK_POS || data_pos > self.index_pos {
            return Err(Error::invalid_format(format!("chunk at {} outside the chunk region", pos)));
        }

        let head = self.streams.read_bytes(pos, CHUNK_HEADER_SIZE)?;
        let encoding = head[0];
        let len = LittleEndian::read_u64(&head[1..]);
        if len > self.index_pos - data_pos {
            return Err(Error::invalid_format(format!("chunk at {} claims {} bytes", pos, len)));
        }

        let stored = self.streams.read_bytes(data_pos, len as usize)?;
        match encoding {
            ENCODING_RAW => Ok(stored),
            ENCODING_ZLIB => decompress(&stored),
            other => Err(Error::invalid_format(format!("unknown chunk encoding {}", other))),
        }
    }

    fn index(&self) -> &StoreIndex {
        &self.index
    }
}
