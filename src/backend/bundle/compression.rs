//! zlib chunk encoding.
//!
//! Compressed chunks carry their uncompressed size in an 8 byte prefix so
//! the reader can size the buffer and reject truncated streams.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::util::{Error, Result};

/// Deflate never expands a stream by more than this factor.
const MAX_DEFLATE_RATIO: u64 = 1032;

/// Compress `data` at `level` (0-9).
///
/// Returns `None` when compression would not save space, in which case
/// the chunk should be stored raw.
pub fn compress(data: &[u8], level: u32) -> Result<Option<Vec<u8>>> {
    if level == 0 || data.is_empty() {
        return Ok(None);
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;

    if compressed.len() + 8 >= data.len() {
        return Ok(None);
    }

    let mut out = Vec::with_capacity(8 + compressed.len());
    out.extend_from_slice(&(data.len() as u64).to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(Some(out))
}

/// Inverse of [`compress`]. Any inconsistency is a format error.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let (size, stream) = data
        .split_first_chunk::<8>()
        .ok_or_else(|| Error::invalid_format("compressed chunk lacks its size prefix"))?;
    let expected = u64::from_le_bytes(*size);
    let bound = (stream.len() as u64).saturating_mul(MAX_DEFLATE_RATIO);
    if expected > bound {
        return Err(Error::invalid_format(format!(
            "compressed chunk of {} bytes claims {} uncompressed",
            stream.len(),
            expected
        )));
    }

    let mut out = Vec::with_capacity(expected.min(stream.len() as u64 * 64) as usize);
    ZlibDecoder::new(stream)
        .take(expected.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| Error::invalid_format(format!("corrupt compressed chunk: {}", e)))?;

    if out.len() as u64 != expected {
        return Err(Error::invalid_format(format!(
            "compressed chunk inflated to {} bytes, expected {}",
            out.len(),
            expected
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ErrorKind;

    #[test]
    fn test_compress_decompress() {
        let original = b"Hello, World! This is some test data that should compress well. ".repeat(100);
        let compressed = compress(&original, 6).unwrap().unwrap();
        assert!(compressed.len() < original.len());
        assert_eq!(decompress(&compressed).unwrap(), original);
    }

    #[test]
    fn test_level_zero_stores_raw() {
        assert!(compress(b"Short data", 0).unwrap().is_none());
    }

    #[test]
    fn test_incompressible_stores_raw() {
        assert!(compress(b"Hi", 9).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_stream() {
        let original = b"abcabcabcabcabcabcabcabcabcabcabcabc".repeat(10);
        let mut compressed = compress(&original, 9).unwrap().unwrap();
        assert_eq!(decompress(&compressed[..4]).unwrap_err().kind(), ErrorKind::InvalidFormat);

        // Claim a larger size than the stream inflates to.
        compressed[0] = compressed[0].wrapping_add(1);
        assert_eq!(decompress(&compressed).unwrap_err().kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn test_oversized_prefix() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"").unwrap();
        let stream = encoder.finish().unwrap();

        for claimed in [u64::MAX, u64::MAX - 1, stream.len() as u64 * 2000] {
            let mut chunk = claimed.to_le_bytes().to_vec();
            chunk.extend_from_slice(&stream);
            assert_eq!(decompress(&chunk).unwrap_err().kind(), ErrorKind::InvalidFormat);
        }

        let mut chunk = 0u64.to_le_bytes().to_vec();
        chunk.extend_from_slice(&stream);
        assert!(decompress(&chunk).unwrap().is_empty());
    }
}
