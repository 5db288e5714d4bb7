//! Bundle file constants.
//!
//! Layout: a 16 byte header, chunks in write order, then the index.
//!
//! ```text
//! 0..5   magic "ABCBF"
//! 5      frozen flag (0xFF once the index is written)
//! 6..8   format version, u16 LE
//! 8..16  index position, u64 LE
//! ```
//!
//! A chunk is `[encoding: u8][stored length: u64 LE][stored bytes]`.

/// Magic bytes at the start of a bundle file.
pub const BUNDLE_MAGIC: &[u8; 5] = b"ABCBF";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Offset of the frozen flag in the header.
pub const FROZEN_OFFSET: usize = 5;

/// Offset of the version in the header.
pub const VERSION_OFFSET: usize = 6;

/// Offset of the index position in the header.
pub const INDEX_POS_OFFSET: usize = 8;

/// Version written by this library.
pub const CURRENT_VERSION: u16 = 1;

/// Oldest version this library reads.
pub const MIN_READ_VERSION: u16 = 1;

/// Frozen flag value once the archive is finalized.
pub const FROZEN_FLAG: u8 = 0xFF;

/// Frozen flag value while the archive is being written.
pub const NOT_FROZEN_FLAG: u8 = 0x00;

/// Size of a chunk header (encoding byte + stored length).
pub const CHUNK_HEADER_SIZE: usize = 9;

/// Chunk stored verbatim.
pub const ENCODING_RAW: u8 = 0;

/// Chunk stored as `[raw length: u64 LE][zlib stream]`.
pub const ENCODING_ZLIB: u8 = 1;

/// Time sampling id marker for compound properties in the index.
pub const NO_TIME_SAMPLING: u32 = u32::MAX;

/// Minimum valid chunk position (after header).
pub const MIN_CHUNK_POS: u64 = HEADER_SIZE as u64;

/// True if `version` is in the readable range.
#[inline]
pub const fn is_supported_version(version: u16) -> bool {
    version >= MIN_READ_VERSION && version <= CURRENT_VERSION
}
