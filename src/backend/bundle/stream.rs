//! Byte streams over bundle files.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use memmap2::Mmap;
use parking_lot::Mutex;

use crate::util::{Error, Result};

/// Buffered output stream that tracks its position.
pub struct OStream {
    writer: BufWriter<File>,
    pos: u64,
}

impl OStream {
    /// Create (truncating) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::with_capacity(2 * 1024 * 1024, file),
            pos: 0,
        })
    }

    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.pos += 8;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.writer.write_u16::<LittleEndian>(value)?;
        self.pos += 2;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        self.pos += 1;
        Ok(())
    }

    /// Seek to an absolute position.
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        self.writer.flush()?;
        self.pos = self.writer.seek(SeekFrom::Start(pos))?;
        Ok(self.pos)
    }

    /// Hand buffered bytes to the OS.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush buffers and sync file contents to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }
}

enum StreamsInner {
    /// Memory-mapped file.
    Mmap(Mmap),
    /// Plain file access, serialized through a lock.
    File(Mutex<File>),
}

/// Random-access input over a bundle file.
pub struct IStreams {
    inner: StreamsInner,
    size: u64,
}

impl IStreams {
    /// Open `path`, memory-mapping it when `use_mmap` is set.
    pub fn open(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        let inner = if use_mmap && size > 0 {
            // Safety: the file is opened read-only and finished bundles are
            // never modified in place; writers replace them by rename.
            let mmap = unsafe { Mmap::map(&file) }?;
            StreamsInner::Mmap(mmap)
        } else {
            StreamsInner::File(Mutex::new(file))
        };
        Ok(Self { inner, size })
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn is_mmap(&self) -> bool {
        matches!(self.inner, StreamsInner::Mmap(_))
    }

    /// Read `len` bytes at `pos`; reading past the end is `UnexpectedEof`.
    pub fn read_bytes(&self, pos: u64, len: usize) -> Result<Vec<u8>> {
        let end = pos
            .checked_add(len as u64)
            .filter(|end| *end <= self.size)
            .ok_or(Error::UnexpectedEof(self.size))?;

        match &self.inner {
            StreamsInner::Mmap(mmap) => Ok(mmap[pos as usize..end as usize].to_vec()),
            StreamsInner::File(file) => {
                let mut f = file.lock();
                f.seek(SeekFrom::Start(pos))?;
                let mut buf = vec![0u8; len];
                f.read_exact(&mut buf)?;
                Ok(buf)
            }
        }
    }

    pub fn read_u64(&self, pos: u64) -> Result<u64> {
        let bytes = self.read_bytes(pos, 8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes);
        Ok(u64::from_le_bytes(buf))
    }
}
