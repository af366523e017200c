//! Big-endian primitive reader over a seekable byte source.
//!
//! The wire format is a sequential, back-referencing grammar rather than a
//! fixed-offset table of contents, so (unlike a zero-copy `mmap` view) the
//! reader consumes its source one primitive at a time and tracks position as
//! it goes.

use std::io::Read;

use crate::error::{Error, Result};

/// Magic bytes every stream must open with.
pub const STREAM_MAGIC: u16 = 0xACED;
/// Version every stream must carry right after the magic.
pub const STREAM_VERSION: u16 = 0x0005;

/// A byte source the decoder can pull from: a file, a memory buffer, or a
/// network stream. Implementations only need to support sequential reads and
/// report how far into the stream they are.
pub trait Source {
    /// Reads exactly `n` bytes, failing with `TruncatedStream` on short read.
    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>>;

    /// Current byte offset from the start of the stream.
    fn position(&self) -> u64;
}

/// A [`Source`] backed by any [`std::io::Read`], counting bytes consumed.
pub struct CountingReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        CountingReader { inner, position: 0 }
    }
}

impl<R: Read> Source for CountingReader<R> {
    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut read = 0;
        while read < n {
            match self.inner.read(&mut buf[read..]) {
                Ok(0) => {
                    return Err(Error::TruncatedStream {
                        position: self.position,
                        needed: n - read,
                    })
                }
                Ok(k) => read += k,
                Err(e) => {
                    return Err(Error::Io {
                        position: self.position,
                        source: e,
                    })
                }
            }
        }
        self.position += n as u64;
        Ok(buf)
    }

    fn position(&self) -> u64 {
        self.position
    }
}

/// A [`Source`] backed by an in-memory byte slice.
pub struct SliceSource<'a> {
    data: &'a [u8],
    position: u64,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SliceSource { data, position: 0 }
    }
}

impl<'a> Source for SliceSource<'a> {
    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let start = self.position as usize;
        let end = start.saturating_add(n);
        if end > self.data.len() {
            return Err(Error::TruncatedStream {
                position: self.position,
                needed: end - self.data.len(),
            });
        }
        self.position += n as u64;
        Ok(self.data[start..end].to_vec())
    }

    fn position(&self) -> u64 {
        self.position
    }
}

/// Typed big-endian reads over a [`Source`], plus the stream-opening
/// magic/version check.
pub struct ByteReader<S> {
    source: S,
    peeked: Option<u8>,
}

impl<S: Source> ByteReader<S> {
    pub fn new(source: S) -> Self {
        ByteReader {
            source,
            peeked: None,
        }
    }

    pub fn position(&self) -> u64 {
        self.source.position().saturating_sub(self.peeked.is_some() as u64)
    }

    fn pull(&mut self, n: usize) -> Result<Vec<u8>> {
        self.source.read_exact(n)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        if let Some(b) = self.peeked.take() {
            let mut rest = self.pull(n - 1)?;
            let mut out = Vec::with_capacity(n);
            out.push(b);
            out.append(&mut rest);
            return Ok(out);
        }
        self.pull(n)
    }

    /// Peeks one byte without consuming it.
    pub fn peek_u8(&mut self) -> Result<u8> {
        if let Some(b) = self.peeked {
            return Ok(b);
        }
        let bytes = self.pull(1)?;
        self.peeked = Some(bytes[0]);
        Ok(bytes[0])
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.read_bytes(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&b);
        Ok(u64::from_be_bytes(arr))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads a 16-bit-length-prefixed modified-UTF-8 string ("short UTF").
    pub fn read_utf_short(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?;
        crate::mutf8::decode(&bytes, self.position())
    }

    /// Reads a 64-bit-length-prefixed modified-UTF-8 string ("long UTF").
    pub fn read_utf_long(&mut self) -> Result<String> {
        let len = self.read_u64()? as usize;
        let bytes = self.read_bytes(len)?;
        crate::mutf8::decode(&bytes, self.position())
    }

    /// Verifies the stream opens with the required magic and version.
    pub fn read_magic_and_version(&mut self) -> Result<()> {
        let start = self.position();
        let magic = self.read_u16()?;
        if magic != STREAM_MAGIC {
            return Err(Error::BadMagic { position: start });
        }
        let version_pos = self.position();
        let version = self.read_u16()?;
        if version != STREAM_VERSION {
            return Err(Error::UnsupportedVersion {
                position: version_pos,
            });
        }
        Ok(())
    }
}
