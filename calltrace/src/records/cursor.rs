//! Bounds-checked forward reader over one record payload.
//!
//! Every decode routine goes through [`RecordCursor`]; no field read can
//! reach past the supplied buffer. Reads that would do so fail with
//! [`ParseError::ShortRecord`] carrying the number of bytes the read needed
//! against the number the payload still had.

use crate::domain::ParseError;

/// Little-endian reader positioned inside a payload slice.
#[derive(Debug)]
pub struct RecordCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RecordCursor<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Total length of the underlying payload.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Take the next `n` bytes as a borrowed slice.
    ///
    /// # Errors
    /// `ShortRecord` if fewer than `n` bytes remain.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        if self.remaining() < n {
            return Err(ParseError::ShortRecord {
                needed: self.pos + n,
                available: self.buf.len(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a little-endian `u32`.
    ///
    /// # Errors
    /// `ShortRecord` if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> Result<u32, ParseError> {
        Ok(u32_from_le(self.read_bytes(4)?))
    }

    /// Read a little-endian `u64`.
    ///
    /// # Errors
    /// `ShortRecord` if fewer than 8 bytes remain.
    pub fn read_u64(&mut self) -> Result<u64, ParseError> {
        Ok(u64_from_le(self.read_bytes(8)?))
    }

    /// Read `n` bytes as a length-delimited UTF-8 string.
    ///
    /// Strings on the wire are *not* null-terminated; the length comes from
    /// a field in the fixed prefix and is validated here against the
    /// physical buffer before the bytes are touched.
    ///
    /// # Errors
    /// `ShortRecord` if fewer than `n` bytes remain, `BadString` if the
    /// bytes are not valid UTF-8.
    pub fn read_str(&mut self, n: usize) -> Result<&'a str, ParseError> {
        let bytes = self.read_bytes(n)?;
        Ok(std::str::from_utf8(bytes)?)
    }
}

/// Decode a `u32` from an exactly-4-byte slice.
pub(crate) fn u32_from_le(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    u32::from_le_bytes(raw)
}

/// Decode a `u64` from an exactly-8-byte slice.
pub(crate) fn u64_from_le(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    u64::from_le_bytes(raw)
}
