// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A sequential big-endian reader over an immutable byte buffer.
//!
//! [`ByteReader`] is the cursor every decoder in this crate is built on. It
//! keeps an explicit read position which is advanced by reads and skips and
//! can be repositioned with [`ByteReader::seek`] and [`ByteReader::align`].
//! Bounded reads past the end of the buffer fail with
//! [`Error::UnexpectedEof`] rather than returning partial data; the
//! non-advancing [`ByteReader::peek`] returns `None` instead, which lets
//! stream-style decoders terminate their loop cleanly at [`ByteReader::eof`].

use core::str;

use crate::error::Error;

/// A sequential big-endian reader over a byte slice.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a new reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Returns the current read position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the number of bytes between the position and the buffer end.
    ///
    /// Returns 0 if the position has been moved past the end.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Returns whether the position is at or past the end of the buffer.
    #[must_use]
    pub fn eof(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Moves the position to an absolute offset.
    pub fn seek(&mut self, position: usize) -> &mut Self {
        self.position = position;
        self
    }

    /// Advances the position by `n` bytes without reading.
    pub fn skip(&mut self, n: usize) -> &mut Self {
        self.position += n;
        self
    }

    /// Advances the position to the next multiple of `n`, if it is not
    /// already one.
    pub fn align(&mut self, n: usize) -> &mut Self {
        let rem = self.position % n;
        if rem != 0 {
            self.position += n - rem;
        }
        self
    }

    /// Reads the next `n` bytes and advances past them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedEof`] if fewer than `n` bytes remain.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let bytes = self
            .data
            .get(self.position..)
            .and_then(|rest| rest.get(..n))
            .ok_or(Error::UnexpectedEof(self.position))?;
        self.position += n;
        Ok(bytes)
    }

    /// Reads all remaining bytes and advances to the end of the buffer.
    pub fn rest(&mut self) -> &'a [u8] {
        let bytes = self.data.get(self.position..).unwrap_or_default();
        self.position = self.data.len();
        bytes
    }

    /// Returns the next `n` bytes without advancing, or `None` if fewer
    /// than `n` bytes remain.
    #[must_use]
    pub fn peek(&self, n: usize) -> Option<&'a [u8]> {
        self.data.get(self.position..)?.get(..n)
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedEof`] if the buffer is exhausted.
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Reads a big-endian 16-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedEof`] if fewer than 2 bytes remain.
    pub fn read_be16(&mut self) -> Result<u16, Error> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a big-endian 32-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedEof`] if fewer than 4 bytes remain.
    pub fn read_be32(&mut self) -> Result<u32, Error> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a big-endian 64-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedEof`] if fewer than 8 bytes remain.
    pub fn read_be64(&mut self) -> Result<u64, Error> {
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(raw))
    }

    /// Reads a null-terminated UTF-8 string and advances past the
    /// terminator. The terminator is not included in the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnterminatedString`] if no null byte is found
    /// before the end of the buffer, or [`Error::InvalidString`] if the
    /// bytes are not valid UTF-8.
    pub fn read_cstr(&mut self) -> Result<&'a str, Error> {
        let start = self.position;
        let rest = self
            .data
            .get(start..)
            .ok_or(Error::UnterminatedString(start))?;
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::UnterminatedString(start))?;
        let s = str::from_utf8(&rest[..len]).map_err(|_| Error::InvalidString(start))?;
        self.position = start + len + 1;
        Ok(s)
    }

    /// Reads exactly `len` bytes as a UTF-8 string. No terminator is
    /// consumed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedEof`] if fewer than `len` bytes remain,
    /// or [`Error::InvalidString`] if the bytes are not valid UTF-8.
    pub fn read_str(&mut self, len: usize) -> Result<&'a str, Error> {
        let start = self.position;
        let bytes = self.read_bytes(len)?;
        str::from_utf8(bytes).map_err(|_| Error::InvalidString(start))
    }
}
