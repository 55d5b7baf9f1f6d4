// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Typed access to a device tree property value.

use core::str;

/// A view of one property of a decoded device tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Property<'a> {
    name: &'a str,
    value: &'a [u8],
}

impl<'a> Property<'a> {
    pub(crate) fn new(name: &'a str, value: &'a [u8]) -> Self {
        Self { name, value }
    }

    /// Returns the name of this property.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Returns the raw stored bytes of this property.
    #[must_use]
    pub fn value(&self) -> &'a [u8] {
        self.value
    }

    /// Re-reads the stored bytes as one big-endian 32-bit integer.
    ///
    /// Returns `None` if the value is shorter than four bytes.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        let bytes = self.value.get(..4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Returns the first element of the null-terminated string list, if
    /// any.
    #[must_use]
    pub fn as_str(&self) -> Option<&'a str> {
        self.str_at(0)
    }

    /// Returns element `idx` of the null-terminated string list.
    #[must_use]
    pub fn str_at(&self, idx: usize) -> Option<&'a str> {
        self.as_str_list().nth(idx)
    }

    /// Splits the stored bytes on null terminators into an ordered list of
    /// strings. Trailing bytes without a terminator are not yielded.
    #[must_use]
    pub fn as_str_list(&self) -> StrList<'a> {
        StrList { rest: self.value }
    }
}

/// An iterator over the null-terminated strings of a property value.
#[derive(Debug, Clone)]
pub struct StrList<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for StrList<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let end = self.rest.iter().position(|&b| b == 0)?;
        let s = str::from_utf8(&self.rest[..end]).ok()?;
        self.rest = &self.rest[end + 1..];
        Some(s)
    }
}
