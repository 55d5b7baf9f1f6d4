// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! An in-memory FDT blob builder for test fixtures.

#![allow(dead_code)]

const FDT_MAGIC: u32 = 0xd00d_feed;
const FDT_BEGIN_NODE: u32 = 1;
const FDT_END_NODE: u32 = 2;
const FDT_PROP: u32 = 3;
const FDT_END: u32 = 9;

/// Builds a well-formed FDT blob: 40-byte header, memory reservation
/// block, aligned structure block and a deduplicated strings block.
#[derive(Default)]
pub struct FdtBuilder {
    structure: Vec<u8>,
    strings: Vec<u8>,
    reservations: Vec<(u64, u64)>,
}

impl FdtBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reservation(&mut self, address: u64, size: u64) -> &mut Self {
        self.reservations.push((address, size));
        self
    }

    pub fn begin_node(&mut self, name: &str) -> &mut Self {
        self.push_u32(FDT_BEGIN_NODE);
        self.structure.extend_from_slice(name.as_bytes());
        self.structure.push(0);
        self.pad();
        self
    }

    pub fn end_node(&mut self) -> &mut Self {
        self.push_u32(FDT_END_NODE);
        self
    }

    pub fn prop(&mut self, name: &str, value: &[u8]) -> &mut Self {
        let nameoff = self.string_offset(name);
        self.push_u32(FDT_PROP);
        self.push_u32(u32::try_from(value.len()).unwrap());
        self.push_u32(nameoff);
        self.structure.extend_from_slice(value);
        self.pad();
        self
    }

    pub fn prop_u32(&mut self, name: &str, value: u32) -> &mut Self {
        self.prop(name, &value.to_be_bytes())
    }

    /// A single null-terminated string property.
    pub fn prop_str(&mut self, name: &str, value: &str) -> &mut Self {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        self.prop(name, &bytes)
    }

    pub fn build(&self) -> Vec<u8> {
        let off_mem_rsvmap = 40u32;
        let rsv_len = u32::try_from((self.reservations.len() + 1) * 16).unwrap();
        let off_dt_struct = off_mem_rsvmap + rsv_len;
        let size_dt_struct = u32::try_from(self.structure.len() + 4).unwrap();
        let off_dt_strings = off_dt_struct + size_dt_struct;
        let size_dt_strings = u32::try_from(self.strings.len()).unwrap();
        let totalsize = off_dt_strings + size_dt_strings;

        let mut out = Vec::with_capacity(totalsize as usize);
        for field in [
            FDT_MAGIC,
            totalsize,
            off_dt_struct,
            off_dt_strings,
            off_mem_rsvmap,
            17, // version
            16, // last_comp_version
            0,  // boot_cpuid_phys
            size_dt_strings,
            size_dt_struct,
        ] {
            out.extend_from_slice(&field.to_be_bytes());
        }
        for (address, size) in &self.reservations {
            out.extend_from_slice(&address.to_be_bytes());
            out.extend_from_slice(&size.to_be_bytes());
        }
        out.extend_from_slice(&[0; 16]);
        out.extend_from_slice(&self.structure);
        out.extend_from_slice(&FDT_END.to_be_bytes());
        out.extend_from_slice(&self.strings);
        out
    }

    fn string_offset(&mut self, name: &str) -> u32 {
        let bytes = name.as_bytes();
        let mut start = 0;
        while start < self.strings.len() {
            let end = start
                + self.strings[start..]
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap();
            if &self.strings[start..end] == bytes {
                return u32::try_from(start).unwrap();
            }
            start = end + 1;
        }
        let offset = u32::try_from(self.strings.len()).unwrap();
        self.strings.extend_from_slice(bytes);
        self.strings.push(0);
        offset
    }

    fn push_u32(&mut self, value: u32) {
        self.structure.extend_from_slice(&value.to_be_bytes());
    }

    fn pad(&mut self) {
        while self.structure.len() % 4 != 0 {
            self.structure.push(0);
        }
    }
}
