// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A decoder for [Flattened Device Tree (FDT)] blobs.
//!
//! This module provides the [`Fdt`] struct, which eagerly parses an FDT
//! blob into an owned [`FdtNode`] tree and exposes the memory reservation
//! block and a predicate-based subtree search. The tree is built once
//! during decode and is read-only afterwards.
//!
//! [Flattened Device Tree (FDT)]: https://devicetree-specification.readthedocs.io/en/latest/chapter5-flattened-format.html

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use zerocopy::byteorder::big_endian;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::Error;
use crate::reader::ByteReader;

mod node;
mod property;
pub use node::FdtNode;
pub use property::{Property, StrList};

pub(crate) const FDT_MAGIC: u32 = 0xd00d_feed;

const FDT_PADDING: u32 = 0;
const FDT_BEGIN_NODE: u32 = 1;
const FDT_END_NODE: u32 = 2;
const FDT_PROP: u32 = 3;
const FDT_NOP: u32 = 4;
const FDT_END: u32 = 9;

#[repr(C, packed)]
#[derive(Debug, Copy, Clone, FromBytes, IntoBytes, Unaligned, Immutable, KnownLayout)]
struct FdtHeader {
    /// Magic number of the device tree.
    magic: big_endian::U32,
    /// Total size of the device tree.
    totalsize: big_endian::U32,
    /// Offset of the device tree structure.
    off_dt_struct: big_endian::U32,
    /// Offset of the device tree strings.
    off_dt_strings: big_endian::U32,
    /// Offset of the memory reservation map.
    off_mem_rsvmap: big_endian::U32,
    /// Version of the device tree.
    version: big_endian::U32,
    /// Last compatible version of the device tree.
    last_comp_version: big_endian::U32,
    /// Physical ID of the boot CPU.
    boot_cpuid_phys: big_endian::U32,
    /// Size of the device tree strings.
    size_dt_strings: big_endian::U32,
    /// Size of the device tree structure.
    size_dt_struct: big_endian::U32,
}

/// A 64-bit memory reservation from the FDT memory reservation block.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
    Unaligned,
)]
#[repr(C)]
pub struct MemoryReservation {
    address: big_endian::U64,
    size: big_endian::U64,
}

impl MemoryReservation {
    /// Creates a new [`MemoryReservation`].
    #[must_use]
    pub const fn new(address: u64, size: u64) -> Self {
        Self {
            address: big_endian::U64::new(address),
            size: big_endian::U64::new(size),
        }
    }

    /// Returns the physical address of the reserved memory region.
    #[must_use]
    pub const fn address(&self) -> u64 {
        self.address.get()
    }

    /// Returns the size of the reserved memory region.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size.get()
    }

    fn is_terminator(&self) -> bool {
        self.address() == 0 && self.size() == 0
    }
}

/// A decoded flattened device tree.
///
/// # Examples
///
/// ```
/// # use panelkit::fdt::Fdt;
/// # let dtb: &[u8] = &[];
/// # let _ = (|| -> Result<(), panelkit::Error> {
/// let fdt = Fdt::new(dtb)?;
/// if let Some(panel) = fdt.find_compatible("simple-panel-dsi") {
///     let width = panel.property("width-mm").and_then(|p| p.as_u32());
/// }
/// # Ok(())
/// # })();
/// ```
#[derive(Debug, Clone)]
pub struct Fdt {
    header: FdtHeader,
    memory_reservations: Vec<MemoryReservation>,
    root: FdtNode,
}

impl Fdt {
    /// Decodes an FDT blob, eagerly building the node tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFdtMagic`] if the magic number is not
    /// `0xd00dfeed`, and the appropriate malformed-input error if the
    /// memory reservation block or structure block cannot be decoded.
    pub fn new(data: &[u8]) -> Result<Self, Error> {
        let (header, _) = FdtHeader::read_from_prefix(data).map_err(|_| Error::UnexpectedEof(0))?;

        if header.magic.get() != FDT_MAGIC {
            return Err(Error::InvalidFdtMagic);
        }

        let memory_reservations =
            read_memory_reservations(data, header.off_mem_rsvmap.get() as usize)?;
        let root = read_tree(data, &header)?;

        Ok(Self {
            header,
            memory_reservations,
            root,
        })
    }

    /// Returns the root node of the decoded tree.
    #[must_use]
    pub fn root(&self) -> &FdtNode {
        &self.root
    }

    /// Returns the entries of the memory reservation block, excluding the
    /// null terminator entry.
    #[must_use]
    pub fn memory_reservations(&self) -> &[MemoryReservation] {
        &self.memory_reservations
    }

    /// Returns the version of the FDT.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.header.version.get()
    }

    /// Returns the last compatible version of the FDT.
    #[must_use]
    pub fn last_comp_version(&self) -> u32 {
        self.header.last_comp_version.get()
    }

    /// Returns the physical ID of the boot CPU.
    #[must_use]
    pub fn boot_cpuid_phys(&self) -> u32 {
        self.header.boot_cpuid_phys.get()
    }

    /// Returns the total size of the FDT recorded in its header.
    #[must_use]
    pub fn totalsize(&self) -> u32 {
        self.header.totalsize.get()
    }

    /// Finds the first node, in depth-first pre-order, whose `compatible`
    /// string list contains `compatible`.
    #[must_use]
    pub fn find_compatible(&self, compatible: &str) -> Option<&FdtNode> {
        self.root.find(|node| node.is_compatible(compatible))
    }
}

fn read_memory_reservations(data: &[u8], offset: usize) -> Result<Vec<MemoryReservation>, Error> {
    let mut r = ByteReader::new(data);
    r.seek(offset);

    let mut reservations = Vec::new();
    loop {
        let position = r.position();
        let entry = MemoryReservation::read_from_bytes(r.read_bytes(16)?)
            .map_err(|_| Error::UnexpectedEof(position))?;
        if entry.is_terminator() {
            return Ok(reservations);
        }
        reservations.push(entry);
    }
}

fn read_tree(data: &[u8], header: &FdtHeader) -> Result<FdtNode, Error> {
    let mut r = ByteReader::new(data);
    r.seek(header.off_dt_struct.get() as usize);

    let off_dt_strings = header.off_dt_strings.get() as usize;

    // Innermost open node last; the bottom entry is the unnamed root.
    let mut stack: Vec<(String, FdtNode)> = Vec::new();
    let mut root = None;

    loop {
        let token = r.align(4).read_be32()?;
        match token {
            FDT_PADDING | FDT_NOP => {}
            FDT_BEGIN_NODE => {
                let name = r.read_cstr()?;
                if stack.is_empty() && root.is_none() {
                    // The implicit root; its name (normally empty) is not
                    // recorded anywhere.
                    stack.push((String::new(), FdtNode::new()));
                } else {
                    stack.push((name.to_string(), FdtNode::new()));
                }
            }
            FDT_END_NODE => {
                let (name, node) = stack.pop().ok_or(Error::UnbalancedNesting)?;
                match stack.last_mut() {
                    Some((_, parent)) => parent.add_child(name, node),
                    None => root = Some(node),
                }
            }
            FDT_PROP => {
                let len = r.read_be32()? as usize;
                let nameoff = r.read_be32()?;
                let name = read_name(data, off_dt_strings, nameoff)?;
                let value = r.read_bytes(len)?;
                let (_, open) = stack.last_mut().ok_or(Error::UnbalancedNesting)?;
                open.add_property(name, value.to_vec());
            }
            FDT_END => {
                // Close any nodes left open, innermost first.
                while let Some((name, node)) = stack.pop() {
                    match stack.last_mut() {
                        Some((_, parent)) => parent.add_child(name, node),
                        None => root = Some(node),
                    }
                }
                return Ok(root.unwrap_or_default());
            }
            other => return Err(Error::BadToken(other)),
        }
    }
}

fn read_name(data: &[u8], off_dt_strings: usize, nameoff: u32) -> Result<String, Error> {
    let mut r = ByteReader::new(data);
    r.seek(off_dt_strings + nameoff as usize);
    let name = r.read_cstr().map_err(|_| Error::BadNameOffset(nameoff))?;
    Ok(name.to_string())
}
