// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A library for converting between the binary and textual representations
//! used to describe and drive an embedded DSI display panel:
//!
//! - A flattened device tree (FDT) blob produced by a bootloader or kernel
//!   build, decoded into an owned node tree with typed property accessors.
//! - A compact run-length bytecode describing a timed sequence of panel bus
//!   commands and delays, with lossless textual forms.
//! - A fixed-layout firmware blob carrying panel geometry, timing modes,
//!   DSI/bus flag bitfields and an embedded command stream.
//! - A bridge extracting a panel configuration from a Rockchip-style
//!   `simple-panel-dsi` device tree node.
//!
//! Every operation is a synchronous, deterministic transformation over an
//! in-memory byte buffer or configuration value; the library performs no
//! file or network I/O. The library is written purely in Rust and is
//! `#![no_std]` compatible (it requires `alloc`).

#![no_std]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

extern crate alloc;
#[cfg(test)]
extern crate std;

pub mod cmdseq;
pub mod error;
pub mod fdt;
pub mod firmware;
pub mod reader;
pub mod rockchip;

pub use self::cmdseq::{Command, CommandKind, CommandSequence, SequenceFormat};
pub use self::error::Error;
pub use self::fdt::Fdt;
pub use self::firmware::{PanelConfig, PanelFirmware, SerializedConfig};
pub use self::reader::ByteReader;
pub use self::rockchip::parse_rockchip_fdt;

/// Deterministic hasher for the crate's ordered maps; the std default
/// hasher is unavailable under `no_std`.
pub(crate) type XxBuildHasher = core::hash::BuildHasherDefault<twox_hash::XxHash64>;
