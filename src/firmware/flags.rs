// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The three bit-flag vocabularies of the firmware format and the generic
//! name-set ↔ bitmask conversion over them.
//!
//! The DRM bus table intentionally contains aliased bit positions: the
//! "sample" name of each edge pair shares its bit with the "drive" name of
//! the opposite edge, mirroring the upstream hardware flag definition.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::XxBuildHasher;
use crate::error::Error;

/// A serialized flag set: every set bit that is individually recognized
/// as a named flag, rendered as a name → `true` mapping.
pub type FlagMap = IndexMap<&'static str, bool, XxBuildHasher>;

/// A flag set given as a name → enabled mapping.
pub type FlagNameMap = IndexMap<String, bool, XxBuildHasher>;

/// Any of the accepted input shapes for a flag set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FlagsInput {
    /// A raw bitmask.
    Bits(u32),
    /// A `|`- or `,`-delimited name string.
    Names(String),
    /// An ordered list of names.
    List(Vec<String>),
    /// A name → enabled mapping; only `true` entries are applied.
    Map(FlagNameMap),
}

impl Default for FlagsInput {
    fn default() -> Self {
        Self::Bits(0)
    }
}

impl From<u32> for FlagsInput {
    fn from(bits: u32) -> Self {
        Self::Bits(bits)
    }
}

impl From<&str> for FlagsInput {
    fn from(names: &str) -> Self {
        Self::Names(names.to_string())
    }
}

/* include/drm/drm_modes.h; HSKEW, BCAST, PIXMUX and the 3D variants are
 * not supported */
const DRM_MODE_FLAGS: &[(&str, u32)] = &[
    ("PHSYNC", 1 << 0),
    ("NHSYNC", 1 << 1),
    ("PVSYNC", 1 << 2),
    ("NVSYNC", 1 << 3),
    ("INTERLACE", 1 << 4),
    ("DBLSCAN", 1 << 5),
    ("CSYNC", 1 << 6),
    ("PCSYNC", 1 << 7),
    ("NCSYNC", 1 << 8),
    ("DBLCLK", 1 << 12),
    ("CLKDIV2", 1 << 13),
];

/* include/drm/drm_connector.h */
const DRM_BUS_FLAGS: &[(&str, u32)] = &[
    ("DE_LOW", 1 << 0),
    ("DE_HIGH", 1 << 1),
    ("PIXDATA_DRIVE_POSEDGE", 1 << 2),
    ("PIXDATA_DRIVE_NEGEDGE", 1 << 3),
    ("PIXDATA_SAMPLE_POSEDGE", 1 << 3),
    ("PIXDATA_SAMPLE_NEGEDGE", 1 << 2),
    ("DATA_MSB_TO_LSB", 1 << 4),
    ("DATA_LSB_TO_MSB", 1 << 5),
    ("SYNC_DRIVE_POSEDGE", 1 << 6),
    ("SYNC_DRIVE_NEGEDGE", 1 << 7),
    ("SYNC_SAMPLE_POSEDGE", 1 << 7),
    ("SYNC_SAMPLE_NEGEDGE", 1 << 6),
    ("SHARP_SIGNALS", 1 << 8),
];

/* include/drm/drm_mipi_dsi.h */
const DSI_MODE_FLAGS: &[(&str, u32)] = &[
    ("MODE_VIDEO", 1 << 0),
    ("MODE_VIDEO_BURST", 1 << 1),
    ("MODE_VIDEO_SYNC_PULSE", 1 << 2),
    ("MODE_VIDEO_AUTO_VERT", 1 << 3),
    ("MODE_VIDEO_HSE", 1 << 4),
    ("MODE_VIDEO_NO_HFP", 1 << 5),
    ("MODE_VIDEO_NO_HBP", 1 << 6),
    ("MODE_VIDEO_NO_HSA", 1 << 7),
    ("MODE_VSYNC_FLUSH", 1 << 8),
    ("MODE_NO_EOT_PACKET", 1 << 9),
    ("CLOCK_NON_CONTINUOUS", 1 << 10),
    ("MODE_LPM", 1 << 11),
    ("HS_PKT_END_ALIGNED", 1 << 12),
];

/// One of the three closed flag vocabularies, with the generic
/// "parse name set to bitmask" / "bitmask to recognized name set" pair.
#[derive(Debug, Clone, Copy)]
pub struct FlagVocabulary {
    name: &'static str,
    defs: &'static [(&'static str, u32)],
}

impl FlagVocabulary {
    /// DRM display mode flags.
    pub const DRM_MODE: Self = Self {
        name: "DRM_MODE_FLAG",
        defs: DRM_MODE_FLAGS,
    };

    /// DRM bus flags, with the aliased drive/sample bit pairs.
    pub const DRM_BUS: Self = Self {
        name: "DRM_BUS_FLAG",
        defs: DRM_BUS_FLAGS,
    };

    /// MIPI-DSI mode flags.
    pub const DSI_MODE: Self = Self {
        name: "MIPI_DSI",
        defs: DSI_MODE_FLAGS,
    };

    fn lookup(&self, name: &str) -> Result<u32, Error> {
        self.defs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, bit)| *bit)
            .ok_or_else(|| Error::UnknownFlag {
                set: self.name,
                name: name.to_string(),
            })
    }

    /// Resolves any accepted flag input shape to a bitmask.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFlag`] for a name not in this vocabulary.
    pub fn parse(&self, input: &FlagsInput) -> Result<u32, Error> {
        match input {
            FlagsInput::Bits(bits) => Ok(*bits),
            FlagsInput::Names(names) => names
                .split(['|', ','])
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .try_fold(0, |acc, name| Ok(acc | self.lookup(name)?)),
            FlagsInput::List(names) => names
                .iter()
                .map(String::as_str)
                .filter(|name| !name.is_empty())
                .try_fold(0, |acc, name| Ok(acc | self.lookup(name)?)),
            FlagsInput::Map(map) => map
                .iter()
                .filter(|&(_, &enabled)| enabled)
                .try_fold(0, |acc, (name, _)| Ok(acc | self.lookup(name)?)),
        }
    }

    /// Renders a bitmask as a name → `true` mapping of the bits that are
    /// both set and individually recognized as a single named flag.
    /// Multi-bit or unknown combinations are silently omitted; an aliased
    /// bit resolves to its first name in the vocabulary.
    #[must_use]
    pub fn serialize(&self, bits: u32) -> FlagMap {
        let mut map = FlagMap::default();
        for i in 0..32 {
            let bit = 1u32 << i;
            if bits & bit != 0
                && let Some((name, _)) = self.defs.iter().find(|(_, value)| *value == bit)
            {
                map.insert(name, true);
            }
        }
        map
    }
}
