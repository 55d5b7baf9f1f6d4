// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The fixed-layout panel firmware blob.
//!
//! A blob is a 15-byte magic, a 1-byte format version, a 48-byte big-endian
//! configuration block, `N` 32-byte timing records and a trailing command
//! bytecode stream. [`PanelFirmware`] is the decoded form; it can be built
//! either from a blob ([`PanelFirmware::parse`]) or from a loosely-typed
//! configuration ([`PanelFirmware::from_config`]), and re-emitted as a blob
//! ([`PanelFirmware::pack`]) or as a serialization-friendly projection
//! ([`PanelFirmware::serialize`]).

use alloc::string::String;
use alloc::vec::Vec;
use core::mem::size_of;

use serde::{Deserialize, Serialize};
use zerocopy::big_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::cmdseq::{CommandSequence, SequenceFormat, SequenceSource};
use crate::error::Error;
use crate::reader::ByteReader;

mod flags;

pub use self::flags::{FlagMap, FlagNameMap, FlagVocabulary, FlagsInput};

const FIRMWARE_MAGIC: [u8; 15] = *b"PANEL-FIRMWARE\0";
const FIRMWARE_VERSION: u8 = 1;

const DEFAULT_RESET_DELAY_MS: u16 = 5;
const DEFAULT_INIT_DELAY_MS: u16 = 10;
const DEFAULT_SLEEP_DELAY_MS: u16 = 120;

/// The pixel format on the DSI bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DsiFormat {
    /// 24-bit RGB, one byte per component.
    #[default]
    Rgb888,
    /// 18-bit RGB, loosely packed into three bytes.
    Rgb666,
    /// 18-bit RGB, tightly packed.
    Rgb666Packed,
    /// 16-bit RGB.
    Rgb565,
}

impl DsiFormat {
    /// Maps the stored format code to a named format.
    #[must_use]
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::Rgb888),
            1 => Some(Self::Rgb666),
            2 => Some(Self::Rgb666Packed),
            3 => Some(Self::Rgb565),
            _ => None,
        }
    }

    /// Returns the format code stored in the blob.
    #[must_use]
    pub fn raw(self) -> u16 {
        match self {
            Self::Rgb888 => 0,
            Self::Rgb666 => 1,
            Self::Rgb666Packed => 2,
            Self::Rgb565 => 3,
        }
    }
}

/// A DSI pixel format given either by name or as a raw format code.
///
/// Raw codes are carried verbatim, including codes with no named
/// equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FormatInput {
    /// A named format.
    Name(DsiFormat),
    /// A raw format code.
    Raw(u16),
}

impl FormatInput {
    fn raw(self) -> u16 {
        match self {
            Self::Name(format) => format.raw(),
            Self::Raw(raw) => raw,
        }
    }
}

impl Default for FormatInput {
    fn default() -> Self {
        Self::Name(DsiFormat::default())
    }
}

impl From<DsiFormat> for FormatInput {
    fn from(format: DsiFormat) -> Self {
        Self::Name(format)
    }
}

impl From<u16> for FormatInput {
    fn from(raw: u16) -> Self {
        Self::Raw(raw)
    }
}

/// Power sequencing delays, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Delays {
    /// Delay after deasserting the reset line.
    pub reset: u16,
    /// Delay after running the init command sequence.
    pub init: u16,
    /// Delay after leaving sleep mode.
    pub sleep: u16,
    /// Delay before enabling the backlight.
    pub backlight: u16,
}

/// One display timing mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelTiming {
    /// Active horizontal pixels.
    pub hactive: u16,
    /// Horizontal front porch, in pixels.
    pub hfp: u16,
    /// Horizontal sync length, in pixels.
    pub hslen: u16,
    /// Horizontal back porch, in pixels.
    pub hbp: u16,
    /// Active vertical lines.
    pub vactive: u16,
    /// Vertical front porch, in lines.
    pub vfp: u16,
    /// Vertical sync length, in lines.
    pub vslen: u16,
    /// Vertical back porch, in lines.
    pub vbp: u16,
    /// Pixel clock, in kHz.
    pub dclk: u32,
    /// Display mode flag bitmask.
    pub flags: u32,
}

/// Delay overrides of a panel configuration; absent fields take the
/// firmware defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    /// Overrides [`Delays::reset`].
    pub reset: Option<u16>,
    /// Overrides [`Delays::init`].
    pub init: Option<u16>,
    /// Overrides [`Delays::sleep`].
    pub sleep: Option<u16>,
    /// Overrides [`Delays::backlight`].
    pub backlight: Option<u16>,
}

/// The DSI bus section of a panel configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DsiConfig {
    /// Number of data lanes.
    pub lanes: u16,
    /// Pixel format, by name or raw code.
    pub format: FormatInput,
    /// DSI mode flags, in any accepted input shape.
    pub mode_flags: FlagsInput,
}

/// One display timing mode of a panel configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Active horizontal pixels.
    pub hactive: u16,
    /// Horizontal front porch, in pixels.
    pub hfp: u16,
    /// Horizontal sync length, in pixels.
    pub hslen: u16,
    /// Horizontal back porch, in pixels.
    pub hbp: u16,
    /// Active vertical lines.
    pub vactive: u16,
    /// Vertical front porch, in lines.
    pub vfp: u16,
    /// Vertical sync length, in lines.
    pub vslen: u16,
    /// Vertical back porch, in lines.
    pub vbp: u16,
    /// Pixel clock, in kHz.
    pub dclk: u32,
    /// Display mode flags, in any accepted input shape.
    pub flags: FlagsInput,
}

/// A loosely-typed panel description, the editable counterpart of a
/// firmware blob. Every field is optional in its serialized form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// A suggested file name for the packed blob.
    pub filename: Option<String>,
    /// Physical width, in millimetres.
    pub width_mm: u16,
    /// Physical height, in millimetres.
    pub height_mm: u16,
    /// Mounting rotation in degrees; one of 0, 90, 180 or 270.
    pub rotation: u16,
    /// Power sequencing delay overrides.
    pub delays: DelayConfig,
    /// DSI bus parameters.
    pub dsi: DsiConfig,
    /// Bus flags, in any accepted input shape.
    pub bus_flags: FlagsInput,
    /// Index of the preferred entry in `timings`.
    pub preferred_timing: u8,
    /// Display timing modes.
    pub timings: Vec<TimingConfig>,
    /// Init command sequence, in any accepted input shape.
    pub init_sequence: SequenceSource,
}

/// The serialization-friendly projection of a decoded firmware: bitmasks
/// become name maps, the format code becomes a name and the command stream
/// becomes its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializedConfig {
    /// A suggested file name for the packed blob, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Physical width, in millimetres.
    pub width_mm: u16,
    /// Physical height, in millimetres.
    pub height_mm: u16,
    /// Mounting rotation, in degrees.
    pub rotation: u16,
    /// Power sequencing delays, with defaults applied.
    pub delays: Delays,
    /// DSI bus parameters.
    pub dsi: SerializedDsi,
    /// Recognized bus flags.
    pub bus_flags: FlagMap,
    /// Index of the preferred entry in `timings`.
    pub preferred_timing: u8,
    /// Display timing modes.
    pub timings: Vec<SerializedTiming>,
    /// Init command sequence, one line per command.
    pub init_sequence: Vec<String>,
}

/// The DSI bus section of a [`SerializedConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializedDsi {
    /// Number of data lanes.
    pub lanes: u16,
    /// Pixel format; an unrecognized stored code falls back to
    /// [`DsiFormat::Rgb888`].
    pub format: DsiFormat,
    /// Recognized DSI mode flags.
    pub mode_flags: FlagMap,
}

/// One timing mode of a [`SerializedConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializedTiming {
    /// Active horizontal pixels.
    pub hactive: u16,
    /// Horizontal front porch, in pixels.
    pub hfp: u16,
    /// Horizontal sync length, in pixels.
    pub hslen: u16,
    /// Horizontal back porch, in pixels.
    pub hbp: u16,
    /// Active vertical lines.
    pub vactive: u16,
    /// Vertical front porch, in lines.
    pub vfp: u16,
    /// Vertical sync length, in lines.
    pub vslen: u16,
    /// Vertical back porch, in lines.
    pub vbp: u16,
    /// Pixel clock, in kHz.
    pub dclk: u32,
    /// Recognized display mode flags.
    pub flags: FlagMap,
}

/// Options of [`PanelFirmware::serialize_with`].
#[derive(Debug, Clone, Copy)]
pub struct SerializeOptions {
    /// Re-emit each command in canonical form instead of keeping the
    /// verbatim source line it was parsed from.
    pub normalize_commands: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            normalize_commands: true,
        }
    }
}

/// The 48-byte configuration block at offset 16 of a blob.
#[derive(FromBytes, IntoBytes, Unaligned, Immutable, KnownLayout)]
#[repr(C)]
struct RawConfig {
    width_mm: U16,
    height_mm: U16,
    rotation: U16,
    reserved0: [u8; 2],
    reserved1: [u8; 8],
    reset_delay: U16,
    init_delay: U16,
    sleep_delay: U16,
    backlight_delay: U16,
    reserved2: [u8; 8],
    lanes: U16,
    format: U16,
    mode_flags: U32,
    bus_flags: U32,
    reserved3: [u8; 2],
    preferred_timing: u8,
    num_timings: u8,
}

/// One 32-byte timing record.
#[derive(FromBytes, IntoBytes, Unaligned, Immutable, KnownLayout)]
#[repr(C)]
struct RawTiming {
    hactive: U16,
    hfp: U16,
    hslen: U16,
    hbp: U16,
    vactive: U16,
    vfp: U16,
    vslen: U16,
    vbp: U16,
    dclk: U32,
    flags: U32,
    reserved: [u8; 8],
}

#[derive(Debug, Clone, Copy)]
struct Dsi {
    lanes: u16,
    format: u16,
    mode_flags: u32,
}

fn read_raw<T: FromBytes>(reader: &mut ByteReader<'_>) -> Result<T, Error> {
    let at = reader.position();
    let bytes = reader.read_bytes(size_of::<T>())?;
    T::read_from_bytes(bytes).map_err(|_| Error::UnexpectedEof(at))
}

/// A decoded panel firmware.
#[derive(Debug, Clone)]
pub struct PanelFirmware {
    filename: Option<String>,
    width_mm: u16,
    height_mm: u16,
    rotation: u16,
    delays: Delays,
    dsi: Dsi,
    bus_flags: u32,
    preferred_timing: u8,
    timings: Vec<PanelTiming>,
    init_sequence: CommandSequence,
}

impl PanelFirmware {
    /// Decodes a firmware blob.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMagic`] or [`Error::InvalidVersion`] if the
    /// blob does not start with the expected magic and version,
    /// [`Error::InvalidRotation`] for a rotation other than 0, 90, 180 or
    /// 270, [`Error::UnexpectedEof`] if the blob is truncated, and any
    /// command stream error for a malformed bytecode remainder.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut reader = ByteReader::new(data);
        if reader.read_bytes(FIRMWARE_MAGIC.len())? != FIRMWARE_MAGIC {
            return Err(Error::InvalidMagic);
        }
        let version = reader.read_u8()?;
        if version != FIRMWARE_VERSION {
            return Err(Error::InvalidVersion(version));
        }

        let raw = read_raw::<RawConfig>(&mut reader)?;
        let rotation = raw.rotation.get();
        if !matches!(rotation, 0 | 90 | 180 | 270) {
            return Err(Error::InvalidRotation(rotation));
        }

        let mut timings = Vec::with_capacity(raw.num_timings as usize);
        for _ in 0..raw.num_timings {
            let t = read_raw::<RawTiming>(&mut reader)?;
            timings.push(PanelTiming {
                hactive: t.hactive.get(),
                hfp: t.hfp.get(),
                hslen: t.hslen.get(),
                hbp: t.hbp.get(),
                vactive: t.vactive.get(),
                vfp: t.vfp.get(),
                vslen: t.vslen.get(),
                vbp: t.vbp.get(),
                dclk: t.dclk.get(),
                flags: t.flags.get(),
            });
        }

        let init_sequence = CommandSequence::from_bytes(reader.rest())?;

        Ok(Self {
            filename: None,
            width_mm: raw.width_mm.get(),
            height_mm: raw.height_mm.get(),
            rotation,
            delays: Delays {
                reset: raw.reset_delay.get(),
                init: raw.init_delay.get(),
                sleep: raw.sleep_delay.get(),
                backlight: raw.backlight_delay.get(),
            },
            dsi: Dsi {
                lanes: raw.lanes.get(),
                format: raw.format.get(),
                mode_flags: raw.mode_flags.get(),
            },
            bus_flags: raw.bus_flags.get(),
            preferred_timing: raw.preferred_timing,
            timings,
            init_sequence,
        })
    }

    /// Builds a firmware from a loosely-typed configuration, applying the
    /// default delays and resolving every flag set and the command
    /// sequence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRotation`] for a rotation other than 0, 90,
    /// 180 or 270, [`Error::UnknownFlag`] for an unrecognized flag name,
    /// and any command stream error for a malformed init sequence.
    pub fn from_config(config: PanelConfig) -> Result<Self, Error> {
        if !matches!(config.rotation, 0 | 90 | 180 | 270) {
            return Err(Error::InvalidRotation(config.rotation));
        }

        let mut timings = Vec::with_capacity(config.timings.len());
        for timing in &config.timings {
            timings.push(PanelTiming {
                hactive: timing.hactive,
                hfp: timing.hfp,
                hslen: timing.hslen,
                hbp: timing.hbp,
                vactive: timing.vactive,
                vfp: timing.vfp,
                vslen: timing.vslen,
                vbp: timing.vbp,
                dclk: timing.dclk,
                flags: FlagVocabulary::DRM_MODE.parse(&timing.flags)?,
            });
        }

        Ok(Self {
            filename: config.filename,
            width_mm: config.width_mm,
            height_mm: config.height_mm,
            rotation: config.rotation,
            delays: Delays {
                reset: config.delays.reset.unwrap_or(DEFAULT_RESET_DELAY_MS),
                init: config.delays.init.unwrap_or(DEFAULT_INIT_DELAY_MS),
                sleep: config.delays.sleep.unwrap_or(DEFAULT_SLEEP_DELAY_MS),
                backlight: config.delays.backlight.unwrap_or(0),
            },
            dsi: Dsi {
                lanes: config.dsi.lanes,
                format: config.dsi.format.raw(),
                mode_flags: FlagVocabulary::DSI_MODE.parse(&config.dsi.mode_flags)?,
            },
            bus_flags: FlagVocabulary::DRM_BUS.parse(&config.bus_flags)?,
            preferred_timing: config.preferred_timing,
            timings,
            init_sequence: CommandSequence::parse(config.init_sequence)?,
        })
    }

    /// Encodes this firmware as a blob.
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            FIRMWARE_MAGIC.len()
                + 1
                + size_of::<RawConfig>()
                + self.timings.len() * size_of::<RawTiming>(),
        );
        out.extend_from_slice(&FIRMWARE_MAGIC);
        out.push(FIRMWARE_VERSION);

        #[expect(clippy::cast_possible_truncation)]
        let num_timings = self.timings.len() as u8;
        let raw = RawConfig {
            width_mm: self.width_mm.into(),
            height_mm: self.height_mm.into(),
            rotation: self.rotation.into(),
            reserved0: [0; 2],
            reserved1: [0; 8],
            reset_delay: self.delays.reset.into(),
            init_delay: self.delays.init.into(),
            sleep_delay: self.delays.sleep.into(),
            backlight_delay: self.delays.backlight.into(),
            reserved2: [0; 8],
            lanes: self.dsi.lanes.into(),
            format: self.dsi.format.into(),
            mode_flags: self.dsi.mode_flags.into(),
            bus_flags: self.bus_flags.into(),
            reserved3: [0; 2],
            preferred_timing: self.preferred_timing,
            num_timings,
        };
        out.extend_from_slice(raw.as_bytes());

        for timing in &self.timings {
            let raw = RawTiming {
                hactive: timing.hactive.into(),
                hfp: timing.hfp.into(),
                hslen: timing.hslen.into(),
                hbp: timing.hbp.into(),
                vactive: timing.vactive.into(),
                vfp: timing.vfp.into(),
                vslen: timing.vslen.into(),
                vbp: timing.vbp.into(),
                dclk: timing.dclk.into(),
                flags: timing.flags.into(),
                reserved: [0; 8],
            };
            out.extend_from_slice(raw.as_bytes());
        }

        out.extend_from_slice(&self.init_sequence.pack());
        out
    }

    /// Projects this firmware into its serialization-friendly form, with
    /// commands in canonical text.
    #[must_use]
    pub fn serialize(&self) -> SerializedConfig {
        self.serialize_with(SerializeOptions::default())
    }

    /// Projects this firmware into its serialization-friendly form.
    #[must_use]
    pub fn serialize_with(&self, options: SerializeOptions) -> SerializedConfig {
        let format = if options.normalize_commands {
            SequenceFormat::TextNormalized
        } else {
            SequenceFormat::Text
        };
        SerializedConfig {
            filename: self.filename.clone(),
            width_mm: self.width_mm,
            height_mm: self.height_mm,
            rotation: self.rotation,
            delays: self.delays,
            dsi: SerializedDsi {
                lanes: self.dsi.lanes,
                format: DsiFormat::from_raw(self.dsi.format).unwrap_or_default(),
                mode_flags: FlagVocabulary::DSI_MODE.serialize(self.dsi.mode_flags),
            },
            bus_flags: FlagVocabulary::DRM_BUS.serialize(self.bus_flags),
            preferred_timing: self.preferred_timing,
            timings: self
                .timings
                .iter()
                .map(|timing| SerializedTiming {
                    hactive: timing.hactive,
                    hfp: timing.hfp,
                    hslen: timing.hslen,
                    hbp: timing.hbp,
                    vactive: timing.vactive,
                    vfp: timing.vfp,
                    vslen: timing.vslen,
                    vbp: timing.vbp,
                    dclk: timing.dclk,
                    flags: FlagVocabulary::DRM_MODE.serialize(timing.flags),
                })
                .collect(),
            init_sequence: self.init_sequence.serialize(format),
        }
    }

    /// Returns the suggested file name for the packed blob, when known.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Returns the physical size in millimetres, width first.
    #[must_use]
    pub fn size_mm(&self) -> (u16, u16) {
        (self.width_mm, self.height_mm)
    }

    /// Returns the mounting rotation, in degrees.
    #[must_use]
    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    /// Returns the power sequencing delays.
    #[must_use]
    pub fn delays(&self) -> Delays {
        self.delays
    }

    /// Returns the number of DSI data lanes.
    #[must_use]
    pub fn lanes(&self) -> u16 {
        self.dsi.lanes
    }

    /// Returns the stored DSI pixel format code.
    #[must_use]
    pub fn format(&self) -> u16 {
        self.dsi.format
    }

    /// Returns the DSI mode flag bitmask.
    #[must_use]
    pub fn mode_flags(&self) -> u32 {
        self.dsi.mode_flags
    }

    /// Returns the bus flag bitmask.
    #[must_use]
    pub fn bus_flags(&self) -> u32 {
        self.bus_flags
    }

    /// Returns the index of the preferred timing mode.
    #[must_use]
    pub fn preferred_timing(&self) -> u8 {
        self.preferred_timing
    }

    /// Returns the display timing modes, in stored order.
    #[must_use]
    pub fn timings(&self) -> &[PanelTiming] {
        &self.timings
    }

    /// Returns the decoded init command sequence.
    #[must_use]
    pub fn commands(&self) -> &CommandSequence {
        &self.init_sequence
    }
}
