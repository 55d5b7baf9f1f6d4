// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Extraction of a panel configuration from a Rockchip-style device tree.
//!
//! Vendor kernels describe DSI panels as a `simple-panel-dsi` node carrying
//! geometry and delay properties, a legacy binary `panel-init-sequence` and
//! a `display-timings` subtree. This module locates that node in a decoded
//! FDT blob and converts it into a serialized panel configuration.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::cmdseq::{SequenceEntry, SequenceSource};
use crate::error::Error;
use crate::fdt::{Fdt, FdtNode};
use crate::firmware::{
    DelayConfig, DsiConfig, FlagNameMap, FlagsInput, FormatInput, PanelConfig, PanelFirmware,
    SerializedConfig, TimingConfig,
};
use crate::reader::ByteReader;

const PANEL_COMPATIBLE: &str = "simple-panel-dsi";

/// Decodes an FDT blob and extracts the configuration of the first
/// `simple-panel-dsi` node, serialized the way [`PanelFirmware::serialize`]
/// emits it. Returns `Ok(None)` if the tree contains no such node.
///
/// # Errors
///
/// Returns any FDT decoding error, [`Error::UnexpectedEof`] for a
/// truncated `panel-init-sequence`, and any configuration error raised by
/// [`PanelFirmware::from_config`].
pub fn parse_rockchip_fdt(data: &[u8]) -> Result<Option<SerializedConfig>, Error> {
    let fdt = Fdt::new(data)?;
    let Some(node) = fdt.find_compatible(PANEL_COMPATIBLE) else {
        return Ok(None);
    };
    let config = panel_config(node)?;
    Ok(Some(PanelFirmware::from_config(config)?.serialize()))
}

#[expect(clippy::cast_possible_truncation)]
fn truncate_u16(value: u32) -> u16 {
    value as u16
}

#[expect(clippy::cast_possible_truncation)]
fn truncate_u8(value: usize) -> u8 {
    value as u8
}

fn prop_u16(node: &FdtNode, name: &str) -> Option<u16> {
    node.prop_u32(name).map(truncate_u16)
}

fn panel_config(node: &FdtNode) -> Result<PanelConfig, Error> {
    let timings = display_timings(node.child("display-timings"));
    Ok(PanelConfig {
        filename: node.prop_str("compatible", 0).map(String::from),
        width_mm: prop_u16(node, "width-mm").unwrap_or(0),
        height_mm: prop_u16(node, "height-mm").unwrap_or(0),
        rotation: 0,
        delays: DelayConfig {
            reset: prop_u16(node, "reset-delay-ms"),
            init: prop_u16(node, "init-delay-ms"),
            sleep: prop_u16(node, "enable-delay-ms"),
            backlight: None,
        },
        dsi: DsiConfig {
            lanes: prop_u16(node, "dsi,lanes").unwrap_or(0),
            format: FormatInput::Raw(prop_u16(node, "dsi,format").unwrap_or(0)),
            mode_flags: FlagsInput::Bits(node.prop_u32("dsi,flags").unwrap_or(0)),
        },
        bus_flags: timings.bus_flags,
        preferred_timing: timings.preferred,
        timings: timings.modes,
        init_sequence: init_sequence(node)?,
    })
}

/// Decodes the legacy `panel-init-sequence` format: a run of
/// `(data type, wait ms, payload length, payload)` records. The data type
/// byte is carried for the controller and ignored here; a non-zero wait
/// becomes a sleep command after the payload.
fn init_sequence(node: &FdtNode) -> Result<SequenceSource, Error> {
    let Some(prop) = node.property("panel-init-sequence") else {
        return Ok(SequenceSource::default());
    };
    let mut reader = ByteReader::new(prop.value());
    let mut entries = Vec::new();
    while !reader.eof() {
        reader.read_u8()?;
        let wait_ms = reader.read_u8()?;
        let len = reader.read_u8()? as usize;
        entries.push(SequenceEntry::Args(reader.read_bytes(len)?.to_vec()));
        if wait_ms != 0 {
            entries.push(SequenceEntry::Line(format!("sleep {wait_ms}ms")));
        }
    }
    Ok(entries.into())
}

struct DisplayTimings {
    preferred: u8,
    modes: Vec<TimingConfig>,
    bus_flags: FlagsInput,
}

fn display_timings(node: Option<&FdtNode>) -> DisplayTimings {
    let mut preferred = 0;
    let mut modes = Vec::new();
    let mut bus_flags = FlagNameMap::default();
    if let Some(node) = node {
        let native_mode = node.prop_u32("native-mode");
        for (index, (_, child)) in node.children().enumerate() {
            let dclk = child.prop_u32("clock-frequency").unwrap_or(0) / 1000;
            let hactive = prop_u16(child, "hactive").unwrap_or(0);
            let vactive = prop_u16(child, "vactive").unwrap_or(0);

            let mut mode_flags = FlagNameMap::default();
            if let Some(active) = child.prop_u32("vsync-active") {
                let name = if active != 0 { "PVSYNC" } else { "NVSYNC" };
                mode_flags.insert(name.into(), true);
            }
            if let Some(active) = child.prop_u32("hsync-active") {
                let name = if active != 0 { "PHSYNC" } else { "NHSYNC" };
                mode_flags.insert(name.into(), true);
            }
            if let Some(active) = child.prop_u32("de-active") {
                let name = if active != 0 { "DE_HIGH" } else { "DE_LOW" };
                bus_flags.insert(name.into(), true);
            }
            if let Some(active) = child.prop_u32("pixelclk-active") {
                let name = if active != 0 {
                    "PIXDATA_DRIVE_POSEDGE"
                } else {
                    "PIXDATA_DRIVE_NEGEDGE"
                };
                bus_flags.insert(name.into(), true);
            }

            // Indexes the full child list, including children skipped
            // below; an absent phandle matches an absent native-mode.
            if child.prop_u32("phandle") == native_mode {
                preferred = truncate_u8(index);
            }
            if dclk == 0 || hactive == 0 || vactive == 0 {
                continue;
            }

            modes.push(TimingConfig {
                hactive,
                hfp: prop_u16(child, "hfront-porch").unwrap_or(0),
                hslen: prop_u16(child, "hsync-len").unwrap_or(0),
                hbp: prop_u16(child, "hback-porch").unwrap_or(0),
                vactive,
                vfp: prop_u16(child, "vfront-porch").unwrap_or(0),
                vslen: prop_u16(child, "vsync-len").unwrap_or(0),
                vbp: prop_u16(child, "vback-porch").unwrap_or(0),
                dclk,
                flags: FlagsInput::Map(mode_flags),
            });
        }
    }
    DisplayTimings {
        preferred,
        modes,
        bus_flags: FlagsInput::Map(bus_flags),
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec;

    use super::*;

    fn u32_prop(value: u32) -> Vec<u8> {
        value.to_be_bytes().to_vec()
    }

    fn timing_child(dclk_hz: u32, hactive: u32, vactive: u32, phandle: Option<u32>) -> FdtNode {
        let mut node = FdtNode::new();
        node.add_property("clock-frequency", u32_prop(dclk_hz));
        node.add_property("hactive", u32_prop(hactive));
        node.add_property("vactive", u32_prop(vactive));
        node.add_property("hfront-porch", u32_prop(40));
        node.add_property("hsync-len", u32_prop(10));
        node.add_property("hback-porch", u32_prop(20));
        node.add_property("vfront-porch", u32_prop(8));
        node.add_property("vsync-len", u32_prop(2));
        node.add_property("vback-porch", u32_prop(6));
        if let Some(phandle) = phandle {
            node.add_property("phandle", u32_prop(phandle));
        }
        node
    }

    fn panel_node() -> FdtNode {
        let mut node = FdtNode::new();
        node.add_property("compatible", b"vendor,lcd\0simple-panel-dsi\0".to_vec());
        node.add_property("width-mm", u32_prop(68));
        node.add_property("height-mm", u32_prop(121));
        node.add_property("reset-delay-ms", u32_prop(10));
        node.add_property("init-delay-ms", u32_prop(60));
        node.add_property("dsi,lanes", u32_prop(4));
        node.add_property("dsi,format", u32_prop(0));
        node.add_property("dsi,flags", u32_prop(0b11));
        node
    }

    #[test]
    fn node_properties_map_to_the_config() {
        let config = panel_config(&panel_node()).unwrap();
        assert_eq!(config.filename.as_deref(), Some("vendor,lcd"));
        assert_eq!(config.width_mm, 68);
        assert_eq!(config.height_mm, 121);
        assert_eq!(config.rotation, 0);
        assert_eq!(config.delays.reset, Some(10));
        assert_eq!(config.delays.init, Some(60));
        // Absent delays stay unset so the firmware defaults apply.
        assert_eq!(config.delays.sleep, None);
        assert_eq!(config.delays.backlight, None);
        assert_eq!(config.dsi.lanes, 4);
        assert_eq!(config.dsi.mode_flags, FlagsInput::Bits(0b11));
        assert!(config.timings.is_empty());
    }

    #[test]
    fn legacy_init_sequence_expands_waits() {
        let mut node = panel_node();
        node.add_property(
            "panel-init-sequence",
            vec![0x05, 0, 1, 0x11, 0x05, 120, 2, 0x29, 0x01],
        );
        let config = panel_config(&node).unwrap();
        let serialized = PanelFirmware::from_config(config).unwrap().serialize();
        assert_eq!(
            serialized.init_sequence,
            ["command 0x11", "command 0x29 0x01", "sleep 120ms"]
        );
    }

    #[test]
    fn truncated_init_sequence_fails() {
        let mut node = panel_node();
        node.add_property("panel-init-sequence", vec![0x05, 0, 4, 0x11]);
        assert!(matches!(
            panel_config(&node),
            Err(Error::UnexpectedEof(_))
        ));
    }

    #[test]
    fn display_timings_select_the_native_mode() {
        let mut timings = FdtNode::new();
        timings.add_property("native-mode", u32_prop(42));
        timings.add_child("timing0", timing_child(148_500_000, 1080, 1920, Some(7)));
        timings.add_child("timing1", timing_child(62_500_000, 720, 1280, Some(42)));
        let mut node = panel_node();
        node.add_child("display-timings", timings);

        let config = panel_config(&node).unwrap();
        assert_eq!(config.preferred_timing, 1);
        assert_eq!(config.timings.len(), 2);
        assert_eq!(config.timings[0].dclk, 148_500);
        assert_eq!(config.timings[1].dclk, 62_500);
        assert_eq!(config.timings[1].hfp, 40);
    }

    #[test]
    fn incomplete_timings_are_skipped_but_still_indexed() {
        let mut timings = FdtNode::new();
        timings.add_property("native-mode", u32_prop(42));
        // Zero clock-frequency: the child is skipped but keeps its index.
        timings.add_child("timing0", timing_child(0, 1080, 1920, None));
        timings.add_child("timing1", timing_child(62_500_000, 720, 1280, Some(42)));
        let mut node = panel_node();
        node.add_child("display-timings", timings);

        let config = panel_config(&node).unwrap();
        assert_eq!(config.timings.len(), 1);
        assert_eq!(config.preferred_timing, 1);
    }

    #[test]
    fn sync_polarities_become_flag_names() {
        let mut child = timing_child(62_500_000, 720, 1280, None);
        child.add_property("vsync-active", u32_prop(1));
        child.add_property("hsync-active", u32_prop(0));
        child.add_property("de-active", u32_prop(1));
        child.add_property("pixelclk-active", u32_prop(0));
        let mut timings = FdtNode::new();
        timings.add_child("timing0", child);
        let mut node = panel_node();
        node.add_child("display-timings", timings);

        let config = panel_config(&node).unwrap();
        let expected: FlagNameMap = [("PVSYNC", true), ("NHSYNC", true)]
            .into_iter()
            .map(|(name, enabled)| (name.to_string(), enabled))
            .collect();
        assert_eq!(config.timings[0].flags, FlagsInput::Map(expected));
        let expected: FlagNameMap = [("DE_HIGH", true), ("PIXDATA_DRIVE_NEGEDGE", true)]
            .into_iter()
            .map(|(name, enabled)| (name.to_string(), enabled))
            .collect();
        assert_eq!(config.bus_flags, FlagsInput::Map(expected));
    }
}
