// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use panelkit::firmware::{DsiFormat, PanelConfig, PanelFirmware};

const CONFIG_JSON: &str = r#"{
    "filename": "vendor,lcd",
    "width_mm": 68,
    "height_mm": 121,
    "rotation": 270,
    "delays": { "reset": 10, "init": 60 },
    "dsi": {
        "lanes": 4,
        "format": "rgb888",
        "mode_flags": "MODE_VIDEO | MODE_VIDEO_BURST | MODE_LPM"
    },
    "bus_flags": ["DE_HIGH"],
    "preferred_timing": 0,
    "timings": [
        {
            "hactive": 1080, "hfp": 40, "hslen": 10, "hbp": 20,
            "vactive": 1920, "vfp": 8, "vslen": 2, "vbp": 6,
            "dclk": 148500,
            "flags": "PHSYNC | PVSYNC"
        },
        {
            "hactive": 720, "hfp": 20, "hslen": 5, "hbp": 10,
            "vactive": 1280, "vfp": 4, "vslen": 1, "vbp": 3,
            "dclk": 62500,
            "flags": { "NHSYNC": true, "NVSYNC": true }
        }
    ],
    "init_sequence": "command 0x11\nsleep 120ms\ncommand 0x29"
}"#;

#[test]
fn json_config_round_trips_through_the_blob() {
    let config: PanelConfig = serde_json::from_str(CONFIG_JSON).unwrap();
    let firmware = PanelFirmware::from_config(config).unwrap();
    let blob = firmware.pack();

    let reparsed = PanelFirmware::parse(&blob).unwrap();
    assert_eq!(reparsed.size_mm(), (68, 121));
    assert_eq!(reparsed.rotation(), 270);
    assert_eq!(reparsed.delays().reset, 10);
    assert_eq!(reparsed.delays().init, 60);
    // Unset delays take the defaults.
    assert_eq!(reparsed.delays().sleep, 120);
    assert_eq!(reparsed.delays().backlight, 0);
    assert_eq!(reparsed.lanes(), 4);
    assert_eq!(reparsed.format(), DsiFormat::Rgb888.raw());
    assert_eq!(reparsed.mode_flags(), (1 << 0) | (1 << 1) | (1 << 11));
    assert_eq!(reparsed.bus_flags(), 1 << 1);
    assert_eq!(reparsed.timings().len(), 2);
    assert_eq!(reparsed.timings()[0].dclk, 148_500);
    assert_eq!(reparsed.timings()[1].flags, (1 << 1) | (1 << 3));
    assert_eq!(reparsed.commands().len(), 3);

    // Re-packing the reparsed firmware reproduces the blob byte for byte.
    assert_eq!(reparsed.pack(), blob);
}

#[test]
fn serialization_is_stable_across_a_round_trip() {
    let config: PanelConfig = serde_json::from_str(CONFIG_JSON).unwrap();
    let firmware = PanelFirmware::from_config(config).unwrap();
    let reparsed = PanelFirmware::parse(&firmware.pack()).unwrap();

    let mut expected = firmware.serialize();
    expected.filename = None; // not stored in the blob
    assert_eq!(reparsed.serialize(), expected);

    let value = serde_json::to_value(reparsed.serialize()).unwrap();
    assert_eq!(value["dsi"]["format"], "rgb888");
    assert_eq!(value["timings"][0]["flags"]["PHSYNC"], true);
    assert_eq!(value["bus_flags"]["DE_HIGH"], true);
    assert_eq!(value["init_sequence"][0].as_str().unwrap(), "command 0x11");
}

#[test]
fn blob_begins_with_magic_and_version() {
    let firmware = PanelFirmware::from_config(PanelConfig::default()).unwrap();
    let blob = firmware.pack();
    assert!(blob.starts_with(b"PANEL-FIRMWARE\0\x01"));
    assert_eq!(blob.len(), 64);
}
