// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use panelkit::{CommandSequence, SequenceFormat};

// A typical panel init block, as found in vendor device trees.
const INIT_TEXT: &str = "\
; ILI9881C initialization
command 0xff 0x98 0x81 0x03 ; page 3
command 0x01 0x00
sleep 5ms
command 0xff 0x98 0x81 0x00 ; page 0
command 0x11 ; sleep out
sleep 120ms
command 0x29 ; display on";

#[test]
fn text_survives_a_binary_round_trip() {
    let seq = CommandSequence::parse(INIT_TEXT).unwrap();
    let packed = seq.pack();
    let decoded = CommandSequence::from_bytes(&packed).unwrap();

    // Comments and blank structure are lost in the binary form, but the
    // command payloads and delays are not.
    assert_eq!(
        decoded.serialize(SequenceFormat::TextNormalized),
        [
            "command 0xff 0x98 0x81 0x03",
            "command 0x01 0x00",
            "sleep 10ms",
            "command 0xff 0x98 0x81 0x00",
            "command 0x11",
            "sleep 120ms",
            "command 0x29",
        ]
    );
    assert_eq!(decoded.pack(), packed);
}

#[test]
fn verbatim_text_serialization_is_lossless() {
    let seq = CommandSequence::parse(INIT_TEXT).unwrap();
    assert_eq!(
        seq.serialize(SequenceFormat::Text).join("\n"),
        INIT_TEXT
    );
    assert_eq!(seq.to_string(), INIT_TEXT);
}

#[test]
fn dts_forms_render_hex_cells() {
    let seq = CommandSequence::parse("command 0x11 ; sleep out\nsleep 120ms\ncommand 0x29").unwrap();
    assert_eq!(
        seq.serialize(SequenceFormat::Dts),
        ["01 11 // sleep out", "80 00 00", "01 29"]
    );
    assert_eq!(
        seq.serialize(SequenceFormat::DtsCompact),
        ["01 11 80 00 00 01 29"]
    );
}

#[test]
fn normalization_is_stable() {
    let seq = CommandSequence::parse("  0x11,0x22   ; spaced oddly\nsleep 1s").unwrap();
    let normalized = seq.serialize(SequenceFormat::TextNormalized).join("\n");
    assert_eq!(normalized, "command 0x11 0x22 ; spaced oddly\nsleep 1000ms");

    let again = CommandSequence::parse(normalized.as_str())
        .unwrap()
        .serialize(SequenceFormat::TextNormalized)
        .join("\n");
    assert_eq!(again, normalized);
}
