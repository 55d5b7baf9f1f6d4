// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod common;

use common::FdtBuilder;
use panelkit::fdt::Fdt;

#[test]
fn decodes_a_nested_tree() {
    let dtb = FdtBuilder::new()
        .begin_node("")
        .prop_str("model", "test-board")
        .begin_node("soc")
        .prop_u32("#address-cells", 1)
        .begin_node("serial@ff180000")
        .prop_str("status", "okay")
        .end_node()
        .end_node()
        .begin_node("chosen")
        .end_node()
        .end_node()
        .build();

    let fdt = Fdt::new(&dtb).unwrap();
    let root = fdt.root();
    assert_eq!(root.prop_str("model", 0), Some("test-board"));

    let names: Vec<&str> = root.children().map(|(name, _)| name).collect();
    assert_eq!(names, ["soc", "chosen"]);

    let soc = root.child("soc").unwrap();
    assert_eq!(soc.prop_u32("#address-cells"), Some(1));
    let serial = soc.child("serial@ff180000").unwrap();
    assert_eq!(serial.prop_str("status", 0), Some("okay"));
    assert!(serial.children().next().is_none());
}

#[test]
fn finds_a_node_by_compatible_string() {
    let dtb = FdtBuilder::new()
        .begin_node("")
        .begin_node("dsi@ff960000")
        .prop_str("compatible", "rockchip,rk3288-mipi-dsi")
        .begin_node("panel")
        .prop("compatible", b"vendor,lcd\0simple-panel-dsi\0")
        .prop_u32("width-mm", 68)
        .end_node()
        .end_node()
        .end_node()
        .build();

    let fdt = Fdt::new(&dtb).unwrap();
    let panel = fdt.find_compatible("simple-panel-dsi").unwrap();
    assert_eq!(panel.prop_u32("width-mm"), Some(68));
    assert_eq!(panel.prop_str("compatible", 1), Some("simple-panel-dsi"));
    assert!(fdt.find_compatible("simple-panel").is_none());
}

#[test]
fn string_list_properties_index_in_order() {
    let dtb = FdtBuilder::new()
        .begin_node("")
        .prop("compatible", b"first\0second\0third\0")
        .end_node()
        .build();

    let fdt = Fdt::new(&dtb).unwrap();
    let prop = fdt.root().property("compatible").unwrap();
    let strings: Vec<&str> = prop.as_str_list().collect();
    assert_eq!(strings, ["first", "second", "third"]);
    assert!(fdt.root().is_compatible("second"));
}

#[test]
fn header_fields_are_exposed() {
    let dtb = FdtBuilder::new().begin_node("").end_node().build();
    let fdt = Fdt::new(&dtb).unwrap();
    assert_eq!(fdt.version(), 17);
    assert_eq!(fdt.last_comp_version(), 16);
    assert_eq!(fdt.boot_cpuid_phys(), 0);
    assert_eq!(fdt.totalsize() as usize, dtb.len());
}

#[test]
fn memory_reservations_are_listed_without_the_terminator() {
    let dtb = FdtBuilder::new()
        .reservation(0x1000, 0x100)
        .reservation(0x2000, 0x200)
        .begin_node("")
        .end_node()
        .build();

    let fdt = Fdt::new(&dtb).unwrap();
    let reservations = fdt.memory_reservations();
    assert_eq!(reservations.len(), 2);
    assert_eq!(reservations[0].address(), 0x1000);
    assert_eq!(reservations[0].size(), 0x100);
    assert_eq!(reservations[1].address(), 0x2000);
    assert_eq!(reservations[1].size(), 0x200);
}

#[test]
fn duplicate_property_names_share_one_string_table_entry() {
    let dtb = FdtBuilder::new()
        .begin_node("")
        .begin_node("a")
        .prop_u32("reg", 1)
        .end_node()
        .begin_node("b")
        .prop_u32("reg", 2)
        .end_node()
        .end_node()
        .build();

    let fdt = Fdt::new(&dtb).unwrap();
    assert_eq!(fdt.root().child("a").unwrap().prop_u32("reg"), Some(1));
    assert_eq!(fdt.root().child("b").unwrap().prop_u32("reg"), Some(2));
}

#[test]
fn empty_structure_block_yields_an_empty_root() {
    let dtb = FdtBuilder::new().build();
    let fdt = Fdt::new(&dtb).unwrap();
    assert!(fdt.root().children().next().is_none());
    assert!(fdt.root().property("model").is_none());
}
