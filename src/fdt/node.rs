// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! An owned, read-only device tree node.

use alloc::string::String;
use alloc::vec::Vec;

use indexmap::IndexMap;

use crate::XxBuildHasher;
use crate::fdt::property::Property;

/// A node in a decoded device tree.
///
/// Each node exclusively owns its properties and children. Property and
/// child names are unique within a node; both maps preserve insertion
/// order, which for children is their order in the structure block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FdtNode {
    properties: IndexMap<String, Vec<u8>, XxBuildHasher>,
    children: IndexMap<String, FdtNode, XxBuildHasher>,
}

impl FdtNode {
    /// Creates an empty node.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a property on this node, replacing any previous value
    /// stored under the same name.
    pub(crate) fn add_property(&mut self, name: impl Into<String>, value: Vec<u8>) {
        self.properties.insert(name.into(), value);
    }

    /// Registers a child node under the given name.
    pub(crate) fn add_child(&mut self, name: impl Into<String>, node: FdtNode) {
        self.children.insert(name.into(), node);
    }

    /// Returns the property with the given name, if present.
    ///
    /// # Examples
    ///
    /// ```
    /// # use panelkit::fdt::FdtNode;
    /// let node = FdtNode::new();
    /// assert!(node.property("width-mm").is_none());
    /// ```
    #[must_use]
    pub fn property(&self, name: &str) -> Option<Property<'_>> {
        self.properties
            .get_key_value(name)
            .map(|(name, value)| Property::new(name, value))
    }

    /// Returns the stored bytes of a property as one big-endian 32-bit
    /// integer, or `None` if the property is absent or shorter than four
    /// bytes.
    #[must_use]
    pub fn prop_u32(&self, name: &str) -> Option<u32> {
        self.property(name)?.as_u32()
    }

    /// Returns element `idx` of a property's null-terminated string list.
    #[must_use]
    pub fn prop_str(&self, name: &str, idx: usize) -> Option<&str> {
        self.property(name)?.str_at(idx)
    }

    /// Returns the child node registered under the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&FdtNode> {
        self.children.get(name)
    }

    /// Returns this node's children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &FdtNode)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Returns whether this node has a `compatible` string list containing
    /// the given value.
    #[must_use]
    pub fn is_compatible(&self, compatible: &str) -> bool {
        self.property("compatible")
            .is_some_and(|prop| prop.as_str_list().any(|c| c == compatible))
    }

    /// Finds the first node in this subtree matching the predicate, in
    /// depth-first pre-order: the node itself is tested before its
    /// children, children in insertion order.
    #[must_use]
    pub fn find<F>(&self, pred: F) -> Option<&FdtNode>
    where
        F: Fn(&FdtNode) -> bool,
    {
        self.find_inner(&pred)
    }

    fn find_inner(&self, pred: &dyn Fn(&FdtNode) -> bool) -> Option<&FdtNode> {
        if pred(self) {
            return Some(self);
        }
        self.children
            .values()
            .find_map(|child| child.find_inner(pred))
    }
}
