// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the element tree: identifiers, flags, local data and errors.

use alloc::string::String;
use kurbo::Rect;

/// Identifier for an element in a [`Tree`](crate::Tree) (generational, tree-stamped).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ElementId {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
    pub(crate) tree: u32,
}

impl ElementId {
    pub(crate) const fn new(slot: u32, generation: u32, tree: u32) -> Self {
        Self {
            slot,
            generation,
            tree,
        }
    }

    pub(crate) const fn idx(self) -> usize {
        self.slot as usize
    }

    /// Stamp of the tree that created this id.
    pub const fn tree_stamp(self) -> u32 {
        self.tree
    }
}

bitflags::bitflags! {
    /// Element flags controlling visibility, enablement, focus and clipping.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ElementFlags: u8 {
        /// Element is painted and participates in hit testing.
        const VISIBLE        = 0b0000_0001;
        /// Element is disabled; it still occupies space but does not receive input.
        const DISABLED       = 0b0000_0010;
        /// Element accepts keyboard focus.
        const FOCUSABLE      = 0b0000_0100;
        /// Children are clipped to this element's bounds for painting and hit testing.
        const CLIP_TO_BOUNDS = 0b0000_1000;
    }
}

impl Default for ElementFlags {
    fn default() -> Self {
        Self::VISIBLE
    }
}

/// Whether an element can hold children.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Leaf element; attaching children to it fails.
    #[default]
    Leaf,
    /// Container element.
    Container,
}

/// Local data for an element.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalElement {
    /// Stable, caller-chosen identifier (used in logs and lookups).
    pub identifier: String,
    /// Bounds in the parent's coordinate space. For a floating root this is window space.
    pub bounds: Rect,
    /// Z-order among siblings. Higher is drawn on top and hit first.
    pub z_index: i32,
    /// Visibility, enablement, focus and clip flags.
    pub flags: ElementFlags,
    /// Leaf or container.
    pub kind: ElementKind,
}

impl Default for LocalElement {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            bounds: Rect::ZERO,
            z_index: 0,
            flags: ElementFlags::default(),
            kind: ElementKind::Leaf,
        }
    }
}

impl LocalElement {
    /// A visible leaf element.
    pub fn leaf(identifier: impl Into<String>, bounds: Rect) -> Self {
        Self {
            identifier: identifier.into(),
            bounds,
            ..Self::default()
        }
    }

    /// A visible container element.
    pub fn container(identifier: impl Into<String>, bounds: Rect) -> Self {
        Self {
            identifier: identifier.into(),
            bounds,
            kind: ElementKind::Container,
            ..Self::default()
        }
    }

    /// Mark the element as focusable.
    #[must_use]
    pub fn focusable(mut self) -> Self {
        self.flags |= ElementFlags::FOCUSABLE;
        self
    }

    /// Clip children to this element's bounds.
    #[must_use]
    pub fn clipped(mut self) -> Self {
        self.flags |= ElementFlags::CLIP_TO_BOUNDS;
        self
    }

    /// Set the z-index.
    #[must_use]
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Replace all flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ElementFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Structural errors reported by tree mutations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// The id is stale or was never issued by this tree.
    #[error("element {0:?} is not alive in this tree")]
    Stale(ElementId),
    /// The id was issued by a different tree (another window).
    #[error("element {0:?} belongs to a different window")]
    Foreign(ElementId),
    /// The requested parent is a leaf.
    #[error("element {0:?} is not a container")]
    NotAContainer(ElementId),
    /// The child already has a parent; detach it first.
    #[error("element {child:?} is already attached to {parent:?}")]
    AlreadyAttached {
        /// The element being attached.
        child: ElementId,
        /// Its current parent.
        parent: ElementId,
    },
    /// Attaching would make an element its own ancestor.
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle {
        /// The element being attached.
        child: ElementId,
        /// The requested parent.
        parent: ElementId,
    },
    /// The window root cannot be detached or removed.
    #[error("the window root cannot be detached or removed")]
    Root,
}
