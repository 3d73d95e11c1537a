// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! UltraCanvas Tree: the element tree owned by each window.
//!
//! ## Overview
//!
//! Every window owns exactly one [`Tree`]. The tree stores the *structural* half of each
//! element: a stable string identifier, bounds relative to the parent, a z-index, and
//! [`ElementFlags`] for visibility, enablement, focusability and clipping. Behavior
//! (event handling, painting) lives elsewhere and is keyed by [`ElementId`].
//!
//! - Parent/child links are arena indices, never owning pointers. An element is reachable
//!   from at most one tree: every [`ElementId`] carries a stamp of the tree that minted it,
//!   and ids from a different tree are rejected.
//! - Bounds are stored relative to the parent. Window coordinates are derived on demand by
//!   [`Tree::absolute_origin`] and [`Tree::absolute_bounds`]; nothing caches them.
//! - Floating subtrees ([`Tree::insert_detached`]) sit beside the root. Windows use them for
//!   popups, and callers use them to build a subtree before attaching it.
//!
//! ## Hit testing
//!
//! [`Tree::hit_test`] walks depth-first and front-to-back: among siblings, higher z-index is
//! tested first, then later siblings before earlier ones. Invisible elements (and their
//! subtrees) never match. A container with [`ElementFlags::CLIP_TO_BOUNDS`] is skipped when
//! the point lies outside it; a non-clipping container still lets children that overflow it
//! receive the hit.
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use ultracanvas_tree::{LocalElement, QueryFilter, Tree};
//!
//! let mut tree = Tree::new(LocalElement::container("window", Rect::new(0.0, 0.0, 400.0, 300.0)));
//! let root = tree.root();
//! let button = tree
//!     .insert(root, LocalElement::leaf("ok", Rect::new(10.0, 10.0, 110.0, 40.0)))
//!     .unwrap();
//!
//! let hit = tree.hit_test(root, Point::new(20.0, 15.0), QueryFilter::new().visible()).unwrap();
//! assert_eq!(hit.element, button);
//! assert_eq!(hit.path.as_slice(), &[root, button]);
//! ```
//!
//! ## Structural errors
//!
//! Attaching an element that already has a parent, attaching under a leaf, creating a cycle,
//! or passing a stale or foreign id yields a [`TreeError`] at the call site.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod tree;
mod types;

pub use tree::{DepthFirst, Hit, QueryFilter, Tree};
pub use types::{ElementFlags, ElementId, ElementKind, LocalElement, TreeError};
