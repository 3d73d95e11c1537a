// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Adapters for building focus spaces from other UltraCanvas crates.
//!
//! - [`tree`]: builds a [`FocusSpace`](crate::FocusSpace) from an `ultracanvas_tree::Tree`.

pub mod tree;
