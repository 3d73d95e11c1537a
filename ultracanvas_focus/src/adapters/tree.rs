// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Adapter helpers for `ultracanvas_tree`.
//!
//! ## Feature
//!
//! Enable with `tree_adapter`.
//!
//! ## Notes
//!
//! Candidates are collected in depth-first pre-order, the same order Tab walks. Invisible
//! elements hide their whole subtree. Focusable elements that are disabled stay in the list
//! with `enabled: false` so a disabled origin can still be located.

use alloc::vec::Vec;

use ultracanvas_tree::{ElementFlags, ElementId, Tree};

use crate::FocusEntry;

/// Collect focus candidates from the subtree rooted at `scope`.
pub fn focus_entries(tree: &Tree, scope: ElementId) -> Vec<FocusEntry<ElementId>> {
    let mut out = Vec::new();
    if tree.is_effectively_visible(scope) {
        collect(tree, scope, &mut out);
    }
    out
}

fn collect(tree: &Tree, id: ElementId, out: &mut Vec<FocusEntry<ElementId>>) {
    let Some(flags) = tree.flags(id) else {
        return;
    };
    if !flags.contains(ElementFlags::VISIBLE) {
        return;
    }
    if flags.contains(ElementFlags::FOCUSABLE) {
        out.push(FocusEntry {
            id,
            enabled: !flags.contains(ElementFlags::DISABLED),
        });
    }
    for &child in tree.children_of(id) {
        collect(tree, child, out);
    }
}

/// Whether `id` can take focus right now: live, focusable, enabled and visible.
pub fn can_receive_focus(tree: &Tree, id: ElementId) -> bool {
    tree.flags(id).is_some_and(|f| {
        f.contains(ElementFlags::FOCUSABLE) && !f.contains(ElementFlags::DISABLED)
    }) && tree.is_effectively_visible(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FocusPolicy, FocusSpace, Navigation, TreeOrderPolicy};
    use kurbo::Rect;
    use ultracanvas_tree::LocalElement;

    #[test]
    fn entries_follow_depth_first_order_and_skip_hidden_subtrees() {
        let mut tree = Tree::new(LocalElement::container("window", Rect::new(0.0, 0.0, 100.0, 100.0)));
        let root = tree.root();
        let a = tree.insert(root, LocalElement::leaf("a", Rect::ZERO).focusable()).unwrap();
        let panel = tree.insert(root, LocalElement::container("panel", Rect::ZERO)).unwrap();
        let b = tree.insert(panel, LocalElement::leaf("b", Rect::ZERO).focusable()).unwrap();
        let hidden = tree.insert(root, LocalElement::container("hidden", Rect::ZERO)).unwrap();
        let _c = tree.insert(hidden, LocalElement::leaf("c", Rect::ZERO).focusable()).unwrap();
        let d = tree.insert(root, LocalElement::leaf("d", Rect::ZERO).focusable()).unwrap();
        let _label = tree.insert(root, LocalElement::leaf("label", Rect::ZERO)).unwrap();
        tree.set_visible(hidden, false);
        tree.set_disabled(d, true);

        let entries = focus_entries(&tree, root);
        let ids: Vec<_> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, [a, b, d]);
        assert!(!entries[2].enabled);

        let space = FocusSpace { nodes: &entries };
        let policy = TreeOrderPolicy::default();
        assert_eq!(policy.next(Some(b), Navigation::Next, &space), Some(a));
        assert!(can_receive_focus(&tree, b));
        assert!(!can_receive_focus(&tree, d));
        assert!(!can_receive_focus(&tree, panel));
    }
}
