// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Delivery chains and propagation.
//!
//! Bubbling is an iterative walk: the chain is the target followed by its ancestors, and
//! [`run`] visits it in order until a handler consumes the event or panics.

use smallvec::SmallVec;
use ultracanvas_event::{EventKind, Modifiers, UIEvent};
use ultracanvas_tree::{ElementFlags, ElementId, Tree};

use crate::ElementRef;

pub(crate) type Chain = SmallVec<[ElementId; 8]>;

/// Result of offering an event to one element or a chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// Nobody consumed the event.
    Ignored,
    /// A handler consumed the event.
    Consumed,
    /// A handler panicked; the event must not be offered further.
    Aborted,
}

impl Delivery {
    pub(crate) fn stops(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Offer an event along `chain` until it stops.
pub(crate) fn run(chain: &[ElementId], mut deliver: impl FnMut(ElementId) -> Delivery) -> Delivery {
    for &element in chain {
        let delivery = deliver(element);
        if delivery.stops() {
            return delivery;
        }
    }
    Delivery::Ignored
}

/// Whether `id` and all its ancestors are enabled.
pub(crate) fn is_enabled(tree: &Tree, id: ElementId) -> bool {
    tree.is_alive(id)
        && tree.ancestors(id).all(|a| {
            tree.flags(a)
                .is_some_and(|f| !f.contains(ElementFlags::DISABLED))
        })
}

/// `start` and its ancestors up to and including `limit` (or the top), minus disabled ones.
pub(crate) fn bubble_chain(tree: &Tree, start: ElementId, limit: Option<ElementId>) -> Chain {
    let mut chain = Chain::new();
    for id in tree.ancestors(start) {
        if is_enabled(tree, id) {
            chain.push(id);
        }
        if Some(id) == limit {
            break;
        }
    }
    chain
}

/// The hit element, then the top of its tree (the window root or a popup root): pointer
/// events fall through without visiting intermediate containers.
pub(crate) fn fall_through_chain(tree: &Tree, hit: ElementId) -> Chain {
    let mut chain = Chain::new();
    if is_enabled(tree, hit) {
        chain.push(hit);
    }
    if let Some(top) = tree.top_of(hit)
        && top != hit
        && is_enabled(tree, top)
    {
        chain.push(top);
    }
    chain
}

/// Leave and enter targets for a hover change.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct HoverChange {
    pub(crate) leave: Option<ElementRef>,
    pub(crate) enter: Option<ElementRef>,
}

pub(crate) fn hover_change(
    previous: Option<ElementRef>,
    next: Option<ElementRef>,
) -> Option<HoverChange> {
    (previous != next).then_some(HoverChange {
        leave: previous,
        enter: next,
    })
}

/// An unconsumed key press that should also produce text.
pub(crate) fn text_input_for(event: &UIEvent) -> Option<UIEvent> {
    if event.kind != EventKind::KeyDown
        || event
            .modifiers
            .intersects(Modifiers::CTRL | Modifiers::ALT | Modifiers::META)
    {
        return None;
    }
    let text = event.text.as_deref()?;
    if text.is_empty() || text.chars().any(char::is_control) {
        return None;
    }
    let mut input = event.clone();
    input.kind = EventKind::TextInput;
    Some(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;
    use ultracanvas_event::WindowId;
    use ultracanvas_native::Key;
    use ultracanvas_tree::LocalElement;

    fn tree() -> (Tree, [ElementId; 4]) {
        let mut tree = Tree::new(LocalElement::container("root", Rect::new(0.0, 0.0, 100.0, 100.0)));
        let root = tree.root();
        let panel = tree
            .insert(root, LocalElement::container("panel", Rect::new(0.0, 0.0, 50.0, 50.0)))
            .unwrap();
        let row = tree
            .insert(panel, LocalElement::container("row", Rect::new(0.0, 0.0, 50.0, 10.0)))
            .unwrap();
        let cell = tree
            .insert(row, LocalElement::leaf("cell", Rect::new(0.0, 0.0, 10.0, 10.0)))
            .unwrap();
        (tree, [root, panel, row, cell])
    }

    #[test]
    fn chains_bubble_to_the_limit_and_skip_disabled() {
        let (mut tree, [root, panel, row, cell]) = tree();
        assert_eq!(bubble_chain(&tree, cell, None).as_slice(), &[cell, row, panel, root]);
        assert_eq!(bubble_chain(&tree, cell, Some(row)).as_slice(), &[cell, row]);

        tree.set_disabled(row, true);
        assert_eq!(
            bubble_chain(&tree, cell, None).as_slice(),
            &[panel, root],
            "a disabled container disables its subtree"
        );
        assert_eq!(fall_through_chain(&tree, cell).as_slice(), &[root]);

        let menu = tree.insert_detached(LocalElement::container("menu", Rect::new(0.0, 0.0, 20.0, 20.0)));
        let item = tree
            .insert(menu, LocalElement::leaf("item", Rect::new(0.0, 0.0, 20.0, 5.0)))
            .unwrap();
        assert_eq!(fall_through_chain(&tree, item).as_slice(), &[item, menu]);
        assert_eq!(fall_through_chain(&tree, root).as_slice(), &[root]);
    }

    #[test]
    fn run_stops_at_the_first_consumer() {
        let (_, [root, panel, row, cell]) = tree();
        let mut seen = Vec::new();
        let outcome = run(&[cell, row, panel, root], |id| {
            seen.push(id);
            if id == panel {
                Delivery::Consumed
            } else {
                Delivery::Ignored
            }
        });
        assert_eq!(outcome, Delivery::Consumed);
        assert_eq!(seen, [cell, row, panel]);

        let aborted = run(&[cell, row], |_| Delivery::Aborted);
        assert_eq!(aborted, Delivery::Aborted);
        assert_eq!(run(&[], |_| Delivery::Consumed), Delivery::Ignored);
    }

    #[test]
    fn hover_changes_only_when_the_target_differs() {
        let (_, [root, _, _, cell]) = tree();
        let at = |element| ElementRef {
            window: WindowId(1),
            element,
        };
        assert_eq!(hover_change(Some(at(cell)), Some(at(cell))), None);
        assert_eq!(
            hover_change(Some(at(cell)), Some(at(root))),
            Some(HoverChange {
                leave: Some(at(cell)),
                enter: Some(at(root)),
            })
        );
    }

    #[test]
    fn only_plain_printable_presses_produce_text() {
        let press = UIEvent::new(EventKind::KeyDown)
            .with_key(Key::Character('a'), 38)
            .with_text("a");
        assert_eq!(text_input_for(&press).map(|e| e.kind), Some(EventKind::TextInput));

        let shortcut = press.clone().with_modifiers(Modifiers::CTRL);
        assert_eq!(text_input_for(&shortcut), None);
        let tab = UIEvent::new(EventKind::KeyDown)
            .with_key(Key::Tab, 23)
            .with_text("\t");
        assert_eq!(text_input_for(&tab), None);
        let shifted = press.with_modifiers(Modifiers::SHIFT).with_text("A");
        assert_eq!(text_input_for(&shifted).and_then(|e| e.text), Some(String::from("A")));
    }
}
