// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;

use hashbrown::HashMap;
use kurbo::{Point, Rect, Size};
use ultracanvas_event::WindowId;
use ultracanvas_focus::FocusState;
use ultracanvas_native::{CursorShape, NativeHandle};
use ultracanvas_tree::{ElementFlags, ElementId, Hit, LocalElement, QueryFilter, Tree};

use crate::element::Element;
use crate::render::{RecordingContext, RenderContext};

/// Lifecycle of a window.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WindowState {
    /// Registered but not yet shown.
    Created,
    /// Mapped on screen.
    Visible,
    /// Close accepted; destroyed during the current turn's cleanup.
    DeleteRequested,
    /// Destroyed. Never observed in the coordinator's window list.
    Deleted,
}

/// A transient subtree floating above the window root.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Popup {
    /// Floating root of the popup in the window's tree.
    pub root: ElementId,
    /// Element that opened the popup.
    pub owner: Option<ElementId>,
    /// Marked for removal after the current event.
    pub dismissed: bool,
}

/// A toolkit window: its element tree, element behavior and per-window input state.
pub struct Window {
    pub(crate) id: WindowId,
    pub(crate) native: NativeHandle,
    pub(crate) state: WindowState,
    pub(crate) tree: Tree,
    pub(crate) elements: HashMap<ElementId, Box<dyn Element>>,
    pub(crate) focus: FocusState<ElementId>,
    pub(crate) popups: Vec<Popup>,
    pub(crate) modal: Option<ElementId>,
    pub(crate) cursor: CursorShape,
    pub(crate) needs_redraw: bool,
    pub(crate) context: Box<dyn RenderContext>,
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("native", &self.native)
            .field("state", &self.state)
            .field("tree", &self.tree)
            .field("elements", &self.elements.len())
            .field("focused", &self.focus.focused())
            .field("popups", &self.popups)
            .field("modal", &self.modal)
            .field("cursor", &self.cursor)
            .field("needs_redraw", &self.needs_redraw)
            .finish_non_exhaustive()
    }
}

impl Window {
    pub(crate) fn new(id: WindowId, native: NativeHandle, size: Size, title: &str) -> Self {
        let root = LocalElement::container(title, Rect::from_origin_size(Point::ZERO, size));
        Self {
            id,
            native,
            state: WindowState::Created,
            tree: Tree::new(root),
            elements: HashMap::new(),
            focus: FocusState::new(),
            popups: Vec::new(),
            modal: None,
            cursor: CursorShape::Default,
            needs_redraw: true,
            context: Box::new(RecordingContext::new()),
        }
    }

    /// Logical id.
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Native handle.
    pub fn native(&self) -> NativeHandle {
        self.native
    }

    /// Lifecycle state.
    pub fn state(&self) -> WindowState {
        self.state
    }

    /// Whether events may still be routed here.
    pub fn is_live(&self) -> bool {
        matches!(self.state, WindowState::Created | WindowState::Visible)
    }

    /// The element tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The root element.
    pub fn root(&self) -> ElementId {
        self.tree.root()
    }

    /// Size of the window (the root's bounds).
    pub fn size(&self) -> Size {
        self.tree.bounds(self.tree.root()).map_or(Size::ZERO, |b| b.size())
    }

    /// Focused element.
    pub fn focused(&self) -> Option<ElementId> {
        self.focus.focused()
    }

    /// Open popups, bottom to top.
    pub fn popups(&self) -> &[Popup] {
        &self.popups
    }

    /// Modal element, if any.
    pub fn modal(&self) -> Option<ElementId> {
        self.modal
    }

    /// Cursor currently shown.
    pub fn cursor(&self) -> CursorShape {
        self.cursor
    }

    /// Whether a repaint is pending.
    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Schedule a repaint.
    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    /// Replace the surface the window paints into.
    pub fn set_render_context(&mut self, context: impl RenderContext + 'static) {
        self.context = Box::new(context);
        self.needs_redraw = true;
    }

    /// Move or resize an element.
    pub fn set_bounds(&mut self, element: ElementId, bounds: Rect) {
        self.tree.set_bounds(element, bounds);
        self.needs_redraw = true;
    }

    /// Show or hide an element.
    pub fn set_visible(&mut self, element: ElementId, visible: bool) {
        self.tree.set_visible(element, visible);
        self.needs_redraw = true;
    }

    /// Enable or disable an element.
    pub fn set_disabled(&mut self, element: ElementId, disabled: bool) {
        self.tree.set_disabled(element, disabled);
        self.needs_redraw = true;
    }

    /// Change an element's z-index.
    pub fn set_z_index(&mut self, element: ElementId, z_index: i32) {
        self.tree.set_z_index(element, z_index);
        self.needs_redraw = true;
    }

    /// Replace an element's flags.
    pub fn set_flags(&mut self, element: ElementId, flags: ElementFlags) {
        self.tree.set_flags(element, flags);
        self.needs_redraw = true;
    }

    /// The popup whose subtree contains `element`.
    pub fn popup_of(&self, element: ElementId) -> Option<&Popup> {
        let top = self.tree.top_of(element)?;
        self.popups.iter().find(|p| p.root == top)
    }

    /// Whether input aimed at `element` gets past the modal element.
    ///
    /// With no modal element everything passes. Otherwise `element` must lie in the modal
    /// subtree, or in a popup whose owner does (popups opened from popups included).
    pub fn admits(&self, element: ElementId) -> bool {
        let Some(modal) = self.modal else {
            return true;
        };
        let mut current = element;
        for _ in 0..=self.popups.len() {
            if self.tree.is_in_subtree(current, modal) {
                return true;
            }
            match self.popup_of(current).and_then(|p| p.owner) {
                Some(owner) => current = owner,
                None => return false,
            }
        }
        false
    }

    /// Deepest element under `point` (window space): open popups from the top first, then
    /// the root's subtree.
    pub fn hit_test(&self, point: Point) -> Option<Hit> {
        let filter = QueryFilter::new().visible();
        self.popups
            .iter()
            .rev()
            .filter(|p| !p.dismissed)
            .find_map(|p| self.tree.hit_test(p.root, point, filter))
            .or_else(|| self.tree.hit_test(self.tree.root(), point, filter))
    }

    /// Cursor requested by `element` or its nearest ancestor that asks for one.
    pub(crate) fn cursor_for(&self, element: ElementId) -> CursorShape {
        self.tree
            .ancestors(element)
            .find_map(|id| self.elements.get(&id).and_then(|e| e.cursor()))
            .unwrap_or_default()
    }

    pub(crate) fn mark_dismissed(&mut self, element: ElementId) -> bool {
        let Some(top) = self.tree.top_of(element) else {
            return false;
        };
        match self.popups.iter_mut().find(|p| p.root == top) {
            Some(popup) => {
                popup.dismissed = true;
                true
            }
            None => false,
        }
    }
}
