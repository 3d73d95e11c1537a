// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element behavior and the context handlers receive.

use std::fmt;

use kurbo::{Point, Rect};
use ultracanvas_clipboard::Clipboard;
use ultracanvas_event::{Modifiers, UIEvent, WindowId};
use ultracanvas_native::CursorShape;
use ultracanvas_tree::{ElementId, Tree};

use crate::error::RenderError;
use crate::render::{RenderContext, RenderInfo};

/// The behavioral half of an element.
///
/// Structure (bounds, flags, parent and children) lives in the window's [`Tree`]; the
/// coordinator keys implementations of this trait by [`ElementId`] and treats them opaquely.
pub trait Element {
    /// Handle an event. Return `true` to consume it and stop propagation.
    ///
    /// Pointer positions are in this element's local coordinates.
    fn receive(&mut self, event: &UIEvent, cx: &mut EventCx<'_>) -> bool;

    /// Paint into `(0, 0)..info.size`.
    fn render(
        &mut self,
        _context: &mut dyn RenderContext,
        _info: &RenderInfo,
    ) -> Result<(), RenderError> {
        Ok(())
    }

    /// Cursor wanted while the pointer is over this element. `None` defers to the parent.
    fn cursor(&self) -> Option<CursorShape> {
        None
    }

    /// Text shown after the pointer rests on this element.
    fn tooltip(&self) -> Option<String> {
        None
    }
}

/// An element with no behavior: it consumes nothing and paints nothing.
impl Element for () {
    fn receive(&mut self, _event: &UIEvent, _cx: &mut EventCx<'_>) -> bool {
        false
    }
}

/// Changes a handler asked for; applied by the coordinator once the handler returns.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Request {
    CaptureMouse(ElementId),
    ReleaseMouse(ElementId),
    SetFocus(Option<ElementId>),
    FocusNext,
    FocusPrevious,
    Redraw,
    DismissPopup(ElementId),
    StartDrag(ElementId),
    EndDrag,
    SetModal(Option<ElementId>),
    Push(UIEvent),
    CloseWindow,
    Exit,
}

/// Context handed to [`Element::receive`].
///
/// Reads see the state at the time of delivery. Mutations are recorded and applied in
/// order right after the handler returns; focus changes deliver their focus events
/// immediately, anything pushed goes to the back of the queue.
pub struct EventCx<'a> {
    window: WindowId,
    element: ElementId,
    tree: &'a Tree,
    focused: Option<ElementId>,
    modifiers: Modifiers,
    current: Option<&'a UIEvent>,
    clipboard: Clipboard<'a>,
    requests: Vec<Request>,
}

impl fmt::Debug for EventCx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventCx")
            .field("window", &self.window)
            .field("element", &self.element)
            .field("focused", &self.focused)
            .field("requests", &self.requests.len())
            .finish_non_exhaustive()
    }
}

impl<'a> EventCx<'a> {
    pub(crate) fn new(
        window: WindowId,
        element: ElementId,
        tree: &'a Tree,
        focused: Option<ElementId>,
        modifiers: Modifiers,
        current: Option<&'a UIEvent>,
        clipboard: Clipboard<'a>,
    ) -> Self {
        Self {
            window,
            element,
            tree,
            focused,
            modifiers,
            current,
            clipboard,
            requests: Vec::new(),
        }
    }

    pub(crate) fn into_requests(self) -> Vec<Request> {
        self.requests
    }

    /// The window being dispatched to.
    pub fn window(&self) -> WindowId {
        self.window
    }

    /// The element receiving the event.
    pub fn element(&self) -> ElementId {
        self.element
    }

    /// The window's element tree.
    pub fn tree(&self) -> &Tree {
        self.tree
    }

    /// This element's bounds in its own coordinates.
    pub fn local_bounds(&self) -> Rect {
        self.tree
            .bounds(self.element)
            .map_or(Rect::ZERO, |b| Rect::from_origin_size(Point::ZERO, b.size()))
    }

    /// Whether this element holds keyboard focus.
    pub fn is_focused(&self) -> bool {
        self.focused == Some(self.element)
    }

    /// The window's focused element.
    pub fn focused(&self) -> Option<ElementId> {
        self.focused
    }

    /// Modifier keys currently held.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// The coordinator's current event: the one being delivered, in this element's
    /// coordinates.
    pub fn current_event(&self) -> Option<&UIEvent> {
        self.current
    }

    /// The clipboard, bound to the display connection.
    pub fn clipboard(&mut self) -> &mut Clipboard<'a> {
        &mut self.clipboard
    }

    /// Route pointer moves and releases to this element until released.
    pub fn capture_mouse(&mut self) {
        self.requests.push(Request::CaptureMouse(self.element));
    }

    /// End a capture held by this element.
    pub fn release_mouse(&mut self) {
        self.requests.push(Request::ReleaseMouse(self.element));
    }

    /// Move keyboard focus to this element.
    pub fn request_focus(&mut self) {
        self.requests.push(Request::SetFocus(Some(self.element)));
    }

    /// Move keyboard focus to `element` in the same window.
    pub fn set_focus(&mut self, element: ElementId) {
        self.requests.push(Request::SetFocus(Some(element)));
    }

    /// Clear keyboard focus in this window.
    pub fn clear_focus(&mut self) {
        self.requests.push(Request::SetFocus(None));
    }

    /// Move focus to the next focus-accepting element.
    pub fn focus_next(&mut self) {
        self.requests.push(Request::FocusNext);
    }

    /// Move focus to the previous focus-accepting element.
    pub fn focus_previous(&mut self) {
        self.requests.push(Request::FocusPrevious);
    }

    /// Repaint the window at the end of this turn.
    pub fn request_redraw(&mut self) {
        self.requests.push(Request::Redraw);
    }

    /// Close the popup containing this element once the event has been dispatched.
    pub fn dismiss_popup(&mut self) {
        self.requests.push(Request::DismissPopup(self.element));
    }

    /// Mark this element as the one being dragged. A release ends the drag.
    pub fn start_drag(&mut self) {
        self.requests.push(Request::StartDrag(self.element));
    }

    /// End any drag in progress.
    pub fn end_drag(&mut self) {
        self.requests.push(Request::EndDrag);
    }

    /// Make `element` (or nothing) the window's modal element.
    pub fn set_modal(&mut self, element: Option<ElementId>) {
        self.requests.push(Request::SetModal(element));
    }

    /// Queue an event. Without a window it is addressed to this one.
    pub fn push_event(&mut self, mut event: UIEvent) {
        if event.window.is_none() && event.native_window.is_none() {
            event.window = Some(self.window);
        }
        self.requests.push(Request::Push(event));
    }

    /// Close this window at the end of the turn.
    pub fn close_window(&mut self) {
        self.requests.push(Request::CloseWindow);
    }

    /// Stop the main loop.
    pub fn request_exit(&mut self) {
        self.requests.push(Request::Exit);
    }
}
