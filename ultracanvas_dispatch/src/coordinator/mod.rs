// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The dispatch coordinator: main loop, routing, focus and capture.

mod paint;
mod route;


use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};

use kurbo::{Point, Rect, Size};
use smallvec::SmallVec;
use ultracanvas_clipboard::{Clipboard, ClipboardEngine};
use ultracanvas_event::{
    Clock, EventKind, EventTranslator, KeyState, Modifiers, MonotonicClock, Translated, UIEvent,
    WindowId,
};
use ultracanvas_focus::adapters::tree::{can_receive_focus, focus_entries};
use ultracanvas_focus::{FocusPolicy, FocusSpace, Navigation, TreeOrderPolicy};
use ultracanvas_native::{CursorShape, Key, NativeEventSource, NativeHandle, WindowDescriptor};
use ultracanvas_tree::{ElementId, LocalElement, Tree, TreeError};

use crate::ElementRef;
use crate::config::DispatchConfig;
use crate::element::{Element, EventCx, Request};
use crate::error::DispatchError;
use crate::queue::{EventQueue, EventSender, ExitHandle};
use crate::tooltip::{Tooltip, TooltipState};
use crate::window::{Popup, Window, WindowState};

use route::{
    Chain, Delivery, bubble_chain, fall_through_chain, hover_change, is_enabled, run, text_input_for,
};

/// Predicate run on every event before routing; returning `true` consumes the event.
pub type GlobalFilter = Box<dyn FnMut(&UIEvent) -> bool>;

/// Callback run once per loop turn, after events are drained and before rendering.
pub type FrameHook = Box<dyn FnMut(&FrameContext<'_>)>;

/// What a per-frame hook can see and do.
#[derive(Debug)]
pub struct FrameContext<'a> {
    /// Monotonic milliseconds at the start of the per-frame step.
    pub now: u64,
    /// Enqueue events for the next turn.
    pub events: &'a EventSender,
    /// Stop the loop.
    pub exit: &'a ExitHandle,
}

/// Outcome of one loop iteration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Turn {
    /// Keep running.
    Continue,
    /// Exit was requested or no windows remain.
    Exit,
}

/// Owns windows, routes every event and drives rendering.
///
/// All window and element state is touched from the thread that owns the coordinator.
/// Other threads reach it through an [`EventSender`] or an [`ExitHandle`].
pub struct DispatchCoordinator<S: NativeEventSource> {
    config: DispatchConfig,
    source: S,
    translator: EventTranslator,
    clipboard: ClipboardEngine,
    clock: Box<dyn Clock>,
    queue: EventQueue,
    exit: ExitHandle,
    windows: Vec<Window>,
    next_window: u64,
    focused_window: Option<WindowId>,
    captured: Option<ElementRef>,
    hovered: Option<ElementRef>,
    dragged: Option<ElementRef>,
    current_event: Option<UIEvent>,
    modifiers: Modifiers,
    keys: KeyState,
    filters: Vec<GlobalFilter>,
    hooks: Vec<FrameHook>,
    tooltip: TooltipState,
}

impl<S: NativeEventSource> fmt::Debug for DispatchCoordinator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchCoordinator")
            .field("windows", &self.windows)
            .field("queued", &self.queue.len())
            .field("focused_window", &self.focused_window)
            .field("captured", &self.captured)
            .field("hovered", &self.hovered)
            .field("dragged", &self.dragged)
            .field("modifiers", &self.modifiers)
            .field("filters", &self.filters.len())
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl<S: NativeEventSource> DispatchCoordinator<S> {
    /// A coordinator driving `source`.
    pub fn new(config: DispatchConfig, source: S) -> Self {
        let tooltip_delay = u64::try_from(config.tooltip_delay.as_millis()).unwrap_or(u64::MAX);
        Self {
            translator: EventTranslator::new(config.translator),
            clipboard: ClipboardEngine::new(config.clipboard.clone()),
            clock: Box::new(MonotonicClock::new()),
            queue: EventQueue::new(config.queue_capacity, source.waker()),
            exit: ExitHandle::default(),
            windows: Vec::new(),
            next_window: 1,
            focused_window: None,
            captured: None,
            hovered: None,
            dragged: None,
            current_event: None,
            modifiers: Modifiers::empty(),
            keys: KeyState::new(),
            filters: Vec::new(),
            hooks: Vec::new(),
            tooltip: TooltipState::new(tooltip_delay),
            config,
            source,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// The event source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The event source, mutably.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Replace the clock that stamps translated events and drives tooltips.
    pub fn set_clock(&mut self, clock: impl Clock + 'static) {
        self.clock = Box::new(clock);
    }

    // --- windows ---

    /// Adopt an existing native window. Its root element spans `size`.
    pub fn register_window(&mut self, native: NativeHandle, size: Size, title: &str) -> WindowId {
        let id = WindowId(self.next_window);
        self.next_window += 1;
        self.windows.push(Window::new(id, native, size, title));
        tracing::debug!(window = id.0, native = native.0, "window registered");
        id
    }

    /// Create a native window and register it.
    pub fn create_window(&mut self, descriptor: &WindowDescriptor) -> Result<WindowId, DispatchError> {
        let native = self.source.create_window(descriptor)?;
        let size = Size::new(f64::from(descriptor.width), f64::from(descriptor.height));
        Ok(self.register_window(native, size, &descriptor.title))
    }

    /// Map a window on screen.
    pub fn show_window(&mut self, window: WindowId) -> Result<(), DispatchError> {
        let idx = self.live_index(window).ok_or(DispatchError::UnknownWindow(window))?;
        let native = self.windows[idx].native;
        self.source.show_window(native)?;
        let w = &mut self.windows[idx];
        w.state = WindowState::Visible;
        w.needs_redraw = true;
        tracing::debug!(window = window.0, "window shown");
        Ok(())
    }

    /// Ask for a window to be destroyed during this turn's cleanup.
    pub fn close_window(&mut self, window: WindowId) -> Result<(), DispatchError> {
        self.live_index(window).ok_or(DispatchError::UnknownWindow(window))?;
        self.request_close(window);
        Ok(())
    }

    /// A registered window.
    pub fn window(&self, window: WindowId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == window)
    }

    /// A registered window, mutably.
    pub fn window_mut(&mut self, window: WindowId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.id == window)
    }

    /// Registered windows, in creation order.
    pub fn windows(&self) -> impl ExactSizeIterator<Item = &Window> + '_ {
        self.windows.iter()
    }

    // --- elements ---

    /// Add an element under `parent`.
    pub fn add_element(
        &mut self,
        window: WindowId,
        parent: ElementId,
        local: LocalElement,
        element: impl Element + 'static,
    ) -> Result<ElementId, DispatchError> {
        let w = self.live_window_mut(window)?;
        let id = w.tree.insert(parent, local)?;
        w.elements.insert(id, Box::new(element));
        w.needs_redraw = true;
        Ok(id)
    }

    /// Give an existing element (the root, for instance) its behavior.
    pub fn set_handler(
        &mut self,
        window: WindowId,
        target: ElementId,
        element: impl Element + 'static,
    ) -> Result<(), DispatchError> {
        let w = self.live_window_mut(window)?;
        check_element(&w.tree, target)?;
        w.elements.insert(target, Box::new(element));
        w.needs_redraw = true;
        Ok(())
    }

    /// Remove an element and its subtree, first clearing every reference to them.
    pub fn remove_element(&mut self, window: WindowId, target: ElementId) -> Result<(), DispatchError> {
        let w = self.live_window_mut(window)?;
        check_element(&w.tree, target)?;
        let gone = w.tree.remove(target)?;
        for id in &gone {
            w.elements.remove(id);
        }
        w.popups.retain(|p| w.tree.is_alive(p.root));
        w.needs_redraw = true;
        self.forget_elements(window, &gone);
        Ok(())
    }

    /// Open a popup: a floating subtree whose root bounds are in window coordinates.
    pub fn open_popup(
        &mut self,
        window: WindowId,
        local: LocalElement,
        owner: Option<ElementId>,
        element: impl Element + 'static,
    ) -> Result<ElementId, DispatchError> {
        let w = self.live_window_mut(window)?;
        if let Some(owner) = owner {
            check_element(&w.tree, owner)?;
        }
        let root = w.tree.insert_detached(local);
        w.elements.insert(root, Box::new(element));
        w.popups.push(Popup {
            root,
            owner,
            dismissed: false,
        });
        w.needs_redraw = true;
        tracing::debug!(window = window.0, popup = ?root, "popup opened");
        Ok(root)
    }

    /// Close the popup containing `element` now. Returns whether one was open.
    pub fn dismiss_popup(&mut self, window: WindowId, element: ElementId) -> Result<bool, DispatchError> {
        let w = self.live_window_mut(window)?;
        let dismissed = w.mark_dismissed(element);
        self.prune_popups(window);
        Ok(dismissed)
    }

    /// Restrict input to the subtree of `element` (or lift the restriction).
    pub fn set_modal(&mut self, window: WindowId, element: Option<ElementId>) -> Result<(), DispatchError> {
        let w = self.live_window_mut(window)?;
        if let Some(element) = element {
            check_element(&w.tree, element)?;
        }
        w.modal = element;
        w.needs_redraw = true;
        tracing::debug!(window = window.0, modal = ?element, "modal element changed");
        Ok(())
    }

    // --- focus, capture, drag ---

    /// Focused element of the focused window.
    pub fn focused_element(&self) -> Option<ElementRef> {
        let window = self.focused_window?;
        let element = self.window(window)?.focus.focused()?;
        Some(ElementRef { window, element })
    }

    /// The window holding keyboard focus.
    pub fn focused_window(&self) -> Option<WindowId> {
        self.focused_window
    }

    /// Move focus within `window`. Returns whether focus changed.
    ///
    /// Focus-lost is delivered to the previous element before focus-gained reaches the new
    /// one, directly rather than through the queue. Elements that cannot take focus are
    /// refused.
    pub fn set_focus(&mut self, window: WindowId, element: Option<ElementId>) -> Result<bool, DispatchError> {
        let w = self.live_window_mut(window)?;
        if let Some(element) = element {
            check_element(&w.tree, element)?;
            if !can_receive_focus(&w.tree, element) {
                return Ok(false);
            }
        }
        let Some(change) = w.focus.set(element) else {
            return Ok(false);
        };
        w.needs_redraw = true;
        if element.is_some() && self.focused_window.is_none() {
            self.focused_window = Some(window);
        }
        tracing::debug!(
            window = window.0,
            lost = ?change.lost,
            gained = ?change.gained,
            "focus moved"
        );
        if let Some(lost) = change.lost {
            let event = self.synthesize(EventKind::FocusLost, window);
            self.deliver(window, lost, &event);
        }
        if let Some(gained) = change.gained {
            let event = self.synthesize(EventKind::FocusGained, window);
            self.deliver(window, gained, &event);
        }
        Ok(true)
    }

    /// Move focus to the next focus-accepting element in depth-first order, wrapping.
    pub fn focus_next(&mut self, window: WindowId) -> Result<bool, DispatchError> {
        self.navigate(window, Navigation::Next)
    }

    /// Move focus to the previous focus-accepting element, wrapping.
    pub fn focus_previous(&mut self, window: WindowId) -> Result<bool, DispatchError> {
        self.navigate(window, Navigation::Prev)
    }

    /// Route pointer moves and releases to `element` until [`Self::release_mouse`].
    pub fn capture_mouse(&mut self, window: WindowId, element: ElementId) -> bool {
        let alive = self
            .live_index(window)
            .is_some_and(|idx| self.windows[idx].tree.is_alive(element));
        if alive {
            self.captured = Some(ElementRef { window, element });
            tracing::debug!(window = window.0, ?element, "mouse captured");
        }
        alive
    }

    /// End a capture held by `element`; a capture held by another element is kept.
    pub fn release_mouse(&mut self, window: WindowId, element: ElementId) {
        if self.captured == Some(ElementRef { window, element }) {
            self.captured = None;
            tracing::debug!(window = window.0, ?element, "mouse released");
        }
    }

    /// Element holding the pointer capture.
    pub fn captured(&self) -> Option<ElementRef> {
        self.captured
    }

    /// Element under the pointer.
    pub fn hovered(&self) -> Option<ElementRef> {
        self.hovered
    }

    /// Element being dragged.
    pub fn dragged(&self) -> Option<ElementRef> {
        self.dragged
    }

    /// Mark `element` as dragged until the next button release.
    pub fn start_drag(&mut self, window: WindowId, element: ElementId) -> bool {
        let alive = self
            .live_index(window)
            .is_some_and(|idx| self.windows[idx].tree.is_alive(element));
        if alive {
            self.dragged = Some(ElementRef { window, element });
        }
        alive
    }

    // --- input state ---

    /// Whether a hardware key is held, as seen by dispatched events.
    pub fn is_key_down(&self, keycode: u32) -> bool {
        self.keys.is_down(keycode)
    }

    /// Modifiers of the last keyboard event dispatched.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// The event being dispatched, while a handler or filter runs.
    pub fn current_event(&self) -> Option<&UIEvent> {
        self.current_event.as_ref()
    }

    /// The visible tooltip.
    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.shown()
    }

    // --- clipboard ---

    /// The clipboard, bound to this coordinator's display connection.
    pub fn clipboard(&mut self) -> Clipboard<'_> {
        self.clipboard.bind(self.source.selection())
    }

    /// The clipboard engine (history, configuration).
    pub fn clipboard_engine(&mut self) -> &mut ClipboardEngine {
        &mut self.clipboard
    }

    // --- loop control ---

    /// Install a filter run on every event before routing.
    pub fn register_global_filter(&mut self, filter: impl FnMut(&UIEvent) -> bool + 'static) {
        self.filters.push(Box::new(filter));
    }

    /// Install a hook run once per turn after events are drained.
    pub fn register_per_frame_hook(&mut self, hook: impl FnMut(&FrameContext<'_>) + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Enqueue an event. Unstamped events get the current time. Returns `false` if the
    /// queue was full.
    pub fn push_event(&mut self, mut event: UIEvent) -> bool {
        if event.timestamp == 0 {
            event.timestamp = self.clock.now_ms();
        }
        self.queue.push(event)
    }

    /// A handle for enqueueing events from other threads.
    pub fn event_sender(&self) -> EventSender {
        self.queue.sender()
    }

    /// Stop the loop at the top of the next turn.
    pub fn request_exit(&self) {
        self.exit.request_exit();
    }

    /// A handle for stopping the loop from elsewhere.
    pub fn exit_handle(&self) -> ExitHandle {
        self.exit.clone()
    }

    /// Run until exit is requested or no windows remain.
    ///
    /// Only a failure of the event source ends the loop with an error.
    pub fn run(&mut self) -> Result<(), DispatchError> {
        while self.turn()? == Turn::Continue {}
        Ok(())
    }

    /// One loop iteration: pull native input, dispatch, clean up, per-frame work, render.
    pub fn turn(&mut self) -> Result<Turn, DispatchError> {
        if self.exit.is_requested() {
            let dropped = self.queue.clear();
            tracing::debug!(dropped, "exit requested");
            return Ok(Turn::Exit);
        }

        if self.pump()? == 0 && self.queue.is_empty() && self.source.wait(self.config.idle_timeout)? {
            self.pump()?;
        }

        for _ in 0..self.config.max_events_per_turn {
            if self.exit.is_requested() {
                break;
            }
            let Some(event) = self.queue.pop() else {
                break;
            };
            self.dispatch(event);
        }

        self.reap_windows();
        if self.windows.is_empty() {
            tracing::debug!("no windows left");
            return Ok(Turn::Exit);
        }

        self.per_frame();
        self.render();
        Ok(Turn::Continue)
    }

    /// Release owned selections, destroy every window and close the connection.
    pub fn shutdown(mut self) {
        self.clipboard.shutdown(self.source.selection());
        for window in mem::take(&mut self.windows) {
            self.translator.forget_window(window.native);
            if let Err(error) = self.source.destroy_window(window.native) {
                tracing::warn!(window = window.id.0, %error, "window teardown failed");
            }
        }
        self.source.shutdown();
        tracing::debug!("coordinator shut down");
    }

    // --- dispatch ---

    /// Route one event now, bypassing the queue.
    pub fn dispatch(&mut self, event: UIEvent) {
        if event.kind.is_keyboard() {
            self.modifiers = event.modifiers;
            match event.kind {
                EventKind::KeyDown => self.keys.set(event.keycode, true),
                EventKind::KeyUp => self.keys.set(event.keycode, false),
                _ => {}
            }
        }

        let previous = self.current_event.replace(event.clone());
        let filtered = self.filters.iter_mut().any(|filter| filter(&event));
        if filtered {
            tracing::trace!(kind = ?event.kind, "event consumed by a global filter");
            self.current_event = previous;
            return;
        }

        let Some(window) = self.resolve_window(&event) else {
            tracing::trace!(kind = ?event.kind, "no live target window, event dropped");
            self.current_event = previous;
            return;
        };
        let mut event = event;
        event.window = Some(window);
        self.current_event = Some(event.clone());

        self.route(window, &event);
        self.prune_popups(window);
        self.current_event = previous;
    }

    fn resolve_window(&self, event: &UIEvent) -> Option<WindowId> {
        if let Some(id) = event.window {
            return self.live_index(id).map(|_| id);
        }
        if let Some(native) = event.native_window
            && let Some(window) = self.windows.iter().find(|w| w.native == native)
        {
            return window.is_live().then_some(window.id);
        }
        if event.kind.is_keyboard() {
            return self.focused_window.filter(|&id| self.live_index(id).is_some());
        }
        None
    }

    fn route(&mut self, window: WindowId, event: &UIEvent) {
        match event.kind {
            EventKind::WindowFocus => self.window_focus(window),
            EventKind::WindowBlur => self.window_blur(window),
            EventKind::WindowClose => self.window_close(window, event),
            EventKind::WindowResize => self.window_resize(window, event),
            EventKind::WindowMove => {
                self.offer_root(window, event);
            }
            EventKind::WindowRepaint => self.redraw(window),
            EventKind::Command => self.command(window, event),
            EventKind::FocusGained | EventKind::FocusLost => {
                if let Some(target) = event.target_element {
                    self.deliver(window, target, event);
                }
            }
            EventKind::KeyDown | EventKind::KeyUp | EventKind::TextInput => {
                self.keyboard(window, event);
            }
            EventKind::MouseWheel => self.wheel(window, event),
            EventKind::MouseDown
            | EventKind::MouseUp
            | EventKind::MouseMove
            | EventKind::MouseDoubleClick
            | EventKind::MouseEnter
            | EventKind::MouseLeave => self.pointer(window, event),
            EventKind::Unknown
            | EventKind::SelectionRequest
            | EventKind::SelectionNotify
            | EventKind::SelectionClear => {
                tracing::trace!(kind = ?event.kind, "event not routed");
            }
        }
    }

    fn window_focus(&mut self, window: WindowId) {
        self.focused_window = Some(window);
        tracing::debug!(window = window.0, "window focused");
        if let Some(focused) = self.focused_in(window) {
            let event = self.synthesize(EventKind::FocusGained, window);
            self.deliver(window, focused, &event);
        }
        self.redraw(window);
    }

    fn window_blur(&mut self, window: WindowId) {
        // Releases made while another window has focus are never reported.
        self.keys.clear();
        if let Some(focused) = self.focused_in(window) {
            let event = self.synthesize(EventKind::FocusLost, window);
            self.deliver(window, focused, &event);
        }
        if self.focused_window == Some(window) {
            self.focused_window = None;
        }
        tracing::debug!(window = window.0, "window blurred");
        if let Some(shown) = self.tooltip.suppress() {
            self.redraw(shown);
        }
    }

    fn window_close(&mut self, window: WindowId, event: &UIEvent) {
        if self.offer_root(window, event) == Delivery::Consumed {
            tracing::debug!(window = window.0, "close vetoed by the root element");
            return;
        }
        self.request_close(window);
    }

    fn window_resize(&mut self, window: WindowId, event: &UIEvent) {
        if let Some(size) = event.size
            && let Some(w) = self.window_mut(window)
        {
            let root = w.tree.root();
            w.tree.set_bounds(root, Rect::from_origin_size(Point::ZERO, size));
            w.needs_redraw = true;
        }
        self.offer_root(window, event);
    }

    fn command(&mut self, window: WindowId, event: &UIEvent) {
        let Some(w) = self.live_window(window) else {
            return;
        };
        let start = event
            .target_element
            .filter(|&t| w.tree.is_alive(t))
            .or_else(|| w.focus.focused())
            .unwrap_or_else(|| w.tree.root());
        if !w.admits(start) {
            tracing::trace!(window = window.0, "command outside the modal element dropped");
            return;
        }
        let chain = bubble_chain(&w.tree, start, w.modal);
        run(&chain, |id| self.deliver(window, id, event));
    }

    fn keyboard(&mut self, window: WindowId, event: &UIEvent) {
        if event.kind == EventKind::KeyDown
            && let Some(shown) = self.tooltip.suppress()
        {
            self.redraw(shown);
        }
        let chains = self.key_chains(window);
        for chain in &chains {
            if run(chain, |id| self.deliver(window, id, event)).stops() {
                return;
            }
        }

        if event.kind == EventKind::KeyDown && matches!(event.key, Some(Key::Tab)) {
            let navigation = if event.shift() {
                Navigation::Prev
            } else {
                Navigation::Next
            };
            self.traverse(window, navigation);
            return;
        }

        if let Some(input) = text_input_for(event) {
            let previous = self.current_event.replace(input.clone());
            for chain in &chains {
                if run(chain, |id| self.deliver(window, id, &input)).stops() {
                    break;
                }
            }
            self.current_event = previous;
        }
    }

    /// Where a key event travels, in order: up from the focused element of the topmost
    /// popup (or that popup's root), then up from the focused element of the window tree
    /// (or the root). Keys aimed outside a modal element start at the modal element instead.
    /// No element appears twice.
    fn key_chains(&self, window: WindowId) -> SmallVec<[Chain; 2]> {
        let mut chains = SmallVec::new();
        let Some(w) = self.live_window(window) else {
            return chains;
        };
        let root = w.tree.root();
        let focused = w.focus.focused().filter(|&f| w.tree.is_alive(f));

        if let Some(popup) = w.popups.iter().rev().find(|p| !p.dismissed)
            && w.admits(popup.root)
        {
            let start = focused
                .filter(|&f| w.tree.is_in_subtree(f, popup.root))
                .unwrap_or(popup.root);
            chains.push(bubble_chain(&w.tree, start, Some(popup.root)));
        }

        let target = focused
            .filter(|&f| w.tree.top_of(f) == Some(root))
            .unwrap_or(root);
        let start = match w.modal {
            Some(modal) if !w.tree.is_in_subtree(target, modal) => modal,
            _ => target,
        };
        chains.push(bubble_chain(&w.tree, start, w.modal));
        chains
    }

    fn wheel(&mut self, window: WindowId, event: &UIEvent) {
        let Some(w) = self.live_window(window) else {
            return;
        };
        let Some(hit) = w.hit_test(event.position).map(|h| h.element) else {
            return;
        };
        if !w.admits(hit) {
            tracing::trace!(window = window.0, "wheel outside the modal element swallowed");
            return;
        }
        let limit = w.modal.filter(|&m| w.tree.is_in_subtree(hit, m));
        let chain = bubble_chain(&w.tree, hit, limit);
        if self.offer_popups(window, event, Some(hit)).stops() {
            return;
        }
        run(&chain, |id| self.deliver(window, id, event));
    }

    fn pointer(&mut self, window: WindowId, event: &UIEvent) {
        let kind = event.kind;
        if kind == EventKind::MouseLeave {
            self.set_hover(None, event);
            return;
        }

        let Some(idx) = self.live_index(window) else {
            return;
        };

        if matches!(kind, EventKind::MouseMove | EventKind::MouseUp)
            && let Some(captured) = self.captured
            && captured.window == window
        {
            if self.windows[idx].admits(captured.element) {
                self.deliver(window, captured.element, event);
            } else {
                tracing::trace!(window = window.0, ?kind, "captured element outside the modal element");
                // Its release is never delivered, so the capture ends here.
                if kind == EventKind::MouseUp {
                    self.captured = None;
                }
            }
            if kind == EventKind::MouseUp {
                self.dragged = None;
            }
            return;
        }

        let w = &self.windows[idx];
        let hit = w.hit_test(event.position).map(|h| h.element);

        if w.modal.is_some() && !hit.is_some_and(|h| w.admits(h)) {
            if kind == EventKind::MouseDown && self.config.modal_bell {
                self.source.bell();
            }
            if kind == EventKind::MouseUp {
                self.dragged = None;
            }
            tracing::trace!(window = window.0, ?kind, "pointer event outside the modal element swallowed");
            return;
        }

        let cursor = hit.map_or(CursorShape::Default, |h| w.cursor_for(h));
        if cursor != w.cursor {
            let native = w.native;
            match self.source.set_cursor(native, cursor) {
                Ok(()) => self.windows[idx].cursor = cursor,
                Err(error) => tracing::warn!(window = window.0, %error, "cursor change failed"),
            }
        }

        self.set_hover(hit.map(|element| ElementRef { window, element }), event);
        if kind == EventKind::MouseEnter {
            return;
        }
        if matches!(kind, EventKind::MouseDown | EventKind::MouseDoubleClick)
            && let Some(shown) = self.tooltip.suppress()
        {
            self.redraw(shown);
        }

        if !self.offer_popups(window, event, hit).stops() {
            if let Some(hit) = hit {
                if kind == EventKind::MouseDown && self.config.click_to_focus {
                    self.click_focus(window, hit);
                }
                if let Some(w) = self.live_window(window) {
                    let chain = fall_through_chain(&w.tree, hit);
                    run(&chain, |id| self.deliver(window, id, event));
                }
            }
        }

        if kind == EventKind::MouseUp {
            self.dragged = None;
        }
    }

    /// Offer a pointer event to open popups from the top down, stopping at the popup under
    /// the pointer (ordinary routing reaches that one).
    fn offer_popups(&mut self, window: WindowId, event: &UIEvent, hit: Option<ElementId>) -> Delivery {
        let Some(w) = self.live_window(window) else {
            return Delivery::Ignored;
        };
        let roots: SmallVec<[ElementId; 4]> = w
            .popups
            .iter()
            .rev()
            .filter(|p| !p.dismissed && w.admits(p.root))
            .map(|p| p.root)
            .take_while(|&root| hit.is_none_or(|h| !w.tree.is_in_subtree(h, root)))
            .collect();
        run(&roots, |root| self.deliver(window, root, event))
    }

    fn click_focus(&mut self, window: WindowId, hit: ElementId) {
        let Some(w) = self.live_window(window) else {
            return;
        };
        let target = w
            .tree
            .ancestors(hit)
            .find(|&id| can_receive_focus(&w.tree, id) && is_enabled(&w.tree, id));
        if let Some(target) = target
            && let Err(error) = self.set_focus(window, Some(target))
        {
            tracing::debug!(window = window.0, %error, "click-to-focus failed");
        }
    }

    fn set_hover(&mut self, target: Option<ElementRef>, event: &UIEvent) {
        let now = self.clock.now_ms();
        if let Some(change) = hover_change(self.hovered, target) {
            self.hovered = target;
            for (target, kind) in [
                (change.leave, EventKind::MouseLeave),
                (change.enter, EventKind::MouseEnter),
            ] {
                let Some(target) = target else {
                    continue;
                };
                let enabled = self
                    .live_window(target.window)
                    .is_some_and(|w| is_enabled(&w.tree, target.element));
                if enabled {
                    let mut synthesized = event.clone();
                    synthesized.kind = kind;
                    self.deliver(target.window, target.element, &synthesized);
                }
            }
        }
        if let Some(hidden) = self.tooltip.hover(target, event.position, now) {
            self.redraw(hidden);
        }
    }

    fn offer_root(&mut self, window: WindowId, event: &UIEvent) -> Delivery {
        match self.live_window(window) {
            Some(w) => {
                let root = w.tree.root();
                self.deliver(window, root, event)
            }
            None => Delivery::Ignored,
        }
    }

    /// Hand `event` to one element, rebasing pointer positions into its local frame.
    ///
    /// The handler is taken out of the window while it runs so it can be given a context
    /// that borrows the tree and the clipboard. A panic is contained and reported as
    /// [`Delivery::Aborted`]; requests made before the panic are discarded.
    fn deliver(&mut self, window: WindowId, element: ElementId, event: &UIEvent) -> Delivery {
        let Some(idx) = self.live_index(window) else {
            return Delivery::Ignored;
        };
        let Some(mut handler) = self.windows[idx].elements.remove(&element) else {
            return Delivery::Ignored;
        };

        let mut routed = event.clone();
        routed.window = Some(window);
        routed.target_element = Some(element);
        if event.kind.is_pointer()
            && let Some(local) = self.windows[idx].tree.to_local(element, event.position)
        {
            routed.position = local;
        }
        let previous = self.current_event.replace(routed.clone());

        let w = &self.windows[idx];
        let mut cx = EventCx::new(
            window,
            element,
            &w.tree,
            w.focus.focused(),
            self.modifiers,
            self.current_event.as_ref(),
            self.clipboard.bind(self.source.selection()),
        );
        let result = panic::catch_unwind(AssertUnwindSafe(|| handler.receive(&routed, &mut cx)));
        let requests = cx.into_requests();
        self.current_event = previous;

        let w = &mut self.windows[idx];
        if w.tree.is_alive(element) {
            w.elements.insert(element, handler);
        }

        match result {
            Ok(consumed) => {
                tracing::trace!(
                    window = window.0,
                    element = w.tree.identifier(element).unwrap_or_default(),
                    kind = ?event.kind,
                    consumed,
                    "event delivered"
                );
                self.apply(window, requests);
                if consumed {
                    Delivery::Consumed
                } else {
                    Delivery::Ignored
                }
            }
            Err(_) => {
                tracing::error!(
                    window = window.0,
                    element = w.tree.identifier(element).unwrap_or_default(),
                    kind = ?event.kind,
                    "element handler panicked, event dropped"
                );
                Delivery::Aborted
            }
        }
    }

    fn apply(&mut self, window: WindowId, requests: Vec<Request>) {
        for request in requests {
            match request {
                Request::CaptureMouse(element) => {
                    self.capture_mouse(window, element);
                }
                Request::ReleaseMouse(element) => self.release_mouse(window, element),
                Request::SetFocus(element) => {
                    if let Err(error) = self.set_focus(window, element) {
                        tracing::debug!(window = window.0, %error, "focus request rejected");
                    }
                }
                Request::FocusNext => self.traverse(window, Navigation::Next),
                Request::FocusPrevious => self.traverse(window, Navigation::Prev),
                Request::Redraw => self.redraw(window),
                Request::DismissPopup(element) => {
                    if let Some(w) = self.window_mut(window)
                        && w.mark_dismissed(element)
                    {
                        w.needs_redraw = true;
                    }
                }
                Request::StartDrag(element) => {
                    self.start_drag(window, element);
                }
                Request::EndDrag => self.dragged = None,
                Request::SetModal(element) => {
                    if let Err(error) = self.set_modal(window, element) {
                        tracing::debug!(window = window.0, %error, "modal request rejected");
                    }
                }
                Request::Push(event) => {
                    self.push_event(event);
                }
                Request::CloseWindow => self.request_close(window),
                Request::Exit => self.exit.request_exit(),
            }
        }
    }

    fn traverse(&mut self, window: WindowId, navigation: Navigation) {
        if let Err(error) = self.navigate(window, navigation) {
            tracing::debug!(window = window.0, %error, "focus traversal failed");
        }
    }

    fn navigate(&mut self, window: WindowId, navigation: Navigation) -> Result<bool, DispatchError> {
        let w = self.live_window(window).ok_or(DispatchError::UnknownWindow(window))?;
        let scope = w.modal.unwrap_or_else(|| w.tree.root());
        let entries = focus_entries(&w.tree, scope);
        let next = TreeOrderPolicy::default().next(
            w.focus.focused(),
            navigation,
            &FocusSpace { nodes: &entries },
        );
        match next {
            Some(next) => self.set_focus(window, Some(next)),
            None => Ok(false),
        }
    }

    // --- cleanup ---

    fn prune_popups(&mut self, window: WindowId) {
        let Some(w) = self.window_mut(window) else {
            return;
        };
        if !w.popups.iter().any(|p| p.dismissed) {
            return;
        }
        let mut gone = Vec::new();
        let (dismissed, open): (Vec<Popup>, Vec<Popup>) =
            mem::take(&mut w.popups).into_iter().partition(|p| p.dismissed);
        w.popups = open;
        for popup in dismissed {
            match w.tree.remove(popup.root) {
                Ok(removed) => gone.extend(removed),
                Err(error) => tracing::warn!(window = window.0, %error, "popup removal failed"),
            }
        }
        for id in &gone {
            w.elements.remove(id);
        }
        w.needs_redraw = true;
        tracing::debug!(window = window.0, removed = gone.len(), "dismissed popups pruned");
        self.forget_elements(window, &gone);
    }

    /// Null every reference into elements that no longer exist.
    fn forget_elements(&mut self, window: WindowId, gone: &[ElementId]) {
        let dead = |r: ElementRef| r.window == window && gone.contains(&r.element);
        for slot in [&mut self.captured, &mut self.hovered, &mut self.dragged] {
            if slot.is_some_and(dead) {
                *slot = None;
            }
        }
        if let Some(w) = self.window_mut(window) {
            w.focus.forget_if(|f| gone.contains(&f));
            if w.modal.is_some_and(|m| gone.contains(&m)) {
                w.modal = None;
            }
        }
        self.tooltip.forget(dead);
    }

    fn reap_windows(&mut self) {
        if !self
            .windows
            .iter()
            .any(|w| w.state == WindowState::DeleteRequested)
        {
            return;
        }
        let (dead, live): (Vec<Window>, Vec<Window>) = mem::take(&mut self.windows)
            .into_iter()
            .partition(|w| w.state == WindowState::DeleteRequested);
        self.windows = live;
        for mut window in dead {
            window.state = WindowState::Deleted;
            let id = window.id;
            for slot in [&mut self.captured, &mut self.hovered, &mut self.dragged] {
                if slot.is_some_and(|r| r.window == id) {
                    *slot = None;
                }
            }
            if self.focused_window == Some(id) {
                self.focused_window = None;
            }
            self.tooltip.forget(|r| r.window == id);
            self.translator.forget_window(window.native);
            if let Err(error) = self.source.destroy_window(window.native) {
                tracing::warn!(window = id.0, %error, "native window destruction failed");
            }
            tracing::debug!(window = id.0, "window destroyed");
        }
    }

    // --- per frame ---

    fn pump(&mut self) -> Result<usize, DispatchError> {
        let mut pulled = 0;
        while self.source.pending()? > 0 {
            let raw = self.source.next_event()?;
            pulled += 1;
            let now = self.clock.now_ms();
            match self.translator.translate(raw, now) {
                Translated::Event(event) => {
                    self.queue.push(event);
                }
                Translated::Selection(selection) => self
                    .clipboard
                    .handle_selection_event(self.source.selection(), selection),
                Translated::Dropped => {}
            }
        }
        Ok(pulled)
    }

    fn per_frame(&mut self) {
        let now = self.clock.now_ms();
        self.clipboard.update(self.source.selection());

        let windows = &self.windows;
        let shown = self.tooltip.tick(now, |target| {
            windows
                .iter()
                .find(|w| w.id == target.window)
                .and_then(|w| w.elements.get(&target.element))
                .and_then(|e| e.tooltip())
        });
        if let Some(window) = shown {
            self.redraw(window);
        }

        let events = self.queue.sender();
        let cx = FrameContext {
            now,
            events: &events,
            exit: &self.exit,
        };
        for hook in &mut self.hooks {
            hook(&cx);
        }
    }

    fn render(&mut self) {
        let hovered = self.hovered;
        let tooltip = self.tooltip.shown().cloned();
        for window in &mut self.windows {
            if window.state != WindowState::Visible || !window.needs_redraw {
                continue;
            }
            window.needs_redraw = false;
            let id = window.id;
            let painted = panic::catch_unwind(AssertUnwindSafe(|| {
                paint::paint_window(window, hovered, tooltip.as_ref());
            }));
            if painted.is_err() {
                tracing::error!(window = id.0, "render pass panicked");
            }
        }
    }

    // --- helpers ---

    fn live_index(&self, window: WindowId) -> Option<usize> {
        self.windows
            .iter()
            .position(|w| w.id == window && w.is_live())
    }

    fn live_window(&self, window: WindowId) -> Option<&Window> {
        self.live_index(window).map(|idx| &self.windows[idx])
    }

    fn live_window_mut(&mut self, window: WindowId) -> Result<&mut Window, DispatchError> {
        let idx = self
            .live_index(window)
            .ok_or(DispatchError::UnknownWindow(window))?;
        Ok(&mut self.windows[idx])
    }

    fn focused_in(&self, window: WindowId) -> Option<ElementId> {
        self.live_window(window)?.focus.focused()
    }

    fn redraw(&mut self, window: WindowId) {
        if let Some(w) = self.window_mut(window) {
            w.needs_redraw = true;
        }
    }

    fn request_close(&mut self, window: WindowId) {
        if let Some(w) = self.window_mut(window)
            && w.is_live()
        {
            w.state = WindowState::DeleteRequested;
            tracing::debug!(window = window.0, "window close requested");
        }
    }

    fn synthesize(&self, kind: EventKind, window: WindowId) -> UIEvent {
        UIEvent::new(kind)
            .for_window(window)
            .with_modifiers(self.modifiers)
            .with_timestamp(self.clock.now_ms())
    }
}

fn check_element(tree: &Tree, element: ElementId) -> Result<(), TreeError> {
    if element.tree_stamp() != tree.stamp() {
        Err(TreeError::Foreign(element))
    } else if !tree.is_alive(element) {
        Err(TreeError::Stale(element))
    } else {
        Ok(())
    }
}
