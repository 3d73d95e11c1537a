// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! UltraCanvas Dispatch: the event loop, routing and focus/capture coordinator.
//!
//! ## Overview
//!
//! A [`DispatchCoordinator`] owns every [`Window`], pulls native input from a
//! [`NativeEventSource`](ultracanvas_native::NativeEventSource), translates it into
//! [`UIEvent`](ultracanvas_event::UIEvent)s and routes each one to at most one consuming
//! element. Element structure lives in each window's
//! [`Tree`](ultracanvas_tree::Tree); behavior is supplied by implementations of [`Element`],
//! keyed by [`ElementId`](ultracanvas_tree::ElementId).
//!
//! ## Routing
//!
//! - Keyboard input goes to the topmost open popup, then to the focused element, bubbling
//!   through its ancestors. An unconsumed Tab moves focus; an unconsumed printable key press
//!   is followed by a text-input event.
//! - Pointer input goes to the captured element if there is one. Otherwise open popups are
//!   offered it first, then the deepest visible element under the pointer, then the root.
//!   Hover changes produce leave and enter events before the triggering event.
//! - While a window has a modal element, input outside its subtree is swallowed (with a bell
//!   on presses) or, for keys, redirected to the modal element.
//! - Disabled elements, and elements under a disabled ancestor, never receive input.
//!
//! Handlers run inside a panic boundary. A panicking handler loses its event and nothing
//! else: the loop, other elements and other windows carry on.
//!
//! ## Loop
//!
//! Each [`DispatchCoordinator::turn`] drains pending native events, dispatches up to
//! [`DispatchConfig::max_events_per_turn`] queued events, destroys windows whose close was
//! accepted, runs per-frame work (clipboard monitoring, tooltips, hooks) and repaints dirty
//! windows. [`DispatchCoordinator::run`] repeats that until exit is requested or the last
//! window is gone.
//!
//! ```
//! use kurbo::{Point, Rect};
//! use ultracanvas_dispatch::{DispatchConfig, DispatchCoordinator, Element, EventCx};
//! use ultracanvas_event::{EventKind, UIEvent};
//! use ultracanvas_native::WindowDescriptor;
//! use ultracanvas_native::headless::HeadlessServer;
//! use ultracanvas_tree::LocalElement;
//!
//! struct Button;
//!
//! impl Element for Button {
//!     fn receive(&mut self, event: &UIEvent, _cx: &mut EventCx<'_>) -> bool {
//!         matches!(event.kind, EventKind::MouseDown | EventKind::MouseUp)
//!     }
//! }
//!
//! let server = HeadlessServer::new();
//! let mut app = DispatchCoordinator::new(DispatchConfig::default(), server.connect());
//! let window = app.create_window(&WindowDescriptor::default())?;
//! let root = app.window(window).map(|w| w.root()).unwrap();
//! let ok = LocalElement::leaf("ok", Rect::new(10.0, 10.0, 110.0, 40.0)).focusable();
//! let button = app.add_element(window, root, ok, Button)?;
//!
//! app.push_event(UIEvent::new(EventKind::MouseDown).at(Point::new(15.0, 20.0)).for_window(window));
//! app.turn()?;
//! assert_eq!(app.focused_element().map(|f| f.element), Some(button));
//! # Ok::<(), ultracanvas_dispatch::DispatchError>(())
//! ```

mod app;
mod config;
mod coordinator;
mod element;
mod error;
mod queue;
mod render;
mod tooltip;
mod window;

use ultracanvas_event::WindowId;
use ultracanvas_tree::ElementId;

pub use app::{exit_code, initialize, shutdown};
pub use config::DispatchConfig;
pub use coordinator::{DispatchCoordinator, FrameContext, FrameHook, GlobalFilter, Turn};
pub use element::{Element, EventCx};
pub use error::{DispatchError, RenderError};
pub use queue::{EventSender, ExitHandle};
pub use render::{Color, DrawOp, Font, ImageSource, RecordingContext, RenderContext, RenderInfo};
pub use tooltip::Tooltip;
pub use window::{Popup, Window, WindowState};

/// An element in a particular window.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementRef {
    /// The window.
    pub window: WindowId,
    /// The element in that window's tree.
    pub element: ElementId,
}
