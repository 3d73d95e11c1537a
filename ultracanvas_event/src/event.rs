// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The canonical event value.

use kurbo::{Point, Size, Vec2};
use ultracanvas_native::{Key, NativeHandle};
use ultracanvas_tree::ElementId;

/// Logical identifier of a toolkit window.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

/// Application-defined command identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub u32);

bitflags::bitflags! {
    /// Normalized modifier keys.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Shift.
        const SHIFT = 0b0001;
        /// Control.
        const CTRL  = 0b0010;
        /// Alt / Option.
        const ALT   = 0b0100;
        /// Meta / Super / Command.
        const META  = 0b1000;
    }
}

/// A pointer button.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Middle button.
    Middle,
    /// Secondary button.
    Right,
    /// "Back" side button.
    Back,
    /// "Forward" side button.
    Forward,
    /// Any other button, by core-protocol number.
    Other(u16),
}

impl MouseButton {
    /// Map a core-protocol button number. Wheel buttons (4-7) are not buttons.
    pub fn from_native(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Left),
            2 => Some(Self::Middle),
            3 => Some(Self::Right),
            4..=7 => None,
            8 => Some(Self::Back),
            9 => Some(Self::Forward),
            other => Some(Self::Other(u16::try_from(other).unwrap_or(u16::MAX))),
        }
    }
}

/// What happened.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Input the translator could not classify.
    Unknown,
    /// Pointer button pressed.
    MouseDown,
    /// Pointer button released.
    MouseUp,
    /// Pointer moved.
    MouseMove,
    /// Pointer entered an element or window.
    MouseEnter,
    /// Pointer left an element or window.
    MouseLeave,
    /// Wheel scrolled; see [`UIEvent::wheel_delta`].
    MouseWheel,
    /// Second press of the same button within the double-click window.
    MouseDoubleClick,
    /// Key pressed (or auto-repeated).
    KeyDown,
    /// Key released.
    KeyUp,
    /// Text produced by typing.
    TextInput,
    /// An element received keyboard focus.
    FocusGained,
    /// An element lost keyboard focus.
    FocusLost,
    /// A window received keyboard focus from the window system.
    WindowFocus,
    /// A window lost keyboard focus to another window.
    WindowBlur,
    /// The window manager asked to close a window.
    WindowClose,
    /// A window changed size; see [`UIEvent::size`].
    WindowResize,
    /// A window moved on screen; see [`UIEvent::global_position`].
    WindowMove,
    /// A window needs a full repaint.
    WindowRepaint,
    /// Another client asked for selection data.
    SelectionRequest,
    /// A selection conversion was answered.
    SelectionNotify,
    /// Selection ownership was lost.
    SelectionClear,
    /// Application command; see [`UIEvent::command`].
    Command,
}

impl EventKind {
    /// Pointer events (button, motion, crossing, wheel, double click).
    pub fn is_pointer(self) -> bool {
        matches!(
            self,
            Self::MouseDown
                | Self::MouseUp
                | Self::MouseMove
                | Self::MouseEnter
                | Self::MouseLeave
                | Self::MouseWheel
                | Self::MouseDoubleClick
        )
    }

    /// Keyboard events, including text input.
    pub fn is_keyboard(self) -> bool {
        matches!(self, Self::KeyDown | Self::KeyUp | Self::TextInput)
    }

    /// Window-level notifications.
    pub fn is_window(self) -> bool {
        matches!(
            self,
            Self::WindowFocus
                | Self::WindowBlur
                | Self::WindowClose
                | Self::WindowResize
                | Self::WindowMove
                | Self::WindowRepaint
        )
    }

    /// Selection protocol notifications.
    pub fn is_selection(self) -> bool {
        matches!(
            self,
            Self::SelectionRequest | Self::SelectionNotify | Self::SelectionClear
        )
    }
}

/// A canonical UI event.
///
/// Events are plain values: the translator produces them, the coordinator copies them while
/// routing (filling in [`UIEvent::window`] and [`UIEvent::target_element`] and rebasing
/// [`UIEvent::position`] into the receiving element's space) and handlers only read them.
#[derive(Clone, Debug, PartialEq)]
pub struct UIEvent {
    /// What happened.
    pub kind: EventKind,
    /// Position in the coordinate space of the receiver (window space before routing).
    pub position: Point,
    /// Position in screen coordinates.
    pub global_position: Point,
    /// Wheel scroll amount; positive `y` scrolls up, positive `x` scrolls left.
    pub wheel_delta: Vec2,
    /// Button for button events.
    pub button: Option<MouseButton>,
    /// Virtual key for key events.
    pub key: Option<Key>,
    /// Hardware keycode for key events.
    pub keycode: u32,
    /// Modifier snapshot taken when the event was produced.
    pub modifiers: Modifiers,
    /// Monotonic milliseconds.
    pub timestamp: u64,
    /// Native window the event was reported for.
    pub native_window: Option<NativeHandle>,
    /// Logical target window, resolved by the coordinator.
    pub window: Option<WindowId>,
    /// Element the event is addressed to.
    pub target_element: Option<ElementId>,
    /// Typed text.
    pub text: Option<String>,
    /// Command identifier for [`EventKind::Command`].
    pub command: Option<CommandId>,
    /// New size for [`EventKind::WindowResize`].
    pub size: Option<Size>,
}

impl UIEvent {
    /// An event of `kind` with every other field empty.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            position: Point::ZERO,
            global_position: Point::ZERO,
            wheel_delta: Vec2::ZERO,
            button: None,
            key: None,
            keycode: 0,
            modifiers: Modifiers::empty(),
            timestamp: 0,
            native_window: None,
            window: None,
            target_element: None,
            text: None,
            command: None,
            size: None,
        }
    }

    /// A command event addressed to `target` (bubbles from there) or to the focused element.
    pub fn command(command: CommandId, window: WindowId, target: Option<ElementId>) -> Self {
        Self {
            command: Some(command),
            window: Some(window),
            target_element: target,
            ..Self::new(EventKind::Command)
        }
    }

    /// Set the position in both window and screen coordinates.
    pub fn at(mut self, position: Point) -> Self {
        self.position = position;
        self.global_position = position;
        self
    }

    /// Set the screen position.
    pub fn with_global_position(mut self, global: Point) -> Self {
        self.global_position = global;
        self
    }

    /// Set the button.
    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = Some(button);
        self
    }

    /// Set the key and its keycode.
    pub fn with_key(mut self, key: Key, keycode: u32) -> Self {
        self.key = Some(key);
        self.keycode = keycode;
        self
    }

    /// Set the text payload.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the modifier snapshot.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Set the wheel delta.
    pub fn with_wheel_delta(mut self, delta: Vec2) -> Self {
        self.wheel_delta = delta;
        self
    }

    /// Set the timestamp.
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the native window.
    pub fn for_native(mut self, window: NativeHandle) -> Self {
        self.native_window = Some(window);
        self
    }

    /// Set the logical window.
    pub fn for_window(mut self, window: WindowId) -> Self {
        self.window = Some(window);
        self
    }

    /// Set the target element.
    pub fn targeting(mut self, element: ElementId) -> Self {
        self.target_element = Some(element);
        self
    }

    /// Set the size.
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    /// Whether the Shift modifier was held.
    pub fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    /// Whether the Control modifier was held.
    pub fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }
}
