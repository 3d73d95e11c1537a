// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raw events as delivered by a backend, before translation.

use crate::selection::SelectionEvent;

/// Opaque handle of a native window on the display connection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

/// Bits of the raw modifier/button state mask, in core-protocol layout.
///
/// Backends report modifier state in this layout; the translator maps it to
/// normalized modifiers through its configurable modifier map.
pub mod mask {
    /// Shift held.
    pub const SHIFT: u32 = 1 << 0;
    /// Caps lock active.
    pub const LOCK: u32 = 1 << 1;
    /// Control held.
    pub const CONTROL: u32 = 1 << 2;
    /// Mod1 (usually Alt) held.
    pub const MOD1: u32 = 1 << 3;
    /// Mod2 (usually Num lock) active.
    pub const MOD2: u32 = 1 << 4;
    /// Mod4 (usually Super/Meta) held.
    pub const MOD4: u32 = 1 << 6;
    /// Left button held.
    pub const BUTTON1: u32 = 1 << 8;
    /// Middle button held.
    pub const BUTTON2: u32 = 1 << 9;
    /// Right button held.
    pub const BUTTON3: u32 = 1 << 10;
}

/// Virtual key, already resolved from the keyboard mapping by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Tab.
    Tab,
    /// Return / Enter.
    Enter,
    /// Escape.
    Escape,
    /// Backspace.
    Backspace,
    /// Delete.
    Delete,
    /// Insert.
    Insert,
    /// Space bar.
    Space,
    /// Left arrow.
    ArrowLeft,
    /// Right arrow.
    ArrowRight,
    /// Up arrow.
    ArrowUp,
    /// Down arrow.
    ArrowDown,
    /// Home.
    Home,
    /// End.
    End,
    /// Page up.
    PageUp,
    /// Page down.
    PageDown,
    /// Either shift key.
    Shift,
    /// Either control key.
    Control,
    /// Either alt key.
    Alt,
    /// Either meta/super key.
    Meta,
    /// Caps lock.
    CapsLock,
    /// Function key `F1`..`F24`.
    Function(u8),
    /// A key producing a character.
    Character(char),
    /// A key without a virtual mapping; carries the backend's symbol value.
    Other(u32),
}

/// Keyboard press or release.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyEvent {
    /// Window with keyboard focus.
    pub window: NativeHandle,
    /// Hardware keycode.
    pub keycode: u32,
    /// Virtual key.
    pub key: Key,
    /// Text produced by the key press, if any.
    pub text: Option<String>,
    /// Pointer position in window coordinates.
    pub x: i32,
    /// Pointer position in window coordinates.
    pub y: i32,
    /// Modifier state mask, see [`mask`].
    pub state: u32,
}

/// Pointer button press or release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonEvent {
    /// Window under the pointer.
    pub window: NativeHandle,
    /// Core-protocol button number (1 left, 2 middle, 3 right, 4-7 wheel, 8-9 side).
    pub button: u32,
    /// Position in window coordinates.
    pub x: i32,
    /// Position in window coordinates.
    pub y: i32,
    /// Position in screen coordinates.
    pub root_x: i32,
    /// Position in screen coordinates.
    pub root_y: i32,
    /// Modifier state mask, see [`mask`].
    pub state: u32,
}

/// Pointer motion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MotionEvent {
    /// Window under the pointer.
    pub window: NativeHandle,
    /// Position in window coordinates.
    pub x: i32,
    /// Position in window coordinates.
    pub y: i32,
    /// Position in screen coordinates.
    pub root_x: i32,
    /// Position in screen coordinates.
    pub root_y: i32,
    /// Modifier state mask, see [`mask`].
    pub state: u32,
}

/// Pointer entering or leaving a window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrossingEvent {
    /// The window entered or left.
    pub window: NativeHandle,
    /// Position in window coordinates.
    pub x: i32,
    /// Position in window coordinates.
    pub y: i32,
    /// Modifier state mask, see [`mask`].
    pub state: u32,
}

/// An untranslated event from the display connection.
#[derive(Clone, Debug, PartialEq)]
pub enum RawEvent {
    /// Key pressed.
    KeyPress(KeyEvent),
    /// Key released.
    KeyRelease(KeyEvent),
    /// Button pressed (wheel notches arrive as presses of buttons 4-7).
    ButtonPress(ButtonEvent),
    /// Button released.
    ButtonRelease(ButtonEvent),
    /// Pointer moved.
    Motion(MotionEvent),
    /// Pointer entered a window.
    PointerEnter(CrossingEvent),
    /// Pointer left a window.
    PointerLeave(CrossingEvent),
    /// Window moved or resized.
    Configure {
        /// The window.
        window: NativeHandle,
        /// New position.
        x: i32,
        /// New position.
        y: i32,
        /// New width; negative values are malformed.
        width: i32,
        /// New height; negative values are malformed.
        height: i32,
    },
    /// Part of a window needs repainting. `count` is the number of fragments still to come.
    Expose {
        /// The window.
        window: NativeHandle,
        /// Remaining fragments in this exposure sequence.
        count: u32,
    },
    /// Window received keyboard focus.
    FocusIn {
        /// The window.
        window: NativeHandle,
    },
    /// Window lost keyboard focus.
    FocusOut {
        /// The window.
        window: NativeHandle,
    },
    /// The window manager asked the window to close.
    CloseRequested {
        /// The window.
        window: NativeHandle,
    },
    /// Selection protocol traffic.
    Selection(SelectionEvent),
    /// Anything the backend does not classify.
    Unknown {
        /// Window the event was reported for, if any.
        window: Option<NativeHandle>,
        /// Backend-specific event code.
        code: u32,
    },
}

impl RawEvent {
    /// Window the event is reported for, if it names one.
    pub fn window(&self) -> Option<NativeHandle> {
        match self {
            Self::KeyPress(k) | Self::KeyRelease(k) => Some(k.window),
            Self::ButtonPress(b) | Self::ButtonRelease(b) => Some(b.window),
            Self::Motion(m) => Some(m.window),
            Self::PointerEnter(c) | Self::PointerLeave(c) => Some(c.window),
            Self::Configure { window, .. }
            | Self::Expose { window, .. }
            | Self::FocusIn { window }
            | Self::FocusOut { window }
            | Self::CloseRequested { window } => Some(*window),
            Self::Selection(_) => None,
            Self::Unknown { window, .. } => *window,
        }
    }

    /// Whether this is selection protocol traffic.
    pub fn is_selection(&self) -> bool {
        matches!(self, Self::Selection(_))
    }
}
