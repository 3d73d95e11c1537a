// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! UltraCanvas Native: the contract between the toolkit and a window-system backend.
//!
//! ## Overview
//!
//! The dispatch coordinator never sees window-system types. A backend implements
//! [`NativeEventSource`], which hands out [`RawEvent`]s, blocks on the display connection
//! with a timeout, and manages native windows and cursors. The same connection also serves
//! the selection (clipboard) protocol through [`SelectionTransport`], which the clipboard
//! engine borrows for the duration of each operation.
//!
//! The wire vocabulary mirrors the X11 core protocol (selection owners, conversion
//! targets, properties and notifications) without exposing any X11 type:
//!
//! - [`Selection`]: the two selections the toolkit uses, CLIPBOARD and PRIMARY.
//! - [`Target`]: an interned conversion target (`TARGETS`, `UTF8_STRING`, MIME types, …).
//! - [`Property`]: data stored on a window property, either bytes with a type or a list
//!   of targets.
//! - [`SelectionEvent`]: requests, notifications and ownership loss.
//!
//! ## Headless backend
//!
//! [`headless::HeadlessServer`] is an in-process display server. Each
//! [`headless::HeadlessDisplay`] connection behaves like one client process with its own
//! event queue, so multi-process selection exchanges can be driven from one test binary.
//!
//! ```rust
//! use ultracanvas_native::headless::HeadlessServer;
//! use ultracanvas_native::{NativeEventSource, Selection, SelectionTransport};
//!
//! let server = HeadlessServer::new();
//! let mut first = server.connect();
//! let mut second = server.connect();
//!
//! let owner = first.selection().helper_window();
//! first.selection().set_owner(Selection::Clipboard, Some(owner)).unwrap();
//! assert_eq!(second.selection().owner(Selection::Clipboard), Some(owner));
//! ```

mod backend;
pub mod headless;
mod raw;
mod selection;

pub use backend::{
    CursorShape, NativeError, NativeEventSource, SelectionTransport, WindowDescriptor, Waker,
};
pub use raw::{
    ButtonEvent, CrossingEvent, Key, KeyEvent, MotionEvent, NativeHandle, RawEvent, mask,
};
pub use selection::{
    Property, Selection, SelectionClear, SelectionEvent, SelectionNotify, SelectionRequest,
    Target,
};
