// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend traits and the types they exchange.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::raw::{NativeHandle, RawEvent};
use crate::selection::{Property, Selection, SelectionEvent, SelectionNotify, Target};

/// Errors reported by a backend.
#[derive(Debug, thiserror::Error)]
pub enum NativeError {
    /// The display could not be opened or a required extension is missing.
    #[error("native backend unavailable: {0}")]
    Unavailable(String),
    /// IO failure on the display connection.
    #[error("display connection error: {0}")]
    Io(#[from] std::io::Error),
    /// The connection to the display was closed.
    #[error("display connection closed")]
    Disconnected,
    /// The handle does not name a live window on this connection.
    #[error("unknown native window {0:?}")]
    UnknownWindow(NativeHandle),
}

/// Pointer cursor shapes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CursorShape {
    /// The platform default arrow.
    #[default]
    Default,
    /// Pointing hand, for links and buttons.
    Pointer,
    /// Text insertion beam.
    Text,
    /// Crosshair.
    Crosshair,
    /// Move/drag.
    Move,
    /// Vertical resize.
    ResizeNs,
    /// Horizontal resize.
    ResizeEw,
    /// Diagonal resize (top-left/bottom-right).
    ResizeNwse,
    /// Diagonal resize (top-right/bottom-left).
    ResizeNesw,
    /// Action not allowed.
    NotAllowed,
    /// Busy.
    Wait,
    /// No cursor.
    Hidden,
}

/// Parameters for creating a native window.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowDescriptor {
    /// Title shown by the window manager.
    pub title: String,
    /// Initial position.
    pub x: i32,
    /// Initial position.
    pub y: i32,
    /// Initial width.
    pub width: u32,
    /// Initial height.
    pub height: u32,
}

impl Default for WindowDescriptor {
    fn default() -> Self {
        Self {
            title: String::new(),
            x: 0,
            y: 0,
            width: 800,
            height: 600,
        }
    }
}

/// Interrupts a [`NativeEventSource::wait`] from another thread.
#[derive(Clone)]
pub struct Waker(Arc<dyn Fn() + Send + Sync>);

impl Waker {
    /// A waker that runs `wake` when triggered.
    pub fn new(wake: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(wake))
    }

    /// Make the blocked `wait` return early. Harmless when nobody is waiting.
    pub fn wake(&self) {
        (self.0)();
    }
}

impl fmt::Debug for Waker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waker").finish_non_exhaustive()
    }
}

/// Source of raw events and owner of the display connection.
///
/// The coordinator drives a backend from its main thread only.
pub trait NativeEventSource {
    /// Number of events that can be read without blocking.
    fn pending(&mut self) -> Result<usize, NativeError>;

    /// Read the next event, blocking until one arrives.
    fn next_event(&mut self) -> Result<RawEvent, NativeError>;

    /// Block until an event is available or `timeout` elapses; returns whether one arrived.
    ///
    /// A [`Waker`] from [`Self::waker`] ends the wait early.
    fn wait(&mut self, timeout: Duration) -> Result<bool, NativeError>;

    /// A handle other threads can use to interrupt [`Self::wait`], if the backend has one.
    fn waker(&self) -> Option<Waker> {
        None
    }

    /// Flush buffered requests to the display.
    fn flush(&mut self) -> Result<(), NativeError>;

    /// Create a native window (initially hidden).
    fn create_window(&mut self, descriptor: &WindowDescriptor) -> Result<NativeHandle, NativeError>;

    /// Map a window on screen.
    fn show_window(&mut self, window: NativeHandle) -> Result<(), NativeError>;

    /// Destroy a native window.
    fn destroy_window(&mut self, window: NativeHandle) -> Result<(), NativeError>;

    /// Change the pointer cursor shown over a window.
    fn set_cursor(&mut self, window: NativeHandle, cursor: CursorShape) -> Result<(), NativeError>;

    /// Ring the bell.
    fn bell(&mut self) {}

    /// The selection protocol on this same connection.
    fn selection(&mut self) -> &mut dyn SelectionTransport;

    /// Close the connection. Further calls may fail with [`NativeError::Disconnected`].
    fn shutdown(&mut self) {}
}

/// Selection protocol over a display connection.
///
/// Conversions are asynchronous: [`SelectionTransport::convert`] only sends the request;
/// the answer arrives later as a [`SelectionEvent::Notify`].
pub trait SelectionTransport {
    /// Invisible window used as selection owner and conversion requestor.
    fn helper_window(&self) -> NativeHandle;

    /// Claim (`Some`) or release (`None`) a selection.
    fn set_owner(&mut self, selection: Selection, owner: Option<NativeHandle>)
    -> Result<(), NativeError>;

    /// Current owner of a selection, if any.
    fn owner(&self, selection: Selection) -> Option<NativeHandle>;

    /// Ask the owner of `selection` to convert it to `target` into `property` on `requestor`.
    fn convert(
        &mut self,
        selection: Selection,
        target: &Target,
        property: &str,
        requestor: NativeHandle,
    ) -> Result<(), NativeError>;

    /// Read a property from a window.
    fn read_property(
        &mut self,
        window: NativeHandle,
        property: &str,
    ) -> Result<Option<Property>, NativeError>;

    /// Store a property on a window (typically another client's requestor window).
    fn write_property(
        &mut self,
        window: NativeHandle,
        property: &str,
        value: Property,
    ) -> Result<(), NativeError>;

    /// Delete a property from a window.
    fn delete_property(&mut self, window: NativeHandle, property: &str) -> Result<(), NativeError>;

    /// Send a notification to a requestor.
    fn send_notify(&mut self, notify: SelectionNotify) -> Result<(), NativeError>;

    /// Wait up to `timeout` for selection traffic, leaving every other event queued.
    fn next_selection_event(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<SelectionEvent>, NativeError>;

    /// Flush buffered requests.
    fn flush(&mut self) -> Result<(), NativeError>;
}
