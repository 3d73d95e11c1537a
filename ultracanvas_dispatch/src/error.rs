// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use ultracanvas_event::WindowId;
use ultracanvas_native::NativeError;
use ultracanvas_tree::TreeError;

/// Errors reported by the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The native backend could not be brought up.
    #[error("native backend failed to initialize: {0}")]
    BackendInit(#[source] NativeError),
    /// The event source failed while running; fatal to the main loop.
    #[error("native event source failed: {0}")]
    Native(#[from] NativeError),
    /// No live window has this id.
    #[error("window {0:?} not found")]
    UnknownWindow(WindowId),
    /// A structural change to a window's tree was rejected.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Failure while painting. Logged by the coordinator, never fatal.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The drawing backend rejected an operation.
    #[error("render backend error: {0}")]
    Backend(String),
    /// An image could not be loaded or decoded.
    #[error("image unavailable: {0}")]
    Image(String),
}
