// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hover tooltips.
//!
//! A tooltip appears once the pointer has rested on the same element for the configured
//! delay and that element offers text. Any hover change, press or key hides it; it is not
//! shown again until the pointer moves to a different element.

use kurbo::{Point, Vec2};
use ultracanvas_event::WindowId;

use crate::ElementRef;

/// Offset from the pointer to the tooltip's top-left corner.
const POINTER_OFFSET: Vec2 = Vec2::new(0.0, 20.0);

/// A visible tooltip.
#[derive(Clone, Debug, PartialEq)]
pub struct Tooltip {
    /// Element the tooltip describes.
    pub target: ElementRef,
    /// The text shown.
    pub text: String,
    /// Top-left corner in window coordinates.
    pub position: Point,
}

#[derive(Clone, Debug)]
struct Pending {
    target: ElementRef,
    since: u64,
    pointer: Point,
    armed: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct TooltipState {
    delay: u64,
    pending: Option<Pending>,
    shown: Option<Tooltip>,
}

impl TooltipState {
    pub(crate) fn new(delay: u64) -> Self {
        Self {
            delay,
            pending: None,
            shown: None,
        }
    }

    pub(crate) fn shown(&self) -> Option<&Tooltip> {
        self.shown.as_ref()
    }

    /// The pointer is over `target` at `pointer` (window space). Returns the window whose
    /// tooltip was hidden, if any.
    pub(crate) fn hover(
        &mut self,
        target: Option<ElementRef>,
        pointer: Point,
        now: u64,
    ) -> Option<WindowId> {
        if let Some(pending) = &mut self.pending
            && Some(pending.target) == target
        {
            pending.pointer = pointer;
            return None;
        }
        self.pending = target.map(|target| Pending {
            target,
            since: now,
            pointer,
            armed: true,
        });
        self.shown.take().map(|t| t.target.window)
    }

    /// Hide the tooltip and keep it hidden until the hover target changes.
    pub(crate) fn suppress(&mut self) -> Option<WindowId> {
        if let Some(pending) = &mut self.pending {
            pending.armed = false;
        }
        self.shown.take().map(|t| t.target.window)
    }

    /// Show the pending tooltip if its delay has elapsed. Returns the window to redraw.
    pub(crate) fn tick(
        &mut self,
        now: u64,
        text_of: impl FnOnce(ElementRef) -> Option<String>,
    ) -> Option<WindowId> {
        if self.shown.is_some() {
            return None;
        }
        let pending = self.pending.as_mut()?;
        if !pending.armed || now.saturating_sub(pending.since) < self.delay {
            return None;
        }
        // One attempt per hover: an element without text does not get asked every frame.
        pending.armed = false;
        let text = text_of(pending.target)?;
        let window = pending.target.window;
        self.shown = Some(Tooltip {
            target: pending.target,
            text,
            position: pending.pointer + POINTER_OFFSET,
        });
        Some(window)
    }

    /// Forget everything that refers to elements matching `gone`.
    pub(crate) fn forget(&mut self, gone: impl Fn(ElementRef) -> bool) {
        if self.pending.as_ref().is_some_and(|p| gone(p.target)) {
            self.pending = None;
        }
        if self.shown.as_ref().is_some_and(|t| gone(t.target)) {
            self.shown = None;
        }
    }
}
