// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Double-click recognition.
//!
//! Window systems report every button press separately; a double click is a second press of
//! the same button, in the same window, close enough in time and space to the first.
//!
//! ## Usage
//!
//! ```
//! use kurbo::Point;
//! use ultracanvas_event::click::{DoubleClickState, PressKind};
//! use ultracanvas_event::MouseButton;
//!
//! let mut clicks: DoubleClickState<u32> = DoubleClickState::new();
//! let at = Point::new(10.0, 10.0);
//!
//! assert_eq!(clicks.on_press(1, MouseButton::Left, at, 1_000), PressKind::Single);
//! assert_eq!(clicks.on_press(1, MouseButton::Left, at, 1_300), PressKind::Double);
//! // The pair is consumed: a third press starts over.
//! assert_eq!(clicks.on_press(1, MouseButton::Left, at, 1_350), PressKind::Single);
//! ```
//!
//! ## Recognition rules
//!
//! 1. Presses are tracked per `(window, button)`; other buttons and windows never interfere.
//! 2. A press is a double click when the previous tracked press is at most `time_threshold`
//!    milliseconds old (inclusive) and at most `distance_threshold` pixels away (inclusive).
//! 3. A recognized double click forgets the pair, so there is no triple click.
//! 4. Any other press replaces the record.

use hashbrown::HashMap;
use kurbo::Point;

use crate::MouseButton;

/// Classification of a button press.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PressKind {
    /// An ordinary press.
    Single,
    /// The second press of a double click.
    Double,
}

/// The last press seen for a `(window, button)` pair.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LastPress {
    /// Where the press happened.
    pub position: Point,
    /// When the press happened (milliseconds).
    pub time: u64,
}

/// Double-click state machine, keyed by window.
#[derive(Clone, Debug)]
pub struct DoubleClickState<W> {
    presses: HashMap<(W, MouseButton), LastPress>,
    /// Largest distance between the two presses, in pixels.
    pub distance_threshold: f64,
    /// Largest delay between the two presses, in milliseconds.
    pub time_threshold: u64,
}

impl<W: Copy + Eq + core::hash::Hash> DoubleClickState<W> {
    /// Default distance tolerance in pixels.
    pub const DEFAULT_DISTANCE: f64 = 5.0;
    /// Default time tolerance in milliseconds.
    pub const DEFAULT_TIME: u64 = 400;

    /// Create a state with a 5-pixel and 400ms tolerance.
    pub fn new() -> Self {
        Self::with_thresholds(Self::DEFAULT_DISTANCE, Self::DEFAULT_TIME)
    }

    /// Create a state with custom tolerances.
    pub fn with_thresholds(distance_threshold: f64, time_threshold: u64) -> Self {
        Self {
            presses: HashMap::new(),
            distance_threshold,
            time_threshold,
        }
    }

    /// Record a press and classify it.
    pub fn on_press(
        &mut self,
        window: W,
        button: MouseButton,
        position: Point,
        timestamp: u64,
    ) -> PressKind {
        let key = (window, button);
        if let Some(last) = self.presses.get(&key) {
            let elapsed = timestamp.saturating_sub(last.time);
            let distance = last.position.distance(position);
            if elapsed <= self.time_threshold && distance <= self.distance_threshold {
                self.presses.remove(&key);
                return PressKind::Double;
            }
        }
        self.presses.insert(
            key,
            LastPress {
                position,
                time: timestamp,
            },
        );
        PressKind::Single
    }

    /// The last tracked press for a pair, if any.
    pub fn last_press(&self, window: W, button: MouseButton) -> Option<LastPress> {
        self.presses.get(&(window, button)).copied()
    }

    /// Forget every press in `window`.
    pub fn forget_window(&mut self, window: W) {
        self.presses.retain(|(w, _), _| *w != window);
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.presses.clear();
    }
}

impl<W: Copy + Eq + core::hash::Hash> Default for DoubleClickState<W> {
    fn default() -> Self {
        Self::new()
    }
}
