// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! UltraCanvas Focus: focus navigation primitives.
//!
//! This crate models keyboard focus as:
//! - **Navigation intents** ([`Navigation`]) such as [`Navigation::Next`] (Tab) and
//!   [`Navigation::Prev`] (Shift+Tab).
//! - A **read-only view of candidates** ([`FocusEntry`] / [`FocusSpace`]) listed in
//!   depth-first tree order.
//! - Pluggable **policies** ([`FocusPolicy`]) that pick the next focused element.
//! - A **focus slot** ([`FocusState`]) that turns a focus request into a
//!   [`FocusChange`]: the element losing focus is always reported before the one gaining it,
//!   and re-focusing the current element reports nothing.
//!
//! ## Minimal example
//!
//! ```rust
//! use ultracanvas_focus::{FocusEntry, FocusPolicy, FocusSpace, Navigation, TreeOrderPolicy};
//!
//! let entries = [
//!     FocusEntry { id: 1_u32, enabled: true },
//!     FocusEntry { id: 2_u32, enabled: false },
//!     FocusEntry { id: 3_u32, enabled: true },
//! ];
//! let space = FocusSpace { nodes: &entries };
//! let policy = TreeOrderPolicy::default();
//!
//! // Tab skips the disabled entry…
//! assert_eq!(policy.next(Some(1), Navigation::Next, &space), Some(3));
//! // …and wraps back to the first.
//! assert_eq!(policy.next(Some(3), Navigation::Next, &space), Some(1));
//! // With nothing focused, Tab starts at the first candidate.
//! assert_eq!(policy.next(None, Navigation::Next, &space), Some(1));
//! ```
//!
//! ## Features
//!
//! - `std` (default) / `libm`: forwarded to `ultracanvas_tree` when the adapter is enabled.
//! - `tree_adapter`: enables [`adapters::tree`], which builds focus entries directly from an
//!   `ultracanvas_tree::Tree`.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

#[cfg(feature = "tree_adapter")]
pub mod adapters;

/// Direction of focus navigation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Navigation {
    /// Move forward in tree order (Tab).
    Next,
    /// Move backward in tree order (Shift+Tab).
    Prev,
    /// Jump to the first candidate.
    First,
    /// Jump to the last candidate.
    Last,
}

/// A single focus candidate within a [`FocusSpace`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FocusEntry<K> {
    /// Identifier of the element.
    pub id: K,
    /// Whether the element may receive focus right now.
    ///
    /// Disabled entries are kept so an origin that became disabled can still be located.
    pub enabled: bool,
}

/// A read-only view of focus candidates, in traversal order.
#[derive(Clone, Debug)]
pub struct FocusSpace<'a, K> {
    /// Candidates in depth-first order.
    pub nodes: &'a [FocusEntry<K>],
}

/// Wrap behavior at the ends of a focus space.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum WrapMode {
    /// Reaching the end yields no candidate.
    Never,
    /// Wrap around within the space.
    #[default]
    Scope,
}

/// Trait for focus traversal policies.
pub trait FocusPolicy<K>
where
    K: Copy + Eq,
{
    /// Compute the next focus target given the current focus (if any) and an intent.
    fn next(&self, origin: Option<K>, direction: Navigation, space: &FocusSpace<'_, K>)
    -> Option<K>;
}

/// Linear policy over tree order.
#[derive(Copy, Clone, Debug, Default)]
pub struct TreeOrderPolicy {
    /// Wrap behavior when traversing focusable candidates.
    pub wrap: WrapMode,
}

impl<K> FocusPolicy<K> for TreeOrderPolicy
where
    K: Copy + Eq,
{
    fn next(
        &self,
        origin: Option<K>,
        direction: Navigation,
        space: &FocusSpace<'_, K>,
    ) -> Option<K> {
        let mut enabled = space.nodes.iter().filter(|e| e.enabled).map(|e| e.id);
        match direction {
            Navigation::First => enabled.next(),
            Navigation::Last => enabled.last(),
            Navigation::Next => next_linear(origin, space, self.wrap, Step::Forward),
            Navigation::Prev => next_linear(origin, space, self.wrap, Step::Backward),
        }
    }
}

#[derive(Copy, Clone)]
enum Step {
    Forward,
    Backward,
}

fn next_linear<K>(
    origin: Option<K>,
    space: &FocusSpace<'_, K>,
    wrap: WrapMode,
    step: Step,
) -> Option<K>
where
    K: Copy + Eq,
{
    let nodes = space.nodes;
    let first = nodes.iter().position(|e| e.enabled)?;
    let last = nodes.iter().rposition(|e| e.enabled)?;

    // An origin outside the space behaves like no origin at all.
    let Some(pos) = origin.and_then(|o| nodes.iter().position(|e| e.id == o)) else {
        return Some(match step {
            Step::Forward => nodes[first].id,
            Step::Backward => nodes[last].id,
        });
    };

    let found = match step {
        Step::Forward => nodes[pos + 1..].iter().find(|e| e.enabled),
        Step::Backward => nodes[..pos].iter().rev().find(|e| e.enabled),
    };
    match (found, wrap) {
        (Some(e), _) => Some(e.id),
        (None, WrapMode::Never) => None,
        (None, WrapMode::Scope) => Some(match step {
            Step::Forward => nodes[first].id,
            Step::Backward => nodes[last].id,
        }),
    }
}

/// A focus transition. `lost` is notified before `gained`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FocusChange<K> {
    /// Element that loses focus.
    pub lost: Option<K>,
    /// Element that gains focus.
    pub gained: Option<K>,
}

/// Holder of the currently focused element.
#[derive(Clone, Debug)]
pub struct FocusState<K> {
    focused: Option<K>,
}

impl<K> Default for FocusState<K> {
    fn default() -> Self {
        Self { focused: None }
    }
}

impl<K: Copy + Eq> FocusState<K> {
    /// Create an empty focus state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently focused element.
    pub fn focused(&self) -> Option<K> {
        self.focused
    }

    /// Move focus to `next`. Returns `None` when focus does not change.
    pub fn set(&mut self, next: Option<K>) -> Option<FocusChange<K>> {
        if self.focused == next {
            return None;
        }
        let lost = core::mem::replace(&mut self.focused, next);
        Some(FocusChange { lost, gained: next })
    }

    /// Drop focus if it rests on an element matching `gone`, without reporting a change.
    ///
    /// Used when the focused element is destroyed and can no longer be notified.
    pub fn forget_if(&mut self, gone: impl FnOnce(K) -> bool) -> bool {
        match self.focused {
            Some(k) if gone(k) => {
                self.focused = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(enabled: &[bool]) -> alloc::vec::Vec<FocusEntry<u32>> {
        enabled
            .iter()
            .enumerate()
            .map(|(i, &enabled)| FocusEntry {
                id: u32::try_from(i).unwrap() + 1,
                enabled,
            })
            .collect()
    }

    #[test]
    fn linear_next_prev_with_wrap() {
        let entries = entries(&[true, true]);
        let space = FocusSpace { nodes: &entries };
        let policy = TreeOrderPolicy {
            wrap: WrapMode::Scope,
        };

        assert_eq!(policy.next(Some(1), Navigation::Next, &space), Some(2));
        assert_eq!(policy.next(Some(2), Navigation::Next, &space), Some(1));
        assert_eq!(policy.next(Some(1), Navigation::Prev, &space), Some(2));
    }

    #[test]
    fn linear_skips_disabled_entries() {
        let entries = entries(&[true, false, true]);
        let space = FocusSpace { nodes: &entries };
        let policy = TreeOrderPolicy::default();

        assert_eq!(policy.next(Some(1), Navigation::Next, &space), Some(3));
        assert_eq!(policy.next(Some(3), Navigation::Prev, &space), Some(1));
        // A disabled origin is still located by position.
        assert_eq!(policy.next(Some(2), Navigation::Next, &space), Some(3));
    }

    #[test]
    fn linear_no_wrap_stops_at_edges() {
        let entries = entries(&[true, true]);
        let space = FocusSpace { nodes: &entries };
        let policy = TreeOrderPolicy {
            wrap: WrapMode::Never,
        };

        assert_eq!(policy.next(Some(2), Navigation::Next, &space), None);
        assert_eq!(policy.next(Some(1), Navigation::Prev, &space), None);
    }

    #[test]
    fn no_origin_starts_at_the_edges() {
        let entries = entries(&[false, true, true, false]);
        let space = FocusSpace { nodes: &entries };
        let policy = TreeOrderPolicy::default();

        assert_eq!(policy.next(None, Navigation::Next, &space), Some(2));
        assert_eq!(policy.next(None, Navigation::Prev, &space), Some(3));
        assert_eq!(policy.next(Some(99), Navigation::Next, &space), Some(2));
        assert_eq!(policy.next(Some(2), Navigation::First, &space), Some(2));
        assert_eq!(policy.next(Some(2), Navigation::Last, &space), Some(3));
    }

    #[test]
    fn empty_or_all_disabled_yields_nothing() {
        let policy = TreeOrderPolicy::default();
        let none: [FocusEntry<u32>; 0] = [];
        assert_eq!(
            policy.next(None, Navigation::Next, &FocusSpace { nodes: &none }),
            None
        );
        let disabled = entries(&[false, false]);
        assert_eq!(
            policy.next(Some(1), Navigation::Next, &FocusSpace { nodes: &disabled }),
            None
        );
    }

    #[test]
    fn focus_state_reports_lost_before_gained_and_is_idempotent() {
        let mut state = FocusState::new();
        assert_eq!(
            state.set(Some(1_u32)),
            Some(FocusChange {
                lost: None,
                gained: Some(1)
            })
        );
        assert_eq!(state.set(Some(1)), None, "re-focusing is a no-op");
        assert_eq!(
            state.set(Some(2)),
            Some(FocusChange {
                lost: Some(1),
                gained: Some(2)
            })
        );
        assert!(state.forget_if(|k| k == 2));
        assert_eq!(state.focused(), None);
        assert!(!state.forget_if(|_| true));
    }
}
