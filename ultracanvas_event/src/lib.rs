// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! UltraCanvas Event: canonical UI events and their translation from native input.
//!
//! ## Overview
//!
//! Everything above the backend speaks [`UIEvent`]. The [`EventTranslator`] turns the raw
//! events of an [`ultracanvas_native::NativeEventSource`] into them and keeps the history
//! that translation needs:
//!
//! - wheel notches (core buttons 4 to 7) become one [`EventKind::MouseWheel`] per notch, with
//!   the matching releases dropped;
//! - a second press of the same button in the same window within
//!   [`TranslatorConfig::double_click_time`] and [`TranslatorConfig::double_click_radius`]
//!   becomes [`EventKind::MouseDoubleClick`] (see [`click`]);
//! - every event carries a normalized [`Modifiers`] snapshot and held keys are tracked in a
//!   [`KeyState`];
//! - expose fragments collapse into one [`EventKind::WindowRepaint`];
//! - selection traffic is returned untouched as [`Translated::Selection`] for the clipboard
//!   engine to answer synchronously.
//!
//! Timestamps come from a [`Clock`]; [`ManualClock`] makes timing-dependent behavior
//! deterministic in tests.

pub mod click;
mod clock;
mod event;
mod keys;
mod translate;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use event::{CommandId, EventKind, Modifiers, MouseButton, UIEvent, WindowId};
pub use keys::KeyState;
pub use translate::{EventTranslator, ModifierMap, Translated, TranslatorConfig};
