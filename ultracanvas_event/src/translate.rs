// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raw event translation.

use hashbrown::HashMap;
use kurbo::{Point, Size, Vec2};
use ultracanvas_native::{ButtonEvent, KeyEvent, NativeHandle, RawEvent, SelectionEvent, mask};

use crate::click::{DoubleClickState, PressKind};
use crate::event::{EventKind, Modifiers, MouseButton, UIEvent};
use crate::keys::KeyState;

/// Which raw state-mask bits mean which modifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModifierMap {
    /// Bits meaning Shift.
    pub shift: u32,
    /// Bits meaning Control.
    pub ctrl: u32,
    /// Bits meaning Alt.
    pub alt: u32,
    /// Bits meaning Meta.
    pub meta: u32,
}

impl Default for ModifierMap {
    fn default() -> Self {
        Self {
            shift: mask::SHIFT,
            ctrl: mask::CONTROL,
            alt: mask::MOD1,
            meta: mask::MOD4,
        }
    }
}

impl ModifierMap {
    /// Normalize a raw state mask.
    pub fn normalize(&self, state: u32) -> Modifiers {
        let mut modifiers = Modifiers::empty();
        modifiers.set(Modifiers::SHIFT, state & self.shift != 0);
        modifiers.set(Modifiers::CTRL, state & self.ctrl != 0);
        modifiers.set(Modifiers::ALT, state & self.alt != 0);
        modifiers.set(Modifiers::META, state & self.meta != 0);
        modifiers
    }
}

/// Translator settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TranslatorConfig {
    /// Longest delay between the presses of a double click, inclusive (milliseconds).
    pub double_click_time: u64,
    /// Largest distance between the presses of a double click, inclusive (pixels).
    pub double_click_radius: f64,
    /// Wheel delta reported for one notch.
    pub wheel_step: f64,
    /// Raw modifier mask layout.
    pub modifier_map: ModifierMap,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            double_click_time: 400,
            double_click_radius: 5.0,
            wheel_step: 5.0,
            modifier_map: ModifierMap::default(),
        }
    }
}

/// Outcome of translating one raw event.
#[derive(Clone, Debug, PartialEq)]
pub enum Translated {
    /// A canonical event to queue.
    Event(UIEvent),
    /// Selection traffic, to be handed to the clipboard engine right away.
    Selection(SelectionEvent),
    /// Nothing to deliver (wheel releases, expose fragments, unchanged geometry).
    Dropped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Geometry {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

/// Stateful translator from [`RawEvent`] to [`UIEvent`].
///
/// The translator owns everything that needs history across events: double-click records,
/// held keys, the latest modifier snapshot and the last known geometry of every window.
///
/// ```
/// use ultracanvas_event::{EventKind, EventTranslator, MouseButton, Translated, TranslatorConfig};
/// use ultracanvas_native::{ButtonEvent, NativeHandle, RawEvent};
///
/// let mut translator = EventTranslator::new(TranslatorConfig::default());
/// let press = |button| {
///     RawEvent::ButtonPress(ButtonEvent {
///         window: NativeHandle(1),
///         button,
///         x: 10,
///         y: 10,
///         root_x: 110,
///         root_y: 110,
///         state: 0,
///     })
/// };
///
/// let Translated::Event(down) = translator.translate(press(1), 0) else { unreachable!() };
/// assert_eq!((down.kind, down.button), (EventKind::MouseDown, Some(MouseButton::Left)));
///
/// let Translated::Event(wheel) = translator.translate(press(5), 10) else { unreachable!() };
/// assert_eq!(wheel.kind, EventKind::MouseWheel);
/// assert_eq!(wheel.wheel_delta.y, -5.0);
/// ```
#[derive(Debug)]
pub struct EventTranslator {
    config: TranslatorConfig,
    clicks: DoubleClickState<NativeHandle>,
    keys: KeyState,
    modifiers: Modifiers,
    geometry: HashMap<NativeHandle, Geometry>,
}

impl EventTranslator {
    /// Create a translator.
    pub fn new(config: TranslatorConfig) -> Self {
        Self {
            clicks: DoubleClickState::with_thresholds(
                config.double_click_radius,
                config.double_click_time,
            ),
            config,
            keys: KeyState::new(),
            modifiers: Modifiers::empty(),
            geometry: HashMap::new(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Modifiers of the most recent input event.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Whether a hardware key is held.
    pub fn is_key_down(&self, keycode: u32) -> bool {
        self.keys.is_down(keycode)
    }

    /// Held-key bitmap.
    pub fn key_state(&self) -> &KeyState {
        &self.keys
    }

    /// Drop per-window history for a window that no longer exists.
    pub fn forget_window(&mut self, window: NativeHandle) {
        self.clicks.forget_window(window);
        self.geometry.remove(&window);
    }

    /// Translate one raw event observed at `now` (monotonic milliseconds).
    pub fn translate(&mut self, raw: RawEvent, now: u64) -> Translated {
        let translated = match raw {
            RawEvent::KeyPress(key) => self.key(EventKind::KeyDown, key, now),
            RawEvent::KeyRelease(key) => self.key(EventKind::KeyUp, key, now),
            RawEvent::ButtonPress(button) => self.button_press(&button, now),
            RawEvent::ButtonRelease(button) => self.button_release(&button, now),
            RawEvent::Motion(motion) => {
                self.modifiers = self.config.modifier_map.normalize(motion.state);
                Translated::Event(
                    self.stamp(EventKind::MouseMove, motion.window, now)
                        .at(point(motion.x, motion.y))
                        .with_global_position(point(motion.root_x, motion.root_y)),
                )
            }
            RawEvent::PointerEnter(crossing) => {
                self.modifiers = self.config.modifier_map.normalize(crossing.state);
                Translated::Event(
                    self.stamp(EventKind::MouseEnter, crossing.window, now)
                        .at(point(crossing.x, crossing.y)),
                )
            }
            RawEvent::PointerLeave(crossing) => {
                self.modifiers = self.config.modifier_map.normalize(crossing.state);
                Translated::Event(
                    self.stamp(EventKind::MouseLeave, crossing.window, now)
                        .at(point(crossing.x, crossing.y)),
                )
            }
            RawEvent::Configure {
                window,
                x,
                y,
                width,
                height,
            } => self.configure(
                window,
                Geometry {
                    x,
                    y,
                    width: width.max(0),
                    height: height.max(0),
                },
                now,
            ),
            RawEvent::Expose { window, count } => {
                if count > 0 {
                    Translated::Dropped
                } else {
                    Translated::Event(self.stamp(EventKind::WindowRepaint, window, now))
                }
            }
            RawEvent::FocusIn { window } => {
                Translated::Event(self.stamp(EventKind::WindowFocus, window, now))
            }
            RawEvent::FocusOut { window } => {
                // Releases that happen while another window has focus are never reported.
                self.keys.clear();
                Translated::Event(self.stamp(EventKind::WindowBlur, window, now))
            }
            RawEvent::CloseRequested { window } => {
                Translated::Event(self.stamp(EventKind::WindowClose, window, now))
            }
            RawEvent::Selection(selection) => Translated::Selection(selection),
            RawEvent::Unknown { window, code } => {
                tracing::trace!(code, "unclassified native event");
                let mut event = UIEvent::new(EventKind::Unknown)
                    .with_modifiers(self.modifiers)
                    .with_timestamp(now);
                event.native_window = window;
                Translated::Event(event)
            }
        };
        if matches!(translated, Translated::Dropped) {
            tracing::trace!("raw event dropped by translation");
        }
        translated
    }

    fn stamp(&self, kind: EventKind, window: NativeHandle, now: u64) -> UIEvent {
        UIEvent::new(kind)
            .for_native(window)
            .with_modifiers(self.modifiers)
            .with_timestamp(now)
    }

    fn key(&mut self, kind: EventKind, key: KeyEvent, now: u64) -> Translated {
        self.modifiers = self.config.modifier_map.normalize(key.state);
        self.keys.set(key.keycode, kind == EventKind::KeyDown);
        let mut event = self
            .stamp(kind, key.window, now)
            .at(point(key.x, key.y))
            .with_key(key.key, key.keycode);
        event.text = key.text.filter(|t| !t.is_empty());
        Translated::Event(event)
    }

    fn button_press(&mut self, raw: &ButtonEvent, now: u64) -> Translated {
        self.modifiers = self.config.modifier_map.normalize(raw.state);
        let at = point(raw.x, raw.y);
        let base = |this: &Self, kind| {
            this.stamp(kind, raw.window, now)
                .at(at)
                .with_global_position(point(raw.root_x, raw.root_y))
        };
        let Some(button) = MouseButton::from_native(raw.button) else {
            let step = self.config.wheel_step;
            let delta = match raw.button {
                4 => Vec2::new(0.0, step),
                5 => Vec2::new(0.0, -step),
                6 => Vec2::new(step, 0.0),
                _ => Vec2::new(-step, 0.0),
            };
            return Translated::Event(base(self, EventKind::MouseWheel).with_wheel_delta(delta));
        };
        let kind = match self.clicks.on_press(raw.window, button, at, now) {
            PressKind::Single => EventKind::MouseDown,
            PressKind::Double => EventKind::MouseDoubleClick,
        };
        Translated::Event(base(self, kind).with_button(button))
    }

    fn button_release(&mut self, raw: &ButtonEvent, now: u64) -> Translated {
        self.modifiers = self.config.modifier_map.normalize(raw.state);
        // Wheel notches are reported as press/release pairs; the press already counted.
        let Some(button) = MouseButton::from_native(raw.button) else {
            return Translated::Dropped;
        };
        Translated::Event(
            self.stamp(EventKind::MouseUp, raw.window, now)
                .at(point(raw.x, raw.y))
                .with_global_position(point(raw.root_x, raw.root_y))
                .with_button(button),
        )
    }

    fn configure(&mut self, window: NativeHandle, next: Geometry, now: u64) -> Translated {
        let previous = self.geometry.insert(window, next);
        let resized = previous.is_none_or(|p| p.width != next.width || p.height != next.height);
        if resized {
            let size = Size::new(f64::from(next.width), f64::from(next.height));
            return Translated::Event(
                self.stamp(EventKind::WindowResize, window, now)
                    .with_global_position(point(next.x, next.y))
                    .with_size(size),
            );
        }
        if previous.is_some_and(|p| p.x != next.x || p.y != next.y) {
            return Translated::Event(
                self.stamp(EventKind::WindowMove, window, now)
                    .with_global_position(point(next.x, next.y)),
            );
        }
        Translated::Dropped
    }
}

fn point(x: i32, y: i32) -> Point {
    Point::new(f64::from(x), f64::from(y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ultracanvas_native::{CrossingEvent, Key, Selection, SelectionClear};

    const WIN: NativeHandle = NativeHandle(7);

    fn button(press: bool, button: u32, x: i32, y: i32) -> RawEvent {
        let event = ButtonEvent {
            window: WIN,
            button,
            x,
            y,
            root_x: x + 100,
            root_y: y + 100,
            state: 0,
        };
        if press {
            RawEvent::ButtonPress(event)
        } else {
            RawEvent::ButtonRelease(event)
        }
    }

    fn event(t: Translated) -> UIEvent {
        match t {
            Translated::Event(e) => e,
            other => panic!("expected an event, got {other:?}"),
        }
    }

    fn key_press(keycode: u32, key: Key, text: Option<&str>, state: u32) -> RawEvent {
        RawEvent::KeyPress(KeyEvent {
            window: WIN,
            keycode,
            key,
            text: text.map(str::to_owned),
            x: 0,
            y: 0,
            state,
        })
    }

    #[test]
    fn double_click_boundary() {
        let mut t = EventTranslator::new(TranslatorConfig::default());
        assert_eq!(event(t.translate(button(true, 1, 10, 10), 1_000)).kind, EventKind::MouseDown);
        t.translate(button(false, 1, 10, 10), 1_050);
        assert_eq!(
            event(t.translate(button(true, 1, 10, 10), 1_399)).kind,
            EventKind::MouseDoubleClick
        );

        let mut t = EventTranslator::new(TranslatorConfig::default());
        t.translate(button(true, 1, 10, 10), 1_000);
        assert_eq!(
            event(t.translate(button(true, 1, 10, 10), 1_401)).kind,
            EventKind::MouseDown
        );
    }

    #[test]
    fn one_wheel_notch_is_one_wheel_event() {
        let mut t = EventTranslator::new(TranslatorConfig::default());
        let wheel = event(t.translate(button(true, 4, 3, 4), 0));
        assert_eq!(wheel.kind, EventKind::MouseWheel);
        assert_eq!(wheel.wheel_delta, Vec2::new(0.0, 5.0));
        assert_eq!(wheel.button, None);
        assert_eq!(t.translate(button(false, 4, 3, 4), 1), Translated::Dropped);

        let left = event(t.translate(button(true, 7, 3, 4), 2));
        assert_eq!(left.wheel_delta, Vec2::new(-5.0, 0.0));
    }

    #[test]
    fn coordinates_are_preserved() {
        let mut t = EventTranslator::new(TranslatorConfig::default());
        let down = event(t.translate(button(true, 3, -4, 250), 0));
        assert_eq!(down.position, Point::new(-4.0, 250.0));
        assert_eq!(down.global_position, Point::new(96.0, 350.0));
        assert_eq!(down.button, Some(MouseButton::Right));
        assert_eq!(down.native_window, Some(WIN));
    }

    #[test]
    fn modifiers_and_key_state_follow_key_events() {
        let mut t = EventTranslator::new(TranslatorConfig::default());
        let down = event(t.translate(
            key_press(38, Key::Character('a'), Some("A"), mask::SHIFT | mask::CONTROL),
            0,
        ));
        assert_eq!(down.kind, EventKind::KeyDown);
        assert_eq!(down.modifiers, Modifiers::SHIFT | Modifiers::CTRL);
        assert_eq!(down.text.as_deref(), Some("A"));
        assert!(t.is_key_down(38));
        assert_eq!(t.modifiers(), Modifiers::SHIFT | Modifiers::CTRL);

        let release = RawEvent::KeyRelease(KeyEvent {
            window: WIN,
            keycode: 38,
            key: Key::Character('a'),
            text: None,
            x: 0,
            y: 0,
            state: 0,
        });
        assert_eq!(event(t.translate(release, 5)).kind, EventKind::KeyUp);
        assert!(!t.is_key_down(38));
        assert_eq!(t.modifiers(), Modifiers::empty());
    }

    #[test]
    fn custom_modifier_map() {
        let config = TranslatorConfig {
            modifier_map: ModifierMap {
                meta: mask::MOD1,
                alt: 0,
                ..ModifierMap::default()
            },
            ..TranslatorConfig::default()
        };
        let mut t = EventTranslator::new(config);
        let down = event(t.translate(key_press(64, Key::Alt, None, mask::MOD1), 0));
        assert_eq!(down.modifiers, Modifiers::META);
    }

    #[test]
    fn empty_text_is_no_text() {
        let mut t = EventTranslator::new(TranslatorConfig::default());
        let down = event(t.translate(key_press(9, Key::Escape, Some(""), 0), 0));
        assert_eq!(down.text, None);
    }

    #[test]
    fn expose_fragments_collapse_into_one_repaint() {
        let mut t = EventTranslator::new(TranslatorConfig::default());
        let mut repaints = 0;
        for count in (0..4).rev() {
            if let Translated::Event(e) = t.translate(RawEvent::Expose { window: WIN, count }, 0) {
                assert_eq!(e.kind, EventKind::WindowRepaint);
                repaints += 1;
            }
        }
        assert_eq!(repaints, 1);
    }

    #[test]
    fn configure_distinguishes_resize_from_move() {
        let mut t = EventTranslator::new(TranslatorConfig::default());
        let configure = |x, y, width, height| RawEvent::Configure {
            window: WIN,
            x,
            y,
            width,
            height,
        };
        let first = event(t.translate(configure(0, 0, 300, -20), 0));
        assert_eq!(first.kind, EventKind::WindowResize);
        assert_eq!(first.size, Some(Size::new(300.0, 0.0)));

        let moved = event(t.translate(configure(40, 50, 300, 0), 1));
        assert_eq!(moved.kind, EventKind::WindowMove);
        assert_eq!(moved.global_position, Point::new(40.0, 50.0));

        assert_eq!(t.translate(configure(40, 50, 300, 0), 2), Translated::Dropped);

        t.forget_window(WIN);
        assert_eq!(
            event(t.translate(configure(40, 50, 300, 0), 3)).kind,
            EventKind::WindowResize
        );
    }

    #[test]
    fn window_level_events() {
        let mut t = EventTranslator::new(TranslatorConfig::default());
        let crossing = CrossingEvent {
            window: WIN,
            x: 1,
            y: 2,
            state: 0,
        };
        assert_eq!(
            event(t.translate(RawEvent::PointerLeave(crossing.clone()), 0)).kind,
            EventKind::MouseLeave
        );
        assert_eq!(
            event(t.translate(RawEvent::PointerEnter(crossing), 0)).kind,
            EventKind::MouseEnter
        );
        assert_eq!(
            event(t.translate(RawEvent::CloseRequested { window: WIN }, 0)).kind,
            EventKind::WindowClose
        );
        assert_eq!(
            event(t.translate(RawEvent::FocusIn { window: WIN }, 0)).kind,
            EventKind::WindowFocus
        );
    }

    #[test]
    fn blur_releases_held_keys() {
        let mut t = EventTranslator::new(TranslatorConfig::default());
        t.translate(key_press(50, Key::Shift, None, 0), 0);
        assert!(t.is_key_down(50));
        t.translate(RawEvent::FocusOut { window: WIN }, 1);
        assert!(!t.is_key_down(50));
    }

    #[test]
    fn selection_traffic_is_passed_through() {
        let mut t = EventTranslator::new(TranslatorConfig::default());
        let clear = SelectionEvent::Clear(SelectionClear {
            selection: Selection::Clipboard,
            owner: WIN,
        });
        assert_eq!(
            t.translate(RawEvent::Selection(clear.clone()), 0),
            Translated::Selection(clear)
        );
    }

    #[test]
    fn unknown_input_is_classified_unknown() {
        let mut t = EventTranslator::new(TranslatorConfig::default());
        let unknown = event(t.translate(
            RawEvent::Unknown {
                window: Some(WIN),
                code: 99,
            },
            0,
        ));
        assert_eq!(unknown.kind, EventKind::Unknown);
        assert_eq!(unknown.native_window, Some(WIN));
    }
}
