// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Duration;

use ultracanvas_clipboard::ClipboardConfig;
use ultracanvas_event::TranslatorConfig;

/// Coordinator settings.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchConfig {
    /// Events the queue holds before new ones are dropped.
    pub queue_capacity: usize,
    /// Events dispatched per loop turn before rendering gets a chance to run.
    pub max_events_per_turn: usize,
    /// Longest idle wait on the display connection when nothing is pending.
    pub idle_timeout: Duration,
    /// Stable hover time before an element's tooltip appears.
    pub tooltip_delay: Duration,
    /// Ring the bell when a press is swallowed by a modal element.
    pub modal_bell: bool,
    /// Move focus to the focus-accepting element under a press.
    pub click_to_focus: bool,
    /// Raw event translation.
    pub translator: TranslatorConfig,
    /// Clipboard engine.
    pub clipboard: ClipboardConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_events_per_turn: 100,
            idle_timeout: Duration::from_millis(16),
            tooltip_delay: Duration::from_millis(500),
            modal_bell: true,
            click_to_focus: true,
            translator: TranslatorConfig::default(),
            clipboard: ClipboardConfig::default(),
        }
    }
}
