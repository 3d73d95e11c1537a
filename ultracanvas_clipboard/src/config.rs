// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Duration;

use ultracanvas_native::Selection;

/// Clipboard engine settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClipboardConfig {
    /// How long an outgoing conversion may take before the read fails.
    pub conversion_timeout: Duration,
    /// Largest payload accepted from another client; longer data is truncated.
    pub max_payload: usize,
    /// Number of history entries kept.
    pub history_capacity: usize,
    /// Delay between change polls. Values below [`ClipboardConfig::MIN_POLL_INTERVAL`] are
    /// raised to it.
    pub poll_interval: Duration,
    /// Property on the helper window that receives converted data.
    pub property: String,
    /// Selection watched for external changes.
    pub poll_selection: Selection,
}

impl ClipboardConfig {
    /// Shortest poll interval the engine honors.
    pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// The poll interval actually used.
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.max(Self::MIN_POLL_INTERVAL)
    }
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            conversion_timeout: Duration::from_millis(1000),
            max_payload: 10 * 1024 * 1024,
            history_capacity: 100,
            poll_interval: Self::MIN_POLL_INTERVAL,
            property: String::from("ULTRACANVAS_SELECTION"),
            poll_selection: Selection::Clipboard,
        }
    }
}
