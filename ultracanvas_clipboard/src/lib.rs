// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! UltraCanvas Clipboard: a selection-owner clipboard engine.
//!
//! ## Model
//!
//! Two selections, CLIPBOARD and PRIMARY, are owned independently. Writing (`set_text`,
//! `set_image`, `set_files`) claims a selection, caches the payload and records it in the
//! history; reads of a selection we own are answered from that cache without touching the
//! display. Reads of a selection owned by another client send a conversion request and wait
//! for the answer, bounded by [`ClipboardConfig::conversion_timeout`].
//!
//! While we own a selection, other clients' requests reach us through the event stream and
//! must be passed to [`ClipboardEngine::handle_selection_event`] as they arrive. `TARGETS`
//! is answered with the list of supported targets, supported targets with the cached bytes,
//! anything else with a refusal. Losing ownership clears the cache but never the history.
//!
//! ## History and change detection
//!
//! Every write and every externally observed change becomes a [`ClipboardEntry`] in a
//! bounded [`History`] (newest first, no two equal entries). [`ClipboardEngine::update`]
//! polls the watched selection at most every [`ClipboardConfig::poll_interval`] and reports
//! new external text through the change callback and [`ClipboardEngine::has_changed`].
//!
//! ## Example
//!
//! ```rust
//! use ultracanvas_clipboard::ClipboardEngine;
//! use ultracanvas_native::Selection;
//! use ultracanvas_native::headless::HeadlessServer;
//!
//! let server = HeadlessServer::new();
//! let mut display = server.connect();
//! let mut engine = ClipboardEngine::default();
//!
//! let mut clipboard = engine.bind(&mut display);
//! assert!(clipboard.set_text(Selection::Clipboard, "hello"));
//! assert_eq!(clipboard.get_text(Selection::Clipboard).as_deref(), Some("hello"));
//! assert_eq!(clipboard.history().len(), 1);
//! ```

mod config;
mod engine;
mod entry;
mod error;
mod history;
mod uri;

pub use config::ClipboardConfig;
pub use engine::{
    ChangeCallback, Clipboard, ClipboardEngine, IMAGE_PREFERENCE, Payload, TEXT_PREFERENCE,
};
pub use entry::{ClipboardEntry, EntryKind, PREVIEW_CHARS};
pub use error::ClipboardError;
pub use history::History;
