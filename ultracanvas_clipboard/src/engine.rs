// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The selection-owner engine.

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use ultracanvas_native::{
    NativeHandle, Property, Selection, SelectionClear, SelectionEvent, SelectionNotify,
    SelectionRequest, SelectionTransport, Target,
};

use crate::config::ClipboardConfig;
use crate::entry::ClipboardEntry;
use crate::error::ClipboardError;
use crate::history::History;
use crate::uri;

/// Text targets tried, in order, when reading text from another client.
pub const TEXT_PREFERENCE: [Target; 4] = [
    Target::UTF8_STRING,
    Target::TEXT_PLAIN_UTF8,
    Target::STRING,
    Target::TEXT_PLAIN,
];

/// Image formats tried, in order, when reading an image from another client.
pub const IMAGE_PREFERENCE: [Target; 3] = [Target::IMAGE_PNG, Target::IMAGE_JPEG, Target::IMAGE_BMP];

const TEXT_TARGETS: [Target; 5] = [
    Target::UTF8_STRING,
    Target::STRING,
    Target::TEXT,
    Target::TEXT_PLAIN,
    Target::TEXT_PLAIN_UTF8,
];

/// Content we advertise while owning a selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text.
    Text(String),
    /// Encoded image bytes.
    Image {
        /// Encoded data.
        bytes: Vec<u8>,
        /// Format, one of the image targets.
        format: Target,
    },
    /// File paths, served as a URI list.
    Files(Vec<PathBuf>),
}

impl Payload {
    /// Targets this payload can be converted to, `TARGETS` first.
    pub fn targets(&self) -> Vec<Target> {
        let mut targets = vec![Target::TARGETS];
        match self {
            Self::Text(_) => targets.extend(TEXT_TARGETS),
            Self::Image { format, .. } => targets.push(format.clone()),
            Self::Files(_) => {
                targets.push(Target::URI_LIST);
                targets.extend(TEXT_TARGETS);
            }
        }
        targets
    }

    /// Convert to `target`, or `None` if this payload has no such representation.
    pub fn convert(&self, target: &Target) -> Option<Property> {
        let data = match self {
            Self::Text(text) if target.is_text() => text.clone().into_bytes(),
            Self::Image { bytes, format } if format == target => bytes.clone(),
            Self::Files(paths) if *target == Target::URI_LIST || target.is_text() => {
                uri::encode_uri_list(paths).into_bytes()
            }
            _ => return None,
        };
        Some(Property::Bytes {
            kind: target.clone(),
            data,
        })
    }

    fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Files(paths) => Some(uri::encode_uri_list(paths)),
            Self::Image { .. } => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct SelectionSlot {
    owned: bool,
    payload: Option<Payload>,
}

/// Callback run with every externally observed clipboard change.
pub type ChangeCallback = Box<dyn FnMut(&ClipboardEntry) + Send>;

/// Clipboard engine: owns selections on behalf of the application, reads them from other
/// clients and keeps a history of what it has seen.
///
/// The engine never holds the display connection. Every operation borrows a
/// [`SelectionTransport`] for its duration; [`ClipboardEngine::bind`] packages the two for
/// convenience.
///
/// Reads from another client are blocking: the engine sends a conversion request and waits
/// for the answer (at most [`ClipboardConfig::conversion_timeout`]), answering requests from
/// other clients in the meantime so two engines reading from each other cannot deadlock.
/// Failures are logged and reported as `None`/`false`/empty.
pub struct ClipboardEngine {
    config: ClipboardConfig,
    clipboard: SelectionSlot,
    primary: SelectionSlot,
    history: History,
    last_observed: Option<String>,
    last_poll: Option<Instant>,
    pending_change: bool,
    on_change: Option<ChangeCallback>,
}

impl fmt::Debug for ClipboardEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipboardEngine")
            .field("config", &self.config)
            .field("clipboard", &self.clipboard)
            .field("primary", &self.primary)
            .field("history", &self.history.len())
            .field("pending_change", &self.pending_change)
            .field("on_change", &self.on_change.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for ClipboardEngine {
    fn default() -> Self {
        Self::new(ClipboardConfig::default())
    }
}

impl ClipboardEngine {
    /// Create an engine that owns nothing and has an empty history.
    pub fn new(config: ClipboardConfig) -> Self {
        Self {
            history: History::new(config.history_capacity),
            config,
            clipboard: SelectionSlot::default(),
            primary: SelectionSlot::default(),
            last_observed: None,
            last_poll: None,
            pending_change: false,
            on_change: None,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ClipboardConfig {
        &self.config
    }

    /// Pair the engine with a transport.
    pub fn bind<'a>(&'a mut self, transport: &'a mut dyn SelectionTransport) -> Clipboard<'a> {
        Clipboard {
            engine: self,
            transport,
        }
    }

    /// Whether we believe we own `selection`.
    pub fn owns(&self, selection: Selection) -> bool {
        self.slot(selection).owned
    }

    // --- text ---

    /// Read text from `selection`.
    ///
    /// Served from cache while we own the selection; otherwise converted from the owner,
    /// trying [`TEXT_PREFERENCE`] in order. A refusal moves on to the next target; a timeout
    /// or transport error ends the read.
    pub fn get_text(
        &mut self,
        transport: &mut dyn SelectionTransport,
        selection: Selection,
    ) -> Option<String> {
        if self.verify_ownership(transport, selection) {
            return self.slot(selection).payload.as_ref().and_then(Payload::as_text);
        }
        for target in &TEXT_PREFERENCE {
            match self.convert(transport, selection, target) {
                Ok(Property::Bytes { data, .. }) => {
                    return Some(String::from_utf8_lossy(&data).into_owned());
                }
                Ok(Property::Targets(_)) | Err(ClipboardError::ConversionRefused { .. }) => {}
                Err(error) => {
                    log_failure("get_text", selection, &error);
                    return None;
                }
            }
        }
        tracing::debug!(op = "get_text", selection = selection.name(), "no text target accepted");
        None
    }

    /// Take ownership of `selection` and advertise `text`.
    pub fn set_text(
        &mut self,
        transport: &mut dyn SelectionTransport,
        selection: Selection,
        text: &str,
    ) -> bool {
        if !self.claim(transport, selection, Payload::Text(text.to_owned()), "set_text") {
            return false;
        }
        if selection == self.config.poll_selection {
            self.last_observed = Some(text.to_owned());
        }
        self.add_entry(ClipboardEntry::text(text));
        true
    }

    // --- images ---

    /// Read an image, trying [`IMAGE_PREFERENCE`] in order.
    pub fn get_image(
        &mut self,
        transport: &mut dyn SelectionTransport,
        selection: Selection,
    ) -> Option<(Vec<u8>, Target)> {
        if self.verify_ownership(transport, selection) {
            return match &self.slot(selection).payload {
                Some(Payload::Image { bytes, format }) => Some((bytes.clone(), format.clone())),
                _ => None,
            };
        }
        for format in &IMAGE_PREFERENCE {
            match self.convert(transport, selection, format) {
                Ok(Property::Bytes { data, .. }) => return Some((data, format.clone())),
                Ok(Property::Targets(_)) | Err(ClipboardError::ConversionRefused { .. }) => {}
                Err(error) => {
                    log_failure("get_image", selection, &error);
                    return None;
                }
            }
        }
        None
    }

    /// Take ownership of `selection` and advertise an image in `format`.
    pub fn set_image(
        &mut self,
        transport: &mut dyn SelectionTransport,
        selection: Selection,
        bytes: Vec<u8>,
        format: Target,
    ) -> bool {
        let entry = ClipboardEntry::binary(bytes.clone(), format.as_str());
        if !self.claim(transport, selection, Payload::Image { bytes, format }, "set_image") {
            return false;
        }
        self.add_entry(entry);
        true
    }

    // --- files ---

    /// Read a file list (`text/uri-list`). Non-`file://` URIs are skipped.
    pub fn get_files(
        &mut self,
        transport: &mut dyn SelectionTransport,
        selection: Selection,
    ) -> Option<Vec<PathBuf>> {
        if self.verify_ownership(transport, selection) {
            return match &self.slot(selection).payload {
                Some(Payload::Files(paths)) => Some(paths.clone()),
                _ => None,
            };
        }
        match self.convert(transport, selection, &Target::URI_LIST) {
            Ok(Property::Bytes { data, .. }) => {
                Some(uri::decode_uri_list(&String::from_utf8_lossy(&data)))
            }
            Ok(Property::Targets(_)) => None,
            Err(error) => {
                log_failure("get_files", selection, &error);
                None
            }
        }
    }

    /// Take ownership of `selection` and advertise `paths`.
    pub fn set_files(
        &mut self,
        transport: &mut dyn SelectionTransport,
        selection: Selection,
        paths: &[PathBuf],
    ) -> bool {
        if !self.claim(transport, selection, Payload::Files(paths.to_vec()), "set_files") {
            return false;
        }
        self.add_entry(ClipboardEntry::files(paths));
        true
    }

    // --- formats and change detection ---

    /// Targets the current owner of `selection` supports.
    pub fn available_formats(
        &mut self,
        transport: &mut dyn SelectionTransport,
        selection: Selection,
    ) -> Vec<Target> {
        if self.verify_ownership(transport, selection) {
            return self
                .slot(selection)
                .payload
                .as_ref()
                .map(Payload::targets)
                .unwrap_or_default();
        }
        match self.convert(transport, selection, &Target::TARGETS) {
            Ok(Property::Targets(targets)) => targets,
            Ok(Property::Bytes { .. }) => Vec::new(),
            Err(error) => {
                log_failure("available_formats", selection, &error);
                Vec::new()
            }
        }
    }

    /// Whether an external change was observed since the last call. Polls if one is due.
    pub fn has_changed(&mut self, transport: &mut dyn SelectionTransport) -> bool {
        self.update(transport);
        std::mem::take(&mut self.pending_change)
    }

    /// Per-turn housekeeping: poll for external changes when the poll interval has elapsed.
    pub fn update(&mut self, transport: &mut dyn SelectionTransport) {
        let now = Instant::now();
        let interval = self.config.effective_poll_interval();
        if self
            .last_poll
            .is_some_and(|last| now.duration_since(last) < interval)
        {
            return;
        }
        self.poll_now(transport);
    }

    /// Read the watched selection now and record it if it changed.
    ///
    /// Returns the new entry when a change was detected. Empty text is never a change.
    pub fn poll_now(&mut self, transport: &mut dyn SelectionTransport) -> Option<ClipboardEntry> {
        self.last_poll = Some(Instant::now());
        let text = self.get_text(transport, self.config.poll_selection)?;
        if text.is_empty() || self.last_observed.as_deref() == Some(text.as_str()) {
            return None;
        }
        tracing::debug!(
            selection = self.config.poll_selection.name(),
            bytes = text.len(),
            "external clipboard change"
        );
        let entry = ClipboardEntry::text(text.clone());
        self.last_observed = Some(text);
        self.add_entry(entry.clone());
        self.pending_change = true;
        if let Some(callback) = self.on_change.as_mut() {
            callback(&entry);
        }
        Some(entry)
    }

    // --- history ---

    /// Record an entry in the history, replacing any equal entry.
    pub fn add_entry(&mut self, entry: ClipboardEntry) {
        if let Some(evicted) = self.history.add(entry) {
            tracing::trace!(preview = %evicted.preview, "history entry evicted");
        }
    }

    /// Install the callback run on every external change, replacing the previous one.
    pub fn set_change_callback(&mut self, callback: impl FnMut(&ClipboardEntry) + Send + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    /// The history, newest first.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// History entry at `index` (0 is the newest).
    pub fn entry(&self, index: usize) -> Option<&ClipboardEntry> {
        self.history.get(index)
    }

    /// Remove the history entry at `index`.
    pub fn remove_entry(&mut self, index: usize) -> Option<ClipboardEntry> {
        self.history.remove(index)
    }

    /// Empty the history.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // --- protocol ---

    /// Handle selection traffic that arrived through the main event stream.
    pub fn handle_selection_event(
        &mut self,
        transport: &mut dyn SelectionTransport,
        event: SelectionEvent,
    ) {
        match event {
            SelectionEvent::Request(request) => self.serve_request(transport, &request),
            SelectionEvent::Clear(clear) => self.lose_ownership(&clear),
            SelectionEvent::Notify(notify) => {
                // Answers are consumed inside `convert`; one arriving here is late.
                tracing::trace!(
                    selection = notify.selection.name(),
                    conversion = %notify.target,
                    "late selection notify ignored"
                );
            }
        }
    }

    /// Release every selection we own.
    pub fn shutdown(&mut self, transport: &mut dyn SelectionTransport) {
        for selection in [Selection::Clipboard, Selection::Primary] {
            if self.slot(selection).owned
                && let Err(error) = transport.set_owner(selection, None)
            {
                log_failure("shutdown", selection, &ClipboardError::from(error));
            }
            *self.slot_mut(selection) = SelectionSlot::default();
        }
        if let Err(error) = transport.flush() {
            tracing::warn!(op = "shutdown", %error, "flush failed");
        }
    }

    fn slot(&self, selection: Selection) -> &SelectionSlot {
        match selection {
            Selection::Clipboard => &self.clipboard,
            Selection::Primary => &self.primary,
        }
    }

    fn slot_mut(&mut self, selection: Selection) -> &mut SelectionSlot {
        match selection {
            Selection::Clipboard => &mut self.clipboard,
            Selection::Primary => &mut self.primary,
        }
    }

    /// Check our belief of ownership against the display; a missed clear drops the cache.
    fn verify_ownership(
        &mut self,
        transport: &mut dyn SelectionTransport,
        selection: Selection,
    ) -> bool {
        if !self.slot(selection).owned {
            return false;
        }
        let helper = transport.helper_window();
        if transport.owner(selection) == Some(helper) {
            return true;
        }
        self.lose_ownership(&SelectionClear {
            selection,
            owner: helper,
        });
        false
    }

    fn claim(
        &mut self,
        transport: &mut dyn SelectionTransport,
        selection: Selection,
        payload: Payload,
        op: &'static str,
    ) -> bool {
        match try_claim(transport, selection) {
            Ok(()) => {
                tracing::debug!(op, selection = selection.name(), "selection claimed");
                *self.slot_mut(selection) = SelectionSlot {
                    owned: true,
                    payload: Some(payload),
                };
                true
            }
            Err(error) => {
                log_failure(op, selection, &error);
                false
            }
        }
    }

    fn lose_ownership(&mut self, clear: &SelectionClear) {
        tracing::debug!(selection = clear.selection.name(), "selection ownership lost");
        *self.slot_mut(clear.selection) = SelectionSlot::default();
        if !self.clipboard.owned && !self.primary.owned {
            self.clipboard.payload = None;
            self.primary.payload = None;
        }
    }

    fn serve_request(&self, transport: &mut dyn SelectionTransport, request: &SelectionRequest) {
        let slot = self.slot(request.selection);
        let reply = if !slot.owned {
            None
        } else if request.target == Target::TARGETS {
            Some(Property::Targets(slot.payload.as_ref().map_or_else(
                || {
                    vec![
                        Target::TARGETS,
                        Target::UTF8_STRING,
                        Target::STRING,
                        Target::TEXT_PLAIN,
                    ]
                },
                Payload::targets,
            )))
        } else {
            slot.payload.as_ref().and_then(|p| p.convert(&request.target))
        };

        let accepted = match (reply, request.property.as_deref()) {
            (Some(value), Some(property)) => {
                match transport.write_property(request.requestor, property, value) {
                    Ok(()) => true,
                    Err(error) => {
                        log_failure("serve_request", request.selection, &ClipboardError::from(error));
                        false
                    }
                }
            }
            _ => false,
        };
        tracing::trace!(
            selection = request.selection.name(),
            conversion = %request.target,
            requestor = request.requestor.0,
            accepted,
            "selection request answered"
        );
        let notify = SelectionNotify::reply_to(request, accepted);
        if let Err(error) = transport.send_notify(notify).and_then(|()| transport.flush()) {
            log_failure("serve_request", request.selection, &ClipboardError::from(error));
        }
    }

    /// Ask the owner of `selection` for `target` and wait for the answer.
    fn convert(
        &mut self,
        transport: &mut dyn SelectionTransport,
        selection: Selection,
        target: &Target,
    ) -> Result<Property, ClipboardError> {
        let helper = transport.helper_window();
        let property = self.config.property.clone();
        transport.delete_property(helper, &property)?;
        transport.convert(selection, target, &property, helper)?;
        transport.flush()?;

        let deadline = Instant::now() + self.config.conversion_timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match transport.next_selection_event(deadline - now)? {
                None => break,
                Some(SelectionEvent::Request(request)) => self.serve_request(transport, &request),
                Some(SelectionEvent::Clear(clear)) => self.lose_ownership(&clear),
                Some(SelectionEvent::Notify(notify))
                    if answers(&notify, helper, selection, target) =>
                {
                    return self.take_reply(transport, helper, notify, target);
                }
                Some(SelectionEvent::Notify(notify)) => {
                    tracing::trace!(conversion = %notify.target, "unrelated selection notify ignored");
                }
            }
        }
        Err(ClipboardError::ConversionTimeout {
            selection,
            target: target.clone(),
        })
    }

    fn take_reply(
        &self,
        transport: &mut dyn SelectionTransport,
        helper: NativeHandle,
        notify: SelectionNotify,
        target: &Target,
    ) -> Result<Property, ClipboardError> {
        let refused = || ClipboardError::ConversionRefused {
            selection: notify.selection,
            target: target.clone(),
        };
        let Some(property) = notify.property.as_deref() else {
            return Err(refused());
        };
        let value = transport.read_property(helper, property)?;
        transport.delete_property(helper, property)?;
        match value {
            Some(Property::Bytes { kind, mut data }) => {
                if data.len() > self.config.max_payload {
                    tracing::warn!(
                        selection = notify.selection.name(),
                        conversion = %target,
                        bytes = data.len(),
                        limit = self.config.max_payload,
                        "oversize clipboard payload truncated"
                    );
                    data.truncate(self.config.max_payload);
                }
                Ok(Property::Bytes { kind, data })
            }
            Some(targets @ Property::Targets(_)) => Ok(targets),
            None => Err(refused()),
        }
    }
}

fn try_claim(transport: &mut dyn SelectionTransport, selection: Selection) -> Result<(), ClipboardError> {
    let helper = transport.helper_window();
    transport.set_owner(selection, Some(helper))?;
    transport.flush()?;
    if transport.owner(selection) == Some(helper) {
        Ok(())
    } else {
        Err(ClipboardError::NotOwner(selection))
    }
}

fn answers(notify: &SelectionNotify, helper: NativeHandle, selection: Selection, target: &Target) -> bool {
    notify.requestor == helper && notify.selection == selection && notify.target == *target
}

fn log_failure(op: &'static str, selection: Selection, error: &ClipboardError) {
    tracing::warn!(op, selection = selection.name(), %error, "clipboard operation failed");
}

/// A [`ClipboardEngine`] bound to the transport it talks through.
///
/// Obtained from [`ClipboardEngine::bind`]; element handlers receive one from the dispatch
/// context.
pub struct Clipboard<'a> {
    engine: &'a mut ClipboardEngine,
    transport: &'a mut dyn SelectionTransport,
}

impl fmt::Debug for Clipboard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clipboard")
            .field("engine", &self.engine)
            .field("helper", &self.transport.helper_window())
            .finish()
    }
}

impl Clipboard<'_> {
    /// See [`ClipboardEngine::get_text`].
    pub fn get_text(&mut self, selection: Selection) -> Option<String> {
        self.engine.get_text(self.transport, selection)
    }

    /// See [`ClipboardEngine::set_text`].
    pub fn set_text(&mut self, selection: Selection, text: &str) -> bool {
        self.engine.set_text(self.transport, selection, text)
    }

    /// See [`ClipboardEngine::get_image`].
    pub fn get_image(&mut self, selection: Selection) -> Option<(Vec<u8>, Target)> {
        self.engine.get_image(self.transport, selection)
    }

    /// See [`ClipboardEngine::set_image`].
    pub fn set_image(&mut self, selection: Selection, bytes: Vec<u8>, format: Target) -> bool {
        self.engine.set_image(self.transport, selection, bytes, format)
    }

    /// See [`ClipboardEngine::get_files`].
    pub fn get_files(&mut self, selection: Selection) -> Option<Vec<PathBuf>> {
        self.engine.get_files(self.transport, selection)
    }

    /// See [`ClipboardEngine::set_files`].
    pub fn set_files(&mut self, selection: Selection, paths: &[PathBuf]) -> bool {
        self.engine.set_files(self.transport, selection, paths)
    }

    /// See [`ClipboardEngine::available_formats`].
    pub fn available_formats(&mut self, selection: Selection) -> Vec<Target> {
        self.engine.available_formats(self.transport, selection)
    }

    /// See [`ClipboardEngine::has_changed`].
    pub fn has_changed(&mut self) -> bool {
        self.engine.has_changed(self.transport)
    }

    /// The engine's history.
    pub fn history(&self) -> &History {
        self.engine.history()
    }
}

#[cfg(test)]
mod tests;
