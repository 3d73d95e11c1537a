// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ultracanvas_native::headless::{HeadlessDisplay, HeadlessServer};
use ultracanvas_native::NativeError;

use super::*;

fn quick() -> ClipboardConfig {
    ClipboardConfig {
        conversion_timeout: Duration::from_millis(300),
        ..ClipboardConfig::default()
    }
}

/// Another process: an engine on its own connection and thread, answering requests until
/// finished.
struct Peer {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<ClipboardEngine>,
}

impl Peer {
    fn spawn(
        server: &HeadlessServer,
        setup: impl FnOnce(&mut ClipboardEngine, &mut HeadlessDisplay) + Send + 'static,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel();
        let mut display = server.connect();
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            let mut engine = ClipboardEngine::new(quick());
            setup(&mut engine, &mut display);
            ready_tx.send(()).unwrap();
            while !flag.load(Ordering::Relaxed) {
                if let Some(event) = display
                    .next_selection_event(Duration::from_millis(5))
                    .unwrap()
                {
                    engine.handle_selection_event(&mut display, event);
                }
            }
            engine
        });
        ready_rx.recv().unwrap();
        Self { stop, handle }
    }

    fn finish(self) -> ClipboardEngine {
        self.stop.store(true, Ordering::Relaxed);
        self.handle.join().unwrap()
    }
}

/// Counts conversions issued through a display.
struct Counting {
    inner: HeadlessDisplay,
    converts: usize,
}

impl SelectionTransport for Counting {
    fn helper_window(&self) -> NativeHandle {
        self.inner.helper_window()
    }

    fn set_owner(&mut self, s: Selection, owner: Option<NativeHandle>) -> Result<(), NativeError> {
        self.inner.set_owner(s, owner)
    }

    fn owner(&self, s: Selection) -> Option<NativeHandle> {
        self.inner.owner(s)
    }

    fn convert(
        &mut self,
        s: Selection,
        target: &Target,
        property: &str,
        requestor: NativeHandle,
    ) -> Result<(), NativeError> {
        self.converts += 1;
        self.inner.convert(s, target, property, requestor)
    }

    fn read_property(&mut self, w: NativeHandle, p: &str) -> Result<Option<Property>, NativeError> {
        self.inner.read_property(w, p)
    }

    fn write_property(&mut self, w: NativeHandle, p: &str, v: Property) -> Result<(), NativeError> {
        self.inner.write_property(w, p, v)
    }

    fn delete_property(&mut self, w: NativeHandle, p: &str) -> Result<(), NativeError> {
        self.inner.delete_property(w, p)
    }

    fn send_notify(&mut self, notify: SelectionNotify) -> Result<(), NativeError> {
        self.inner.send_notify(notify)
    }

    fn next_selection_event(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<SelectionEvent>, NativeError> {
        self.inner.next_selection_event(timeout)
    }

    fn flush(&mut self) -> Result<(), NativeError> {
        SelectionTransport::flush(&mut self.inner)
    }
}

#[test]
fn own_text_is_served_from_cache() {
    let server = HeadlessServer::new();
    let mut display = Counting {
        inner: server.connect(),
        converts: 0,
    };
    let mut engine = ClipboardEngine::new(quick());

    assert!(engine.set_text(&mut display, Selection::Clipboard, "hello"));
    assert_eq!(
        engine.get_text(&mut display, Selection::Clipboard).as_deref(),
        Some("hello")
    );
    assert_eq!(display.converts, 0);
    assert_eq!(server.selection_owner(Selection::Clipboard), Some(display.helper_window()));
}

#[test]
fn copy_across_two_processes() {
    let server = HeadlessServer::new();
    let p1 = Peer::spawn(&server, |engine, display| {
        assert!(engine.set_text(display, Selection::Clipboard, "abc"));
    });

    let mut display = server.connect();
    let mut p2 = ClipboardEngine::new(quick());
    let started = Instant::now();
    assert_eq!(
        p2.get_text(&mut display, Selection::Clipboard).as_deref(),
        Some("abc")
    );
    assert!(started.elapsed() < quick().conversion_timeout);

    let mut p1 = p1.finish();
    assert_eq!(p1.history().len(), 1);
    assert_eq!(p1.entry(0).map(|e| e.text.as_str()), Some("abc"));

    // Copying the same text again does not grow the history.
    let mut again = server.connect();
    assert!(p1.set_text(&mut again, Selection::Clipboard, "abc"));
    assert_eq!(p1.history().len(), 1);
}

#[test]
fn mutual_reads_do_not_deadlock() {
    let server = HeadlessServer::new();
    let mut left_display = server.connect();
    let mut right_display = server.connect();
    let mut left = ClipboardEngine::new(quick());
    let mut right = ClipboardEngine::new(quick());
    assert!(left.set_text(&mut left_display, Selection::Clipboard, "from left"));
    assert!(right.set_text(&mut right_display, Selection::Primary, "from right"));

    // Both read from each other at the same time; each answers while it waits.
    let (done_tx, done_rx) = mpsc::channel();
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let reader = thread::spawn(move || {
        done_tx
            .send(left.get_text(&mut left_display, Selection::Primary))
            .unwrap();
        while !flag.load(Ordering::Relaxed) {
            if let Some(event) = left_display
                .next_selection_event(Duration::from_millis(5))
                .unwrap()
            {
                left.handle_selection_event(&mut left_display, event);
            }
        }
    });
    let got_right = right.get_text(&mut right_display, Selection::Clipboard);
    let deadline = Instant::now() + Duration::from_secs(2);
    let got_left = loop {
        if let Ok(got) = done_rx.try_recv() {
            break got;
        }
        assert!(Instant::now() < deadline, "left reader never finished");
        if let Some(event) = right_display
            .next_selection_event(Duration::from_millis(5))
            .unwrap()
        {
            right.handle_selection_event(&mut right_display, event);
        }
    };
    stop.store(true, Ordering::Relaxed);
    reader.join().unwrap();

    assert_eq!(got_right.as_deref(), Some("from left"));
    assert_eq!(got_left.as_deref(), Some("from right"));
}

#[test]
fn unresponsive_owner_fails_within_the_timeout() {
    let server = HeadlessServer::new();
    let mut silent_display = server.connect();
    let mut silent = ClipboardEngine::new(quick());
    assert!(silent.set_text(&mut silent_display, Selection::Clipboard, "never served"));

    let mut display = server.connect();
    let mut reader = ClipboardEngine::new(quick());
    let started = Instant::now();
    assert_eq!(reader.get_text(&mut display, Selection::Clipboard), None);
    let elapsed = started.elapsed();
    assert!(elapsed >= quick().conversion_timeout, "returned after {elapsed:?}");
    assert!(
        elapsed < quick().conversion_timeout + Duration::from_millis(50),
        "returned after {elapsed:?}"
    );
}

#[test]
fn lost_ownership_never_serves_stale_bytes() {
    let server = HeadlessServer::new();
    let mut mine = server.connect();
    let mut engine = ClipboardEngine::new(quick());
    assert!(engine.set_text(&mut mine, Selection::Clipboard, "stale"));

    let mut thief_display = server.connect();
    let mut thief = ClipboardEngine::new(quick());
    assert!(thief.set_text(&mut thief_display, Selection::Clipboard, "fresh"));
    drop(thief_display);

    // The clear notification is still queued; ownership is checked against the display.
    assert_eq!(engine.get_text(&mut mine, Selection::Clipboard), None);
    assert!(!engine.owns(Selection::Clipboard));
    assert_eq!(engine.history().len(), 1, "losing ownership keeps the history");
}

#[test]
fn clear_notification_drops_the_cache() {
    let server = HeadlessServer::new();
    let mut mine = server.connect();
    let mut engine = ClipboardEngine::new(quick());
    assert!(engine.set_text(&mut mine, Selection::Clipboard, "a"));
    assert!(engine.set_text(&mut mine, Selection::Primary, "b"));

    let mut other = server.connect();
    let helper = other.helper_window();
    other.set_owner(Selection::Primary, Some(helper)).unwrap();

    let clear = mine
        .next_selection_event(Duration::from_millis(50))
        .unwrap()
        .expect("clear notification");
    engine.handle_selection_event(&mut mine, clear);
    assert!(!engine.owns(Selection::Primary));
    assert!(engine.owns(Selection::Clipboard));
    assert_eq!(
        engine.get_text(&mut mine, Selection::Clipboard).as_deref(),
        Some("a")
    );
}

#[test]
fn owner_answers_targets_and_refuses_unknown_targets() {
    let server = HeadlessServer::new();
    let owner = Peer::spawn(&server, |engine, display| {
        assert!(engine.set_text(display, Selection::Clipboard, "text"));
    });

    let mut display = server.connect();
    let mut reader = ClipboardEngine::new(quick());
    let formats = reader.available_formats(&mut display, Selection::Clipboard);
    for required in [
        Target::TARGETS,
        Target::UTF8_STRING,
        Target::STRING,
        Target::TEXT_PLAIN,
    ] {
        assert!(formats.contains(&required), "{required} missing from {formats:?}");
    }
    assert_eq!(reader.get_image(&mut display, Selection::Clipboard), None);
    owner.finish();
}

#[test]
fn images_follow_the_format_preference() {
    let server = HeadlessServer::new();
    let owner = Peer::spawn(&server, |engine, display| {
        assert!(engine.set_image(display, Selection::Clipboard, vec![0xFF, 0xD8, 0xFF], Target::IMAGE_JPEG));
    });

    let mut display = server.connect();
    let mut reader = ClipboardEngine::new(quick());
    assert_eq!(
        reader.get_image(&mut display, Selection::Clipboard),
        Some((vec![0xFF, 0xD8, 0xFF], Target::IMAGE_JPEG))
    );
    let owner = owner.finish();
    assert_eq!(owner.entry(0).map(|e| e.kind), Some(crate::EntryKind::Image));
}

#[test]
fn file_lists_cross_processes() {
    let server = HeadlessServer::new();
    let paths = vec![PathBuf::from("/srv/a b.txt"), PathBuf::from("/srv/c")];
    let sent = paths.clone();
    let owner = Peer::spawn(&server, move |engine, display| {
        assert!(engine.set_files(display, Selection::Clipboard, &sent));
    });

    let mut display = server.connect();
    let mut reader = ClipboardEngine::new(quick());
    assert_eq!(reader.get_files(&mut display, Selection::Clipboard), Some(paths));
    owner.finish();
}

#[test]
fn oversize_payloads_are_truncated() {
    let server = HeadlessServer::new();
    let owner = Peer::spawn(&server, |engine, display| {
        assert!(engine.set_text(display, Selection::Clipboard, "abcdefgh"));
    });

    let mut display = server.connect();
    let mut reader = ClipboardEngine::new(ClipboardConfig {
        max_payload: 4,
        ..quick()
    });
    assert_eq!(
        reader.get_text(&mut display, Selection::Clipboard).as_deref(),
        Some("abcd")
    );
    owner.finish();
}

#[test]
fn external_changes_are_reported_once() {
    let server = HeadlessServer::new();
    let owner = Peer::spawn(&server, |engine, display| {
        assert!(engine.set_text(display, Selection::Clipboard, "external"));
    });

    let mut display = server.connect();
    let mut watcher = ClipboardEngine::new(quick());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let seen = Arc::clone(&seen);
        let calls = Arc::clone(&calls);
        watcher.set_change_callback(move |entry| {
            calls.fetch_add(1, Ordering::Relaxed);
            seen.lock().unwrap().push(entry.text.clone());
        });
    }

    let entry = watcher.poll_now(&mut display).expect("change detected");
    assert_eq!(entry.text, "external");
    assert!(watcher.has_changed(&mut display));
    assert!(!watcher.has_changed(&mut display));

    // Same content again: no new change.
    assert_eq!(watcher.poll_now(&mut display), None);
    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert_eq!(*seen.lock().unwrap(), ["external"]);
    assert_eq!(watcher.history().len(), 1);
    owner.finish();
}

#[test]
fn own_copies_are_not_external_changes() {
    let server = HeadlessServer::new();
    let mut display = server.connect();
    let mut engine = ClipboardEngine::new(quick());
    assert!(engine.set_text(&mut display, Selection::Clipboard, "mine"));
    assert_eq!(engine.poll_now(&mut display), None);
    assert!(!engine.has_changed(&mut display));
}

#[test]
fn shutdown_releases_owned_selections() {
    let server = HeadlessServer::new();
    let mut display = server.connect();
    let mut engine = ClipboardEngine::new(quick());
    assert!(engine.bind(&mut display).set_text(Selection::Primary, "p"));
    assert_eq!(server.selection_owner(Selection::Primary), Some(display.helper_window()));

    engine.shutdown(&mut display);
    assert_eq!(server.selection_owner(Selection::Primary), None);
    assert!(!engine.owns(Selection::Primary));
}
