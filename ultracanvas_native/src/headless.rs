// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-process display server.
//!
//! A [`HeadlessServer`] keeps the state an X server would keep for the features the toolkit
//! uses: windows and their properties, selection owners, and one event queue per client.
//! Every [`HeadlessDisplay`] is one client connection and implements both
//! [`NativeEventSource`] and [`SelectionTransport`].
//!
//! Selection semantics follow the core protocol:
//! - claiming a selection sends a [`SelectionClear`] to the previous owner's client;
//! - converting an owned selection forwards a [`SelectionRequest`] to the owner's client;
//!   converting an unowned one answers at once with a refusal;
//! - notifications are routed to the client owning the requestor window;
//! - closing a connection destroys its windows and releases their selections.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::backend::{
    CursorShape, NativeError, NativeEventSource, SelectionTransport, WindowDescriptor, Waker,
};
use crate::raw::{NativeHandle, RawEvent};
use crate::selection::{
    Property, Selection, SelectionClear, SelectionEvent, SelectionNotify, SelectionRequest, Target,
};

#[derive(Debug, Default)]
struct ServerState {
    next_id: u64,
    time: u64,
    clients: HashMap<u64, Client>,
    windows: HashMap<NativeHandle, WindowRecord>,
    owners: HashMap<Selection, NativeHandle>,
}

#[derive(Debug, Default)]
struct Client {
    queue: VecDeque<RawEvent>,
    bells: usize,
    woken: bool,
}

#[derive(Debug)]
struct WindowRecord {
    client: u64,
    title: String,
    visible: bool,
    cursor: CursorShape,
    properties: HashMap<String, Property>,
}

impl ServerState {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn tick(&mut self) -> u64 {
        self.time += 1;
        self.time
    }

    fn client_of(&self, window: NativeHandle) -> Option<u64> {
        self.windows.get(&window).map(|w| w.client)
    }

    fn push(&mut self, client: u64, event: RawEvent) -> bool {
        match self.clients.get_mut(&client) {
            Some(c) => {
                c.queue.push_back(event);
                true
            }
            None => false,
        }
    }

    fn push_to_window(&mut self, window: NativeHandle, event: RawEvent) -> bool {
        match self.client_of(window) {
            Some(client) => self.push(client, event),
            None => false,
        }
    }

    fn release_window(&mut self, window: NativeHandle) {
        self.windows.remove(&window);
        self.owners.retain(|_, owner| *owner != window);
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<ServerState>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process display server shared by any number of [`HeadlessDisplay`] connections.
#[derive(Clone, Debug, Default)]
pub struct HeadlessServer {
    shared: Arc<Shared>,
}

impl HeadlessServer {
    /// Start an empty server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new client connection with its own helper window.
    pub fn connect(&self) -> HeadlessDisplay {
        let mut state = self.shared.lock();
        let client = state.allocate();
        state.clients.insert(client, Client::default());
        let helper = NativeHandle(state.allocate());
        state.windows.insert(
            helper,
            WindowRecord {
                client,
                title: String::from("selection helper"),
                visible: false,
                cursor: CursorShape::Default,
                properties: HashMap::new(),
            },
        );
        tracing::trace!(client, helper = helper.0, "headless client connected");
        HeadlessDisplay {
            shared: Arc::clone(&self.shared),
            client,
            helper,
            closed: false,
        }
    }

    /// Deliver an input event to the client owning the event's window.
    ///
    /// Returns `false` when the window is unknown (the event is discarded).
    pub fn post(&self, event: RawEvent) -> bool {
        let Some(window) = event.window() else {
            return false;
        };
        let delivered = self.shared.lock().push_to_window(window, event);
        self.shared.wake.notify_all();
        delivered
    }

    /// Whether a window exists.
    pub fn window_exists(&self, window: NativeHandle) -> bool {
        self.shared.lock().windows.contains_key(&window)
    }

    /// Whether a window is mapped.
    pub fn is_visible(&self, window: NativeHandle) -> bool {
        self.shared
            .lock()
            .windows
            .get(&window)
            .is_some_and(|w| w.visible)
    }

    /// Title a window was created with.
    pub fn title(&self, window: NativeHandle) -> Option<String> {
        self.shared.lock().windows.get(&window).map(|w| w.title.clone())
    }

    /// Cursor currently shown over a window.
    pub fn cursor(&self, window: NativeHandle) -> Option<CursorShape> {
        self.shared.lock().windows.get(&window).map(|w| w.cursor)
    }

    /// Current owner of a selection.
    pub fn selection_owner(&self, selection: Selection) -> Option<NativeHandle> {
        self.shared.lock().owners.get(&selection).copied()
    }

    /// Bells rung by all connected clients.
    pub fn bells(&self) -> usize {
        self.shared.lock().clients.values().map(|c| c.bells).sum()
    }
}

/// One client connection to a [`HeadlessServer`].
#[derive(Debug)]
pub struct HeadlessDisplay {
    shared: Arc<Shared>,
    client: u64,
    helper: NativeHandle,
    closed: bool,
}

impl HeadlessDisplay {
    /// Number of times this client rang the bell.
    pub fn bells(&self) -> usize {
        self.shared
            .lock()
            .clients
            .get(&self.client)
            .map_or(0, |c| c.bells)
    }

    /// Queue an event directly on this connection, whatever window it names.
    pub fn inject(&self, event: RawEvent) {
        self.shared.lock().push(self.client, event);
        self.shared.wake.notify_all();
    }

    fn check_open(&self) -> Result<(), NativeError> {
        if self.closed {
            Err(NativeError::Disconnected)
        } else {
            Ok(())
        }
    }

    fn with_own_window<R>(
        &self,
        window: NativeHandle,
        f: impl FnOnce(&mut WindowRecord) -> R,
    ) -> Result<R, NativeError> {
        self.check_open()?;
        let mut state = self.shared.lock();
        match state.windows.get_mut(&window) {
            Some(record) if record.client == self.client => Ok(f(record)),
            _ => Err(NativeError::UnknownWindow(window)),
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut state = self.shared.lock();
        state.clients.remove(&self.client);
        let owned: Vec<NativeHandle> = state
            .windows
            .iter()
            .filter(|(_, w)| w.client == self.client)
            .map(|(&h, _)| h)
            .collect();
        for window in owned {
            state.release_window(window);
        }
        drop(state);
        self.shared.wake.notify_all();
        tracing::trace!(client = self.client, "headless client disconnected");
    }
}

impl Drop for HeadlessDisplay {
    fn drop(&mut self) {
        self.close();
    }
}

impl NativeEventSource for HeadlessDisplay {
    fn pending(&mut self) -> Result<usize, NativeError> {
        self.check_open()?;
        Ok(self
            .shared
            .lock()
            .clients
            .get(&self.client)
            .map_or(0, |c| c.queue.len()))
    }

    fn next_event(&mut self) -> Result<RawEvent, NativeError> {
        self.check_open()?;
        let mut state = self.shared.lock();
        loop {
            let client = state
                .clients
                .get_mut(&self.client)
                .ok_or(NativeError::Disconnected)?;
            if let Some(event) = client.queue.pop_front() {
                return Ok(event);
            }
            state = self
                .shared
                .wake
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn wait(&mut self, timeout: Duration) -> Result<bool, NativeError> {
        self.check_open()?;
        let client = self.client;
        let state = self.shared.lock();
        let (state, _) = self
            .shared
            .wake
            .wait_timeout_while(state, timeout, |s| {
                s.clients
                    .get(&client)
                    .is_some_and(|c| c.queue.is_empty() && !c.woken)
            })
            .unwrap_or_else(PoisonError::into_inner);
        let mut state = state;
        Ok(state.clients.get_mut(&client).is_some_and(|c| {
            c.woken = false;
            !c.queue.is_empty()
        }))
    }

    fn waker(&self) -> Option<Waker> {
        let shared = Arc::clone(&self.shared);
        let client = self.client;
        Some(Waker::new(move || {
            if let Some(c) = shared.lock().clients.get_mut(&client) {
                c.woken = true;
            }
            shared.wake.notify_all();
        }))
    }

    fn flush(&mut self) -> Result<(), NativeError> {
        self.check_open()
    }

    fn create_window(&mut self, descriptor: &WindowDescriptor) -> Result<NativeHandle, NativeError> {
        self.check_open()?;
        let mut state = self.shared.lock();
        let handle = NativeHandle(state.allocate());
        state.windows.insert(
            handle,
            WindowRecord {
                client: self.client,
                title: descriptor.title.clone(),
                visible: false,
                cursor: CursorShape::Default,
                properties: HashMap::new(),
            },
        );
        Ok(handle)
    }

    fn show_window(&mut self, window: NativeHandle) -> Result<(), NativeError> {
        self.with_own_window(window, |w| w.visible = true)?;
        // Mapping a window exposes it.
        self.inject(RawEvent::Expose { window, count: 0 });
        Ok(())
    }

    fn destroy_window(&mut self, window: NativeHandle) -> Result<(), NativeError> {
        self.with_own_window(window, |_| ())?;
        self.shared.lock().release_window(window);
        Ok(())
    }

    fn set_cursor(&mut self, window: NativeHandle, cursor: CursorShape) -> Result<(), NativeError> {
        self.with_own_window(window, |w| w.cursor = cursor)
    }

    fn bell(&mut self) {
        if let Some(client) = self.shared.lock().clients.get_mut(&self.client) {
            client.bells += 1;
        }
    }

    fn selection(&mut self) -> &mut dyn SelectionTransport {
        self
    }

    fn shutdown(&mut self) {
        self.close();
    }
}

impl SelectionTransport for HeadlessDisplay {
    fn helper_window(&self) -> NativeHandle {
        self.helper
    }

    fn set_owner(
        &mut self,
        selection: Selection,
        owner: Option<NativeHandle>,
    ) -> Result<(), NativeError> {
        self.check_open()?;
        let mut state = self.shared.lock();
        match owner {
            Some(window) => {
                if state.client_of(window) != Some(self.client) {
                    return Err(NativeError::UnknownWindow(window));
                }
                let previous = state.owners.insert(selection, window);
                if let Some(previous) = previous
                    && previous != window
                {
                    state.push_to_window(
                        previous,
                        RawEvent::Selection(SelectionEvent::Clear(SelectionClear {
                            selection,
                            owner: previous,
                        })),
                    );
                }
            }
            None => {
                let mine = state
                    .owners
                    .get(&selection)
                    .is_some_and(|&w| state.client_of(w) == Some(self.client));
                if mine {
                    state.owners.remove(&selection);
                }
            }
        }
        state.tick();
        drop(state);
        self.shared.wake.notify_all();
        Ok(())
    }

    fn owner(&self, selection: Selection) -> Option<NativeHandle> {
        self.shared.lock().owners.get(&selection).copied()
    }

    fn convert(
        &mut self,
        selection: Selection,
        target: &Target,
        property: &str,
        requestor: NativeHandle,
    ) -> Result<(), NativeError> {
        self.check_open()?;
        let mut state = self.shared.lock();
        let time = state.tick();
        match state.owners.get(&selection).copied() {
            Some(owner) => {
                let request = SelectionRequest {
                    requestor,
                    selection,
                    target: target.clone(),
                    property: Some(property.to_owned()),
                    time,
                };
                state.push_to_window(owner, RawEvent::Selection(SelectionEvent::Request(request)));
            }
            None => {
                let refusal = SelectionNotify {
                    requestor,
                    selection,
                    target: target.clone(),
                    property: None,
                    time,
                };
                state.push_to_window(requestor, RawEvent::Selection(SelectionEvent::Notify(refusal)));
            }
        }
        drop(state);
        self.shared.wake.notify_all();
        Ok(())
    }

    fn read_property(
        &mut self,
        window: NativeHandle,
        property: &str,
    ) -> Result<Option<Property>, NativeError> {
        self.check_open()?;
        let state = self.shared.lock();
        let record = state
            .windows
            .get(&window)
            .ok_or(NativeError::UnknownWindow(window))?;
        Ok(record.properties.get(property).cloned())
    }

    fn write_property(
        &mut self,
        window: NativeHandle,
        property: &str,
        value: Property,
    ) -> Result<(), NativeError> {
        self.check_open()?;
        let mut state = self.shared.lock();
        let record = state
            .windows
            .get_mut(&window)
            .ok_or(NativeError::UnknownWindow(window))?;
        record.properties.insert(property.to_owned(), value);
        Ok(())
    }

    fn delete_property(&mut self, window: NativeHandle, property: &str) -> Result<(), NativeError> {
        self.check_open()?;
        if let Some(record) = self.shared.lock().windows.get_mut(&window) {
            record.properties.remove(property);
        }
        Ok(())
    }

    fn send_notify(&mut self, notify: SelectionNotify) -> Result<(), NativeError> {
        self.check_open()?;
        let requestor = notify.requestor;
        let delivered = self
            .shared
            .lock()
            .push_to_window(requestor, RawEvent::Selection(SelectionEvent::Notify(notify)));
        if !delivered {
            tracing::trace!(requestor = requestor.0, "notify for a vanished requestor dropped");
        }
        self.shared.wake.notify_all();
        Ok(())
    }

    fn next_selection_event(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<SelectionEvent>, NativeError> {
        self.check_open()?;
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        loop {
            let client = state
                .clients
                .get_mut(&self.client)
                .ok_or(NativeError::Disconnected)?;
            if let Some(pos) = client.queue.iter().position(RawEvent::is_selection)
                && let Some(RawEvent::Selection(event)) = client.queue.remove(pos)
            {
                return Ok(Some(event));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let (next, _) = self
                .shared
                .wake
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = next;
        }
    }

    fn flush(&mut self) -> Result<(), NativeError> {
        self.check_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::MotionEvent;

    fn motion(window: NativeHandle) -> RawEvent {
        RawEvent::Motion(MotionEvent {
            window,
            x: 1,
            y: 2,
            root_x: 1,
            root_y: 2,
            state: 0,
        })
    }

    #[test]
    fn events_route_to_the_window_owner() {
        let server = HeadlessServer::new();
        let mut a = server.connect();
        let mut b = server.connect();
        let wa = a.create_window(&WindowDescriptor::default()).unwrap();

        assert!(server.post(motion(wa)));
        assert!(!server.post(motion(NativeHandle(9_999))));
        assert_eq!(a.pending().unwrap(), 1);
        assert_eq!(b.pending().unwrap(), 0);
        assert_eq!(a.next_event().unwrap(), motion(wa));
        assert!(!a.wait(Duration::from_millis(5)).unwrap());
    }

    #[test]
    fn a_waker_ends_an_idle_wait_early() {
        let server = HeadlessServer::new();
        let mut display = server.connect();
        let waker = display.waker().unwrap();
        let started = Instant::now();
        let poke = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            waker.wake();
        });
        assert!(!display.wait(Duration::from_secs(5)).unwrap(), "woken, not fed");
        assert!(started.elapsed() < Duration::from_secs(5));
        poke.join().unwrap();

        // The wake is consumed; the next wait times out normally.
        assert!(!display.wait(Duration::from_millis(10)).unwrap());
    }

    #[test]
    fn claiming_a_selection_clears_the_previous_owner() {
        let server = HeadlessServer::new();
        let mut a = server.connect();
        let mut b = server.connect();
        let ha = a.helper_window();
        let hb = b.helper_window();

        a.set_owner(Selection::Clipboard, Some(ha)).unwrap();
        b.set_owner(Selection::Clipboard, Some(hb)).unwrap();
        assert_eq!(server.selection_owner(Selection::Clipboard), Some(hb));

        let event = a.next_selection_event(Duration::from_millis(50)).unwrap();
        assert_eq!(
            event,
            Some(SelectionEvent::Clear(SelectionClear {
                selection: Selection::Clipboard,
                owner: ha
            }))
        );
    }

    #[test]
    fn converting_an_unowned_selection_is_refused_immediately() {
        let server = HeadlessServer::new();
        let mut a = server.connect();
        let ha = a.helper_window();
        a.convert(Selection::Primary, &Target::UTF8_STRING, "P", ha)
            .unwrap();
        match a.next_selection_event(Duration::ZERO).unwrap() {
            Some(SelectionEvent::Notify(n)) => assert_eq!(n.property, None),
            other => panic!("expected a refusal, got {other:?}"),
        }
    }

    #[test]
    fn selection_wait_leaves_other_events_queued() {
        let server = HeadlessServer::new();
        let mut a = server.connect();
        let mut b = server.connect();
        let wa = a.create_window(&WindowDescriptor::default()).unwrap();
        a.inject(motion(wa));

        let hb = b.helper_window();
        b.set_owner(Selection::Clipboard, Some(hb)).unwrap();
        let ha = a.helper_window();
        a.convert(Selection::Clipboard, &Target::TARGETS, "P", ha)
            .unwrap();

        // b sees the request; a's motion stays queued while a waits for selection traffic.
        let request = b.next_selection_event(Duration::from_millis(50)).unwrap();
        assert!(matches!(request, Some(SelectionEvent::Request(_))));
        assert_eq!(a.next_selection_event(Duration::from_millis(5)).unwrap(), None);
        assert_eq!(a.pending().unwrap(), 1);
    }

    #[test]
    fn dropping_a_connection_releases_its_windows_and_selections() {
        let server = HeadlessServer::new();
        let mut a = server.connect();
        let wa = a.create_window(&WindowDescriptor::default()).unwrap();
        let ha = a.helper_window();
        a.set_owner(Selection::Clipboard, Some(ha)).unwrap();
        a.set_cursor(wa, CursorShape::Text).unwrap();
        assert_eq!(server.cursor(wa), Some(CursorShape::Text));

        drop(a);
        assert!(!server.window_exists(wa));
        assert_eq!(server.selection_owner(Selection::Clipboard), None);
    }
}
