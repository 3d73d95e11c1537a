// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The event queue and the handles other threads use to reach the main loop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ultracanvas_event::UIEvent;
use ultracanvas_native::Waker;

#[derive(Debug)]
struct Shared {
    events: Mutex<VecDeque<UIEvent>>,
    capacity: usize,
    waker: Option<Waker>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, VecDeque<UIEvent>> {
        // A producer that panicked mid-push leaves the deque intact.
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, event: UIEvent) -> bool {
        let mut events = self.lock();
        if events.len() >= self.capacity {
            tracing::warn!(
                kind = ?event.kind,
                capacity = self.capacity,
                "event queue full, event dropped"
            );
            return false;
        }
        events.push_back(event);
        true
    }
}

/// Bounded FIFO of events waiting for dispatch.
///
/// When full, the incoming event is dropped and logged; queued events are never displaced.
#[derive(Debug)]
pub(crate) struct EventQueue {
    shared: Arc<Shared>,
}

impl EventQueue {
    /// A queue holding at most `capacity` events. Senders on other threads use `waker` to
    /// interrupt a loop idling in the event source.
    pub(crate) fn new(capacity: usize, waker: Option<Waker>) -> Self {
        Self {
            shared: Arc::new(Shared {
                events: Mutex::new(VecDeque::new()),
                capacity: capacity.max(1),
                waker,
            }),
        }
    }

    pub(crate) fn push(&self, event: UIEvent) -> bool {
        self.shared.push(event)
    }

    pub(crate) fn pop(&self) -> Option<UIEvent> {
        self.shared.lock().pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.shared.lock().is_empty()
    }

    pub(crate) fn clear(&self) -> usize {
        let mut events = self.shared.lock();
        let dropped = events.len();
        events.clear();
        dropped
    }

    pub(crate) fn sender(&self) -> EventSender {
        EventSender {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Cloneable handle for enqueueing events from any thread.
#[derive(Clone, Debug)]
pub struct EventSender {
    shared: Arc<Shared>,
}

impl EventSender {
    /// Enqueue an event and wake the loop. Returns `false` if the queue was full and the
    /// event was dropped.
    pub fn send(&self, event: UIEvent) -> bool {
        let queued = self.shared.push(event);
        if queued && let Some(waker) = &self.shared.waker {
            waker.wake();
        }
        queued
    }
}

/// Cloneable handle that asks the main loop to stop.
///
/// The loop notices the request at the top of its next turn and discards queued events.
#[derive(Clone, Debug, Default)]
pub struct ExitHandle {
    requested: Arc<AtomicBool>,
}

impl ExitHandle {
    /// Ask the loop to exit.
    pub fn request_exit(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Whether an exit was requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ultracanvas_event::EventKind;

    #[test]
    fn overflow_drops_the_incoming_event() {
        let queue = EventQueue::new(2, None);
        let sender = queue.sender();
        assert!(sender.send(UIEvent::new(EventKind::KeyDown)));
        assert!(queue.push(UIEvent::new(EventKind::KeyUp)));
        assert!(!sender.send(UIEvent::new(EventKind::MouseMove)));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().map(|e| e.kind), Some(EventKind::KeyDown));
        assert_eq!(queue.pop().map(|e| e.kind), Some(EventKind::KeyUp));
        assert!(queue.is_empty());
    }

    #[test]
    fn senders_work_across_threads() {
        let queue = EventQueue::new(16, None);
        let sender = queue.sender();
        let producer = std::thread::spawn(move || {
            for _ in 0..4 {
                sender.send(UIEvent::new(EventKind::Command));
            }
        });
        producer.join().unwrap();
        assert_eq!(queue.clear(), 4);
        assert!(queue.is_empty());
    }

    #[test]
    fn sending_wakes_the_loop() {
        let wakes = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        let waker = Waker::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let queue = EventQueue::new(1, Some(waker));
        let sender = queue.sender();
        assert!(sender.send(UIEvent::new(EventKind::Command)));
        assert!(!sender.send(UIEvent::new(EventKind::Command)));
        assert!(!queue.push(UIEvent::new(EventKind::Command)));
        assert_eq!(wakes.load(Ordering::SeqCst), 1, "only accepted events wake the loop");
    }

    #[test]
    fn exit_requests_are_shared_by_clones() {
        let exit = ExitHandle::default();
        let other = exit.clone();
        assert!(!exit.is_requested());
        other.request_exit();
        assert!(exit.is_requested());
    }
}
