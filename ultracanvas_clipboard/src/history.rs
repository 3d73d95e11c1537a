// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::VecDeque;

use crate::entry::ClipboardEntry;

/// Bounded clipboard history, newest first, without duplicates.
#[derive(Clone, Debug)]
pub struct History {
    entries: VecDeque<ClipboardEntry>,
    capacity: usize,
}

impl History {
    /// An empty history holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert `entry` as the newest, removing any equal entry first.
    ///
    /// Returns the entry evicted from the tail to stay within capacity, if any.
    pub fn add(&mut self, entry: ClipboardEntry) -> Option<ClipboardEntry> {
        if let Some(pos) = self.entries.iter().position(|e| *e == entry) {
            self.entries.remove(pos);
        }
        self.entries.push_front(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    /// Entry at `index` (0 is the newest).
    pub fn get(&self, index: usize) -> Option<&ClipboardEntry> {
        self.entries.get(index)
    }

    /// The newest entry.
    pub fn latest(&self) -> Option<&ClipboardEntry> {
        self.entries.front()
    }

    /// Remove and return the entry at `index`.
    pub fn remove(&mut self, index: usize) -> Option<ClipboardEntry> {
        self.entries.remove(index)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries from newest to oldest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &ClipboardEntry> + '_ {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_entries_are_not_duplicated() {
        let mut history = History::new(100);
        history.add(ClipboardEntry::text("abc"));
        history.add(ClipboardEntry::text("abc"));
        assert_eq!(history.len(), 1);

        history.add(ClipboardEntry::text("def"));
        history.add(ClipboardEntry::text("abc"));
        let texts: Vec<&str> = history.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["abc", "def"], "re-adding moves the entry to the front");
    }

    #[test]
    fn the_101st_entry_evicts_the_oldest() {
        let mut history = History::new(100);
        for i in 0..100 {
            assert_eq!(history.add(ClipboardEntry::text(format!("{i}"))), None);
        }
        let evicted = history.add(ClipboardEntry::text("100"));
        assert_eq!(evicted.map(|e| e.text), Some(String::from("0")));
        assert_eq!(history.len(), 100);
        assert_eq!(history.latest().map(|e| e.text.as_str()), Some("100"));
        assert_eq!(history.get(99).map(|e| e.text.as_str()), Some("1"));
    }

    #[test]
    fn remove_and_clear() {
        let mut history = History::new(0);
        assert_eq!(history.capacity(), 1);
        history.add(ClipboardEntry::text("a"));
        history.add(ClipboardEntry::text("b"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.remove(0).map(|e| e.text), Some(String::from("b")));
        assert!(history.is_empty());
        history.add(ClipboardEntry::text("c"));
        history.clear();
        assert!(history.is_empty());
    }
}
