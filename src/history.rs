// Bounded linear undo/redo log

use std::collections::VecDeque;

/// Snapshot history. The current state is always `entries[index]`;
/// undo and redo only move the index.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
    index: usize,
    limit: usize,
}

impl<T: Clone> History<T> {
    /// Starts a history whose only entry is `initial`. `limit` is clamped to at least 1.
    pub fn new(initial: T, limit: usize) -> Self {
        let mut entries = VecDeque::with_capacity(limit.max(1));
        entries.push_back(initial);
        History {
            entries,
            index: 0,
            limit: limit.max(1),
        }
    }

    pub fn current(&self) -> &T {
        &self.entries[self.index]
    }

    /// Drops the redo branch, appends `snapshot` and makes it current.
    pub fn push(&mut self, snapshot: T) {
        self.entries.truncate(self.index + 1);
        self.entries.push_back(snapshot);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.index = self.entries.len() - 1;
    }

    /// Steps back one entry. Returns `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        Some(self.current())
    }

    /// Steps forward one entry. Returns `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        Some(self.current())
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Replaces the current entry in place without touching the rest of the log.
    ///
    /// Used for changes that must be visible in the current state but are not
    /// undoable on their own (selection).
    pub fn replace_current(&mut self, snapshot: T) {
        self.entries[self.index] = snapshot;
    }

    /// Forgets everything and starts over from `initial`.
    pub fn clear(&mut self, initial: T) {
        self.entries.clear();
        self.entries.push_back(initial);
        self.index = 0;
    }
}
