//! In-memory audit queue.
//!
//! Appends never touch the filesystem; they take the buffer's own lock,
//! push, and return. The flusher swaps the whole vector out in one step.

use parking_lot::Mutex;

use super::entry::{LogEntry, LogLevel};

/// Ordered, thread-safe queue of pending audit entries.
#[derive(Default)]
pub struct LogBuffer {
    entries: Mutex<Vec<LogEntry>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp and enqueue one entry.
    pub fn append(&self, level: LogLevel, identifier: &str, message: impl Into<String>) {
        self.push(LogEntry::new(level, identifier, message));
    }

    pub fn info(&self, identifier: &str, message: impl Into<String>) {
        self.append(LogLevel::Info, identifier, message);
    }

    pub fn error(&self, identifier: &str, message: impl Into<String>) {
        self.append(LogLevel::Error, identifier, message);
    }

    pub fn push(&self, entry: LogEntry) {
        self.entries.lock().push(entry);
    }

    /// Take everything buffered so far, leaving an empty queue.
    pub fn drain(&self) -> Vec<LogEntry> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Put entries that could not be written back ahead of anything
    /// appended since they were drained.
    pub(crate) fn requeue_front(&self, mut entries: Vec<LogEntry>) {
        if entries.is_empty() {
            return;
        }
        let mut queue = self.entries.lock();
        entries.append(&mut queue);
        *queue = entries;
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
