//! # Event Log Module
//!
//! Bounded, most-recent-first list of timestamped messages. Used for the
//! connection event list (10 entries) and the Bluetooth debug log.

use chrono::{DateTime, Local};
use std::collections::VecDeque;

pub const EVENT_LOG_CAPACITY: usize = 10;
pub const DEBUG_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub time: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    /// Wall-clock time as shown in the UI
    pub fn time_label(&self) -> String {
        self.time.format("%H:%M:%S").to_string()
    }
}

#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.push_at(Local::now(), message);
    }

    pub fn push_at(&mut self, time: DateTime<Local>, message: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }

        self.entries.push_front(LogEntry {
            time,
            message: message.into(),
        });
        self.entries.truncate(self.capacity);
    }

    /// Newest entry first
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Oldest entry first, for the debug console
    pub fn iter_chronological(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(EVENT_LOG_CAPACITY)
    }
}
