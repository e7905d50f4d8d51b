use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::Serialize;
use vigil_bridge::notification::Severity;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub message: String,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub timestamp: DateTime<Local>,
}

/// Every notification ever shown, newest first, capped at `capacity`.
/// Eviction from the live set does not touch the history.
#[derive(Debug)]
pub struct NotificationHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl NotificationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, message: &str, severity: Severity, timestamp: DateTime<Local>) {
        self.entries.push_front(HistoryEntry {
            message: message.to_string(),
            severity,
            timestamp,
        });
        self.entries.truncate(self.capacity);
    }

    /// Drops the oldest entries beyond a lowered capacity.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.entries.truncate(capacity);
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
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

    /// Pretty-printed JSON array of the entries, newest first.
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }
}
