//! Traffic log of the real-time channel, for inspecting what the dashboard
//! sends and receives.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use vigil_bridge::config::DebugConfig;
use vigil_bridge::diagnostics::{Direction, TrafficRecord};

use crate::connection::{Frame, TrafficTap, now_millis};

/// Records channel frames, newest first, when enabled.
#[derive(Debug)]
pub struct DebugObserver {
    enabled: AtomicBool,
    max_entries: usize,
    preview_length: usize,
    records: Mutex<VecDeque<TrafficRecord>>,
}

impl DebugObserver {
    pub fn new(config: &DebugConfig) -> Self {
        Self {
            enabled: AtomicBool::new(config.traffic_log),
            max_entries: config.max_entries,
            preview_length: config.preview_length,
            records: Mutex::new(VecDeque::new()),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        log::info!(
            "Traffic log {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Recorded frames, newest first.
    pub fn records(&self) -> Vec<TrafficRecord> {
        self.lock_records().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock_records().clear();
    }

    fn record(&self, direction: Direction, frame: &Frame) {
        if !self.is_enabled() {
            return;
        }
        log::trace!("[{direction}] {}", frame.event);
        let record = TrafficRecord {
            timestamp: now_millis(),
            direction,
            event: frame.event.clone(),
            preview: preview(&frame.data, self.preview_length),
        };

        let mut records = self.lock_records();
        records.push_front(record);
        records.truncate(self.max_entries);
    }

    fn lock_records(&self) -> MutexGuard<'_, VecDeque<TrafficRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TrafficTap for DebugObserver {
    fn outbound(&self, frame: &Frame) {
        self.record(Direction::Out, frame);
    }

    fn inbound(&self, frame: &Frame) {
        self.record(Direction::In, frame);
    }
}

/// Serialized payload cut to `max_chars` characters; `None` for null.
fn preview(data: &Value, max_chars: usize) -> Option<String> {
    if data.is_null() {
        return None;
    }
    let text = data.to_string();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => Some(text[..cut].to_string()),
        None => Some(text),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn observer(max_entries: usize) -> DebugObserver {
        DebugObserver::new(&DebugConfig {
            traffic_log: true,
            max_entries,
            preview_length: 100,
        })
    }

    #[test]
    fn disabled_observer_records_nothing() {
        let observer = DebugObserver::new(&DebugConfig::default());
        observer.inbound(&Frame::new("system_status", json!({"status": "ok"})));
        assert!(observer.records().is_empty());

        observer.set_enabled(true);
        observer.inbound(&Frame::new("system_status", json!({"status": "ok"})));
        assert_eq!(observer.records().len(), 1);
    }

    #[test]
    fn keeps_the_newest_entries_first() {
        let observer = observer(3);
        for index in 0..5 {
            observer.outbound(&Frame::new(format!("event_{index}"), json!(index)));
        }
        let events: Vec<_> = observer
            .records()
            .into_iter()
            .map(|record| record.event)
            .collect();
        assert_eq!(events, vec!["event_4", "event_3", "event_2"]);
    }

    #[test]
    fn records_direction_and_preview() {
        let observer = observer(10);
        observer.inbound(&Frame::new("pong", Value::Null));
        observer.outbound(&Frame::new("ping", json!({"timestamp": 5})));

        let records = observer.records();
        assert_eq!(records[0].direction, Direction::Out);
        assert_eq!(records[0].preview.as_deref(), Some(r#"{"timestamp":5}"#));
        assert_eq!(records[1].direction, Direction::In);
        assert_eq!(records[1].preview, None);
    }

    #[test]
    fn long_payloads_are_truncated_on_character_boundaries() {
        let text = "é".repeat(150);
        let cut = preview(&json!(text), 100).unwrap();
        assert_eq!(cut.chars().count(), 100);
        assert!(cut.starts_with("\"é"));
        assert_eq!(preview(&json!("short"), 100).as_deref(), Some("\"short\""));
    }
}
