//! Text rendering of notifications and dashboard state.

use std::fmt::Write;
use std::time::Instant;

use vigil_bridge::diagnostics::{ConnectionSnapshot, TrafficRecord};
use vigil_bridge::events::ViolationRecord;
use vigil_bridge::notification::Severity;

use crate::dashboard::{Dashboard, HIGH_LATENCY_MS};
use crate::formatting::{format_bytes, format_clock, format_latency, format_uptime};
use crate::notifications::{DismissReason, Dismissal, HistoryEntry, Notification};

fn icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Success => "[ok]",
        Severity::Error => "[error]",
        Severity::Warning => "[warn]",
        Severity::Info => "[info]",
    }
}

pub fn notification(notification: &Notification) -> String {
    let mut line = format!(
        "{} {} {} ({})",
        format_clock(&notification.shown_at),
        icon(notification.severity),
        notification.message,
        notification.id
    );
    if let Some(action) = &notification.action {
        let _ = write!(line, " [act: {}]", action.label);
    }
    line
}

pub fn dismissal(dismissal: &Dismissal) -> String {
    let reason = match dismissal.reason {
        DismissReason::Closed => "closed",
        DismissReason::Expired => "expired",
        DismissReason::Evicted => "evicted",
    };
    format!("  - {} ({reason})", dismissal.notification.message)
}

pub fn history_entry(entry: &HistoryEntry) -> String {
    format!(
        "{} {} {}",
        format_clock(&entry.timestamp),
        icon(entry.severity),
        entry.message
    )
}

pub fn dashboard(dashboard: &Dashboard, now: Instant) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "connection: {}",
        if dashboard.online { "online" } else { "offline" }
    );
    if let Some(latency) = dashboard.latency {
        let slow = if latency > HIGH_LATENCY_MS { " (slow)" } else { "" };
        let _ = writeln!(out, "latency:    {}{slow}", format_latency(latency));
    }
    let _ = writeln!(
        out,
        "system:     {}",
        dashboard.system_status.as_deref().unwrap_or("unknown")
    );
    let _ = writeln!(
        out,
        "monitoring: {} (uptime {})",
        if dashboard.monitoring { "active" } else { "stopped" },
        format_uptime(dashboard.uptime(now))
    );
    let _ = writeln!(
        out,
        "recording:  {}",
        if dashboard.recording { "yes" } else { "no" }
    );
    let _ = writeln!(out, "people:     {}", dashboard.people_count);
    if let Some(status) = &dashboard.access_status {
        let _ = writeln!(out, "access:     {status}");
    }
    match dashboard.frame_bytes {
        Some(bytes) => {
            let _ = writeln!(out, "last frame: {}", format_bytes(bytes));
        }
        None => {
            let _ = writeln!(out, "last frame: no signal");
        }
    }
    if let Some(quality) = &dashboard.settings.recording_quality {
        let _ = writeln!(out, "quality:    {quality}");
    }
    let _ = write!(out, "violations: {}", dashboard.violations.len());
    out
}

pub fn violation(record: &ViolationRecord) -> String {
    let mut line = format!(
        "#{} {} {} people [{}]",
        record.id, record.timestamp, record.person_count, record.status
    );
    if let Some(duration) = record.duration {
        let _ = write!(line, " {duration:.1}s");
    }
    if let Some(clip) = &record.clip_path {
        let _ = write!(line, " {clip}");
    }
    line
}

pub fn connection_snapshot(snapshot: &ConnectionSnapshot) -> String {
    let mut out = format!(
        "state: {:?}, attempts {}/{}, queued {}",
        snapshot.state,
        snapshot.reconnect_attempts,
        snapshot.max_reconnect_attempts,
        snapshot.queued_messages
    );
    if let Some(latency) = snapshot.latency {
        let _ = write!(out, ", latency {}", format_latency(latency));
    }
    if let Some(last_activity) = snapshot.last_activity {
        let _ = write!(out, ", last activity at {last_activity}");
    }
    out
}

pub fn traffic_record(record: &TrafficRecord) -> String {
    format!(
        "{} {} {} {}",
        record.timestamp,
        record.direction,
        record.event,
        record.preview.as_deref().unwrap_or("-")
    )
}
