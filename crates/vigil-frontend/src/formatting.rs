use std::fmt::Write;
use std::time::Duration;

use chrono::{DateTime, Local};

/// IEC units for byte quantities.
const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Formats a byte count using IEC units, with two decimals above one KiB.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;

    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

/// Formats how long monitoring has been running as `HH:MM:SS`. Hours are
/// not wrapped at 24.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    let mut out = String::with_capacity(8);
    let _ = write!(&mut out, "{:02}:{:02}:{:02}", hours, minutes, secs);
    out
}

/// Two-digit hour and minute shown next to a notification, e.g. `03:07 PM`.
pub fn format_clock(time: &DateTime<Local>) -> String {
    time.format("%I:%M %p").to_string()
}

pub fn format_latency(milliseconds: u64) -> String {
    format!("{milliseconds}ms")
}
