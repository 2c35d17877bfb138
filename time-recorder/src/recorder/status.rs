// src/recorder/status.rs
//! Point-in-time view of the recorder for reporting.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub database_available:    bool,
    pub buffered_records:      usize,
    pub max_buffer_capacity:   usize,
    /// Percent of capacity in use, two decimals.
    pub buffer_utilization:    f64,
    pub total_records_written: u64,
    pub records_dropped:       u64,
    pub last_successful_write: Option<DateTime<Utc>>,
    pub database_down_since:   Option<DateTime<Utc>>,
    pub outage_duration:       Option<String>,
    pub reconnection_attempts: u32,
    pub recording_enabled:     bool,
    pub uptime:                String,
    pub generated_at:          DateTime<Utc>,
}

/// `occupied / capacity * 100`, rounded to two decimals; 0 for no capacity.
pub fn utilization(occupied: usize, capacity: usize) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    let pct = occupied as f64 / capacity as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

/// Render as `XhYmZs`, leaving out leading zero units (`4m0s`, `12s`).
/// Negative spans render as `0s`.
pub fn format_duration(span: TimeDelta) -> String {
    let total = span.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
