// src/recorder/health.rs
//! Health classification for probes and dashboards.

use serde::Serialize;

/// Utilization (percent) above which a warning is attached.
pub const WARN_UTILIZATION: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    /// Store down, but captures are still being buffered.
    Degraded,
    /// Store down and the buffer is dropping captures.
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status:             HealthStatus,
    pub database_connected: bool,
    pub buffered_records:   usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning:            Option<String>,
}

impl HealthReport {
    pub fn classify(database_connected: bool, buffered: usize, capacity: usize) -> Self {
        let status = match (database_connected, buffered < capacity) {
            (true, _) => HealthStatus::Up,
            (false, true) => HealthStatus::Degraded,
            (false, false) => HealthStatus::Down,
        };
        let pct = super::status::utilization(buffered, capacity);
        let warning = (pct > WARN_UTILIZATION)
            .then(|| format!("Buffer is {pct}% full ({buffered}/{capacity})"));
        Self { status, database_connected, buffered_records: buffered, warning }
    }
}
