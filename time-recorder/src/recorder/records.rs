// src/recorder/records.rs
//! Read side: stored records plus the recorder's view of what is pending.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::TimeRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsPage {
    pub records:         Vec<TimeRecord>,
    pub total_count:     u64,
    pub buffered_count:  usize,
    pub database_status: DatabaseStatus,
    pub generated_at:    DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page:            Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size:            Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages:     Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DatabaseStatus {
    Connected,
    Disconnected,
}

impl DatabaseStatus {
    pub fn from_available(available: bool) -> Self {
        if available { Self::Connected } else { Self::Disconnected }
    }
}

/// Pages needed for `total` rows at `size` per page.
pub fn total_pages(total: u64, size: u64) -> u64 {
    if size == 0 { 0 } else { total.div_ceil(size) }
}
