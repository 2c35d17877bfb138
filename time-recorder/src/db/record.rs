// src/db/record.rs
//! Rows of the `time_records` table and their in-flight form.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A capture that has not reached the store yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTimeRecord {
    pub recorded_at:  DateTime<Utc>,
    pub was_buffered: bool,
}

impl NewTimeRecord {
    /// Record written straight from the capture tick.
    pub fn direct(recorded_at: DateTime<Utc>) -> Self {
        Self { recorded_at, was_buffered: false }
    }

    /// Record recovered from the in-memory buffer.
    pub fn buffered(recorded_at: DateTime<Utc>) -> Self {
        Self { recorded_at, was_buffered: true }
    }
}

/// A persisted row. `id` and `persisted_at` come from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRecord {
    pub id:           i64,
    pub recorded_at:  DateTime<Utc>,
    pub persisted_at: DateTime<Utc>,
    pub was_buffered: bool,
}

impl TimeRecord {
    pub fn persisted(id: i64, record: &NewTimeRecord, persisted_at: DateTime<Utc>) -> Self {
        Self {
            id,
            recorded_at: record.recorded_at,
            persisted_at,
            was_buffered: record.was_buffered,
        }
    }
}
