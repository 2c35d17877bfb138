// src/db/batch_inserts.rs

use chrono::{DateTime, Utc};
use rusqlite::{params, Row, Statement};
use crate::db::record::{NewTimeRecord, TimeRecord};

pub const INSERT_SQL: &str =
    "INSERT INTO time_records (recorded_at, persisted_at, was_buffered) VALUES (?1, ?2, ?3)";

pub const SELECT_COLUMNS: &str = "SELECT id, recorded_at, persisted_at, was_buffered FROM time_records";

/// Bind one record to a prepared `INSERT_SQL` and return the new row id.
pub fn bind_and_insert(
    stmt: &mut Statement<'_>,
    rec: &NewTimeRecord,
    persisted_at: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    stmt.insert(params![
        rec.recorded_at.timestamp_micros(),
        persisted_at.timestamp_micros(),
        rec.was_buffered,
    ])
}

/// Map a `SELECT_COLUMNS` row back into a [`TimeRecord`].
pub fn from_row(row: &Row<'_>) -> rusqlite::Result<TimeRecord> {
    Ok(TimeRecord {
        id:           row.get(0)?,
        recorded_at:  micros_to_utc(1, row.get(1)?)?,
        persisted_at: micros_to_utc(2, row.get(2)?)?,
        was_buffered: row.get(3)?,
    })
}

fn micros_to_utc(column: usize, micros: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, micros))
}
