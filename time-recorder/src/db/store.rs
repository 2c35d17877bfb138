// src/db/store.rs
//! The boundary the recorder writes through.

use thiserror::Error;
use crate::db::record::{NewTimeRecord, TimeRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("store connection poisoned by a panicking writer")]
    Poisoned,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable home of [`TimeRecord`]s.
///
/// Every call either succeeds completely or fails; `write_batch` in
/// particular persists all records or none of them.
pub trait TimeStore: Send + Sync {
    /// Persist one record.
    fn write(&self, record: &NewTimeRecord) -> Result<TimeRecord, StoreError>;

    /// Persist `records` atomically, returning them with assigned ids in
    /// input order.
    fn write_batch(&self, records: &[NewTimeRecord]) -> Result<Vec<TimeRecord>, StoreError>;

    /// Cheap read-only reachability check.
    fn probe(&self) -> Result<(), StoreError>;

    fn count_all(&self) -> Result<u64, StoreError>;

    /// Up to `limit` records ordered by id, skipping the first `offset`.
    fn find_page(&self, offset: u64, limit: u64) -> Result<Vec<TimeRecord>, StoreError>;

    /// Every record, ordered by id.
    fn find_all(&self) -> Result<Vec<TimeRecord>, StoreError>;
}
