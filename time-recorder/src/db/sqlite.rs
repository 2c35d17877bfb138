// src/db/sqlite.rs
//! [`TimeStore`] backed by a single SQLite connection.

use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};

use chrono::Utc;
use rusqlite::Connection;

use crate::config::DatabaseConfig;
use crate::db::{
    batch_inserts::{bind_and_insert, from_row, INSERT_SQL, SELECT_COLUMNS},
    connection::{apply_schema, init_database},
    record::{NewTimeRecord, TimeRecord},
    store::{StoreError, TimeStore},
};

/// Serialises all access through one connection; SQLite allows a single
/// writer anyway.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (and initialise) the configured database under `base_dir`.
    pub fn open(base_dir: &Path, cfg: &DatabaseConfig) -> Result<Self, StoreError> {
        Ok(Self::from_connection(init_database(base_dir, cfg)?))
    }

    /// Private in-memory database, mostly for tests and dry runs.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap a connection whose schema is already in place.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn query_records(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<TimeRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl TimeStore for SqliteStore {
    fn write(&self, record: &NewTimeRecord) -> Result<TimeRecord, StoreError> {
        let conn = self.conn()?;
        let persisted_at = Utc::now();
        let mut stmt = conn.prepare_cached(INSERT_SQL)?;
        let id = bind_and_insert(&mut stmt, record, persisted_at)?;
        Ok(TimeRecord::persisted(id, record, persisted_at))
    }

    fn write_batch(&self, records: &[NewTimeRecord]) -> Result<Vec<TimeRecord>, StoreError> {
        let mut conn = self.conn()?;
        let persisted_at = Utc::now();
        // Dropping `tx` without commit rolls the whole batch back.
        let tx = conn.transaction()?;
        let mut saved = Vec::with_capacity(records.len());
        {
            let mut stmt = tx.prepare_cached(INSERT_SQL)?;
            for rec in records {
                let id = bind_and_insert(&mut stmt, rec, persisted_at)?;
                saved.push(TimeRecord::persisted(id, rec, persisted_at));
            }
        }
        tx.commit()?;
        Ok(saved)
    }

    fn probe(&self) -> Result<(), StoreError> {
        self.count_all().map(|_| ())
    }

    fn count_all(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM time_records", [], |r| r.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn find_page(&self, offset: u64, limit: u64) -> Result<Vec<TimeRecord>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY id ASC LIMIT ?1 OFFSET ?2");
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        self.query_records(&sql, [limit, offset])
    }

    fn find_all(&self) -> Result<Vec<TimeRecord>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY id ASC");
        self.query_records(&sql, [])
    }
}
