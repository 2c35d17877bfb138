// src/db/connection.rs
//! Opening and initialising SQLite with runtime parameters.

use std::{fs, path::{Path, PathBuf}, time::Duration};
use rusqlite::Connection;
use crate::config::DatabaseConfig;

pub fn db_path(base_dir: &Path, cfg: &DatabaseConfig) -> PathBuf {
    base_dir.join(&cfg.path)
}

pub fn open_db_connection(path: &Path, cfg: &DatabaseConfig) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_millis(cfg.busy_timeout_ms))?;
    let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |r| r.get(0))?;
    log::debug!("journal_mode={} for {}", mode, path.display());
    conn.pragma_update(None, "synchronous", cfg.synchronous.as_str())?;
    Ok(conn)
}

/// Open the database under `base_dir`, purging it first when configured, and
/// apply the schema. The schema is idempotent so it runs on every start.
pub fn init_database(base_dir: &Path, cfg: &DatabaseConfig) -> rusqlite::Result<Connection> {
    let path = db_path(base_dir, cfg);

    if cfg.purge_on_restart && path.exists() {
        let _ = fs::remove_file(&path);
    }

    let conn = open_db_connection(&path, cfg)?;
    let limit = i64::try_from(cfg.journal_size_limit).unwrap_or(i64::MAX);
    conn.pragma_update_and_check(None, "journal_size_limit", limit, |r| r.get::<_, i64>(0))?;
    apply_schema(&conn)?;
    log::info!("Database ready at {}", path.display());
    Ok(conn)
}

pub fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(include_str!("../../resources/schema.sql"))
}
