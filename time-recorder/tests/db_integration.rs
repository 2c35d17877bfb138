//! Integration tests for the SQLite WAL store.
//!
//! Runs the store and the recorder against real database files in temporary
//! directories.
// tests/db_integration.rs

mod common;

use std::sync::Arc;

use rusqlite::Connection;
use tempfile::TempDir;

use common::{settings, t, ManualClock};
use time_recorder::{
    config::DatabaseConfig,
    db::{connection::db_path, NewTimeRecord, SqliteStore, TimeStore},
    recorder::TimeRecorder,
};

fn make_db_config() -> DatabaseConfig {
    DatabaseConfig::at("time_records.db")
}

#[test]
fn schema_is_created_and_rows_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let cfg = make_db_config();

    {
        let store = SqliteStore::open(dir.path(), &cfg).unwrap();
        store.write(&NewTimeRecord::direct(t(1))).unwrap();
        store
            .write_batch(&[NewTimeRecord::buffered(t(2)), NewTimeRecord::buffered(t(3))])
            .unwrap();
    }

    let store = SqliteStore::open(dir.path(), &cfg).unwrap();
    assert_eq!(store.count_all().unwrap(), 3);

    let conn = Connection::open(db_path(dir.path(), &cfg)).unwrap();
    let buffered: i64 = conn
        .query_row("SELECT COUNT(*) FROM time_records WHERE was_buffered = 1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(buffered, 2);
}

#[test]
fn purge_on_restart_starts_empty() {
    let dir = TempDir::new().unwrap();
    let mut cfg = make_db_config();

    SqliteStore::open(dir.path(), &cfg)
        .unwrap()
        .write(&NewTimeRecord::direct(t(1)))
        .unwrap();

    cfg.purge_on_restart = true;
    let store = SqliteStore::open(dir.path(), &cfg).unwrap();
    assert_eq!(store.count_all().unwrap(), 0);
}

#[test]
fn failed_batch_leaves_no_partial_rows() {
    let dir = TempDir::new().unwrap();
    let cfg = make_db_config();
    let store = SqliteStore::open(dir.path(), &cfg).unwrap();

    // A trigger that rejects one specific timestamp makes the third insert fail.
    let conn = Connection::open(db_path(dir.path(), &cfg)).unwrap();
    conn.execute_batch(&format!(
        "CREATE TRIGGER reject_one BEFORE INSERT ON time_records
         WHEN NEW.recorded_at = {}
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        t(3).timestamp_micros()
    ))
    .unwrap();
    drop(conn);

    let batch: Vec<_> = (1..=4).map(|n| NewTimeRecord::buffered(t(n))).collect();
    assert!(store.write_batch(&batch).is_err());
    assert_eq!(store.count_all().unwrap(), 0);
}

#[test]
fn recorder_writes_through_sqlite() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path(), &make_db_config()).unwrap());
    let clock = Arc::new(ManualClock::new(t(0)));
    let rec = TimeRecorder::with_clock(store.clone(), clock.clone(), settings(10, 2));

    for n in 1..=3 {
        clock.set(t(n));
        rec.record_now();
    }

    let all = store.find_all().unwrap();
    let stamps: Vec<_> = all.iter().map(|r| r.recorded_at).collect();
    assert_eq!(stamps, vec![t(1), t(2), t(3)]);
    assert!(all.windows(2).all(|w| w[0].id < w[1].id));

    let page = rec.records_page(0, 2).unwrap();
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.total_count, 3);
    assert_eq!(page.total_pages, Some(2));
}
