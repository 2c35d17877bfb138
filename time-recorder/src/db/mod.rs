// src/db/mod.rs
//! Public façade for the persistence layer.

pub mod batch_inserts;
pub mod connection;
pub mod record;
pub mod sqlite;
pub mod store;

pub use record::{NewTimeRecord, TimeRecord};
pub use sqlite::SqliteStore;
pub use store::{StoreError, TimeStore};
