// src/recorder/mod.rs
//! Capture, buffering and reconnection.

pub mod availability;
pub mod buffer;
pub mod clock;
pub mod health;
pub mod records;
pub mod service;
pub mod status;

pub use clock::{Clock, SystemClock};
pub use health::{HealthReport, HealthStatus};
pub use records::{DatabaseStatus, RecordsPage};
pub use service::{FlushEnd, FlushReport, ReconnectOutcome, TimeRecorder};
pub use status::StatusReport;
