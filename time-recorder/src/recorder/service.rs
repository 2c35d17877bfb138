// src/recorder/service.rs

//! # Time Recorder
//!
//! Captures instants, writes them through a [`TimeStore`] and keeps them in a
//! bounded buffer while the store is unreachable.
//!
//! **Responsibilities:**
//! - Write path: one direct write per capture while the store is up.
//! - Outage handling: flip availability on the first failure, buffer from then on.
//! - Reconnection: probe on a timer and drain the buffer in batches under a
//!   wall-clock budget, never with two flushes at once.
//! - Read-only projections: status, health, stored records.
//!
//! Store failures never leave this type; they become state transitions,
//! buffered entries and log lines.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, TryLockError,
    },
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};

use crate::config::RecorderConfig;
use crate::db::{NewTimeRecord, StoreError, TimeStore};
use super::{
    availability::Availability,
    buffer::{RingBuffer, Timestamp},
    clock::{Clock, SystemClock},
    health::HealthReport,
    records::{total_pages, DatabaseStatus, RecordsPage},
    status::{format_duration, utilization, StatusReport},
};

const NEVER: i64 = i64::MIN;

/// What one call to [`TimeRecorder::attempt_reconnection`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectOutcome {
    /// Store up and nothing buffered; no store call was made.
    Idle,
    /// Another flush holds the lock.
    Skipped,
    /// The probe failed; the store stays down.
    StillDown,
    Flushed(FlushReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushEnd {
    /// Buffer was empty on entry.
    Empty,
    /// Buffer fully drained.
    Drained,
    /// Budget exhausted with entries left.
    TimedOut,
    /// A batch write failed; the batch was put back.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub end:       FlushEnd,
    pub written:   usize,
    pub batches:   usize,
    pub remaining: usize,
    pub elapsed:   Duration,
}

impl FlushReport {
    fn empty() -> Self {
        Self { end: FlushEnd::Empty, written: 0, batches: 0, remaining: 0, elapsed: Duration::ZERO }
    }
}

pub struct TimeRecorder {
    store:    Arc<dyn TimeStore>,
    clock:    Arc<dyn Clock>,
    settings: RecorderConfig,
    enabled:  AtomicBool,

    buffer:       RingBuffer,
    availability: Availability,
    flush_lock:   Mutex<()>,

    total_written:         AtomicU64,
    total_dropped:         AtomicU64,
    last_successful_write: AtomicI64,
    started_at:            DateTime<Utc>,
}

impl TimeRecorder {
    pub fn new(store: Arc<dyn TimeStore>, settings: RecorderConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), settings)
    }

    pub fn with_clock(store: Arc<dyn TimeStore>, clock: Arc<dyn Clock>, settings: RecorderConfig) -> Self {
        let started_at = clock.now();
        log::info!(
            "TimeRecorder initialised: buffer capacity {}, batch size {}, flush budget {} ms",
            settings.max_buffer_size,
            settings.batch_size,
            settings.batch_write_timeout_ms
        );
        gauge!("timerecorder_database_available").set(1.0);
        Self {
            store,
            clock,
            enabled: AtomicBool::new(settings.enabled),
            buffer: RingBuffer::new(settings.max_buffer_size),
            availability: Availability::new(),
            flush_lock: Mutex::new(()),
            total_written: AtomicU64::new(0),
            total_dropped: AtomicU64::new(0),
            last_successful_write: AtomicI64::new(NEVER),
            started_at,
            settings,
        }
    }

    // ───── write path ──────────────────────────────────────────────────────

    /// Capture the current instant. Never fails and never blocks on a flush.
    pub fn record_now(&self) {
        if !self.is_enabled() {
            log::trace!("Recording is disabled");
            return;
        }

        let now = self.clock.now();
        if self.availability.is_available() && self.write_direct(now) {
            return;
        }
        self.enqueue(now);
    }

    fn write_direct(&self, ts: Timestamp) -> bool {
        let started = Instant::now();
        match self.store.write(&NewTimeRecord::direct(ts)) {
            Ok(saved) => {
                histogram!("timerecorder_write_duration_seconds").record(started.elapsed().as_secs_f64());
                self.note_written(1);
                // A write can race a concurrent failure; it proves the store is back.
                self.mark_available();
                log::trace!("Recorded {} as id {}", saved.recorded_at, saved.id);
                true
            }
            Err(e) => {
                self.mark_unavailable(&e);
                false
            }
        }
    }

    fn enqueue(&self, ts: Timestamp) {
        if let Some(dropped) = self.buffer.push(ts) {
            self.total_dropped.fetch_add(1, Ordering::AcqRel);
            counter!("timerecorder_records_dropped_total").increment(1);
            log::warn!(
                "Buffer full ({} records). Dropped oldest record: {}",
                self.buffer.capacity(),
                dropped
            );
        }
        counter!("timerecorder_records_buffered_total").increment(1);
        gauge!("timerecorder_buffer_size").set(self.buffer.len() as f64);
        log::debug!("Buffered timestamp {}. Buffer size: {}", ts, self.buffer.len());
    }

    fn note_written(&self, n: usize) {
        let now = self.clock.now();
        self.last_successful_write.store(now.timestamp_micros(), Ordering::Release);
        self.total_written.fetch_add(n as u64, Ordering::AcqRel);
        counter!("timerecorder_records_written_total").increment(n as u64);
    }

    fn mark_available(&self) {
        if let Some(outage) = self.availability.mark_up(self.clock.now()) {
            gauge!("timerecorder_database_available").set(1.0);
            log::info!(
                "Database connection RESTORED after {} (down since {}). Reconnection attempts: {}",
                humantime::format_duration(outage.duration.to_std().unwrap_or_default()),
                outage.since,
                outage.attempts
            );
        }
    }

    fn mark_unavailable(&self, err: &StoreError) {
        if self.availability.mark_down(self.clock.now()) {
            gauge!("timerecorder_database_available").set(0.0);
            log::error!(
                "Database connection LOST: {}. Buffering records, retrying every {} ms",
                err,
                self.settings.reconnect_interval_ms
            );
        } else {
            log::debug!("Database still unavailable: {}", err);
        }
    }

    // ───── reconnection / flush path ───────────────────────────────────────

    /// One reconnection cycle: probe the store and, if it answers, flush.
    pub fn attempt_reconnection(&self) -> ReconnectOutcome {
        if self.availability.is_available() && self.buffer.is_empty() {
            return ReconnectOutcome::Idle;
        }

        let Some(guard) = self.try_flush_lock() else {
            log::debug!("Flush already in progress, skipping this attempt");
            return ReconnectOutcome::Skipped;
        };

        let attempt = self.availability.record_attempt();
        log::info!(
            "Attempting database reconnection (attempt #{}). Buffer size: {} records",
            attempt,
            self.buffer.len()
        );

        if let Err(e) = self.store.probe() {
            log::warn!(
                "Database still unavailable ({}). Will retry in {} ms",
                e,
                self.settings.reconnect_interval_ms
            );
            return ReconnectOutcome::StillDown;
        }

        let report = self.flush_locked(&guard);
        if report.end == FlushEnd::Empty {
            // Reachable with nothing pending counts as a full drain.
            self.mark_available();
        }
        ReconnectOutcome::Flushed(report)
    }

    /// Drain the buffer now. `None` if another flush is running.
    pub fn flush_buffer(&self) -> Option<FlushReport> {
        let guard = self.try_flush_lock()?;
        Some(self.flush_locked(&guard))
    }

    fn try_flush_lock(&self) -> Option<MutexGuard<'_, ()>> {
        match self.flush_lock.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::WouldBlock) => None,
            // The lock guards no data; a panicked flush leaves nothing to repair.
            Err(TryLockError::Poisoned(p)) => Some(p.into_inner()),
        }
    }

    fn flush_locked(&self, _exclusive: &MutexGuard<'_, ()>) -> FlushReport {
        if self.buffer.is_empty() {
            log::debug!("Buffer is empty, nothing to flush");
            return FlushReport::empty();
        }

        let budget = self.settings.batch_write_timeout();
        let batch_size = self.settings.batch_size.max(1);
        log::info!("Starting buffer flush. {} records to write", self.buffer.len());

        let started = Instant::now();
        let mut written = 0;
        let mut batches = 0;

        let end = loop {
            if self.buffer.is_empty() {
                break FlushEnd::Drained;
            }
            if started.elapsed() > budget {
                log::warn!(
                    "Flush timeout reached after {} records. {} records remaining in buffer",
                    written,
                    self.buffer.len()
                );
                break FlushEnd::TimedOut;
            }

            let batch = self.buffer.drain_batch(batch_size);
            if batch.is_empty() {
                break FlushEnd::Drained;
            }
            let records: Vec<NewTimeRecord> = batch.iter().copied().map(NewTimeRecord::buffered).collect();

            let write_started = Instant::now();
            match self.store.write_batch(&records) {
                Ok(_) => {
                    histogram!("timerecorder_write_duration_seconds")
                        .record(write_started.elapsed().as_secs_f64());
                    written += batch.len();
                    batches += 1;
                    self.note_written(batch.len());
                    log::debug!("Written batch #{}: {} records", batches, batch.len());
                }
                Err(e) => {
                    log::error!("Batch write failed: {}. Re-buffering {} records", e, batch.len());
                    self.buffer.restore(batch);
                    self.mark_unavailable(&e);
                    break FlushEnd::Failed;
                }
            }
        };

        gauge!("timerecorder_buffer_size").set(self.buffer.len() as f64);
        let report = FlushReport {
            end,
            written,
            batches,
            remaining: self.buffer.len(),
            elapsed: started.elapsed(),
        };

        if end == FlushEnd::Drained {
            log::info!(
                "Buffer flush completed. Written {} records in {} batches. Duration: {} ms",
                written,
                batches,
                report.elapsed.as_millis()
            );
            self.mark_available();
        }
        report
    }

    /// Final best-effort flush before the process exits. Whatever is still
    /// buffered afterwards is lost.
    pub fn shutdown(&self) -> Option<FlushReport> {
        let pending = self.buffer.len();
        log::info!("Shutting down TimeRecorder. Buffer size: {}", pending);
        if pending == 0 {
            return None;
        }

        if !self.availability.is_available() {
            if let Err(e) = self.store.probe() {
                log::error!("Failed to flush buffer during shutdown: {}. {} records will be lost", e, pending);
                return None;
            }
        }

        log::info!("Attempting to flush {} buffered records before shutdown...", pending);
        let report = self.flush_buffer();
        match &report {
            Some(r) if r.remaining > 0 => {
                log::error!("Shutdown flush ended {:?}. {} records will be lost", r.end, r.remaining)
            }
            Some(_) => {}
            None => log::error!(
                "Flush still running at shutdown. {} records may be lost",
                self.buffer.len()
            ),
        }
        report
    }

    // ───── controls & projections ──────────────────────────────────────────

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        if self.enabled.swap(enabled, Ordering::AcqRel) != enabled {
            log::info!("Recording {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    pub fn is_available(&self) -> bool {
        self.availability.is_available()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn total_written(&self) -> u64 {
        self.total_written.load(Ordering::Acquire)
    }

    pub fn total_dropped(&self) -> u64 {
        self.total_dropped.load(Ordering::Acquire)
    }

    pub fn reconnection_attempts(&self) -> u32 {
        self.availability.reconnection_attempts()
    }

    pub fn down_since(&self) -> Option<DateTime<Utc>> {
        self.availability.down_since()
    }

    pub fn settings(&self) -> &RecorderConfig {
        &self.settings
    }

    pub fn status_snapshot(&self) -> StatusReport {
        let now = self.clock.now();
        let buffered = self.buffer.len();
        let capacity = self.buffer.capacity();
        let down_since = self.availability.down_since();
        let last_write = match self.last_successful_write.load(Ordering::Acquire) {
            NEVER => None,
            micros => DateTime::from_timestamp_micros(micros),
        };

        StatusReport {
            database_available: down_since.is_none(),
            buffered_records: buffered,
            max_buffer_capacity: capacity,
            buffer_utilization: utilization(buffered, capacity),
            total_records_written: self.total_written(),
            records_dropped: self.total_dropped(),
            last_successful_write: last_write,
            database_down_since: down_since,
            outage_duration: down_since.map(|since| format_duration(now - since)),
            reconnection_attempts: self.availability.reconnection_attempts(),
            recording_enabled: self.is_enabled(),
            uptime: format_duration(now - self.started_at),
            generated_at: now,
        }
    }

    pub fn health(&self) -> HealthReport {
        HealthReport::classify(self.is_available(), self.buffer.len(), self.buffer.capacity())
    }

    /// Page `page` (zero-based) of stored records, `size` per page.
    pub fn records_page(&self, page: u64, size: u64) -> Result<RecordsPage, StoreError> {
        let total = self.store.count_all()?;
        let records = self.store.find_page(page.saturating_mul(size), size)?;
        Ok(RecordsPage {
            records,
            total_count: total,
            buffered_count: self.buffer.len(),
            database_status: DatabaseStatus::from_available(self.is_available()),
            generated_at: self.clock.now(),
            page: Some(page),
            size: Some(size),
            total_pages: Some(total_pages(total, size)),
        })
    }

    pub fn all_records(&self) -> Result<RecordsPage, StoreError> {
        let records = self.store.find_all()?;
        Ok(RecordsPage {
            total_count: records.len() as u64,
            records,
            buffered_count: self.buffer.len(),
            database_status: DatabaseStatus::from_available(self.is_available()),
            generated_at: self.clock.now(),
            page: None,
            size: None,
            total_pages: None,
        })
    }
}
