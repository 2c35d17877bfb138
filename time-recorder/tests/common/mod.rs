//! Shared fixtures: a store whose health is switched by the test.
#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use chrono::{DateTime, TimeZone, Utc};
use crossbeam::channel::{Receiver, Sender};

use time_recorder::{
    config::RecorderConfig,
    db::{NewTimeRecord, StoreError, TimeRecord, TimeStore},
    recorder::{Clock, TimeRecorder},
};

/// `t(n)`: n seconds after a fixed epoch.
pub fn t(n: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + n, 0).unwrap()
}

/// Clock that only moves when told to. Resolution is one microsecond.
#[derive(Debug)]
pub struct ManualClock {
    micros: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { micros: AtomicI64::new(start.timestamp_micros()) }
    }

    pub fn advance(&self, by: Duration) {
        let delta = i64::try_from(by.as_micros()).unwrap();
        self.micros.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.micros.store(to.timestamp_micros(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.micros.load(Ordering::SeqCst)).unwrap()
    }
}

/// Hold a store call until the test says go.
pub struct Gate {
    pub entered: Sender<()>,
    pub release: Receiver<()>,
}

#[derive(Default)]
pub struct FlakyStore {
    healthy:        AtomicBool,
    /// Batches allowed to succeed before `write_batch` starts failing.
    batch_budget:   Mutex<Option<usize>>,
    batch_delay:    Mutex<Option<Duration>>,
    gate:           Mutex<Option<Gate>>,
    write_gate:     Mutex<Option<Gate>>,
    next_id:        AtomicI64,
    saved:          Mutex<Vec<TimeRecord>>,
    batches:        Mutex<Vec<Vec<DateTime<Utc>>>>,
    pub writes:     AtomicUsize,
    pub probes:     AtomicUsize,
    pub queries:    AtomicUsize,
}

impl FlakyStore {
    pub fn healthy() -> Arc<Self> {
        let s = Self::default();
        s.healthy.store(true, Ordering::SeqCst);
        Arc::new(s)
    }

    pub fn down() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Let `n` more batches through, then fail every batch.
    pub fn fail_batches_after(&self, n: usize) {
        *self.batch_budget.lock().unwrap() = Some(n);
    }

    pub fn slow_batches(&self, delay: Duration) {
        *self.batch_delay.lock().unwrap() = Some(delay);
    }

    pub fn gate_batches(&self, gate: Gate) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    /// Hold the next `write` until released. Health is checked afterwards.
    pub fn gate_next_write(&self, gate: Gate) {
        *self.write_gate.lock().unwrap() = Some(gate);
    }

    pub fn saved(&self) -> Vec<TimeRecord> {
        self.saved.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<Vec<DateTime<Utc>>> {
        self.batches.lock().unwrap().clone()
    }

    /// Every call that reached the store.
    pub fn calls(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
            + self.probes.load(Ordering::SeqCst)
            + self.queries.load(Ordering::SeqCst)
            + self.batches.lock().unwrap().len()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    fn persist(&self, records: &[NewTimeRecord]) -> Vec<TimeRecord> {
        let now = Utc::now();
        let out: Vec<_> = records
            .iter()
            .map(|r| TimeRecord::persisted(self.next_id.fetch_add(1, Ordering::SeqCst) + 1, r, now))
            .collect();
        self.saved.lock().unwrap().extend(out.iter().cloned());
        out
    }
}

impl TimeStore for FlakyStore {
    fn write(&self, record: &NewTimeRecord) -> Result<TimeRecord, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let gate = self.write_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.send(()).unwrap();
            gate.release.recv().unwrap();
        }
        self.check()?;
        Ok(self.persist(std::slice::from_ref(record)).remove(0))
    }

    fn write_batch(&self, records: &[NewTimeRecord]) -> Result<Vec<TimeRecord>, StoreError> {
        self.batches
            .lock()
            .unwrap()
            .push(records.iter().map(|r| r.recorded_at).collect());

        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.entered.send(()).unwrap();
            gate.release.recv().unwrap();
        }
        let delay = *self.batch_delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        self.check()?;
        {
            let mut budget = self.batch_budget.lock().unwrap();
            match budget.as_mut() {
                Some(0) => return Err(StoreError::Unavailable("batch rejected".into())),
                Some(n) => *n -= 1,
                None => {}
            }
        }
        Ok(self.persist(records))
    }

    fn probe(&self) -> Result<(), StoreError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.check()
    }

    fn count_all(&self) -> Result<u64, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.saved.lock().unwrap().len() as u64)
    }

    fn find_page(&self, offset: u64, limit: u64) -> Result<Vec<TimeRecord>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .saved
            .lock()
            .unwrap()
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    fn find_all(&self) -> Result<Vec<TimeRecord>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.saved.lock().unwrap().clone())
    }
}

pub fn settings(capacity: usize, batch_size: usize) -> RecorderConfig {
    RecorderConfig {
        max_buffer_size: capacity,
        batch_size,
        batch_write_timeout_ms: 5_000,
        ..RecorderConfig::default()
    }
}

/// Recorder over `store` whose clock starts at `t(0)`.
pub fn recorder(store: &Arc<FlakyStore>, cfg: RecorderConfig) -> (Arc<TimeRecorder>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(t(0)));
    let rec = TimeRecorder::with_clock(store.clone(), clock.clone(), cfg);
    (Arc::new(rec), clock)
}

/// Record at `t(n)` for each `n`.
pub fn record_at(rec: &TimeRecorder, clock: &ManualClock, stamps: impl IntoIterator<Item = i64>) {
    for n in stamps {
        clock.set(t(n));
        rec.record_now();
    }
}
