// src/recorder/buffer.rs
//! Bounded FIFO of capture instants waiting for the store.
//!
//! The recording tick is the only producer and the flush holding the flush
//! lock is the only consumer. New entries go through a lock-free
//! [`SegQueue`], so `push` never waits on a flush in progress. Entries handed
//! back by a failed batch live in a separate `restored` lane that drains
//! first; that lane is touched by the consumer and, only when the buffer is
//! full, by the producer's eviction.
//!
//! `len` is incremented before an entry becomes visible and decremented after
//! it is taken out, so it never underflows and never under-reports.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use crossbeam::queue::SegQueue;

pub type Timestamp = DateTime<Utc>;

pub struct RingBuffer {
    fresh:    SegQueue<Timestamp>,
    restored: Mutex<VecDeque<Timestamp>>,
    len:      AtomicUsize,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            fresh: SegQueue::new(),
            restored: Mutex::new(VecDeque::new()),
            len: AtomicUsize::new(0),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `ts`, evicting the oldest entry when the buffer is full.
    /// Returns the evicted entry, if any. With zero capacity `ts` itself is
    /// returned and nothing is stored.
    pub fn push(&self, ts: Timestamp) -> Option<Timestamp> {
        if self.capacity == 0 {
            return Some(ts);
        }

        let evicted = if self.len() >= self.capacity { self.pop_oldest() } else { None };

        self.len.fetch_add(1, Ordering::AcqRel);
        self.fresh.push(ts);
        evicted
    }

    /// Remove up to `max` of the oldest entries, oldest first. `len` drops
    /// with every entry taken, so a concurrent `push` sees the freed room.
    pub fn drain_batch(&self, max: usize) -> Vec<Timestamp> {
        let mut out = Vec::with_capacity(max.min(self.len()));
        {
            let mut restored = self.restored();
            while out.len() < max {
                match restored.pop_front() {
                    Some(ts) => self.take(&mut out, ts),
                    None => break,
                }
            }
        }
        while out.len() < max {
            match self.fresh.pop() {
                Some(ts) => self.take(&mut out, ts),
                None => break,
            }
        }
        out
    }

    fn take(&self, out: &mut Vec<Timestamp>, ts: Timestamp) {
        out.push(ts);
        self.len.fetch_sub(1, Ordering::AcqRel);
    }

    /// Put a drained batch back at the front, keeping its order. Capacity is
    /// not enforced here: these entries were already accepted once.
    pub fn restore(&self, batch: Vec<Timestamp>) {
        if batch.is_empty() {
            return;
        }
        let mut restored = self.restored();
        self.len.fetch_add(batch.len(), Ordering::AcqRel);
        for ts in batch.into_iter().rev() {
            restored.push_front(ts);
        }
    }

    fn pop_oldest(&self) -> Option<Timestamp> {
        let taken = self.restored().pop_front().or_else(|| self.fresh.pop());
        if taken.is_some() {
            self.len.fetch_sub(1, Ordering::AcqRel);
        }
        taken
    }

    fn restored(&self) -> MutexGuard<'_, VecDeque<Timestamp>> {
        // The deque holds plain values; a panic mid-operation cannot break it.
        self.restored.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
