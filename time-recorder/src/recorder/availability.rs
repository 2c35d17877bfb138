// src/recorder/availability.rs
//! Up/down state of the store as seen by the recorder.
//!
//! `available` and `down_since` share one atomic cell: `UP` means available,
//! anything else is the outage start in micros since the epoch. Readers can
//! never observe one without the other, and each edge is a single CAS/swap so
//! its side effects run once.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use chrono::{DateTime, TimeDelta, Utc};

const UP: i64 = i64::MIN;

/// An outage that has just ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outage {
    pub since:    DateTime<Utc>,
    pub duration: TimeDelta,
    pub attempts: u32,
}

#[derive(Debug)]
pub struct Availability {
    down_since: AtomicI64,
    attempts:   AtomicU32,
}

impl Default for Availability {
    fn default() -> Self {
        Self::new()
    }
}

impl Availability {
    /// Starts optimistic: the store is assumed reachable.
    pub fn new() -> Self {
        Self { down_since: AtomicI64::new(UP), attempts: AtomicU32::new(0) }
    }

    pub fn is_available(&self) -> bool {
        self.down_since.load(Ordering::Acquire) == UP
    }

    pub fn down_since(&self) -> Option<DateTime<Utc>> {
        match self.down_since.load(Ordering::Acquire) {
            UP => None,
            micros => DateTime::from_timestamp_micros(micros),
        }
    }

    pub fn reconnection_attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    /// Count one reconnection attempt and return the new total.
    pub fn record_attempt(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }

    /// UP → DOWN. Returns `true` only for the caller that made the transition;
    /// an existing outage keeps its original start. A new outage counts its
    /// attempts from zero, whatever catch-up flushes ran while the store was up.
    pub fn mark_down(&self, now: DateTime<Utc>) -> bool {
        let mut since = now.timestamp_micros();
        if since == UP {
            since += 1;
        }
        let began = self
            .down_since
            .compare_exchange(UP, since, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if began {
            self.attempts.store(0, Ordering::Release);
        }
        began
    }

    /// DOWN → UP. Returns the finished outage for the caller that made the
    /// transition, `None` if the store was already up.
    pub fn mark_up(&self, now: DateTime<Utc>) -> Option<Outage> {
        let previous = self.down_since.swap(UP, Ordering::AcqRel);
        if previous == UP {
            return None;
        }
        let attempts = self.attempts.swap(0, Ordering::AcqRel);
        let since = DateTime::from_timestamp_micros(previous).unwrap_or(now);
        Some(Outage { since, duration: now - since, attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn starts_available() {
        let av = Availability::new();
        assert!(av.is_available());
        assert_eq!(av.down_since(), None);
        assert_eq!(av.reconnection_attempts(), 0);
    }

    #[test]
    fn only_the_first_failure_sets_down_since() {
        let av = Availability::new();
        assert!(av.mark_down(at(10)));
        assert!(!av.mark_down(at(20)));
        assert!(!av.is_available());
        assert_eq!(av.down_since(), Some(at(10)));
    }

    #[test]
    fn recovery_reports_outage_and_resets_attempts() {
        let av = Availability::new();
        av.mark_down(at(0));
        av.record_attempt();
        assert_eq!(av.record_attempt(), 2);

        let outage = av.mark_up(at(90)).unwrap();
        assert_eq!(outage.since, at(0));
        assert_eq!(outage.duration, TimeDelta::seconds(90));
        assert_eq!(outage.attempts, 2);

        assert!(av.is_available());
        assert_eq!(av.down_since(), None);
        assert_eq!(av.reconnection_attempts(), 0);
        assert_eq!(av.mark_up(at(91)), None);
    }

    #[test]
    fn attempts_are_kept_while_up() {
        let av = Availability::new();
        av.record_attempt();
        assert_eq!(av.mark_up(at(0)), None);
        assert_eq!(av.reconnection_attempts(), 1);
    }

    #[test]
    fn new_outage_counts_attempts_from_zero() {
        let av = Availability::new();
        av.record_attempt();
        av.record_attempt();

        assert!(av.mark_down(at(5)));
        assert_eq!(av.reconnection_attempts(), 0);

        av.record_attempt();
        assert!(!av.mark_down(at(6)));
        assert_eq!(av.reconnection_attempts(), 1);
    }
}
