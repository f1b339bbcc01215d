//! Injectable wall clock.
//!
//! Alarm times are local wall-clock values; the facility wants epoch
//! milliseconds. The [`Clock`] trait covers both views so the trigger
//! computation and the sessions stay deterministic under test.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, LocalResult, NaiveDateTime, TimeZone, Utc};

pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;

    /// Current wall-clock date and time in the local timezone.
    fn now_local(&self) -> NaiveDateTime;

    /// Convert a local wall-clock instant to epoch milliseconds.
    ///
    /// `None` for instants skipped by a DST transition; ambiguous instants
    /// resolve to the earlier offset.
    fn epoch_ms(&self, local: NaiveDateTime) -> Option<i64>;
}

/// Production clock over the system timezone.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn epoch_ms(&self, local: NaiveDateTime) -> Option<i64> {
        match Local.from_local_datetime(&local) {
            LocalResult::Single(t) => Some(t.timestamp_millis()),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.timestamp_millis()),
            LocalResult::None => None,
        }
    }
}

/// Settable clock for tests and simulation.
///
/// Treats its wall-clock time as UTC, so `epoch_ms` is a plain conversion
/// with no DST edge cases.
#[derive(Debug)]
pub struct ManualClock {
    epoch_ms: AtomicI64,
}

impl ManualClock {
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            epoch_ms: AtomicI64::new(now.and_utc().timestamp_millis()),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.epoch_ms
            .store(now.and_utc().timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta: i64) {
        self.epoch_ms.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.epoch_ms.load(Ordering::SeqCst)
    }

    fn now_local(&self) -> NaiveDateTime {
        DateTime::<Utc>::from_timestamp_millis(self.now_ms())
            .map(|t| t.naive_utc())
            .unwrap_or_default()
    }

    fn epoch_ms(&self, local: NaiveDateTime) -> Option<i64> {
        Some(local.and_utc().timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn monday_noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .expect("valid date")
            .and_hms_opt(12, 0, 0)
            .expect("valid time")
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::at(monday_noon());
        let before = clock.now_ms();
        clock.advance_ms(1500);
        assert_eq!(clock.now_ms(), before + 1500);
        assert_eq!(
            clock.now_local(),
            monday_noon() + chrono::Duration::milliseconds(1500)
        );
    }

    #[test]
    fn manual_epoch_round_trip() {
        let clock = ManualClock::at(monday_noon());
        let local = clock.now_local();
        assert_eq!(clock.epoch_ms(local), Some(clock.now_ms()));
    }
}
