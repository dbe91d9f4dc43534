//! Time source for timestamps and "today".

use chrono::{Local, NaiveDate};
use std::sync::atomic::{AtomicI64, Ordering};

/// Supplies wall-clock millis and the local calendar date.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;

    /// The current day in the host's local calendar.
    fn today(&self) -> NaiveDate;
}

/// Host clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        now_ms()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Get the current timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Deterministic clock for tests: a fixed day, and millis that advance by
/// `step` on every read.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
    step: i64,
    today: NaiveDate,
}

impl ManualClock {
    pub fn new(start_ms: i64, today: NaiveDate) -> Self {
        Self {
            millis: AtomicI64::new(start_ms),
            step: 1,
            today,
        }
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.millis.fetch_add(self.step, Ordering::SeqCst)
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances_by_step() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 13).unwrap();
        let clock = ManualClock::new(1_000, day).with_step(10);
        assert_eq!(clock.now_ms(), 1_000);
        assert_eq!(clock.now_ms(), 1_010);
        clock.set(5);
        assert_eq!(clock.now_ms(), 5);
        assert_eq!(clock.today(), day);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
