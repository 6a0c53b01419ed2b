// Time source injected into the store

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use std::sync::Mutex;

/// Source of the current instant
///
/// All timestamps and every date-based filter are evaluated against a `Clock`,
/// so tests can pin time with [`FixedClock`].
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day used for due-date comparisons
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time; calendar days follow the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Manually driven clock for deterministic tests
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_system_clock_is_recent() {
        let now = SystemClock.now();
        // After 2020
        assert!(now.timestamp() > 1_600_000_000);
    }

    #[test]
    fn test_fixed_clock_advance() {
        let start = Utc.with_ymd_and_hms(2025, 1, 31, 23, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());

        clock.advance(Duration::hours(2));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_arc_clock_delegates() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let clock = std::sync::Arc::new(FixedClock::new(start));
        let shared = clock.clone();
        clock.advance(Duration::minutes(5));
        assert_eq!(shared.now(), start + Duration::minutes(5));
    }
}
