//! Time source for expiry bookkeeping.
//!
//! The engine never calls `Utc::now()` directly so tests can drive TTL
//! boundaries deterministically with [`ManualClock`].

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `millis` milliseconds.
    pub fn advance_millis(&self, millis: i64) {
        let mut now = self.now.lock().expect("manual clock lock poisoned");
        *now += Duration::milliseconds(millis);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_millis(secs.saturating_mul(1000));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("manual clock lock poisoned")
    }
}

/// Seconds between `now` and `expires_at`, negative once expired.
pub fn seconds_until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let delta = expires_at - now;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance_millis(1500);
        assert_eq!(clock.now(), start + Duration::milliseconds(1500));
        clock.advance_secs(2);
        assert_eq!(clock.now(), start + Duration::milliseconds(3500));
    }

    #[test]
    fn test_seconds_until_sign() {
        let now = Utc::now();
        let later = now + Duration::milliseconds(2500);
        assert!((seconds_until(later, now) - 2.5).abs() < 1e-9);
        assert!((seconds_until(now, later) + 2.5).abs() < 1e-9);
    }
}
