//! Bounded lifetime for source nodes.
//!
//! A source constructed with a lifetime records its birth time when it is
//! initialized and is considered expired once the wall clock passes
//! `birth_time + lifetime`. Time comes from a [`Clock`] so drivers and tests
//! can substitute their own time source.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Wall-clock time source.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Millisecond resolution.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: std::time::Duration) {
        self.millis
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.millis.store(to.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Expiry bookkeeping of a source node.
#[derive(Debug, Clone, PartialEq)]
pub struct Lifetime {
    seconds: f64,
    birth_time: Option<DateTime<Utc>>,
}

impl Lifetime {
    /// Returns `None` unless `seconds` is positive and finite.
    pub fn new(seconds: f64) -> Option<Self> {
        if seconds.is_finite() && seconds > 0.0 {
            Some(Self {
                seconds,
                birth_time: None,
            })
        } else {
            None
        }
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    pub fn birth_time(&self) -> Option<DateTime<Utc>> {
        self.birth_time
    }

    /// Record the birth time. Called on every initialization.
    pub fn mark_birth(&mut self, now: DateTime<Utc>) {
        self.birth_time = Some(now);
    }

    /// `None` before birth, and when the end lies past the last
    /// representable instant.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let birth = self.birth_time?;
        let span = std::time::Duration::try_from_secs_f64(self.seconds).ok()?;
        let span = chrono::Duration::from_std(span).ok()?;
        birth.checked_add_signed(span)
    }

    /// A source that has not been initialized yet has not started ageing,
    /// and one whose end is out of range never expires.
    pub fn is_alive_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(end) => now <= end,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_lifetimes() {
        assert!(Lifetime::new(0.0).is_none());
        assert!(Lifetime::new(-1.0).is_none());
        assert!(Lifetime::new(f64::NAN).is_none());
        assert!(Lifetime::new(f64::INFINITY).is_none());
        assert!(Lifetime::new(0.5).is_some());
    }

    #[test]
    fn test_alive_before_birth() {
        let lifetime = Lifetime::new(2.0).unwrap();
        assert!(lifetime.is_alive_at(epoch()));
        assert!(lifetime.expires_at().is_none());
    }

    #[test]
    fn test_expires_after_interval() {
        let mut lifetime = Lifetime::new(2.0).unwrap();
        lifetime.mark_birth(epoch());
        assert!(lifetime.is_alive_at(epoch()));
        assert!(lifetime.is_alive_at(epoch() + chrono::Duration::seconds(2)));
        assert!(!lifetime.is_alive_at(epoch() + chrono::Duration::milliseconds(2001)));
    }

    #[test]
    fn test_rebirth_extends_life() {
        let mut lifetime = Lifetime::new(1.0).unwrap();
        lifetime.mark_birth(epoch());
        let later = epoch() + chrono::Duration::seconds(5);
        assert!(!lifetime.is_alive_at(later));
        lifetime.mark_birth(later);
        assert!(lifetime.is_alive_at(later));
    }

    #[test]
    fn test_out_of_range_end_never_expires() {
        for seconds in [1e13, 1e300, f64::MAX] {
            let mut lifetime = Lifetime::new(seconds).unwrap();
            lifetime.mark_birth(epoch());
            assert!(lifetime.expires_at().is_none());
            assert!(lifetime.is_alive_at(epoch() + chrono::Duration::days(365_000)));
        }
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(epoch());
        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now(), epoch() + chrono::Duration::milliseconds(1500));
        clock.set(epoch());
        assert_eq!(clock.now(), epoch());
    }

    #[test]
    fn test_mock_clock() {
        let mut clock = MockClock::new();
        clock.expect_now().times(1).return_const(epoch());
        assert_eq!(clock.now(), epoch());
    }
}
