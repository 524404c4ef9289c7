//! Clock implementations - wall clock for production, manual clock for tests and simulation.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::{Clock, Timestamp};

/// Wall clock backed by `chrono::Utc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Pre-epoch system clocks read as 0.
        u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
    }
}

/// Manually driven clock. Never moves backwards.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self { now: AtomicU64::new(start) }
    }

    /// Advance by `secs` seconds, returns the new time.
    pub fn advance(&self, secs: u64) -> Timestamp {
        self.now.fetch_add(secs, Ordering::SeqCst) + secs
    }

    /// Advance by whole days of `seconds_per_day`.
    pub fn advance_days(&self, days: u64, seconds_per_day: u64) -> Timestamp {
        self.advance(days * seconds_per_day)
    }

    /// Jump to `ts`. Earlier timestamps are ignored.
    pub fn set(&self, ts: Timestamp) {
        self.now.fetch_max(ts, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_is_monotonic() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.advance(10), 1_010);
        clock.set(500);
        assert_eq!(clock.now(), 1_010);
        clock.set(2_000);
        assert_eq!(clock.now(), 2_000);
        assert_eq!(clock.advance_days(2, 86_400), 2_000 + 172_800);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now() > 1_577_836_800);
    }
}
