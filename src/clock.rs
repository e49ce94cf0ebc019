//! Clock abstraction so escalation timing can be driven in tests

use chrono::{DateTime, Utc};

#[cfg(test)]
pub use fake::FakeClock;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod fake {
    use chrono::{DateTime, Duration, Utc};
    use parking_lot::Mutex;
    use std::sync::Arc;

    use super::Clock;

    /// Manually controlled clock for tests
    #[derive(Debug, Clone)]
    pub struct FakeClock {
        current: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FakeClock {
        pub fn new() -> Self {
            Self::at(Utc::now())
        }

        pub fn at(instant: DateTime<Utc>) -> Self {
            Self {
                current: Arc::new(Mutex::new(instant)),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: Duration) {
            let mut current = self.current.lock();
            *current += by;
        }

        pub fn advance_minutes(&self, minutes: i64) {
            self.advance(Duration::minutes(minutes));
        }
    }

    impl Default for FakeClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> DateTime<Utc> {
            *self.current.lock()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fake_clock_advances() {
        let clock = FakeClock::new();
        let start = clock.now();
        clock.advance_minutes(30);
        assert_eq!(clock.now() - start, Duration::minutes(30));
    }

    #[test]
    fn fake_clock_clones_share_time() {
        let clock = FakeClock::new();
        let other = clock.clone();
        clock.advance(Duration::seconds(5));
        assert_eq!(clock.now(), other.now());
    }
}
