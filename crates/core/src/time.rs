use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Time source for an exam attempt.
///
/// Every deadline in the services layer (debounce, audio countdowns, seek lock,
/// redirect delay) is expressed as an offset from the clock's origin, so tests
/// can drive them by advancing a fixed clock instead of sleeping.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    /// Wall time from the system, offsets from a monotonic origin.
    System { origin: Instant },
    /// Manually advanced time.
    Fixed {
        origin: DateTime<Utc>,
        elapsed: Duration,
    },
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl Clock {
    /// Returns a clock that follows the system time.
    #[must_use]
    pub fn system() -> Self {
        Self::System {
            origin: Instant::now(),
        }
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed {
            origin: at,
            elapsed: Duration::ZERO,
        }
    }

    /// Current wall time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System { .. } => Utc::now(),
            Clock::Fixed { origin, elapsed } => {
                *origin + chrono::Duration::from_std(*elapsed).unwrap_or(chrono::Duration::zero())
            }
        }
    }

    /// Monotonic time since the clock was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        match self {
            Clock::System { origin } => origin.elapsed(),
            Clock::Fixed { elapsed, .. } => *elapsed,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::System`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed { elapsed, .. } = self {
            *elapsed += delta;
        }
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed { .. })
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances_both_views() {
        let mut clock = fixed_clock();
        assert_eq!(clock.elapsed(), Duration::ZERO);
        clock.advance(Duration::from_millis(1_500));
        assert_eq!(clock.elapsed(), Duration::from_millis(1_500));
        assert_eq!(
            clock.now(),
            fixed_now() + chrono::Duration::milliseconds(1_500)
        );
    }

    #[test]
    fn system_clock_ignores_advance() {
        let mut clock = Clock::system();
        clock.advance(Duration::from_secs(3_600));
        assert!(clock.elapsed() < Duration::from_secs(3_600));
        assert!(!clock.is_fixed());
    }
}
