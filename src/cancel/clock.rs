use std::time::{Duration, Instant};

/// Start of a solve phase, taken from the monotonic clock.
///
/// Wall-clock adjustments never make the elapsed time negative or inflate it, and reading it is a
/// plain `clock_gettime(CLOCK_MONOTONIC)`, which may be called from inside a signal handler.
#[derive(Clone, Copy, Debug)]
pub struct SolveClock {
    start: Instant,
}

impl SolveClock {
    /// Captures the start instant. Call this before any handler is installed.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn started_at(&self) -> Instant {
        self.start
    }

    /// Time since start; saturates to zero rather than going negative.
    pub fn elapsed(&self) -> Duration {
        Instant::now().saturating_duration_since(self.started_at())
    }
}

/// Converts a duration to milliseconds without dropping sub-millisecond precision.
pub fn as_millis_f64(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;

    #[test]
    fn elapsed_is_monotonic() {
        let clock = SolveClock::start();
        let a = clock.elapsed();
        thread::sleep(Duration::from_millis(5));
        let b = clock.elapsed();
        assert!(b >= a);
        assert!(b >= Duration::from_millis(5));
    }

    #[test]
    fn started_at_is_fixed() {
        let clock = SolveClock::start();
        let at = clock.started_at();
        thread::sleep(Duration::from_millis(2));
        assert_eq!(clock.started_at(), at);
        assert!(clock.elapsed() <= at.elapsed());
    }

    #[test]
    fn millis_keeps_fraction() {
        let ms = as_millis_f64(Duration::from_micros(1500));
        assert!((ms - 1.5).abs() < 1e-9);
    }
}
