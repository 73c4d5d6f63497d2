//! Elapsed-time sources for log line timestamps

use std::time::Instant;

/// Seconds elapsed since the run's reference point
pub trait Clock: Send + Sync {
    fn elapsed_secs(&self) -> f64;
}

/// Wall-clock time measured from a fixed start instant
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    started: Instant,
}

impl MonotonicClock {
    /// Start measuring now
    pub fn starting_now() -> Self {
        Self::since(Instant::now())
    }

    /// Measure from an earlier instant, such as process start
    pub fn since(started: Instant) -> Self {
        Self { started }
    }
}

impl Clock for MonotonicClock {
    fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// A clock frozen at one value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedClock(pub f64);

impl Clock for FixedClock {
    fn elapsed_secs(&self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_monotonic_clock_counts_from_start() {
        let clock = MonotonicClock::since(Instant::now() - Duration::from_millis(1500));
        let elapsed = clock.elapsed_secs();
        assert!(elapsed >= 1.5, "elapsed {}", elapsed);
        assert!(clock.elapsed_secs() >= elapsed);
    }

    #[test]
    fn test_fixed_clock() {
        assert_eq!(FixedClock(3.25).elapsed_secs(), 3.25);
    }
}
