//! Cadence clocks.
use std::time::Duration;

/// Longest stretch of time a clock will try to catch up on.
const MAX_BACKLOG: Duration = Duration::from_millis(250);

/// Converts elapsed wall-clock time into a count of whole cycles at a fixed rate.
///
/// The driver measures time between calls and feeds it in. Leftover time
/// that doesn't make up a whole cycle is carried over to the next call.
#[derive(Debug, Clone)]
pub(crate) struct Clock {
    /// Duration of a single cycle. Zero stops the clock.
    interval: Duration,
    /// Time accrued towards the next cycle.
    accrued: Duration,
}

impl Clock {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            accrued: Duration::ZERO,
        }
    }

    /// Set the clock state back to zero.
    pub(crate) fn reset(&mut self) {
        self.accrued = Duration::ZERO;
    }

    /// Accrue elapsed time and return the number of cycles that are due.
    pub(crate) fn advance(&mut self, elapsed: Duration) -> u32 {
        if self.interval.is_zero() {
            return 0;
        }

        // Drop the backlog rather than trying to catch up.
        //
        // If the VM was paused for debugging, and a large
        // amount of time has elapsed until it is resumed,
        // it should simply continue at its usual speed.
        self.accrued = (self.accrued + elapsed).min(MAX_BACKLOG);

        let interval = self.interval.as_nanos();
        let accrued = self.accrued.as_nanos();
        let cycles = accrued / interval;

        self.accrued = Duration::from_nanos((accrued % interval) as u64);

        cycles as u32
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_carry_over() {
        let mut clock = Clock::new(Duration::from_millis(10));

        assert_eq!(clock.advance(Duration::from_millis(4)), 0);
        assert_eq!(clock.advance(Duration::from_millis(4)), 0);
        assert_eq!(clock.advance(Duration::from_millis(4)), 1);
        assert_eq!(clock.advance(Duration::from_millis(28)), 3);
        assert_eq!(clock.advance(Duration::from_millis(9)), 0);

        clock.reset();
        assert_eq!(clock.advance(Duration::from_millis(9)), 0);
    }

    #[test]
    fn test_backlog_dropped() {
        let mut clock = Clock::new(Duration::from_millis(1));
        assert_eq!(clock.advance(Duration::from_secs(10)), 250);
    }

    #[test]
    fn test_stopped_clock() {
        let mut clock = Clock::new(Duration::ZERO);
        assert_eq!(clock.advance(Duration::from_secs(1)), 0);
    }
}
