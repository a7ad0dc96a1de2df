//! Attempt accounting for the register and faucet loops

/// What a registration loop should do after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStep {
    /// Try again
    Continue,
    /// Enough successful submissions; stop
    Success,
    /// Too many consecutive failures; stop
    Exhausted,
}

/// Counts consecutive failures and total successes.
#[derive(Debug, Clone)]
pub struct AttemptTracker {
    max_attempts: u32,
    max_successes: u32,
    failures: u32,
    successes: u32,
}

impl AttemptTracker {
    /// `max_attempts` consecutive failures end the loop, as do
    /// `max_successes` successes. Both are at least one.
    pub fn new(max_attempts: u32, max_successes: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            max_successes: max_successes.max(1),
            failures: 0,
            successes: 0,
        }
    }

    /// One success ends the loop.
    pub fn single(max_attempts: u32) -> Self {
        Self::new(max_attempts, 1)
    }

    pub fn record_success(&mut self) -> AttemptStep {
        self.successes += 1;
        self.failures = 0;
        if self.successes >= self.max_successes {
            AttemptStep::Success
        } else {
            AttemptStep::Continue
        }
    }

    pub fn record_failure(&mut self) -> AttemptStep {
        self.failures += 1;
        if self.failures >= self.max_attempts {
            AttemptStep::Exhausted
        } else {
            AttemptStep::Continue
        }
    }

    pub fn successes(&self) -> u32 {
        self.successes
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// 1-based number of the attempt about to run
    pub fn attempt(&self) -> u32 {
        self.failures + 1
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_exhaust() {
        let mut tracker = AttemptTracker::single(3);
        assert_eq!(tracker.record_failure(), AttemptStep::Continue);
        assert_eq!(tracker.record_failure(), AttemptStep::Continue);
        assert_eq!(tracker.record_failure(), AttemptStep::Exhausted);
    }

    #[test]
    fn test_success_resets_failures() {
        let mut tracker = AttemptTracker::new(2, 3);
        assert_eq!(tracker.record_failure(), AttemptStep::Continue);
        assert_eq!(tracker.record_success(), AttemptStep::Continue);
        assert_eq!(tracker.failures(), 0);
        assert_eq!(tracker.record_failure(), AttemptStep::Continue);
        assert_eq!(tracker.record_success(), AttemptStep::Continue);
        assert_eq!(tracker.record_success(), AttemptStep::Success);
        assert_eq!(tracker.successes(), 3);
    }

    #[test]
    fn test_single_success_finishes() {
        let mut tracker = AttemptTracker::single(3);
        assert_eq!(tracker.attempt(), 1);
        assert_eq!(tracker.record_success(), AttemptStep::Success);
    }

    #[test]
    fn test_zero_limits_clamped() {
        let mut tracker = AttemptTracker::new(0, 0);
        assert_eq!(tracker.max_attempts(), 1);
        assert_eq!(tracker.record_failure(), AttemptStep::Exhausted);
    }
}
