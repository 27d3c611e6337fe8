//! Fixed-delay attempt schedule.
//!
//! Attempts are indexed from zero. Every attempt after the first is preceded
//! by the same fixed delay; there is no backoff growth and no jitter.

use std::time::Duration;

/// Default number of attempts for a request.
pub const DEFAULT_NUM_TRIES: u32 = 1;

/// Default pause between attempts.
pub const DEFAULT_DELAY_BETWEEN_TRIES: Duration = Duration::from_millis(500);

/// How many attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    num_tries: u32,
    delay: Duration,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_TRIES, DEFAULT_DELAY_BETWEEN_TRIES)
    }
}

impl RetrySchedule {
    /// Create a schedule. `num_tries` is clamped to at least one.
    pub fn new(num_tries: u32, delay: Duration) -> Self {
        Self {
            num_tries: num_tries.max(1),
            delay,
        }
    }

    /// Total attempts allowed.
    pub fn num_tries(&self) -> u32 {
        self.num_tries
    }

    /// Pause between attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether another attempt may be made after `attempts_made` failures.
    pub fn has_remaining(&self, attempts_made: u32) -> bool {
        attempts_made < self.num_tries
    }

    /// Delay to observe before attempt `attempt`, if any.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        (attempt > 0 && attempt < self.num_tries).then_some(self.delay)
    }

    /// Sleep for the delay preceding `attempt`.
    pub async fn wait_before(&self, attempt: u32) {
        if let Some(delay) = self.delay_before(attempt) {
            tokio::time::sleep(delay).await;
        }
    }
}
