//! Bounded exponential backoff for the connect step.

use std::time::Duration;

/// Configuration for connect retries.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Growth factor applied after every failure.
    pub multiplier: f64,
    /// Total connect attempts per round, including the first (minimum 1).
    pub max_attempts: usize,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_attempts: 5,
        }
    }
}

impl BackoffConfig {
    /// Config that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Returns the delay to wait after the `failures`-th failure (1-based).
    #[must_use]
    pub fn delay_for(&self, failures: usize) -> Duration {
        let exponent = failures.saturating_sub(1).min(i32::MAX as usize) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let nanos = (self.initial_delay.as_nanos() as f64 * factor).round();
        if nanos < self.max_delay.as_nanos() as f64 {
            Duration::from_nanos(nanos as u64)
        } else {
            self.max_delay
        }
    }
}

/// Counts failed connects within one round and hands out delays.
#[derive(Debug, Clone)]
pub struct ConnectBackoff {
    config: BackoffConfig,
    failures: usize,
}

impl ConnectBackoff {
    /// Creates a new backoff tracker.
    #[must_use]
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            failures: 0,
        }
    }

    /// Records a failed attempt.
    ///
    /// Returns the delay before the next attempt, or `None` once the attempt
    /// budget is spent.
    pub fn on_failure(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.failures >= self.config.max_attempts.max(1) {
            return None;
        }
        Some(self.config.delay_for(self.failures))
    }

    /// Resets the failure count after a successful connect.
    pub fn on_success(&mut self) {
        self.failures = 0;
    }

    /// Returns the number of attempts made in the current round.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.failures
    }
}
