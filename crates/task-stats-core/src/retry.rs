//! # Store Retry Policy
//!
//! Optional in-process retry for transient store failures during ingestion.
//!
//! The log already redelivers, so the policy is disabled unless configured.
//! When enabled, delays grow exponentially from `initial_delay`, are capped
//! at `max_delay` and carry random jitter.

use rand::Rng;
use std::time::Duration;

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;

/// Exponential backoff policy for ingestion store writes
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retry at all
    pub enabled: bool,

    /// Retries after the first attempt
    pub max_attempts: u32,

    pub initial_delay: Duration,

    pub max_delay: Duration,

    /// Growth factor per retry
    pub backoff_multiplier: f64,

    /// Jitter as a fraction of the delay (0.25 = ±25%); 0 disables it
    pub jitter_percent: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter_percent: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Create an enabled policy
    ///
    /// ```rust
    /// use task_stats_core::retry::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(3, Duration::from_millis(200), Duration::from_secs(5), 2.0);
    /// assert!(policy.enabled);
    /// ```
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            enabled: true,
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
            jitter_percent: 0.25,
        }
    }

    /// Policy that never retries
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter_percent = 0.0;
        self
    }

    /// Set jitter fraction, clamped to `0.0..=1.0`
    pub fn with_jitter_percent(mut self, percent: f64) -> Self {
        self.jitter_percent = percent.clamp(0.0, 1.0);
        self
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());

        let delay = if self.jitter_percent > 0.0 {
            let spread = capped * self.jitter_percent;
            (capped + rand::thread_rng().gen_range(-spread..=spread)).max(0.0)
        } else {
            capped
        };

        Duration::from_secs_f64(delay)
    }

    /// Whether retry number `attempt` (0-based) is allowed
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.enabled && attempt < self.max_attempts
    }
}

/// Attempt counter for one record
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    /// Retries performed so far
    pub attempt: u32,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_retry(&self, policy: &RetryPolicy) -> bool {
        policy.should_retry(self.attempt)
    }

    pub fn next_delay(&self, policy: &RetryPolicy) -> Duration {
        policy.calculate_delay(self.attempt)
    }

    pub fn next_attempt(&mut self) {
        self.attempt += 1;
    }

    /// Attempts made including the first
    pub fn total_attempts(&self) -> u32 {
        self.attempt + 1
    }
}
