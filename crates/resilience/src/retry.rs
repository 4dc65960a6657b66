// crates/resilience/src/retry.rs
//! Exponential backoff between failed sync passes

use crate::error::{ResilienceError, ResilienceResult};
use std::time::Duration;

/// Backoff policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay after the first failure
    initial_delay: Duration,
    /// Upper bound for any delay
    max_delay: Duration,
    /// Backoff multiplier
    multiplier: f64,
    /// Whether to spread delays to avoid synchronized retries across devices
    use_jitter: bool,
}

impl RetryPolicy {
    /// Creates a policy starting at `initial_delay`
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay: Duration::from_secs(300),
            multiplier: 2.0,
            use_jitter: true,
        }
    }

    /// Sets the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets whether to use jitter
    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Checks that the policy can produce sensible delays
    pub fn validate(&self) -> ResilienceResult<()> {
        if self.initial_delay.is_zero() {
            return Err(ResilienceError::InvalidPolicy(
                "initial delay must be greater than zero".to_string(),
            ));
        }
        if self.max_delay < self.initial_delay {
            return Err(ResilienceError::InvalidPolicy(format!(
                "max delay {:?} is shorter than initial delay {:?}",
                self.max_delay, self.initial_delay
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ResilienceError::InvalidPolicy(format!(
                "multiplier must be >= 1.0, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }

    /// Calculates the delay after `failures` consecutive failures
    pub fn delay_for_attempt(&self, failures: usize) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(failures - 1).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.use_jitter {
            // Deterministic spread between 75% and 100% of the capped delay
            let jitter_factor = 0.75 + (failures as f64 * 0.1 % 0.25);
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

/// Tracks consecutive failures and yields the next delay
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    failures: usize,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    /// Records a failure and returns the delay before the next attempt
    pub fn record_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.policy.delay_for_attempt(self.failures)
    }

    /// Resets the failure streak
    pub fn record_success(&mut self) {
        self.failures = 0;
    }

    /// Number of consecutive failures so far
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Delay for the current streak, or `regular` when there is none
    ///
    /// Backoff delays never exceed `regular`, so a failing device retries at
    /// least as often as a healthy one.
    pub fn next_delay(&self, regular: Duration) -> Duration {
        if self.failures == 0 {
            regular
        } else {
            self.policy.delay_for_attempt(self.failures).min(regular)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_builder() {
        let policy = RetryPolicy::new(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(60))
            .with_multiplier(3.0)
            .with_jitter(false);

        assert_eq!(policy.initial_delay, Duration::from_millis(200));
        assert_eq!(policy.max_delay, Duration::from_secs(60));
        assert_eq!(policy.multiplier, 3.0);
        assert!(!policy.use_jitter);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::new(Duration::from_millis(100))
            .with_multiplier(2.0)
            .with_jitter(false);

        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_max_delay_capping() {
        let policy = RetryPolicy::new(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_jitter(false);

        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(usize::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::new(Duration::from_millis(1000)).with_max_delay(Duration::from_secs(1));
        for failures in 1..20 {
            let delay = policy.delay_for_attempt(failures);
            assert!(delay >= Duration::from_millis(750), "{delay:?}");
            assert!(delay <= Duration::from_millis(1000), "{delay:?}");
        }
    }

    #[test]
    fn test_invalid_policies() {
        assert!(RetryPolicy::new(Duration::ZERO).validate().is_err());
        assert!(RetryPolicy::new(Duration::from_secs(10))
            .with_max_delay(Duration::from_secs(1))
            .validate()
            .is_err());
        assert!(RetryPolicy::default().with_multiplier(0.5).validate().is_err());
    }

    #[test]
    fn test_backoff_streak() {
        let policy = RetryPolicy::new(Duration::from_millis(100)).with_jitter(false);
        let mut backoff = Backoff::new(policy);
        let regular = Duration::from_secs(60);

        assert_eq!(backoff.next_delay(regular), regular);
        assert_eq!(backoff.record_failure(), Duration::from_millis(100));
        assert_eq!(backoff.record_failure(), Duration::from_millis(200));
        assert_eq!(backoff.failures(), 2);
        assert_eq!(backoff.next_delay(regular), Duration::from_millis(200));

        backoff.record_success();
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.next_delay(regular), regular);
    }

    #[test]
    fn test_backoff_never_exceeds_regular_interval() {
        let policy = RetryPolicy::new(Duration::from_secs(10)).with_jitter(false);
        let mut backoff = Backoff::new(policy);
        backoff.record_failure();
        assert_eq!(
            backoff.next_delay(Duration::from_secs(5)),
            Duration::from_secs(5)
        );
    }
}
