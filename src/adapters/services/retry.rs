//! Simple exponential backoff retry policy.

use reqwest_retry::{RetryDecision, RetryPolicy};
use std::time::{Duration, SystemTime};

/// Exponential backoff retry policy.
///
/// Retries failed requests with exponentially increasing delays, capped at a maximum.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl BackoffPolicy {
    /// Create a new retry policy with default delays.
    ///
    /// # Arguments
    ///
    /// * `max_retries` - Maximum number of retry attempts after the first try
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Calculate exponential backoff delay.
    fn exponential_delay(&self, n_attempts: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * 2_f64.powi(n_attempts as i32);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

impl RetryPolicy for BackoffPolicy {
    fn should_retry(&self, _request_start_time: SystemTime, n_past_retries: u32) -> RetryDecision {
        if n_past_retries >= self.max_retries {
            RetryDecision::DoNotRetry
        } else {
            let delay = self.exponential_delay(n_past_retries);
            log::debug!(
                "Retrying request in {:?} ({}/{})",
                delay,
                n_past_retries + 1,
                self.max_retries
            );
            RetryDecision::Retry {
                execute_after: SystemTime::now() + delay,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_delay() {
        let policy = BackoffPolicy::new(3);

        assert_eq!(policy.exponential_delay(0).as_secs(), 1);
        assert_eq!(policy.exponential_delay(1).as_secs(), 2);
        assert_eq!(policy.exponential_delay(2).as_secs(), 4);
    }

    #[test]
    fn test_max_delay_cap() {
        let policy = BackoffPolicy::new(10);
        assert_eq!(policy.exponential_delay(10), policy.max_delay);
    }

    #[test]
    fn test_stops_after_max_retries() {
        let policy = BackoffPolicy::new(2);
        let start = SystemTime::now();

        assert!(matches!(
            policy.should_retry(start, 0),
            RetryDecision::Retry { .. }
        ));
        assert!(matches!(
            policy.should_retry(start, 1),
            RetryDecision::Retry { .. }
        ));
        assert!(matches!(
            policy.should_retry(start, 2),
            RetryDecision::DoNotRetry
        ));
    }

    #[test]
    fn test_zero_retries_never_retries() {
        let policy = BackoffPolicy::new(0);
        assert!(matches!(
            policy.should_retry(SystemTime::now(), 0),
            RetryDecision::DoNotRetry
        ));
    }
}
