//! Retry configuration and strategies.

use crate::HttpClientError;
use std::time::Duration;

/// Retry configuration.
///
/// Only HTTP status failures are retried. Transport failures (connect,
/// timeout, DNS) surface on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Status codes that should trigger a retry.
    pub retry_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential {
                base: Duration::from_millis(1000),
                max: Duration::from_millis(30_000),
            },
            retry_status_codes: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// Create a retry config with exponential backoff.
    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: BackoffStrategy::Exponential {
                base: base_delay,
                max: Duration::from_millis(30_000),
            },
            ..Default::default()
        }
    }

    /// Create a retry config with constant delay.
    pub fn constant(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: BackoffStrategy::Constant(delay),
            ..Default::default()
        }
    }

    /// A single attempt, never retried.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Replace the status codes to retry on.
    pub fn with_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.retry_status_codes = codes;
        self
    }

    /// Cap exponential backoff at `max`.
    pub fn with_max_delay(mut self, max: Duration) -> Self {
        if let BackoffStrategy::Exponential { max: cap, .. } = &mut self.backoff {
            *cap = max;
        }
        self
    }

    /// Calculate delay after a failed attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay_for_attempt(attempt)
    }

    /// Check if a status code should trigger a retry.
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }

    /// Check the configuration for values that cannot work.
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_attempts == 0 {
            return Err(HttpClientError::configuration(
                "Retry max_attempts must be at least 1",
            ));
        }
        if let BackoffStrategy::Exponential { base, max } = self.backoff
            && base > max
        {
            return Err(HttpClientError::configuration(format!(
                "Retry base delay {base:?} exceeds max delay {max:?}"
            )));
        }
        Ok(())
    }
}

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Same delay before every retry.
    Constant(Duration),
    /// Delay doubles after each attempt: `min(base * 2^(attempt - 1), max)`.
    Exponential {
        /// Delay after the first attempt.
        base: Duration,
        /// Maximum delay.
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Calculate delay after a failed attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match *self {
            Self::Constant(delay) => delay,
            Self::Exponential { base, max } => {
                let factor = 1u32
                    .checked_shl(attempt.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

/// Retry strategy trait for custom retry logic.
pub trait RetryStrategy: Send + Sync {
    /// Check if the request should be retried after failed `attempt` (1-indexed).
    fn should_retry(&self, attempt: u32, error: &HttpClientError) -> bool;

    /// Get the delay before the attempt after `attempt`.
    fn retry_delay(&self, attempt: u32) -> Duration;
}

impl RetryStrategy for RetryConfig {
    fn should_retry(&self, attempt: u32, error: &HttpClientError) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }

        match error {
            HttpClientError::Response { status, .. } => self.should_retry_status(*status),
            _ => false,
        }
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        self.delay_for_attempt(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: u16) -> HttpClientError {
        HttpClientError::Response {
            status,
            reason: String::new(),
            body: String::new(),
        }
    }

    #[test]
    fn test_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_status_codes, vec![408, 429, 500, 502, 503, 504]);
        assert_eq!(
            config.backoff,
            BackoffStrategy::Exponential {
                base: Duration::from_secs(1),
                max: Duration::from_secs(30),
            }
        );
    }

    #[test]
    fn test_exponential_backoff() {
        let strategy = BackoffStrategy::Exponential {
            base: Duration::from_millis(1000),
            max: Duration::from_millis(30_000),
        };

        assert_eq!(strategy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(strategy.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(strategy.delay_for_attempt(3), Duration::from_millis(4000));
        assert_eq!(strategy.delay_for_attempt(5), Duration::from_millis(16_000));
        assert_eq!(strategy.delay_for_attempt(6), Duration::from_millis(30_000));
    }

    #[test]
    fn test_exponential_matches_formula() {
        let base = Duration::from_millis(150);
        let max = Duration::from_secs(20);
        let strategy = BackoffStrategy::Exponential { base, max };

        for attempt in 1..=12u32 {
            let expected = (base * 2u32.pow(attempt - 1)).min(max);
            assert_eq!(strategy.delay_for_attempt(attempt), expected, "attempt {attempt}");
        }
    }

    #[test]
    fn test_exponential_saturates_for_large_attempts() {
        let strategy = BackoffStrategy::Exponential {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
        };

        assert_eq!(strategy.delay_for_attempt(64), Duration::from_secs(30));
        assert_eq!(strategy.delay_for_attempt(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_constant_backoff() {
        let strategy = BackoffStrategy::Constant(Duration::from_millis(500));

        assert_eq!(strategy.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(strategy.delay_for_attempt(5), Duration::from_millis(500));
    }

    #[test]
    fn test_should_retry_status_until_attempts_run_out() {
        let config = RetryConfig::default().with_status_codes(vec![503]);

        assert!(config.should_retry(1, &status_error(503)));
        assert!(config.should_retry(2, &status_error(503)));
        assert!(!config.should_retry(3, &status_error(503)));
        assert!(!config.should_retry(1, &status_error(404)));
    }

    #[test]
    fn test_transport_errors_are_not_retried() {
        let config = RetryConfig::default();

        assert!(!config.should_retry(1, &HttpClientError::Connection("refused".into())));
        assert!(!config.should_retry(1, &HttpClientError::Timeout(Duration::from_secs(30))));
        assert!(!config.should_retry(1, &HttpClientError::decode("bad json")));
    }

    #[test]
    fn test_validate() {
        assert!(RetryConfig::default().validate().is_ok());
        assert!(RetryConfig::disabled().validate().is_ok());

        let zero = RetryConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(zero.validate().unwrap_err().is_configuration());

        let inverted = RetryConfig::exponential(3, Duration::from_secs(60));
        assert!(inverted.validate().unwrap_err().is_configuration());
    }
}
