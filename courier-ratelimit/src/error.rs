//! Error types for rate limiting

use thiserror::Error;

/// Result type for rate limiting operations
pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// Rate limiting errors
///
/// The limiter itself never rejects a call (it waits instead), so the only
/// failures are invalid construction parameters.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Configuration error
    #[error("Rate limit configuration error: {0}")]
    ConfigError(String),
}

impl RateLimitError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if this error is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = RateLimitError::config("max_requests must be greater than 0");
        assert!(error.is_config());
        assert_eq!(
            error.to_string(),
            "Rate limit configuration error: max_requests must be greater than 0"
        );
    }
}
