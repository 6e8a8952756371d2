//! Circuit breaker middleware.

use super::{Middleware, Next};
use crate::circuit_breaker::CircuitBreaker;
use crate::{HttpClientError, Request, Response, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Rejects requests with [`HttpClientError::CircuitOpen`] while the circuit is open.
///
/// Transport failures and 5xx status errors count against the circuit.
/// Other outcomes, 4xx errors included, count as successes.
#[derive(Debug, Clone)]
pub struct CircuitBreakerMiddleware {
    breaker: Arc<CircuitBreaker>,
}

impl CircuitBreakerMiddleware {
    /// Guard requests with `breaker`.
    pub fn new(breaker: Arc<CircuitBreaker>) -> Self {
        Self { breaker }
    }

    /// The shared breaker.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}

fn counts_as_failure(error: &HttpClientError) -> bool {
    error.is_transport() || error.status_code().is_some_and(|status| status >= 500)
}

#[async_trait]
impl Middleware for CircuitBreakerMiddleware {
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<Response> {
        if !self.breaker.is_allowed() {
            debug!(url = %request.url(), "Circuit open, rejecting request");
            return Err(HttpClientError::CircuitOpen);
        }

        let result = next.run(request).await;
        match &result {
            Err(error) if counts_as_failure(error) => self.breaker.record_failure(),
            _ => self.breaker.record_success(),
        }
        result
    }
}
