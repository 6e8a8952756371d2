//! Terminal stage: one logical call, retried beneath all middleware.

use crate::middleware::Endpoint;
use crate::retry::RetryStrategy;
use crate::transport::Transport;
use crate::{Request, Response, Result};
use async_trait::async_trait;
use courier_ratelimit::{Clock, SystemClock};
use std::sync::Arc;
use tracing::{debug, warn};

/// Sends a request through a [`Transport`], retrying per a [`RetryStrategy`].
///
/// A response with status 400 or above becomes
/// [`HttpClientError::Response`](crate::HttpClientError::Response). Between
/// attempts the stage sleeps on its [`Clock`]. Middleware around the chain
/// observe one call however many attempts happen here.
#[derive(Clone)]
pub struct ResilientTransport {
    transport: Arc<dyn Transport>,
    retry: Option<Arc<dyn RetryStrategy>>,
    clock: Arc<dyn Clock>,
}

impl ResilientTransport {
    /// Send each request once.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            retry: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Retry failed attempts per `strategy`.
    pub fn with_retry(mut self, strategy: impl RetryStrategy + 'static) -> Self {
        self.retry = Some(Arc::new(strategy));
        self
    }

    /// Retry failed attempts per a shared strategy.
    pub fn with_retry_strategy(mut self, strategy: Arc<dyn RetryStrategy>) -> Self {
        self.retry = Some(strategy);
        self
    }

    /// Replace the clock used for backoff sleeps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Execute the request with retry logic.
    pub async fn execute(&self, request: &Request) -> Result<Response> {
        let mut attempt = 1;

        loop {
            let error = match self.transport.send(request).await {
                Ok(response) if response.status().as_u16() < 400 => return Ok(response),
                Ok(response) => response.into_error(),
                Err(error) => error,
            };

            let Some(strategy) = &self.retry else {
                return Err(error);
            };

            if !strategy.should_retry(attempt, &error) {
                if attempt > 1 {
                    warn!(attempts = attempt, error = %error, "Request failed after retries");
                }
                return Err(error);
            }

            let delay = strategy.retry_delay(attempt);
            debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying request"
            );
            self.clock.sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl Endpoint for ResilientTransport {
    async fn call(&self, request: Request) -> Result<Response> {
        self.execute(&request).await
    }
}

impl std::fmt::Debug for ResilientTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientTransport")
            .field("retry", &self.retry.is_some())
            .finish_non_exhaustive()
    }
}
