//! Client-side rate limiting middleware.

use super::{Middleware, Next};
use crate::{Request, Response, Result};
use async_trait::async_trait;
use courier_ratelimit::RateLimiter;
use std::sync::Arc;
use tracing::trace;

/// Waits for a token from a shared [`RateLimiter`] before each request.
///
/// Every request is eventually sent; when the bucket is empty the middleware
/// sleeps until a token is available. All requests draw from one key, so
/// clients sharing a limiter and key share one budget.
#[derive(Debug)]
pub struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
    key: String,
}

impl RateLimitMiddleware {
    /// Key used when none is configured.
    pub const DEFAULT_KEY: &'static str = "default";

    /// Limit requests through `limiter` under the default key.
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            limiter,
            key: Self::DEFAULT_KEY.to_string(),
        }
    }

    /// Draw tokens from `key` instead of the default key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// The shared limiter.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// The bucket key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<Response> {
        self.limiter.attempt(&self.key).await;
        trace!(key = %self.key, url = %request.url(), "Rate limit token acquired");
        next.run(request).await
    }
}
