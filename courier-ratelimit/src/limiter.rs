//! Keyed token bucket that waits instead of rejecting.
//!
//! Every key owns a bucket of `max_requests` tokens that refills
//! continuously at `max_requests / per` tokens per second.
//!
//! - A call that finds a whole token consumes it and returns at once.
//! - A call that finds less than one token sleeps until the deficit has
//!   refilled, then proceeds with the bucket drained to zero.
//!
//! Waiters reserve time under the bucket's lock before they sleep. When
//! several tasks hit an empty bucket together, each one waits for its own
//! token rather than all of them waking up for the same one.
//!
//! ```rust
//! use courier_ratelimit::{ManualClock, RateLimiter};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let clock = ManualClock::new();
//! let limiter = RateLimiter::new(2, Duration::from_secs(1))
//!     .unwrap()
//!     .with_clock(Arc::new(clock.clone()));
//!
//! assert!(limiter.attempt("api").await);
//! assert!(limiter.attempt("api").await);
//! assert!(clock.sleeps().is_empty());
//!
//! // The third call waits half a second for the next token.
//! assert!(limiter.attempt("api").await);
//! assert_eq!(clock.sleeps(), vec![Duration::from_millis(500)]);
//! # });
//! ```

use crate::clock::{Clock, SystemClock};
use crate::error::{RateLimitError, RateLimitResult};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Token bucket state for one key
#[derive(Debug, Clone)]
struct BucketState {
    /// Current number of tokens
    tokens: f64,
    /// Instant the token count was last brought up to date.
    ///
    /// Lies in the future while a waiter holds a reservation.
    last_refill: Instant,
}

/// Keyed token-bucket rate limiter
pub struct RateLimiter {
    max_requests: u32,
    per: Duration,
    buckets: DashMap<String, BucketState>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` calls per `per` for each key.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either argument is zero.
    pub fn new(max_requests: u32, per: Duration) -> RateLimitResult<Self> {
        if max_requests == 0 {
            return Err(RateLimitError::config(
                "max_requests must be greater than 0",
            ));
        }
        if per.is_zero() {
            return Err(RateLimitError::config("period must be greater than 0"));
        }

        debug!(max_requests, per = ?per, "Creating rate limiter");

        Ok(Self {
            max_requests,
            per,
            buckets: DashMap::new(),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bucket capacity
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Refill period for a full bucket
    pub fn per(&self) -> Duration {
        self.per
    }

    /// Number of keys with a bucket
    pub fn key_count(&self) -> usize {
        self.buckets.len()
    }

    /// Tokens added per second
    fn refill_rate(&self) -> f64 {
        self.max_requests as f64 / self.per.as_secs_f64()
    }

    /// Token count of `state` projected to `now`, capped at capacity.
    fn refilled(&self, state: &BucketState, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        (state.tokens + elapsed * self.refill_rate()).min(self.max_requests as f64)
    }

    /// Consume a token for `key`, waiting for one if the bucket is empty.
    ///
    /// Always returns `true`; the wait is the only effect of running dry.
    pub async fn attempt(&self, key: &str) -> bool {
        if let Some(wait) = self.reserve(key) {
            debug!(key, wait = ?wait, "Rate limit reached, waiting for token");
            self.clock.sleep(wait).await;
        }
        true
    }

    /// Take a token or reserve the time at which the next one is ours.
    fn reserve(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let capacity = self.max_requests as f64;

        let mut state = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| BucketState {
                tokens: capacity,
                last_refill: now,
            });

        let pending = state.last_refill.saturating_duration_since(now);
        let tokens = self.refilled(&state, now);
        state.tokens = tokens;
        if pending.is_zero() {
            state.last_refill = now;
        }

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            trace!(key, remaining = state.tokens, "Token consumed");
            return None;
        }

        let deficit = (1.0 - state.tokens) / capacity * self.per.as_secs_f64();
        let wait = pending + Duration::from_secs_f64(deficit);

        state.tokens = 0.0;
        state.last_refill = now + wait;

        Some(wait)
    }

    /// Whether a call for `key` would proceed without waiting.
    ///
    /// Never consumes a token. Unknown keys report `true`.
    pub fn check(&self, key: &str) -> bool {
        match self.buckets.get(key) {
            Some(state) => self.refilled(&state, self.clock.now()) >= 1.0,
            None => true,
        }
    }

    /// Whole tokens currently available for `key`.
    pub fn remaining(&self, key: &str) -> u32 {
        match self.buckets.get(key) {
            Some(state) => self.refilled(&state, self.clock.now()).floor() as u32,
            None => self.max_requests,
        }
    }

    /// Forget the bucket for `key`; its next call sees a full bucket.
    pub fn reset(&self, key: &str) {
        if self.buckets.remove(key).is_some() {
            trace!(key, "Rate limit bucket reset");
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_requests", &self.max_requests)
            .field("per", &self.per)
            .field("keys", &self.buckets.len())
            .finish()
    }
}
