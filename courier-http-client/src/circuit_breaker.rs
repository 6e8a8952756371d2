//! Circuit breaker state machine.

use courier_ratelimit::{Clock, SystemClock};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are rejected without being sent.
    Open,
    /// A limited number of trial requests are let through.
    HalfOpen,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failures within `failure_window` that open the circuit.
    pub failure_threshold: u32,
    /// Trial successes that close a half-open circuit.
    pub success_threshold: u32,
    /// How long the circuit stays open before going half-open.
    pub reset_timeout: Duration,
    /// Trial requests admitted while half-open.
    pub half_open_requests: u32,
    /// Failures older than this no longer count toward the threshold.
    pub failure_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            reset_timeout: Duration::from_secs(30),
            half_open_requests: 3,
            failure_window: Duration::from_secs(60),
        }
    }
}

impl CircuitBreakerConfig {
    /// Open after `failure_threshold` failures; retry after `reset_timeout`.
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
            ..Default::default()
        }
    }

    /// Set the trial successes needed to close the circuit.
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Set the number of trial requests admitted while half-open.
    pub fn with_half_open_requests(mut self, count: u32) -> Self {
        self.half_open_requests = count;
        self
    }

    /// Set the failure counting window.
    pub fn with_failure_window(mut self, window: Duration) -> Self {
        self.failure_window = window;
        self
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failures: u32,
    window_started: Option<Instant>,
    successes: u32,
    trials: u32,
    opened_at: Option<Instant>,
}

impl BreakerState {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            window_started: None,
            successes: 0,
            trials: 0,
            opened_at: None,
        }
    }
}

/// Tracks call outcomes and decides whether new calls may proceed.
///
/// Time is read from an injectable [`Clock`], so the open-to-half-open
/// transition can be driven in tests without sleeping.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    /// Create a closed circuit breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerState::closed()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state, after any due open-to-half-open transition.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        self.half_open_if_due(&mut inner);
        inner.state
    }

    /// Whether a call may proceed. Admitting a half-open trial uses up a slot.
    pub fn is_allowed(&self) -> bool {
        let mut inner = self.inner.lock();
        self.half_open_if_due(&mut inner);

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if inner.trials < self.config.half_open_requests {
                    inner.trials += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a call that succeeded.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.failures = 0;
                inner.window_started = None;
            }
            CircuitState::HalfOpen => {
                inner.successes += 1;
                if inner.successes >= self.config.success_threshold {
                    info!("Circuit breaker closing");
                    *inner = BreakerState::closed();
                }
            }
            CircuitState::Open => debug!("Success recorded while circuit open, ignoring"),
        }
    }

    /// Record a call that failed.
    pub fn record_failure(&self) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => {
                let window_expired = inner
                    .window_started
                    .is_none_or(|started| now.saturating_duration_since(started) > self.config.failure_window);
                if window_expired {
                    inner.window_started = Some(now);
                    inner.failures = 1;
                } else {
                    inner.failures += 1;
                }

                if inner.failures >= self.config.failure_threshold {
                    self.open(&mut inner, now);
                }
            }
            CircuitState::HalfOpen => self.open(&mut inner, now),
            CircuitState::Open => {}
        }
    }

    /// Failures counted in the current window.
    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failures
    }

    /// Trial successes while half-open.
    pub fn success_count(&self) -> u32 {
        self.inner.lock().successes
    }

    /// Force the circuit closed and clear all counters.
    pub fn reset(&self) {
        *self.inner.lock() = BreakerState::closed();
    }

    fn open(&self, inner: &mut BreakerState, now: Instant) {
        warn!(failures = inner.failures, "Circuit breaker opening");
        *inner = BreakerState {
            state: CircuitState::Open,
            opened_at: Some(now),
            ..BreakerState::closed()
        };
    }

    fn half_open_if_due(&self, inner: &mut BreakerState) {
        if inner.state != CircuitState::Open {
            return;
        }
        if let Some(opened) = inner.opened_at
            && self.clock.now().saturating_duration_since(opened) >= self.config.reset_timeout
        {
            debug!("Circuit breaker transitioning to half-open");
            inner.state = CircuitState::HalfOpen;
            inner.successes = 0;
            inner.trials = 0;
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("state", &self.inner.lock().state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_ratelimit::ManualClock;

    fn breaker(config: CircuitBreakerConfig) -> (CircuitBreaker, ManualClock) {
        let clock = ManualClock::new();
        let breaker = CircuitBreaker::new(config).with_clock(Arc::new(clock.clone()));
        (breaker, clock)
    }

    #[test]
    fn test_opens_after_threshold() {
        let (cb, _) = breaker(CircuitBreakerConfig::new(3, Duration::from_secs(30)));

        assert!(cb.is_allowed());
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.is_allowed());
    }

    #[test]
    fn test_success_resets_failures() {
        let (cb, _) = breaker(CircuitBreakerConfig::new(3, Duration::from_secs(30)));

        cb.record_failure();
        cb.record_failure();
        cb.record_success();

        assert_eq!(cb.failure_count(), 0);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_failures_outside_window_do_not_accumulate() {
        let (cb, clock) = breaker(
            CircuitBreakerConfig::new(2, Duration::from_secs(30))
                .with_failure_window(Duration::from_secs(10)),
        );

        cb.record_failure();
        clock.advance(Duration::from_secs(11));
        cb.record_failure();

        assert_eq!(cb.failure_count(), 1);
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_half_open_after_reset_timeout() {
        let (cb, clock) = breaker(
            CircuitBreakerConfig::new(1, Duration::from_secs(30))
                .with_half_open_requests(2)
                .with_success_threshold(2),
        );

        cb.record_failure();
        clock.advance(Duration::from_secs(29));
        assert_eq!(cb.state(), CircuitState::Open);

        clock.advance(Duration::from_secs(1));
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        assert!(cb.is_allowed());
        assert!(cb.is_allowed());
        assert!(!cb.is_allowed());

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let (cb, clock) = breaker(CircuitBreakerConfig::new(1, Duration::from_secs(5)));

        cb.record_failure();
        clock.advance(Duration::from_secs(5));
        assert!(cb.is_allowed());

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.is_allowed());
    }

    #[test]
    fn test_reset_closes() {
        let (cb, _) = breaker(CircuitBreakerConfig::new(1, Duration::from_secs(30)));
        cb.record_failure();
        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.is_allowed());
    }
}
