//! Integration tests for courier-ratelimit

use courier_ratelimit::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_attempt_never_returns_false() {
    let clock = ManualClock::new();
    let limiter = RateLimiter::new(3, Duration::from_secs(1))
        .unwrap()
        .with_clock(Arc::new(clock.clone()));

    for _ in 0..20 {
        assert!(limiter.attempt("api").await);
    }

    // 17 calls beyond the burst, each waiting one third of a second.
    let total = clock.total_slept().as_secs_f64();
    assert!((total - 17.0 / 3.0).abs() < 1e-6, "slept {total}");
}

#[tokio::test]
async fn test_wait_is_close_to_period_over_max() {
    let clock = ManualClock::new();
    let limiter = RateLimiter::new(10, Duration::from_secs(1))
        .unwrap()
        .with_clock(Arc::new(clock.clone()));

    for _ in 0..10 {
        limiter.attempt("api").await;
    }
    limiter.attempt("api").await;

    let sleeps = clock.sleeps();
    assert_eq!(sleeps.len(), 1);
    assert!((sleeps[0].as_secs_f64() - 0.1).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn test_shared_limiter_across_tasks() {
    let limiter = Arc::new(RateLimiter::new(5, Duration::from_secs(1)).unwrap());
    let start = tokio::time::Instant::now();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.attempt("shared").await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap());
    }

    // Five burst tokens, then five more at 200ms apiece.
    assert!(start.elapsed() >= Duration::from_millis(990));
}

#[test]
fn test_invalid_configuration() {
    let err = RateLimiter::new(0, Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, RateLimitError::ConfigError(_)));
}
