// Courier - an HTTP client core built around a middleware chain
//
// This library re-exports the client, the rate limiter and the cache stores
// so applications can depend on a single crate.

// Re-export the client
pub use courier_http_client::*;

// Re-export the supporting crates
pub use courier_cache;
pub use courier_http_client;
pub use courier_ratelimit;

pub use courier_cache::{CacheError, CacheResult, CacheStore, InMemoryCache};
pub use courier_ratelimit::{RateLimitError, RateLimitResult, RateLimiter};

// Prelude for common imports
pub mod prelude {
    pub use courier_cache::{CacheStore, InMemoryCache};
    pub use courier_http_client::middleware::{
        CacheMiddleware, CircuitBreakerMiddleware, CookieMiddleware, EventMiddleware,
        LoggingMiddleware, RateLimitMiddleware,
    };
    pub use courier_http_client::prelude::*;
    pub use courier_ratelimit::{Clock, ManualClock, RateLimiter, SystemClock};
}
