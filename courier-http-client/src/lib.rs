//! # Courier HTTP Client
//!
//! An HTTP client core built around a middleware chain, with retry and
//! backoff, client-side rate limiting, response caching and a cookie jar.
//!
//! ## Features
//!
//! - **Middleware Chain**: Ordered interceptors that may rewrite the request,
//!   inspect the response or short-circuit the call
//! - **Retry with Backoff**: Constant or exponential delays, retried beneath
//!   all middleware so each logical call is observed once
//! - **Rate Limiting**: Shared keyed token buckets that delay rather than reject
//! - **Response Caching**: Fingerprinted GET responses honoring `Cache-Control`
//!   and `Expires`
//! - **Cookies**: A jar fed by `Set-Cookie` and replayed by domain and path
//! - **Observability**: Logging with header redaction, lifecycle events and a
//!   circuit breaker
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier_http_client::{HttpClient, HttpClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HttpClientConfig::builder()
//!         .base_url("https://api.example.com/v4")
//!         .bearer_token("t0k3n")
//!         .build()?;
//!     let client = HttpClient::new(config)?;
//!
//!     let response = client.get("/zones").data("page", 2).send().await?;
//!
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! ## With Middleware and Retry
//!
//! ```rust,no_run
//! use courier_cache::InMemoryCache;
//! use courier_http_client::middleware::{CacheMiddleware, CookieMiddleware, RateLimitMiddleware};
//! use courier_http_client::{HttpClient, HttpClientConfig, RetryConfig};
//! use courier_ratelimit::RateLimiter;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HttpClientConfig::builder()
//!         .base_url("https://api.example.com")
//!         .retry(RetryConfig::exponential(3, Duration::from_millis(100)))
//!         .build()?;
//!
//!     let limiter = Arc::new(RateLimiter::new(10, Duration::from_secs(1))?);
//!     let client = HttpClient::new(config)?
//!         .with_middleware(RateLimitMiddleware::new(limiter))
//!         .with_middleware(CookieMiddleware::new())
//!         .with_middleware(CacheMiddleware::new(Arc::new(InMemoryCache::new())));
//!
//!     let zones: serde_json::Value = client.get_json("/zones").await?;
//!     println!("{zones}");
//!     Ok(())
//! }
//! ```

mod auth;
mod circuit_breaker;
mod client;
mod config;
mod cookie;
mod error;
mod events;
mod request;
mod resilient;
mod response;
mod retry;
mod transport;

pub mod middleware;

pub use auth::{
    ApiKey, ApiToken, Authenticator, BasicAuth, CustomHeaders, GoogleServiceAccount, NoAuth,
    SERVICE_ACCOUNT_TOKEN_LIFETIME, ServiceAccountClaims, UserServiceKey,
};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::HttpClient;
pub use config::{HttpClientConfig, HttpClientConfigBuilder};
pub use cookie::{Cookie, CookieJar};
pub use error::{HttpClientError, Result};
pub use events::{EventDispatcher, HttpEvent, Listener};
pub use middleware::{Middleware, MiddlewareChain, Next};
pub use request::{FORM_PARAMS, Method, Request, RequestBuilder};
pub use resilient::ResilientTransport;
pub use response::Response;
pub use retry::{BackoffStrategy, RetryConfig, RetryStrategy};
pub use transport::{ReqwestTransport, Transport};

pub use courier_ratelimit::{Clock, ManualClock, SystemClock};

// Re-export common types
pub use bytes::Bytes;
pub use http::{HeaderMap, HeaderValue, StatusCode, header};
pub use url::Url;

/// Prelude for common imports.
///
/// ```
/// use courier_http_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::auth::{Authenticator, NoAuth};
    pub use crate::client::HttpClient;
    pub use crate::config::{HttpClientConfig, HttpClientConfigBuilder};
    pub use crate::error::{HttpClientError, Result};
    pub use crate::middleware::{
        CacheMiddleware, CookieMiddleware, LoggingMiddleware, Middleware, MiddlewareChain, Next,
        RateLimitMiddleware,
    };
    pub use crate::request::{Method, Request, RequestBuilder};
    pub use crate::response::Response;
    pub use crate::retry::{BackoffStrategy, RetryConfig, RetryStrategy};
    pub use http::{HeaderMap, HeaderValue, StatusCode, header};
}
