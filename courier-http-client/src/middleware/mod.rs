//! Middleware chain for HTTP client.
//!
//! Middleware wrap one terminal [`Endpoint`]. The first middleware added is
//! the outermost: it sees the request first and the response last.
//!
//! ```rust
//! use async_trait::async_trait;
//! use courier_http_client::middleware::{Middleware, Next};
//! use courier_http_client::{Request, Response, Result};
//!
//! struct UserAgent;
//!
//! #[async_trait]
//! impl Middleware for UserAgent {
//!     async fn handle(&self, request: Request, next: Next<'_>) -> Result<Response> {
//!         next.run(request.with_header("User-Agent", "courier")).await
//!     }
//! }
//! ```

mod cache;
mod circuit_breaker;
mod cookie;
mod events;
mod logging;
mod rate_limit;

pub use cache::{CacheMiddleware, fingerprint};
pub use circuit_breaker::CircuitBreakerMiddleware;
pub use cookie::CookieMiddleware;
pub use events::EventMiddleware;
pub use logging::{LoggingMiddleware, REDACTED};
pub use rate_limit::RateLimitMiddleware;

use crate::{Request, Response, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Middleware trait for processing requests and responses.
///
/// An implementation may change the request before calling `next`, inspect
/// or replace the response after, or return without calling `next` at all
/// to short-circuit the chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process the request and call the next middleware.
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<Response>;
}

/// The innermost stage of a chain.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Execute the request.
    async fn call(&self, request: Request) -> Result<Response>;
}

/// The remainder of the chain, handed to each middleware.
///
/// `run` consumes it, so a middleware continues the chain at most once.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    /// Continue to the next middleware, or the endpoint after the last one.
    pub fn run(self, request: Request) -> BoxFuture<'a, Result<Response>> {
        match self.middlewares.split_first() {
            Some((current, rest)) => current.handle(
                request,
                Next {
                    middlewares: rest,
                    endpoint: self.endpoint,
                },
            ),
            None => self.endpoint.call(request),
        }
    }
}

/// Chain of middleware handlers.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Create an empty middleware chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the chain.
    pub fn with_middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Add a shared middleware to the chain.
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Number of registered middleware.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Whether no middleware is registered.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Execute the request through the middleware chain.
    pub async fn execute(&self, request: Request, endpoint: &dyn Endpoint) -> Result<Response> {
        Next {
            middlewares: &self.middlewares,
            endpoint,
        }
        .run(request)
        .await
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

/// Endpoint backed by an async function.
pub struct FnEndpoint<F> {
    f: F,
}

/// Wrap an async function as an [`Endpoint`].
pub fn endpoint_fn<F, Fut>(f: F) -> FnEndpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send,
{
    FnEndpoint { f }
}

#[async_trait]
impl<F, Fut> Endpoint for FnEndpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send,
{
    async fn call(&self, request: Request) -> Result<Response> {
        (self.f)(request).await
    }
}
