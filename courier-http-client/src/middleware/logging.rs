//! Request/response logging middleware.

use super::{Middleware, Next};
use crate::{Request, Response, Result};
use async_trait::async_trait;
use http::HeaderMap;
use std::time::Instant;
use tracing::Level;

/// Placeholder logged in place of sensitive header values.
pub const REDACTED: &str = "***REDACTED***";

const SENSITIVE_HEADERS: [&str; 6] = [
    "authorization",
    "x-api-key",
    "api-key",
    "token",
    "x-auth-key",
    "x-auth-user-service-key",
];

/// `tracing::event!` needs a constant level.
macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {{
        let level = $level;
        if level == Level::TRACE {
            tracing::event!(Level::TRACE, $($arg)+)
        } else if level == Level::DEBUG {
            tracing::event!(Level::DEBUG, $($arg)+)
        } else if level == Level::INFO {
            tracing::event!(Level::INFO, $($arg)+)
        } else if level == Level::WARN {
            tracing::event!(Level::WARN, $($arg)+)
        } else {
            tracing::event!(Level::ERROR, $($arg)+)
        }
    }};
}

/// Logs each request, its response and any failure through `tracing`.
///
/// Values of well-known credential headers, and of any header value marked
/// sensitive, are replaced with [`REDACTED`]. Errors are logged and returned
/// unchanged.
#[derive(Debug, Clone)]
pub struct LoggingMiddleware {
    request_level: Level,
    response_level: Level,
    error_level: Level,
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self {
            request_level: Level::INFO,
            response_level: Level::INFO,
            error_level: Level::ERROR,
        }
    }
}

impl LoggingMiddleware {
    /// Log requests and responses at INFO and failures at ERROR.
    pub fn new() -> Self {
        Self::default()
    }

    /// Level for outgoing requests.
    pub fn with_request_level(mut self, level: Level) -> Self {
        self.request_level = level;
        self
    }

    /// Level for received responses.
    pub fn with_response_level(mut self, level: Level) -> Self {
        self.response_level = level;
        self
    }

    /// Level for failures.
    pub fn with_error_level(mut self, level: Level) -> Self {
        self.error_level = level;
        self
    }
}

/// Header pairs safe to log.
fn redacted_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name = name.as_str();
            let value = if value.is_sensitive() || SENSITIVE_HEADERS.contains(&name) {
                REDACTED.to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.to_string(), value)
        })
        .collect()
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<Response> {
        let method = request.method();
        let url = request.url().to_string();

        log_at!(
            self.request_level,
            method = %method,
            url = %url,
            headers = ?redacted_headers(request.headers()),
            "HTTP request"
        );

        let start = Instant::now();
        let result = next.run(request).await;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(response) => log_at!(
                self.response_level,
                method = %method,
                url = %url,
                status = response.status().as_u16(),
                duration_ms,
                "HTTP response"
            ),
            Err(error) => log_at!(
                self.error_level,
                method = %method,
                url = %url,
                error = %error,
                duration_ms,
                "HTTP request failed"
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{MiddlewareChain, endpoint_fn};
    use crate::{ApiKey, Authenticator, HttpClientError, Method, UserServiceKey};
    use http::{HeaderValue, StatusCode};
    use url::Url;

    fn request() -> Request {
        Request::new(Method::Get, Url::parse("https://api.example.com/zones").unwrap())
            .with_header("Authorization", "Bearer secret")
            .with_header("X-Api-Key", "k3y")
            .with_header("Accept", "application/json")
    }

    #[test]
    fn test_sensitive_headers_are_redacted() {
        let mut headers = request().headers().clone();
        headers.insert("token", HeaderValue::from_static("abc"));

        let logged = redacted_headers(&headers);
        let value = |name: &str| {
            logged
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(value("authorization"), Some(REDACTED));
        assert_eq!(value("x-api-key"), Some(REDACTED));
        assert_eq!(value("token"), Some(REDACTED));
        assert_eq!(value("accept"), Some("application/json"));
    }

    #[test]
    fn test_authenticator_secrets_are_redacted() {
        let mut headers = ApiKey::new("ops@example.com", "s3cr3t-global-key")
            .headers()
            .unwrap();
        headers.extend(UserServiceKey::new("v1.0-service").headers().unwrap());
        let mut marked = HeaderValue::from_static("hunter2");
        marked.set_sensitive(true);
        headers.insert("x-session-secret", marked);

        let logged = redacted_headers(&headers);
        let rendered = format!("{logged:?}");

        assert!(!rendered.contains("s3cr3t-global-key"));
        assert!(!rendered.contains("v1.0-service"));
        assert!(!rendered.contains("hunter2"));
        assert!(logged.contains(&("x-auth-email".to_string(), "ops@example.com".to_string())));
        assert!(logged.contains(&("x-auth-key".to_string(), REDACTED.to_string())));
    }

    #[tokio::test]
    async fn test_passes_response_through() {
        let chain = MiddlewareChain::new()
            .with_middleware(LoggingMiddleware::new().with_request_level(Level::DEBUG));
        let endpoint = endpoint_fn(|request: Request| async move {
            assert_eq!(request.header("authorization"), Some("Bearer secret"));
            Ok(Response::new(StatusCode::CREATED))
        });

        let response = chain.execute(request(), &endpoint).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_reraises_errors() {
        let chain = MiddlewareChain::new()
            .with_middleware(LoggingMiddleware::new().with_error_level(Level::WARN));
        let endpoint = endpoint_fn(|_request| async {
            Err(HttpClientError::Connection("reset by peer".to_string()))
        });

        let err = chain.execute(request(), &endpoint).await.unwrap_err();
        assert!(err.is_transport());
    }
}
