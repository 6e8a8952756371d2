//! Cookie jar middleware.

use super::{Middleware, Next};
use crate::cookie::{Cookie, CookieJar};
use crate::{Request, Response, Result};
use async_trait::async_trait;
use http::HeaderValue;
use http::header::{COOKIE, SET_COOKIE};
use std::sync::Arc;
use tracing::{debug, warn};

/// Attaches stored cookies to requests and stores cookies from responses.
///
/// Before the request continues, every unexpired cookie matching the
/// request's host and path is sent in one `Cookie` header. Every
/// `Set-Cookie` header on a successful response is parsed into the jar.
#[derive(Debug, Default)]
pub struct CookieMiddleware {
    jar: Arc<CookieJar>,
}

impl CookieMiddleware {
    /// Create a middleware with an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a jar shared with other clients or with the caller.
    pub fn with_jar(jar: Arc<CookieJar>) -> Self {
        Self { jar }
    }

    /// The backing jar.
    pub fn cookie_jar(&self) -> &Arc<CookieJar> {
        &self.jar
    }
}

#[async_trait]
impl Middleware for CookieMiddleware {
    async fn handle(&self, mut request: Request, next: Next<'_>) -> Result<Response> {
        if let Some(header) = self.jar.cookie_header(request.domain(), request.path()) {
            match HeaderValue::try_from(header) {
                Ok(value) => {
                    request.headers_mut().insert(COOKIE, value);
                }
                Err(e) => warn!(error = %e, "Stored cookies do not form a valid header"),
            }
        }

        let response = next.run(request).await?;

        for header in response.header_values(SET_COOKIE) {
            match Cookie::parse(header) {
                Some(cookie) => {
                    debug!(name = %cookie.name(), "Received cookie");
                    self.jar.add(cookie);
                }
                None => warn!(header = %header, "Ignoring malformed Set-Cookie header"),
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;
    use crate::middleware::{MiddlewareChain, endpoint_fn};
    use http::StatusCode;
    use parking_lot::Mutex;
    use url::Url;

    fn get(url: &str) -> Request {
        Request::new(Method::Get, Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_set_cookie_is_sent_back() {
        let middleware = CookieMiddleware::new();
        let jar = middleware.cookie_jar().clone();
        let chain = MiddlewareChain::new().with_middleware(middleware);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let endpoint = endpoint_fn(move |request: Request| {
            let recorder = recorder.clone();
            async move {
                recorder
                    .lock()
                    .push(request.header("cookie").map(str::to_string));
                Ok(Response::new(StatusCode::OK)
                    .with_header("set-cookie", "session=abc123; Path=/")
                    .with_header("set-cookie", "theme=dark"))
            }
        });

        chain.execute(get("https://example.com/login"), &endpoint).await.unwrap();
        chain.execute(get("https://example.com/account"), &endpoint).await.unwrap();

        assert_eq!(jar.len(), 2);
        assert_eq!(
            *seen.lock(),
            vec![None, Some("session=abc123; theme=dark".to_string())]
        );
    }

    #[tokio::test]
    async fn test_only_matching_cookies_are_sent() {
        let jar = Arc::new(CookieJar::new());
        jar.add(Cookie::new("api", "1").with_domain("api.example.com").with_path("/v1"));
        jar.add(Cookie::new("other", "2").with_domain("other.org"));

        let chain = MiddlewareChain::new().with_middleware(CookieMiddleware::with_jar(jar));
        let endpoint = endpoint_fn(|request: Request| async move {
            let cookie = request.header("cookie").unwrap_or("").to_string();
            Ok(Response::new(StatusCode::OK).with_body(cookie))
        });

        let response = chain
            .execute(get("https://api.example.com/v1/zones"), &endpoint)
            .await
            .unwrap();
        assert_eq!(response.text().unwrap(), "api=1");

        let response = chain
            .execute(get("https://api.example.com/v2/zones"), &endpoint)
            .await
            .unwrap();
        assert_eq!(response.text().unwrap(), "");
    }

    #[tokio::test]
    async fn test_expired_set_cookie_replaces_stored_cookie() {
        let jar = Arc::new(CookieJar::new());
        jar.add(Cookie::new("session", "old"));

        let chain =
            MiddlewareChain::new().with_middleware(CookieMiddleware::with_jar(jar.clone()));
        let endpoint = endpoint_fn(|_request| async {
            Ok(Response::new(StatusCode::OK).with_header("set-cookie", "session=gone; Max-Age=0"))
        });

        chain.execute(get("https://example.com/logout"), &endpoint).await.unwrap();

        assert_eq!(jar.len(), 1);
        assert!(jar.cookie_header("example.com", "/").is_none());
    }
}
