//! HTTP client implementation.

use crate::middleware::{Middleware, MiddlewareChain};
use crate::resilient::ResilientTransport;
use crate::transport::{ReqwestTransport, Transport};
use crate::{
    HttpClientConfig, HttpClientError, Method, Request, RequestBuilder, Response, Result,
};
use courier_ratelimit::Clock;
use http::header::{ACCEPT, HeaderName, HeaderValue};
use http::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// HTTP client: resolves URIs, merges headers, then runs the middleware
/// chain around a retrying transport.
///
/// Cloning is cheap and clones share middleware and connection pool.
#[derive(Clone)]
pub struct HttpClient {
    config: Arc<HttpClientConfig>,
    chain: MiddlewareChain,
    terminal: ResilientTransport,
}

impl HttpClient {
    /// Create a client backed by `reqwest`.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client with default configuration.
    pub fn default_client() -> Result<Self> {
        Self::new(HttpClientConfig::default())
    }

    /// Create a client that sends through `transport`.
    pub fn with_transport(config: HttpClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let mut terminal = ResilientTransport::new(transport);
        if let Some(retry) = &config.retry {
            terminal = terminal.with_retry(retry.clone());
        }

        Ok(Self {
            config: Arc::new(config),
            chain: MiddlewareChain::new(),
            terminal,
        })
    }

    /// Replace the clock used for retry backoff.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.terminal = self.terminal.with_clock(clock);
        self
    }

    /// Append a middleware. The first one added runs outermost.
    pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.add_middleware(middleware);
        self
    }

    /// Append a middleware in place.
    pub fn add_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.chain.push(Arc::new(middleware));
        self
    }

    /// Get the client configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// The middleware chain.
    pub fn middleware(&self) -> &MiddlewareChain {
        &self.chain
    }

    /// Create a GET request builder.
    pub fn get(&self, uri: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::Get, uri.into())
    }

    /// Create a POST request builder.
    pub fn post(&self, uri: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::Post, uri.into())
    }

    /// Create a PUT request builder.
    pub fn put(&self, uri: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::Put, uri.into())
    }

    /// Create a PATCH request builder.
    pub fn patch(&self, uri: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::Patch, uri.into())
    }

    /// Create a DELETE request builder.
    pub fn delete(&self, uri: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::Delete, uri.into())
    }

    /// GET `uri` and decode the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, uri: &str) -> Result<T> {
        self.get(uri).send_json().await
    }

    /// POST `body` as JSON and decode the JSON response.
    pub async fn post_json<T: DeserializeOwned, B: Serialize>(&self, uri: &str, body: &B) -> Result<T> {
        self.post(uri).json(body).send_json().await
    }

    /// PUT `body` as JSON and decode the JSON response.
    pub async fn put_json<T: DeserializeOwned, B: Serialize>(&self, uri: &str, body: &B) -> Result<T> {
        self.put(uri).json(body).send_json().await
    }

    /// PATCH `body` as JSON and decode the JSON response.
    pub async fn patch_json<T: DeserializeOwned, B: Serialize>(&self, uri: &str, body: &B) -> Result<T> {
        self.patch(uri).json(body).send_json().await
    }

    /// DELETE `uri` and decode the JSON response.
    pub async fn delete_json<T: DeserializeOwned>(&self, uri: &str) -> Result<T> {
        self.delete(uri).send_json().await
    }

    /// Send a request whose method is given by name, case-insensitively.
    pub async fn request_str(
        &self,
        method: &str,
        uri: &str,
        data: Map<String, Value>,
        headers: HeaderMap,
    ) -> Result<Response> {
        let method = method.parse()?;
        self.request(method, uri, data, headers).await
    }

    /// Send a request through the middleware chain.
    ///
    /// `uri` is used as-is when it starts with `http://` or `https://`,
    /// otherwise it is appended to the base URL. Responses with status 400
    /// or above are returned as [`HttpClientError::Response`].
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        data: Map<String, Value>,
        headers: HeaderMap,
    ) -> Result<Response> {
        let url = self.resolve(uri)?;
        let headers = self.merge_headers(headers)?;

        debug!(method = %method, url = %url, "Sending request");

        let request = Request::new(method, url)
            .with_data(data)
            .with_headers(headers);
        self.chain.execute(request, &self.terminal).await
    }

    fn resolve(&self, uri: &str) -> Result<Url> {
        let lower = uri.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Url::parse(uri)?);
        }

        match &self.config.base_url {
            Some(base) => Ok(Url::parse(&format!(
                "{}/{}",
                base.trim_end_matches('/'),
                uri.trim_start_matches('/')
            ))?),
            None => Err(HttpClientError::configuration(format!(
                "Relative URI {uri:?} requires a base URL"
            ))),
        }
    }

    /// `Accept: application/json`, then default headers, then authenticator
    /// headers, then the caller's. Later sources replace earlier ones.
    fn merge_headers(&self, caller: HeaderMap) -> Result<HeaderMap> {
        let mut merged = HeaderMap::new();
        merged.insert(ACCEPT, HeaderValue::from_static("application/json"));

        for (name, value) in &self.config.default_headers {
            let name = HeaderName::try_from(name.as_str()).map_err(|e| {
                HttpClientError::configuration(format!("Invalid default header {name:?}: {e}"))
            })?;
            let value = HeaderValue::try_from(value.as_str()).map_err(|e| {
                HttpClientError::configuration(format!("Invalid value for {name}: {e}"))
            })?;
            merged.insert(name, value);
        }

        merged.extend(self.config.authenticator.headers()?);
        merged.extend(caller);
        Ok(merged)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.config.base_url)
            .field("middleware", &self.chain.len())
            .field("terminal", &self.terminal)
            .finish()
    }
}
