//! Transport layer: one HTTP exchange, no retries.

use crate::request::FORM_PARAMS;
use crate::{HttpClientConfig, HttpClientError, Method, Request, Response, Result};
use async_trait::async_trait;
use http::HeaderValue;
use http::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// Sends a single request over the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and buffer the response, whatever its status.
    async fn send(&self, request: &Request) -> Result<Response>;
}

/// Transport backed by `reqwest`.
///
/// GET data is sent as query parameters. Other methods send data as a JSON
/// body, except a `form_params` object which is sent URL-encoded.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build a transport from the client configuration.
    pub fn new(config: &HttpClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent);

        if config.gzip {
            builder = builder.gzip(true);
        }
        if config.brotli {
            builder = builder.brotli(true);
        }
        if config.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        } else {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        let inner = builder.build().map_err(|e| {
            HttpClientError::configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            inner,
            timeout: config.timeout,
        })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(inner: reqwest::Client, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Get the underlying reqwest client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    /// Translate a request descriptor into a reqwest request.
    fn build(&self, request: &Request) -> Result<reqwest::Request> {
        let mut url = request.url().clone();
        let mut builder;

        if request.method() == Method::Get {
            if !request.data().is_empty() {
                let mut pairs = url.query_pairs_mut();
                for (key, value) in flatten(request.data()) {
                    pairs.append_pair(&key, &value);
                }
            }
            builder = self.inner.request(request.method().into(), url);
            builder = builder.headers(request.headers().clone());
        } else {
            let mut headers = request.headers().clone();
            let mut body = None;

            match request.data().get(FORM_PARAMS) {
                Some(Value::Object(form)) => {
                    let encoded = serde_urlencoded::to_string(flatten(form))
                        .map_err(|e| HttpClientError::decode(e.to_string()))?;
                    headers.insert(
                        CONTENT_TYPE,
                        HeaderValue::from_static("application/x-www-form-urlencoded"),
                    );
                    body = Some(encoded.into_bytes());
                }
                _ if !request.data().is_empty() => {
                    let encoded = serde_json::to_vec(request.data())
                        .map_err(|e| HttpClientError::decode(e.to_string()))?;
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                    body = Some(encoded);
                }
                _ => {}
            }

            builder = self
                .inner
                .request(request.method().into(), url)
                .headers(headers);
            if let Some(body) = body {
                builder = builder.body(body);
            }
        }

        Ok(builder.build()?)
    }

    fn map_error(&self, error: reqwest::Error) -> HttpClientError {
        if error.is_timeout() {
            HttpClientError::Timeout(self.timeout)
        } else if error.is_connect() {
            HttpClientError::Connection(error.to_string())
        } else {
            HttpClientError::Http(error)
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &Request) -> Result<Response> {
        let outgoing = self.build(request)?;

        debug!(
            method = %request.method(),
            url = %outgoing.url(),
            "Sending HTTP request"
        );

        let response = self
            .inner
            .execute(outgoing)
            .await
            .map_err(|e| self.map_error(e))?;

        Response::from_reqwest(response)
            .await
            .map_err(|e| match e {
                HttpClientError::Http(e) => self.map_error(e),
                other => other,
            })
    }
}

/// Flatten request data into form/query pairs.
///
/// Nested values use bracket notation: `filter[status]=active`, `ids[0]=1`.
fn flatten(data: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in data {
        flatten_value(key.clone(), value, &mut pairs);
    }
    pairs
}

fn flatten_value(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => pairs.push((key, if *b { "1" } else { "0" }.to_string())),
        Value::Number(n) => pairs.push((key, n.to_string())),
        Value::String(s) => pairs.push((key, s.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(format!("{key}[{index}]"), item, pairs);
            }
        }
        Value::Object(map) => {
            for (name, item) in map {
                flatten_value(format!("{key}[{name}]"), item, pairs);
            }
        }
    }
}
