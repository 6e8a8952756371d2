//! Response cache middleware.

use super::{Middleware, Next};
use crate::{HttpClientError, Method, Request, Response, Result};
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use courier_cache::{CacheError, CacheStore};
use http::header::{CACHE_CONTROL, EXPIRES};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, trace};

/// Default time-to-live when a response carries no freshness headers.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Largest `max-age` honored; larger values are treated as this (RFC 9111 1.2.2).
pub const MAX_AGE_LIMIT: Duration = Duration::from_secs(1 << 31);

/// Serves repeated requests from a [`CacheStore`].
///
/// Only requests whose method is cacheable (GET by default) are considered.
/// A hit returns the stored response without calling the rest of the chain.
/// A miss stores any 2xx response for the time given by `Cache-Control:
/// max-age`, else `Expires`, else the default TTL.
pub struct CacheMiddleware {
    store: Arc<dyn CacheStore>,
    default_ttl: Duration,
    cacheable_methods: HashSet<Method>,
}

impl CacheMiddleware {
    /// Cache GET responses in `store` for 300 seconds by default.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            default_ttl: DEFAULT_TTL,
            cacheable_methods: HashSet::from([Method::Get]),
        }
    }

    /// Set the TTL used when a response has no freshness headers.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Replace the set of cacheable methods.
    pub fn with_cacheable_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.cacheable_methods = methods.into_iter().collect();
        self
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// How long `response` stays fresh.
    fn ttl_for(&self, response: &Response) -> Duration {
        if let Some(max_age) = response.header(CACHE_CONTROL).and_then(max_age) {
            return max_age;
        }
        if let Some(expires) = response
            .header(EXPIRES)
            .and_then(|value| httpdate::parse_http_date(value).ok())
        {
            return expires
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO);
        }
        self.default_ttl
    }
}

#[async_trait]
impl Middleware for CacheMiddleware {
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<Response> {
        if !self.cacheable_methods.contains(&request.method()) {
            return next.run(request).await;
        }

        let key = fingerprint(&request);

        if let Some(payload) = self.store.get(&key).await? {
            debug!(url = %request.url(), key = %key, "Cache hit");
            return CachedResponse::decode(&payload);
        }

        trace!(url = %request.url(), key = %key, "Cache miss");
        let response = next.run(request).await?;

        if response.is_success() {
            let ttl = self.ttl_for(&response);
            if ttl.is_zero() {
                trace!(key = %key, "Response already stale, not caching");
            } else {
                let payload = CachedResponse::encode(&response)?;
                self.store.set(&key, payload, ttl).await?;
                debug!(key = %key, ttl_secs = ttl.as_secs(), "Cached response");
            }
        }

        Ok(response)
    }
}

/// `max-age` from a `Cache-Control` header value.
fn max_age(header: &str) -> Option<Duration> {
    header.split(',').find_map(|directive| {
        let (key, value) = directive.trim().split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("max-age") {
            return None;
        }
        value
            .trim()
            .trim_matches('"')
            .parse()
            .ok()
            .map(|secs: u64| Duration::from_secs(secs).min(MAX_AGE_LIMIT))
    })
}

/// Stable cache key for a request: SHA-256 over method, URL and data.
///
/// Object keys in the data are sorted before hashing, so the same logical
/// data always yields the same key regardless of insertion order.
pub fn fingerprint(request: &Request) -> String {
    let data = Value::Object(canonical_map(request.data()));
    let mut hasher = Sha256::new();
    hasher.update(request.method().as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(request.url().as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(data.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

fn canonical_map(map: &Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
        .into_iter()
        .map(|(key, value)| (key.clone(), canonical(value)))
        .collect()
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(canonical_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

/// Stored form of a response.
#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    headers: Vec<(String, String)>,
    body: String,
}

impl CachedResponse {
    fn encode(response: &Response) -> Result<String> {
        let cached = CachedResponse {
            status: response.status().as_u16(),
            reason: response.custom_reason().map(str::to_string),
            headers: response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            body: base64::engine::general_purpose::STANDARD.encode(response.bytes()),
        };
        serde_json::to_string(&cached)
            .map_err(|e| HttpClientError::Cache(CacheError::Serialization(e.to_string())))
    }

    fn decode(payload: &str) -> Result<Response> {
        let cached: CachedResponse = serde_json::from_str(payload)
            .map_err(|e| HttpClientError::decode(format!("Malformed cached response: {e}")))?;

        let status = StatusCode::from_u16(cached.status)
            .map_err(|e| HttpClientError::decode(format!("Malformed cached status: {e}")))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &cached.headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| HttpClientError::decode(format!("Malformed cached header: {e}")))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| HttpClientError::decode(format!("Malformed cached header: {e}")))?;
            headers.append(name, value);
        }

        let body = base64::engine::general_purpose::STANDARD
            .decode(&cached.body)
            .map_err(|e| HttpClientError::decode(format!("Malformed cached body: {e}")))?;

        let response = Response::from_parts(status, headers, Bytes::from(body));
        Ok(match cached.reason {
            Some(reason) => response.with_reason(reason),
            None => response,
        })
    }
}
