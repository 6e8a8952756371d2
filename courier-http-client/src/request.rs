//! Request descriptor and request builder.

use crate::{HttpClient, HttpClientError, Response, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use url::Url;

/// Key in the request data whose object is sent URL-encoded instead of as JSON.
pub const FORM_PARAMS: &str = "form_params";

/// HTTP methods the client accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET; data is sent as query parameters.
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = HttpClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(HttpClientError::configuration(format!(
                "Request method must be GET, POST, PUT, PATCH, or DELETE, got {s:?}"
            ))),
        }
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Patch => http::Method::PATCH,
            Method::Delete => http::Method::DELETE,
        }
    }
}

/// A request as it travels through the middleware chain.
///
/// Each stage receives the request by value and may pass a modified copy
/// onward. The URL is always absolute.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    data: Map<String, Value>,
    headers: HeaderMap,
}

impl Request {
    /// Create a request with no data and no headers.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            data: Map::new(),
            headers: HeaderMap::new(),
        }
    }

    /// Replace the request data.
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    /// Replace the request headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set a header, replacing existing values. Invalid pairs are skipped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!(header = name, "Skipping invalid request header"),
        }
        self
    }

    /// HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Change the HTTP method.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Absolute request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Change the request URL.
    pub fn set_url(&mut self, url: Url) {
        self.url = url;
    }

    /// Request data, in insertion order.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Mutable request data.
    pub fn data_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.data
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Host of the request URL, empty if there is none.
    pub fn domain(&self) -> &str {
        self.url.host_str().unwrap_or("")
    }

    /// Path of the request URL, `/` if empty.
    pub fn path(&self) -> &str {
        match self.url.path() {
            "" => "/",
            path => path,
        }
    }
}

/// HTTP request builder.
pub struct RequestBuilder<'a> {
    client: &'a HttpClient,
    method: Method,
    uri: String,
    data: Map<String, Value>,
    headers: HeaderMap,
    error: Option<HttpClientError>,
}

impl<'a> RequestBuilder<'a> {
    /// Create a new request builder.
    pub(crate) fn new(client: &'a HttpClient, method: Method, uri: String) -> Self {
        Self {
            client,
            method,
            uri,
            data: Map::new(),
            headers: HeaderMap::new(),
            error: None,
        }
    }

    /// Keep the first builder error; `send` reports it.
    fn fail(&mut self, error: HttpClientError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Add a header to the request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => {
                self.fail(HttpClientError::configuration(format!("Invalid header: {name}")));
            }
        }
        self
    }

    /// Add multiple headers to the request.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Set one data field.
    ///
    /// For GET requests data becomes query parameters, otherwise the JSON body.
    pub fn data(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.data.insert(key.into(), value);
            }
            Err(e) => {
                self.fail(HttpClientError::decode(e.to_string()));
            }
        }
        self
    }

    /// Merge a serializable object into the request data.
    pub fn json<T: Serialize>(mut self, json: &T) -> Self {
        match serde_json::to_value(json) {
            Ok(Value::Object(map)) => self.data.extend(map),
            Ok(other) => {
                self.fail(HttpClientError::configuration(format!(
                    "Request data must be a JSON object, got {other}"
                )));
            }
            Err(e) => {
                self.fail(HttpClientError::decode(e.to_string()));
            }
        }
        self
    }

    /// Send a serializable object URL-encoded.
    pub fn form<T: Serialize>(self, form: &T) -> Self {
        self.data(FORM_PARAMS, form)
    }

    /// Set bearer authentication.
    pub fn bearer_auth(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    /// Set basic authentication.
    pub fn basic_auth(
        self,
        username: impl Into<String>,
        password: Option<impl Into<String>>,
    ) -> Self {
        use base64::Engine;
        let credentials = match password {
            Some(p) => format!("{}:{}", username.into(), p.into()),
            None => format!("{}:", username.into()),
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        self.header("Authorization", format!("Basic {}", encoded))
    }

    /// Send the request.
    pub async fn send(self) -> Result<Response> {
        if let Some(error) = self.error {
            return Err(error);
        }
        self.client
            .request(self.method, &self.uri, self.data, self.headers)
            .await
    }

    /// Send the request and decode the JSON response.
    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T> {
        self.send().await?.into_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing_is_case_insensitive() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("Patch".parse::<Method>().unwrap(), Method::Patch);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
    }

    #[test]
    fn test_unknown_method_is_configuration_error() {
        let err = "HEAD".parse::<Method>().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("GET, POST, PUT, PATCH, or DELETE"));
    }

    #[test]
    fn test_method_into_http() {
        assert_eq!(http::Method::from(Method::Put), http::Method::PUT);
        assert_eq!(Method::Post.to_string(), "POST");
    }

    #[test]
    fn test_request_domain_and_path() {
        let url = Url::parse("https://api.example.com/v1/users?page=2").unwrap();
        let request = Request::new(Method::Get, url);
        assert_eq!(request.domain(), "api.example.com");
        assert_eq!(request.path(), "/v1/users");

        let root = Request::new(Method::Get, Url::parse("https://example.com").unwrap());
        assert_eq!(root.path(), "/");
    }

    #[test]
    fn test_request_data_keeps_insertion_order() {
        let mut request = Request::new(Method::Post, Url::parse("https://example.com").unwrap());
        request.data_mut().insert("zeta".into(), Value::from(1));
        request.data_mut().insert("alpha".into(), Value::from(2));

        let keys: Vec<_> = request.data().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_with_header_replaces() {
        let request = Request::new(Method::Get, Url::parse("https://example.com").unwrap())
            .with_header("Accept", "text/plain")
            .with_header("accept", "application/json");
        assert_eq!(request.header("Accept"), Some("application/json"));
        assert_eq!(request.headers().len(), 1);
    }
}
