//! Authentication header providers.
//!
//! An [`Authenticator`] contributes headers that the client sends with
//! every request. Headers passed for an individual request take precedence.

use crate::{HttpClientError, Result};
use base64::Engine;
use http::{HeaderMap, HeaderName, HeaderValue};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default lifetime of a self-signed service account token.
pub const SERVICE_ACCOUNT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Produces the authentication headers for every request.
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// Headers to add to each request.
    fn headers(&self) -> Result<HeaderMap>;
}

fn header_map<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let header_name = HeaderName::try_from(name).map_err(|_| {
            HttpClientError::configuration(format!("Invalid auth header name: {name}"))
        })?;
        let header_value = HeaderValue::try_from(value).map_err(|_| {
            HttpClientError::configuration(format!("Invalid value for auth header {name}"))
        })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

fn sensitive(mut value: HeaderValue) -> HeaderValue {
    value.set_sensitive(true);
    value
}

/// No authentication.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl Authenticator for NoAuth {
    fn headers(&self) -> Result<HeaderMap> {
        Ok(HeaderMap::new())
    }
}

/// Bearer token, sent as `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct ApiToken {
    token: String,
}

impl ApiToken {
    /// Create a bearer token authenticator.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiToken").finish_non_exhaustive()
    }
}

impl Authenticator for ApiToken {
    fn headers(&self) -> Result<HeaderMap> {
        let value = HeaderValue::try_from(format!("Bearer {}", self.token))
            .map_err(|_| HttpClientError::configuration("Invalid bearer token"))?;

        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, sensitive(value));
        Ok(headers)
    }
}

/// Account email and global API key, sent as `X-Auth-Email` and `X-Auth-Key`.
#[derive(Clone)]
pub struct ApiKey {
    email: String,
    api_key: String,
}

impl ApiKey {
    /// Create an email and API key authenticator.
    pub fn new(email: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Authenticator for ApiKey {
    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = header_map([("X-Auth-Email", self.email.as_str())])?;
        let key = HeaderValue::try_from(self.api_key.as_str())
            .map_err(|_| HttpClientError::configuration("Invalid API key"))?;
        headers.insert("x-auth-key", sensitive(key));
        Ok(headers)
    }
}

/// User service key, sent as `X-Auth-User-Service-Key`.
#[derive(Clone)]
pub struct UserServiceKey {
    key: String,
}

impl UserServiceKey {
    /// Create a user service key authenticator.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl fmt::Debug for UserServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserServiceKey").finish_non_exhaustive()
    }
}

impl Authenticator for UserServiceKey {
    fn headers(&self) -> Result<HeaderMap> {
        let key = HeaderValue::try_from(self.key.as_str())
            .map_err(|_| HttpClientError::configuration("Invalid user service key"))?;

        let mut headers = HeaderMap::new();
        headers.insert("x-auth-user-service-key", sensitive(key));
        Ok(headers)
    }
}

/// HTTP basic authentication.
#[derive(Clone)]
pub struct BasicAuth {
    username: String,
    password: Option<String>,
}

impl BasicAuth {
    /// Create a basic authenticator.
    pub fn new(username: impl Into<String>, password: Option<impl Into<String>>) -> Self {
        Self {
            username: username.into(),
            password: password.map(Into::into),
        }
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Authenticator for BasicAuth {
    fn headers(&self) -> Result<HeaderMap> {
        let credentials = format!(
            "{}:{}",
            self.username,
            self.password.as_deref().unwrap_or("")
        );
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        let value = HeaderValue::try_from(format!("Basic {encoded}"))
            .map_err(|_| HttpClientError::configuration("Invalid basic auth credentials"))?;

        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, sensitive(value));
        Ok(headers)
    }
}

/// Arbitrary fixed headers.
#[derive(Debug, Clone, Default)]
pub struct CustomHeaders {
    headers: Vec<(String, String)>,
}

impl CustomHeaders {
    /// Create from name/value pairs.
    pub fn new<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Authenticator for CustomHeaders {
    fn headers(&self) -> Result<HeaderMap> {
        header_map(
            self.headers
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )
    }
}

/// Fields read from a Google service account key file.
#[derive(Deserialize)]
struct ServiceAccountKey {
    private_key_id: String,
    private_key: String,
    client_email: String,
}

/// Claims of a self-signed service account token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountClaims {
    /// Issuer, the service account email.
    pub iss: String,
    /// Subject, the service account email.
    pub sub: String,
    /// Audience, the API the token is meant for.
    pub aud: String,
    /// Issued at, seconds since the Unix epoch.
    pub iat: u64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
}

/// Google service account, sent as a self-signed RS256 JWT bearer token.
///
/// The token carries the key id in its header and is signed with the
/// account's private key. Unless a fixed window is set, a fresh token valid
/// for [`SERVICE_ACCOUNT_TOKEN_LIFETIME`] is signed for every request.
#[derive(Clone)]
pub struct GoogleServiceAccount {
    private_key_id: String,
    client_email: String,
    audience: String,
    key: EncodingKey,
    lifetime: Duration,
    window: Option<(u64, u64)>,
}

impl GoogleServiceAccount {
    /// Load the key file at `path` and sign tokens for `audience`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read, is not a
    /// service account key, or holds an invalid RSA key.
    pub fn from_file(path: impl AsRef<Path>, audience: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            HttpClientError::configuration(format!(
                "Cannot read service account file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&contents, audience)
    }

    /// Build from the JSON contents of a service account key file.
    pub fn from_json(json: &str, audience: impl Into<String>) -> Result<Self> {
        let account: ServiceAccountKey = serde_json::from_str(json).map_err(|e| {
            HttpClientError::configuration(format!("Malformed service account key: {e}"))
        })?;
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes()).map_err(|e| {
            HttpClientError::configuration(format!("Invalid service account private key: {e}"))
        })?;

        Ok(Self {
            private_key_id: account.private_key_id,
            client_email: account.client_email,
            audience: audience.into(),
            key,
            lifetime: SERVICE_ACCOUNT_TOKEN_LIFETIME,
            window: None,
        })
    }

    /// Change how long freshly signed tokens stay valid.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Pin the token window. Without `expires_at` the token lasts one lifetime.
    pub fn with_token_window(mut self, issued_at: u64, expires_at: Option<u64>) -> Self {
        let expires_at =
            expires_at.unwrap_or_else(|| issued_at.saturating_add(self.lifetime.as_secs()));
        self.window = Some((issued_at, expires_at));
        self
    }

    /// Service account email.
    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Claims the next token will carry.
    pub fn claims(&self) -> ServiceAccountClaims {
        let (iat, exp) = self.window.unwrap_or_else(|| {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            (now, now.saturating_add(self.lifetime.as_secs()))
        });

        ServiceAccountClaims {
            iss: self.client_email.clone(),
            sub: self.client_email.clone(),
            aud: self.audience.clone(),
            iat,
            exp,
        }
    }

    /// Sign a token.
    pub fn token(&self) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.private_key_id.clone());

        jsonwebtoken::encode(&header, &self.claims(), &self.key).map_err(|e| {
            HttpClientError::configuration(format!("Cannot sign service account token: {e}"))
        })
    }
}

impl fmt::Debug for GoogleServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleServiceAccount")
            .field("client_email", &self.client_email)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl Authenticator for GoogleServiceAccount {
    fn headers(&self) -> Result<HeaderMap> {
        let value = HeaderValue::try_from(format!("Bearer {}", self.token()?))
            .map_err(|_| HttpClientError::configuration("Invalid service account token"))?;

        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, sensitive(value));
        Ok(headers)
    }
}
