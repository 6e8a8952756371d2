//! HTTP client configuration.

use crate::auth::{
    ApiKey, ApiToken, Authenticator, CustomHeaders, GoogleServiceAccount, NoAuth, UserServiceKey,
};
use crate::retry::RetryConfig;
use crate::{HttpClientError, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL that relative request URIs are appended to.
    pub base_url: Option<String>,
    /// Total request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Retry configuration. `None` sends each request once.
    pub retry: Option<RetryConfig>,
    /// Headers provider applied to every request.
    pub authenticator: Arc<dyn Authenticator>,
    /// How long idle pooled connections are kept.
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_max_idle_per_host: usize,
    /// Default headers for all requests.
    pub default_headers: Vec<(String, String)>,
    /// User agent string.
    pub user_agent: String,
    /// Enable gzip compression.
    pub gzip: bool,
    /// Enable brotli compression.
    pub brotli: bool,
    /// Follow redirects.
    pub follow_redirects: bool,
    /// Maximum redirects to follow.
    pub max_redirects: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            retry: None,
            authenticator: Arc::new(NoAuth),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 32,
            default_headers: Vec::new(),
            user_agent: format!("courier-http-client/{}", env!("CARGO_PKG_VERSION")),
            gzip: true,
            brotli: true,
            follow_redirects: true,
            max_redirects: 5,
        }
    }
}

impl HttpClientConfig {
    /// Create a new configuration builder.
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }

    /// Check the configuration for values that cannot work.
    pub fn validate(&self) -> Result<()> {
        if let Some(base_url) = &self.base_url {
            let parsed = url::Url::parse(base_url)?;
            if parsed.cannot_be_a_base() {
                return Err(HttpClientError::configuration(format!(
                    "Base URL cannot be a base: {base_url}"
                )));
            }
        }
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }
        if self.timeout.is_zero() {
            return Err(HttpClientError::configuration("Timeout must be greater than 0"));
        }
        Ok(())
    }
}

/// Builder for HTTP client configuration.
#[derive(Debug, Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
    require_base_url: bool,
    error: Option<HttpClientError>,
}

impl HttpClientConfigBuilder {
    /// Set the base URL for all requests.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Fail `build` unless a base URL was given.
    pub fn require_base_url(mut self) -> Self {
        self.require_base_url = true;
        self
    }

    /// Set the default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set retry configuration.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.config.retry = Some(config);
        self
    }

    /// Set the authenticator.
    pub fn auth(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.config.authenticator = Arc::new(authenticator);
        self
    }

    /// Authenticate with a bearer token.
    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.auth(ApiToken::new(token))
    }

    /// Authenticate with an account email and API key.
    pub fn api_key(self, email: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.auth(ApiKey::new(email, api_key))
    }

    /// Authenticate with a user service key.
    pub fn user_service_key(self, key: impl Into<String>) -> Self {
        self.auth(UserServiceKey::new(key))
    }

    /// Authenticate with fixed custom headers.
    pub fn custom_headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.auth(CustomHeaders::new(headers))
    }

    /// Authenticate with a Google service account key file.
    ///
    /// A key file that cannot be loaded makes `build` fail.
    pub fn google_service_account(
        mut self,
        path: impl AsRef<Path>,
        audience: impl Into<String>,
    ) -> Self {
        match GoogleServiceAccount::from_file(path, audience) {
            Ok(account) => self.auth(account),
            Err(e) => {
                self.error = Some(e);
                self
            }
        }
    }

    /// Send requests without authentication.
    pub fn without_auth(self) -> Self {
        self.auth(NoAuth)
    }

    /// Set the connection pool idle timeout.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// Set the maximum idle connections per host.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.config.pool_max_idle_per_host = max;
        self
    }

    /// Add a default header for all requests.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.push((name.into(), value.into()));
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Enable or disable gzip compression.
    pub fn gzip(mut self, enable: bool) -> Self {
        self.config.gzip = enable;
        self
    }

    /// Enable or disable brotli compression.
    pub fn brotli(mut self, enable: bool) -> Self {
        self.config.brotli = enable;
        self
    }

    /// Enable or disable following redirects.
    pub fn follow_redirects(mut self, enable: bool) -> Self {
        self.config.follow_redirects = enable;
        self
    }

    /// Set the maximum number of redirects to follow.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<HttpClientConfig> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.require_base_url && self.config.base_url.is_none() {
            return Err(HttpClientError::configuration("Base URI is required"));
        }
        self.config.validate()?;
        Ok(self.config)
    }
}
