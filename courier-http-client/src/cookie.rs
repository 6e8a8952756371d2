//! Cookies and the cookie jar.

use parking_lot::RwLock;
use std::fmt;
use std::time::{Duration, SystemTime};
use tracing::trace;

/// A cookie received from a `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    expires: Option<SystemTime>,
    path: Option<String>,
    domain: Option<String>,
    secure: bool,
    http_only: bool,
}

impl Cookie {
    /// Create a session cookie with no attributes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: None,
            path: None,
            domain: None,
            secure: false,
            http_only: false,
        }
    }

    /// Set the absolute expiry.
    pub fn with_expires(mut self, expires: SystemTime) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Restrict the cookie to paths starting with `path`.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Restrict the cookie to hosts ending with `domain`. A leading dot is dropped.
    pub fn with_domain(mut self, domain: impl AsRef<str>) -> Self {
        self.domain = Some(domain.as_ref().trim_start_matches('.').to_string());
        self
    }

    /// Set the `Secure` flag.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the `HttpOnly` flag.
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Parse a `Set-Cookie` header value.
    ///
    /// Returns `None` when the header carries no cookie name.
    pub fn parse(header: &str) -> Option<Self> {
        Self::parse_at(header, SystemTime::now())
    }

    /// Parse a `Set-Cookie` header value, resolving `Max-Age` against `now`.
    ///
    /// `Max-Age` takes precedence over `Expires`. Attribute names are
    /// case-insensitive; unknown attributes and unparseable dates are ignored.
    pub fn parse_at(header: &str, now: SystemTime) -> Option<Self> {
        let mut parts = header.split(';').map(str::trim);
        let first = parts.next()?;
        let (name, value) = match first.split_once('=') {
            Some((name, value)) => (name.trim(), value.trim()),
            None => (first, ""),
        };
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie::new(name, value);
        let mut max_age = None;

        for part in parts {
            match part.split_once('=') {
                Some((attr, value)) => {
                    let value = value.trim();
                    match attr.trim().to_ascii_lowercase().as_str() {
                        "expires" => {
                            if let Ok(expires) = httpdate::parse_http_date(value) {
                                cookie.expires = Some(expires);
                            }
                        }
                        "max-age" => max_age = Some(value.parse::<i64>().unwrap_or(0)),
                        "path" => cookie.path = Some(value.to_string()),
                        "domain" => cookie = cookie.with_domain(value),
                        _ => {}
                    }
                }
                None => match part.to_ascii_lowercase().as_str() {
                    "secure" => cookie.secure = true,
                    "httponly" => cookie.http_only = true,
                    _ => {}
                },
            }
        }

        if let Some(seconds) = max_age {
            let expires = if seconds > 0 {
                now.checked_add(Duration::from_secs(seconds.unsigned_abs()))
                    .unwrap_or(now)
            } else {
                now
            };
            cookie.expires = Some(expires);
        }

        Some(cookie)
    }

    /// Cookie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Absolute expiry, `None` for a session cookie.
    pub fn expires(&self) -> Option<SystemTime> {
        self.expires
    }

    /// Path attribute.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Domain attribute, without a leading dot.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// `Secure` flag.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// `HttpOnly` flag.
    pub fn is_http_only(&self) -> bool {
        self.http_only
    }

    /// Whether the cookie has expired by now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    /// Whether the cookie has expired at `now`.
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires.is_some_and(|expires| now >= expires)
    }

    /// Whether the cookie applies to a request for `domain` and `path`.
    ///
    /// The request domain must end with the cookie domain and the request
    /// path must start with the cookie path. Missing attributes match
    /// everything.
    pub fn matches(&self, domain: &str, path: &str) -> bool {
        let domain_ok = self
            .domain
            .as_deref()
            .is_none_or(|cookie_domain| domain.ends_with(cookie_domain));
        let path_ok = self
            .path
            .as_deref()
            .is_none_or(|cookie_path| path.starts_with(cookie_path));
        domain_ok && path_ok
    }

    fn same_key(&self, other: &Cookie) -> bool {
        self.name == other.name
            && self.domain.as_deref().unwrap_or("") == other.domain.as_deref().unwrap_or("")
            && self.path.as_deref().unwrap_or("/") == other.path.as_deref().unwrap_or("/")
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Thread-safe cookie store.
///
/// Cookies are unique by name, domain and path (an absent path counts as
/// `/`). Adding a cookie with an existing key replaces it in place.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: RwLock<Vec<Cookie>>,
}

impl CookieJar {
    /// Create an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a cookie.
    pub fn add(&self, cookie: Cookie) {
        let mut cookies = self.cookies.write();
        trace!(name = %cookie.name, domain = ?cookie.domain, path = ?cookie.path, "Storing cookie");
        match cookies.iter_mut().find(|existing| existing.same_key(&cookie)) {
            Some(existing) => *existing = cookie,
            None => cookies.push(cookie),
        }
    }

    /// Unexpired cookies that apply to `domain` and `path`, in insertion order.
    pub fn cookies_for(&self, domain: &str, path: &str) -> Vec<Cookie> {
        let now = SystemTime::now();
        self.cookies
            .read()
            .iter()
            .filter(|cookie| !cookie.is_expired_at(now) && cookie.matches(domain, path))
            .cloned()
            .collect()
    }

    /// `Cookie` header value for a request, `None` if nothing applies.
    pub fn cookie_header(&self, domain: &str, path: &str) -> Option<String> {
        let cookies = self.cookies_for(domain, path);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(Cookie::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Every stored cookie, expired ones included.
    pub fn all(&self) -> Vec<Cookie> {
        self.cookies.read().clone()
    }

    /// Number of stored cookies.
    pub fn len(&self) -> usize {
        self.cookies.read().len()
    }

    /// Whether the jar is empty.
    pub fn is_empty(&self) -> bool {
        self.cookies.read().is_empty()
    }

    /// Remove every cookie.
    pub fn clear(&self) {
        self.cookies.write().clear();
    }

    /// Drop expired cookies, returning how many were removed.
    pub fn remove_expired(&self) -> usize {
        let now = SystemTime::now();
        let mut cookies = self.cookies.write();
        let before = cookies.len();
        cookies.retain(|cookie| !cookie.is_expired_at(now));
        before - cookies.len()
    }
}
