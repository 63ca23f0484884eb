//! Configuration types for the GraphQL HTTP transport.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`TransportConfig`]: Everything that affects the bytes on the wire
//! - [`TransportConfigBuilder`]: A builder for constructing [`TransportConfig`] instances
//! - [`Endpoint`]: A validated `http`/`https` endpoint URL
//! - [`TlsVerification`] and [`TrustStore`]: Certificate verification mode
//!
//! A configuration is immutable once built and is owned by exactly one
//! [`HttpTransport`](crate::HttpTransport).
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use gql_http::TransportConfig;
//!
//! let config = TransportConfig::builder()
//!     .url("https://countries.example.com/graphql")
//!     .header("Authorization", "Bearer abc123")
//!     .cookie("session", "s3cr3t")
//!     .timeout(Duration::from_secs(10))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.timeout(), Some(Duration::from_secs(10)));
//! ```

mod newtypes;
mod tls;

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

pub use newtypes::Endpoint;
pub use tls::{TlsVerification, TrustStore};

use crate::error::ConfigError;

/// Wire-level configuration for an [`HttpTransport`](crate::HttpTransport).
///
/// Requests are always sent with `POST`.
///
/// # Thread Safety
///
/// `TransportConfig` is `Clone`, `Send`, and `Sync`.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    url: Endpoint,
    headers: HeaderMap,
    cookies: Vec<(String, String)>,
    verify: TlsVerification,
    timeout: Option<Duration>,
}

impl TransportConfig {
    /// Creates a new builder for constructing a `TransportConfig`.
    #[must_use]
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::new()
    }

    /// Returns the endpoint requests are posted to.
    #[must_use]
    pub const fn url(&self) -> &Endpoint {
        &self.url
    }

    /// Returns the static headers sent with every request.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the cookies the jar is seeded with, in insertion order.
    #[must_use]
    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    /// Returns the certificate verification mode.
    #[must_use]
    pub const fn verify(&self) -> &TlsVerification {
        &self.verify
    }

    /// Returns the per-request timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

// Verify TransportConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TransportConfig>();
};

/// Builder for constructing [`TransportConfig`] instances.
///
/// `url` is required. Setters are infallible; validation happens in
/// [`build`](Self::build).
///
/// # Defaults
///
/// - `headers`: none
/// - `cookies`: none
/// - `verify`: [`TlsVerification::Enabled`]
/// - `timeout`: `None` (wait indefinitely)
#[derive(Debug, Default)]
pub struct TransportConfigBuilder {
    url: Option<String>,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    verify: Option<TlsVerification>,
    timeout: Option<Duration>,
}

impl TransportConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoint URL (required).
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Adds a static header. Names are case-insensitive; a later value for
    /// the same name replaces the earlier one.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds every header from an iterator of name/value pairs.
    #[must_use]
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Seeds the cookie jar with a cookie scoped to the endpoint.
    #[must_use]
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Sets the certificate verification mode. Accepts a `bool` or a
    /// [`TrustStore`] as well as a [`TlsVerification`].
    #[must_use]
    pub fn verify(mut self, verify: impl Into<TlsVerification>) -> Self {
        self.verify = Some(verify.into());
        self
    }

    /// Sets the timeout applied to each request, covering connect, send, and
    /// reading the full response body.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the [`TransportConfig`], validating every field.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingRequiredField`] if `url` is not set
    /// - [`ConfigError::InvalidUrl`] if `url` is not an absolute http(s) URL
    /// - [`ConfigError::InvalidHeader`] for a malformed header name or value
    /// - [`ConfigError::InvalidCookie`] for a malformed cookie
    pub fn build(self) -> Result<TransportConfig, ConfigError> {
        let url = self
            .url
            .ok_or(ConfigError::MissingRequiredField { field: "url" })?;
        let url = Endpoint::new(url)?;

        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConfigError::InvalidHeader { name: name.clone() })?;
            let header_value = HeaderValue::from_str(&value)
                .map_err(|_| ConfigError::InvalidHeader { name: name.clone() })?;
            headers.insert(header_name, header_value);
        }

        for (name, value) in &self.cookies {
            if !is_valid_cookie(name, value) {
                return Err(ConfigError::InvalidCookie { name: name.clone() });
            }
        }

        Ok(TransportConfig {
            url,
            headers,
            cookies: self.cookies,
            verify: self.verify.unwrap_or_default(),
            timeout: self.timeout,
        })
    }
}

/// Cookie names are RFC 6265 tokens; values may not contain separators that
/// would split the `Cookie` header.
fn is_valid_cookie(name: &str, value: &str) -> bool {
    const SEPARATORS: &[char] = &[
        '(', ')', '<', '>', '@', ',', ';', ':', '\\', '"', '/', '[', ']', '?', '=', '{', '}',
    ];
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_graphic() && !SEPARATORS.contains(&c))
        && value
            .chars()
            .all(|c| c.is_ascii_graphic() && !matches!(c, ';' | ',' | '"' | '\\'))
}
