//! Validated newtype wrappers for configuration values.
//!
//! This module provides type-safe wrappers around values that validate their
//! contents on construction. Invalid values are rejected with clear error messages.

use std::fmt;

use reqwest::Url;

use crate::error::ConfigError;

/// A validated GraphQL endpoint URL.
///
/// Only absolute `http` and `https` URLs with a host are accepted.
///
/// # Example
///
/// ```rust
/// use gql_http::Endpoint;
///
/// let endpoint = Endpoint::new("https://countries.example.com/graphql").unwrap();
/// assert_eq!(endpoint.scheme(), "https");
/// assert_eq!(endpoint.host_name(), Some("countries.example.com"));
/// assert!(endpoint.is_https());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint(Url);

impl Endpoint {
    /// Creates a new validated endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if the URL cannot be parsed, has no
    /// host, or uses a scheme other than `http`/`https`.
    pub fn new(url: impl AsRef<str>) -> Result<Self, ConfigError> {
        let raw = url.as_ref().trim();
        let invalid = |reason: String| ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason,
        };

        let parsed = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "unsupported scheme '{}', expected http or https",
                parsed.scheme()
            )));
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }

        Ok(Self(parsed))
    }

    /// Returns the URL scheme (`http` or `https`).
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Returns the host name portion of the URL.
    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        self.0.host_str()
    }

    /// Returns `true` when the endpoint is served over TLS.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.0.scheme() == "https"
    }

    /// Returns the parsed URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.0
    }
}

impl AsRef<str> for Endpoint {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}
