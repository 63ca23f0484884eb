//! Response classification.
//!
//! This module provides [`classify`], which turns an HTTP status and body into
//! an [`ExecutionResult`] or a typed failure, and [`ResponseHeaders`], the
//! header snapshot a transport keeps from its most recent round trip.
//!
//! # Decision Order
//!
//! The first matching rule wins:
//!
//! 1. 4xx/5xx status: [`ServerError`], whatever the body
//! 2. body is not JSON: [`ProtocolError`]
//! 3. JSON with neither `data` nor `errors`: [`ProtocolError`]
//! 4. JSON with `errors`: [`QueryError`], errors kept verbatim
//! 5. otherwise: success with `data` and optional `extensions`

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clients::errors::{ProtocolError, QueryError, ServerError, TransportError};

/// Headers from the most recent HTTP response.
///
/// Lookups are case-insensitive. The snapshot is replaced wholesale on every
/// round trip that receives a response, including error responses.
///
/// # Example
///
/// ```rust
/// use gql_http::ResponseHeaders;
/// use reqwest::header::HeaderMap;
///
/// let mut map = HeaderMap::new();
/// map.insert("Retry-After", "3600".parse().unwrap());
/// let headers = ResponseHeaders::from(&map);
///
/// assert_eq!(headers.get("retry-after"), Some("3600"));
/// assert_eq!(headers.retry_after().unwrap().as_secs(), 3600);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseHeaders(HeaderMap);

impl ResponseHeaders {
    /// Returns the first value of a header, if present and valid UTF-8.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns every value of a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.0
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Returns `true` if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of header values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(name, value)` pairs; names are lowercase.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str(), v)))
    }

    /// Parses `Retry-After` given in seconds.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        self.get("retry-after")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64)
    }

    /// Returns the underlying header map.
    #[must_use]
    pub const fn as_header_map(&self) -> &HeaderMap {
        &self.0
    }
}

impl From<&HeaderMap> for ResponseHeaders {
    fn from(headers: &HeaderMap) -> Self {
        Self(headers.clone())
    }
}

impl From<HeaderMap> for ResponseHeaders {
    fn from(headers: HeaderMap) -> Self {
        Self(headers)
    }
}

/// A successful GraphQL result.
///
/// Built once per executed operation and never modified afterwards. When the
/// server reports errors the transport returns a [`QueryError`] instead, so
/// `errors` is only populated on results deserialized from elsewhere.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The `data` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// The raw `errors` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
    /// The `extensions` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl ExecutionResult {
    /// Deserializes `data` into a typed value.
    ///
    /// # Errors
    ///
    /// Returns the serde error if `data` does not match `T`. Missing `data`
    /// is deserialized from `null`.
    pub fn parse_data<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        match &self.data {
            Some(data) => T::deserialize(data),
            None => T::deserialize(&serde_json::Value::Null),
        }
    }
}

/// Classifies an HTTP response.
///
/// `url` is only used in the message of a status failure.
///
/// # Errors
///
/// See the module documentation for the decision order.
pub fn classify(
    status: StatusCode,
    url: &Url,
    body: &[u8],
) -> Result<ExecutionResult, TransportError> {
    if status.is_client_error() || status.is_server_error() {
        return Err(ServerError::from_status(status, url, body).into());
    }

    let envelope: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| ProtocolError::not_json(body))?;
    let serde_json::Value::Object(mut envelope) = envelope else {
        return Err(ProtocolError::missing_data_and_errors(body).into());
    };

    if !envelope.contains_key("data") && !envelope.contains_key("errors") {
        return Err(ProtocolError::missing_data_and_errors(body).into());
    }

    let data = envelope.remove("data").filter(|d| !d.is_null());
    let extensions = envelope.remove("extensions");

    if let Some(errors) = envelope.remove("errors") {
        return Err(QueryError::new(errors, data, extensions).into());
    }

    Ok(ExecutionResult {
        data,
        errors: None,
        extensions,
    })
}
