//! Error types for GraphQL transport operations.
//!
//! # Error Handling
//!
//! Every failure is returned to the caller; nothing is retried or swallowed.
//!
//! - [`TransportError::AlreadyConnected`]: `connect()` on a connected transport
//! - [`TransportError::Closed`]: `execute()` on a disconnected transport
//! - [`TransportError::Server`]: non-2xx status, or a network/TLS failure
//! - [`TransportError::Protocol`]: 2xx whose body is not a GraphQL result
//! - [`TransportError::Query`]: a GraphQL result carrying `errors`
//! - [`TransportError::UnexpectedUpload`]: an upload passed without enabling uploads
//! - [`TransportError::InvalidUpload`]: an upload declared an unusable content type
//! - [`TransportError::Encode`]: the request envelope failed to serialize
//!
//! # Example
//!
//! ```rust,ignore
//! use gql_http::TransportError;
//!
//! match transport.execute(operation, false) {
//!     Ok(result) => println!("data: {:?}", result.data),
//!     Err(TransportError::Server(e)) => {
//!         println!("HTTP failure {:?}: {}", e.status, e);
//!         println!("Retry-After: {:?}", transport.response_headers().and_then(|h| h.get("Retry-After")));
//!     }
//!     Err(TransportError::Query(e)) => println!("GraphQL errors: {}", e.errors),
//!     Err(e) => println!("{e}"),
//! }
//! ```

use std::error::Error as StdError;

use reqwest::{StatusCode, Url};
use thiserror::Error;

/// Error returned for an HTTP-level failure.
///
/// Covers non-2xx responses and failures of the HTTP layer itself (DNS,
/// connect, TLS handshake, timeout, a connection dropped mid-body).
///
/// # Message Format
///
/// For a status failure:
/// `Client error '401 Unauthorized' for url 'http://localhost/graphql'`
/// (`Server error` for 5xx).
///
/// For a network failure the message is the underlying error followed by each
/// error in its `source()` chain, so certificate verification failures are
/// reported verbatim.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ServerError {
    /// Human-readable description.
    pub message: String,
    /// HTTP status code, when a response was received.
    pub status: Option<u16>,
    /// Response body, when it parsed as JSON.
    pub body: Option<serde_json::Value>,
    timed_out: bool,
}

impl ServerError {
    /// Builds the error for a 4xx/5xx response.
    #[must_use]
    pub fn from_status(status: StatusCode, url: &Url, body: &[u8]) -> Self {
        let class = if status.is_server_error() {
            "Server"
        } else {
            "Client"
        };
        let reason = status.canonical_reason().unwrap_or("Unknown Status");
        Self {
            message: format!(
                "{class} error '{} {reason}' for url '{url}'",
                status.as_u16()
            ),
            status: Some(status.as_u16()),
            body: serde_json::from_slice(body).ok(),
            timed_out: false,
        }
    }

    /// Returns `true` if the request was aborted by the configured timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        self.timed_out
    }
}

impl From<reqwest::Error> for ServerError {
    fn from(error: reqwest::Error) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            let text = cause.to_string();
            if !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = cause.source();
        }
        let timed_out = error.is_timeout();
        if timed_out && !message.contains("timed out") {
            message.push_str(": operation timed out");
        }
        Self {
            message,
            status: error.status().map(|s| s.as_u16()),
            body: None,
            timed_out,
        }
    }
}

/// Error returned when a 2xx response is not a GraphQL result envelope.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProtocolError {
    /// Human-readable description.
    pub message: String,
    /// The raw response body, lossily decoded as UTF-8.
    pub body: String,
}

impl ProtocolError {
    pub(crate) fn not_json(body: &[u8]) -> Self {
        let body = String::from_utf8_lossy(body).into_owned();
        Self {
            message: format!("Server did not return a GraphQL result: {body}"),
            body,
        }
    }

    pub(crate) fn missing_data_and_errors(body: &[u8]) -> Self {
        let body = String::from_utf8_lossy(body).into_owned();
        Self {
            message: format!(
                "Server did not return a GraphQL result: No \"data\" or \"errors\" keys in answer: {body}"
            ),
            body,
        }
    }
}

/// Error returned when the GraphQL result carries an `errors` field.
///
/// `errors` is kept exactly as the server sent it: usually a list of error
/// objects, but any JSON shape is preserved. Partial `data` and `extensions`
/// are kept alongside.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct QueryError {
    /// The first error (or the whole `errors` value when it is not a list).
    pub message: String,
    /// The raw `errors` value.
    pub errors: serde_json::Value,
    /// Any `data` returned with the errors.
    pub data: Option<serde_json::Value>,
    /// Any `extensions` returned with the errors.
    pub extensions: Option<serde_json::Value>,
}

impl QueryError {
    /// Builds the error from the raw envelope fields.
    #[must_use]
    pub fn new(
        errors: serde_json::Value,
        data: Option<serde_json::Value>,
        extensions: Option<serde_json::Value>,
    ) -> Self {
        let message = match errors.as_array().and_then(|list| list.first()) {
            Some(serde_json::Value::String(first)) => first.clone(),
            Some(first) => first.to_string(),
            None => errors.to_string(),
        };
        Self {
            message,
            errors,
            data,
            extensions,
        }
    }

    /// Returns the same error with `context` prepended to the message.
    #[must_use]
    pub fn with_context(mut self, context: &str) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }
}

/// Unified error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// `connect()` was called on a connected transport.
    #[error("Transport is already connected")]
    AlreadyConnected,

    /// `execute()` was called on a transport that is not connected.
    #[error("Transport is not connected")]
    Closed,

    /// HTTP-level failure.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// The response body is not a GraphQL result.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The GraphQL result carries errors.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// An upload was found in the variables but uploads were not enabled.
    #[error("Variable at '{path}' is a file upload; enable uploads to send it as a multipart request")]
    UnexpectedUpload {
        /// Dotted path of the offending value.
        path: String,
    },

    /// An upload declared a content type that is not a valid MIME type.
    ///
    /// Raised while encoding, before anything is sent.
    #[error("Upload at '{path}' has an invalid content type '{content_type}'")]
    InvalidUpload {
        /// Dotted path of the offending upload.
        path: String,
        /// The content type as declared.
        content_type: String,
    },

    /// The request envelope could not be serialized.
    #[error("Failed to encode GraphQL request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        Self::Server(error.into())
    }
}
