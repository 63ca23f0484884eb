//! Configuration error types.
//!
//! Every constructor that validates user input ([`TransportConfigBuilder::build`],
//! [`Endpoint::new`], [`TrustStore::from_pem`]) returns `Result<T, ConfigError>`
//! so a misconfigured transport fails before it ever opens a connection.
//!
//! [`TransportConfigBuilder::build`]: crate::TransportConfigBuilder::build
//! [`Endpoint::new`]: crate::Endpoint::new
//! [`TrustStore::from_pem`]: crate::TrustStore::from_pem
//!
//! # Example
//!
//! ```rust
//! use gql_http::{ConfigError, Endpoint};
//!
//! let result = Endpoint::new("ftp://example.com/graphql");
//! assert!(matches!(result, Err(ConfigError::InvalidUrl { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur while building a transport configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// The endpoint URL could not be parsed or does not use http/https.
    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL that was provided.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A static header name or value is not valid HTTP.
    #[error("Invalid header '{name}'. Header names must be tokens and values must be visible ASCII.")]
    InvalidHeader {
        /// The offending header name.
        name: String,
    },

    /// A cookie name is empty or contains characters not allowed in a cookie.
    #[error("Invalid cookie '{name}'.")]
    InvalidCookie {
        /// The offending cookie name.
        name: String,
    },

    /// A PEM certificate could not be loaded into the trust store.
    #[error("Invalid certificate: {reason}")]
    InvalidCertificate {
        /// Why the certificate was rejected.
        reason: String,
    },
}
