//! TLS certificate verification settings.
//!
//! A transport verifies server certificates against the bundled web PKI roots
//! by default. Verification can be turned off entirely (testing only), or
//! pinned to a caller-supplied [`TrustStore`], in which case the built-in roots
//! are not consulted at all.
//!
//! # Example
//!
//! ```rust,ignore
//! use gql_http::{TlsVerification, TransportConfig, TrustStore};
//!
//! let pem = std::fs::read("ca.crt")?;
//! let config = TransportConfig::builder()
//!     .url("https://localhost:8443/graphql")
//!     .verify(TlsVerification::Custom(TrustStore::from_pem(&pem)?))
//!     .build()?;
//! ```

use std::fmt;

use crate::error::ConfigError;

/// A set of trusted root certificates.
#[derive(Clone, Default)]
pub struct TrustStore {
    certificates: Vec<reqwest::Certificate>,
}

impl TrustStore {
    /// Creates an empty trust store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every certificate from a PEM bundle.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCertificate`] if the bundle cannot be
    /// parsed or contains no certificates.
    pub fn from_pem(pem: &[u8]) -> Result<Self, ConfigError> {
        let mut store = Self::new();
        store.add_pem(pem)?;
        Ok(store)
    }

    /// Adds every certificate from a PEM bundle to this store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCertificate`] if the bundle cannot be
    /// parsed or contains no certificates.
    pub fn add_pem(&mut self, pem: &[u8]) -> Result<(), ConfigError> {
        let certificates = reqwest::Certificate::from_pem_bundle(pem).map_err(|e| {
            ConfigError::InvalidCertificate {
                reason: e.to_string(),
            }
        })?;
        if certificates.is_empty() {
            return Err(ConfigError::InvalidCertificate {
                reason: "no PEM certificates found".to_string(),
            });
        }
        self.certificates.extend(certificates);
        Ok(())
    }

    /// Returns the number of certificates in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Returns `true` if the store holds no certificates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub(crate) fn certificates(&self) -> impl Iterator<Item = &reqwest::Certificate> {
        self.certificates.iter()
    }
}

impl fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustStore")
            .field("certificates", &self.certificates.len())
            .finish()
    }
}

/// How server certificates are verified when the endpoint uses `https`.
#[derive(Clone, Debug, Default)]
pub enum TlsVerification {
    /// Verify against the bundled web PKI roots.
    #[default]
    Enabled,
    /// Accept any certificate. Testing only.
    Disabled,
    /// Verify only against the supplied roots.
    Custom(TrustStore),
}

impl TlsVerification {
    /// Returns `true` unless verification is disabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl From<bool> for TlsVerification {
    fn from(verify: bool) -> Self {
        if verify {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

impl From<TrustStore> for TlsVerification {
    fn from(store: TrustStore) -> Self {
        Self::Custom(store)
    }
}
