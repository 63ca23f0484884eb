//! Synchronous HTTP transport for GraphQL operations.
//!
//! [`HttpTransport`] owns a [`TransportConfig`] and, while connected, a
//! blocking `reqwest` client. Each [`execute`](Transport::execute) call is one
//! `POST` round trip: encode, send, record the response headers, classify.
//! Redirects are not followed; a `3xx` answer is classified like any other.
//!
//! # State Machine
//!
//! ```text
//! Disconnected --connect()--> Connected --close()--> Disconnected
//! ```
//!
//! - `connect()` while connected fails with [`TransportError::AlreadyConnected`]
//! - `execute()` while disconnected fails with [`TransportError::Closed`]
//! - `close()` is idempotent and never fails
//!
//! # Example
//!
//! ```rust,no_run
//! use gql_http::{HttpTransport, Operation, Transport, TransportConfig};
//!
//! let config = TransportConfig::builder()
//!     .url("https://countries.example.com/graphql")
//!     .header("Authorization", "Bearer abc123")
//!     .build()?;
//! let mut transport = HttpTransport::new(config);
//!
//! transport.connect()?;
//! let result = transport.execute(Operation::new("query { continents { code } }"), false)?;
//! println!("{:?}", result.data);
//! println!("{:?}", transport.response_headers().and_then(|h| h.get("X-Request-Id")));
//! transport.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::Arc;

use reqwest::blocking::Client as BlockingClient;
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;

use crate::clients::encoder::{encode, RequestBody};
use crate::clients::errors::{ServerError, TransportError};
use crate::clients::http_response::{classify, ExecutionResult, ResponseHeaders};
use crate::config::{TlsVerification, TransportConfig};
use crate::operation::Operation;

/// Crate version, sent in the default `User-Agent`.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Connection state of a [`Transport`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No HTTP client is held; `execute` fails.
    Disconnected,
    /// An HTTP client is held and operations may be executed.
    Connected,
}

/// A connection-oriented executor of GraphQL operations.
///
/// The [`Client`](crate::Client) and [`Session`](crate::Session) types drive
/// any implementation of this trait; [`HttpTransport`] is the HTTP one.
pub trait Transport {
    /// Opens the connection.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::AlreadyConnected`] if already connected, or
    /// an error describing why the connection could not be set up.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Executes one operation.
    ///
    /// When `upload_files` is `true` and the variables hold uploads, the
    /// request is sent as `multipart/form-data`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if not connected, or the failure
    /// the round trip produced.
    fn execute(
        &mut self,
        operation: Operation,
        upload_files: bool,
    ) -> Result<ExecutionResult, TransportError>;

    /// Releases the connection. Calling it again is a no-op.
    fn close(&mut self);

    /// Returns the current connection state.
    fn state(&self) -> ConnectionState;
}

/// GraphQL over HTTP `POST`, backed by a blocking `reqwest` client.
///
/// # Thread Safety
///
/// `HttpTransport` is `Send` and `Sync`, but executes one request at a time
/// (`execute` takes `&mut self`). Share it across threads through a
/// [`Session`](crate::Session).
///
/// The underlying blocking client must not be dropped from within an async
/// runtime; call [`close`](Transport::close) from a blocking context.
#[derive(Debug)]
pub struct HttpTransport {
    config: TransportConfig,
    client: Option<BlockingClient>,
    response_headers: Option<ResponseHeaders>,
}

// Verify HttpTransport is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpTransport>();
};

impl HttpTransport {
    /// Creates a disconnected transport.
    #[must_use]
    pub const fn new(config: TransportConfig) -> Self {
        Self {
            config,
            client: None,
            response_headers: None,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Returns the HTTP client while connected.
    #[must_use]
    pub const fn client(&self) -> Option<&BlockingClient> {
        self.client.as_ref()
    }

    /// Returns the headers of the most recent HTTP response.
    ///
    /// `None` until a response has been received. A round trip that fails
    /// before any response arrives (DNS, connect, TLS, timeout) leaves the
    /// previous snapshot in place.
    #[must_use]
    pub const fn response_headers(&self) -> Option<&ResponseHeaders> {
        self.response_headers.as_ref()
    }

    fn build_client(&self) -> Result<BlockingClient, reqwest::Error> {
        let url = self.config.url().url();

        // Seeded cookies apply to the endpoint; Set-Cookie answers are kept
        // for the lifetime of the connection.
        let jar = Jar::default();
        for (name, value) in self.config.cookies() {
            jar.add_cookie_str(&format!("{name}={value}"), url);
        }

        let mut builder = BlockingClient::builder()
            .use_rustls_tls()
            .user_agent(format!("gql-http v{SDK_VERSION}"))
            .cookie_provider(Arc::new(jar))
            .redirect(Policy::none())
            .timeout(self.config.timeout());

        match self.config.verify() {
            TlsVerification::Enabled => {}
            TlsVerification::Disabled => {
                builder = builder.danger_accept_invalid_certs(true);
            }
            TlsVerification::Custom(store) => {
                builder = builder.tls_built_in_root_certs(false);
                for certificate in store.certificates() {
                    builder = builder.add_root_certificate(certificate.clone());
                }
            }
        }

        builder.build()
    }
}

impl Transport for HttpTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.client.is_some() {
            return Err(TransportError::AlreadyConnected);
        }

        tracing::debug!("Connecting transport to {}", self.config.url());
        self.client = Some(self.build_client()?);
        Ok(())
    }

    fn execute(
        &mut self,
        operation: Operation,
        upload_files: bool,
    ) -> Result<ExecutionResult, TransportError> {
        let Some(client) = self.client.as_ref() else {
            return Err(TransportError::Closed);
        };

        let encoded = encode(operation, upload_files)?;
        let url = self.config.url().url().clone();

        // Encoder headers win over configured ones with the same name.
        let mut headers = self.config.headers().clone();
        for (name, value) in &encoded.headers {
            headers.insert(name.clone(), value.clone());
        }

        let request = match encoded.body {
            RequestBody::Json(body) => {
                tracing::debug!("Sending GraphQL request to {}", url);
                client.post(url).headers(headers).body(body)
            }
            RequestBody::Multipart(body) => {
                tracing::debug!(
                    "Sending GraphQL multipart request with {} file(s) to {}",
                    body.files().len(),
                    url
                );
                // The multipart boundary header is set by the form itself.
                headers.remove(CONTENT_TYPE);
                client.post(url).headers(headers).multipart(body.into_form()?)
            }
        };

        let response = request.send().map_err(|error| {
            let error = ServerError::from(error);
            tracing::warn!("GraphQL request failed: {}", error);
            error
        })?;

        self.response_headers = Some(ResponseHeaders::from(response.headers()));
        let status = response.status();
        let url = response.url().clone();
        let body = response.bytes().map_err(ServerError::from)?;

        classify(status, &url, &body).map_err(|error| {
            if let TransportError::Server(ref server) = error {
                tracing::warn!("GraphQL request failed: {}", server);
            }
            error
        })
    }

    fn close(&mut self) {
        if self.client.take().is_some() {
            tracing::debug!("Closing transport to {}", self.config.url());
        }
    }

    fn state(&self) -> ConnectionState {
        if self.client.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
}
