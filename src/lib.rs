//! # gql-http
//!
//! A blocking GraphQL-over-HTTP transport with support for the GraphQL
//! multipart request convention (file uploads).
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`TransportConfig`] and [`TransportConfigBuilder`]
//! - A validated [`Endpoint`] newtype and TLS verification modes
//! - Operations with typed variables, including streamed [`UploadRef`] uploads
//! - An [`HttpTransport`] that posts operations and classifies the answers
//! - A [`Client`]/[`Session`] pair that guarantees the transport is closed
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gql_http::{Client, HttpTransport, Operation, TransportConfig};
//!
//! let config = TransportConfig::builder()
//!     .url("https://countries.example.com/graphql")
//!     .header("Authorization", "Bearer abc123")
//!     .build()?;
//! let mut client = Client::new(HttpTransport::new(config));
//!
//! let data = client.with_session(|session| {
//!     session.execute(
//!         Operation::new("query getContinent($code: ID!) { continent(code: $code) { name } }")
//!             .variable("code", "EU"),
//!     )
//! })?;
//! println!("{}", data["continent"]["name"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## File Uploads
//!
//! Any [`Value::Upload`] found in the variables is moved into its own
//! multipart part when the operation is executed with
//! [`Session::execute_with_uploads`]:
//!
//! ```rust,no_run
//! use gql_http::{Client, HttpTransport, Operation, TransportConfig, UploadRef, Value};
//!
//! let config = TransportConfig::builder().url("http://localhost:4000/graphql").build()?;
//! let mut client = Client::new(HttpTransport::new(config));
//!
//! let files = Value::List(vec![
//!     UploadRef::open("a.txt")?.into(),
//!     UploadRef::from_bytes(vec![0u8, 1, 2]).with_file_name("b.bin").into(),
//! ]);
//! let operation = Operation::new("mutation ($files: [Upload!]!) { uploadFiles(files: $files) { success } }")
//!     .variable("files", files);
//!
//! client.with_session(|session| session.execute_with_uploads(operation))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Logging
//!
//! Connection lifecycle and requests are logged at `debug` level through the
//! [`tracing`](https://docs.rs/tracing) crate; HTTP failures at `warn`.
//!
//! ## Design Principles
//!
//! - **No global state**: Configuration is instance-based and passed explicitly
//! - **Fail-fast validation**: Configuration is validated when built
//! - **Typed failures**: Every failure mode is a distinct error variant
//! - **Streaming uploads**: Upload sources are read only while the body is sent

pub mod clients;
pub mod config;
pub mod error;
pub mod operation;

// Re-export public types at crate root for convenience
pub use config::{Endpoint, TlsVerification, TransportConfig, TransportConfigBuilder, TrustStore};
pub use error::ConfigError;

// Re-export transport types
pub use clients::{
    classify, encode, Client, ConnectionState, EncodedRequest, ExecutionResult, HttpTransport,
    ProtocolError, QueryError, RequestBody, ResponseHeaders, ServerError, Session, Transport,
    TransportError,
};

// Re-export operation types
pub use operation::{
    extract_uploads, GraphqlRequest, Operation, UploadEntry, UploadIndex, UploadRef, Value,
    Variables,
};
