//! GraphQL transport and session types.
//!
//! This module provides the HTTP layer for executing GraphQL operations:
//! encoding requests (JSON or multipart), sending them, and classifying the
//! answers into typed results and failures.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`Transport`]: The connect/execute/close contract
//! - [`HttpTransport`]: The blocking HTTP implementation
//! - [`Client`]: Owner of a transport, optionally fetching the schema
//! - [`Session`]: A connected transport that closes itself when dropped
//! - [`ExecutionResult`]: A successful GraphQL result
//! - [`ResponseHeaders`]: Headers of the most recent HTTP response
//! - [`TransportError`]: Every way an operation can fail
//!
//! # Example
//!
//! ```rust,no_run
//! use gql_http::{Client, HttpTransport, Operation, TransportConfig, UploadRef};
//!
//! let config = TransportConfig::builder()
//!     .url("http://localhost:4000/graphql")
//!     .header("X-Auth", "abc123")
//!     .build()?;
//! let mut client = Client::new(HttpTransport::new(config));
//!
//! let session = client.connect()?;
//! let operation = Operation::new("mutation ($file: Upload!) { uploadFile(file: $file) { success } }")
//!     .variable("file", UploadRef::open("report.pdf")?.with_content_type("application/pdf"));
//! let result = session.execute_with_uploads(operation)?;
//! println!("{:?}", result.data);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Failure Behavior
//!
//! Nothing is retried. A status failure carries its code, and the response
//! headers (for instance `Retry-After` on a 429) remain readable through
//! [`HttpTransport::response_headers`] so callers can schedule their own
//! retry.

mod encoder;
mod errors;
mod http_response;
mod session;
mod transport;

pub use encoder::{encode, EncodedRequest, FilePart, MultipartBody, RequestBody};
pub use errors::{ProtocolError, QueryError, ServerError, TransportError};
pub use http_response::{classify, ExecutionResult, ResponseHeaders};
pub use session::{Client, Session, INTROSPECTION_QUERY};
pub use transport::{ConnectionState, HttpTransport, Transport, SDK_VERSION};
