//! Client and session lifecycle.
//!
//! A [`Client`] owns a [`Transport`] and optionally the server's schema.
//! [`Client::connect`] opens the transport and returns a [`Session`], through
//! which operations are executed. Dropping the session closes the transport
//! exactly once, on success, on error and on panic alike.
//!
//! # Example
//!
//! ```rust,no_run
//! use gql_http::{Client, HttpTransport, Operation, TransportConfig};
//!
//! let config = TransportConfig::builder()
//!     .url("https://countries.example.com/graphql")
//!     .build()?;
//! let mut client = Client::new(HttpTransport::new(config));
//!
//! let data = client.with_session(|session| {
//!     session.execute(Operation::new("query { continents { code name } }"))
//! })?;
//! println!("{data}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use parking_lot::Mutex;

use crate::clients::errors::TransportError;
use crate::clients::http_response::ExecutionResult;
use crate::clients::transport::Transport;
use crate::operation::Operation;

/// The standard introspection query used to fetch a schema.
pub const INTROSPECTION_QUERY: &str = r"
query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    subscriptionType { name }
    types { ...FullType }
    directives {
      name
      description
      locations
      args { ...InputValue }
    }
  }
}

fragment FullType on __Type {
  kind
  name
  description
  fields(includeDeprecated: true) {
    name
    description
    args { ...InputValue }
    type { ...TypeRef }
    isDeprecated
    deprecationReason
  }
  inputFields { ...InputValue }
  interfaces { ...TypeRef }
  enumValues(includeDeprecated: true) {
    name
    description
    isDeprecated
    deprecationReason
  }
  possibleTypes { ...TypeRef }
}

fragment InputValue on __InputValue {
  name
  description
  type { ...TypeRef }
  defaultValue
}

fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType {
        kind
        name
        ofType {
          kind
          name
          ofType {
            kind
            name
            ofType {
              kind
              name
              ofType { kind name }
            }
          }
        }
      }
    }
  }
}
";

/// Owner of a transport and, once fetched, the server schema.
///
/// # Example
///
/// ```rust,no_run
/// use gql_http::{Client, HttpTransport, TransportConfig};
///
/// let config = TransportConfig::builder().url("http://localhost:4000/graphql").build()?;
/// let mut client = Client::new(HttpTransport::new(config)).fetch_schema_from_transport(true);
///
/// let session = client.connect()?;
/// println!("schema fetched: {}", session.schema().is_some());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Client<T: Transport> {
    transport: T,
    fetch_schema_from_transport: bool,
    schema: Option<serde_json::Value>,
}

impl<T: Transport> Client<T> {
    /// Creates a client that does not fetch the schema.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            fetch_schema_from_transport: false,
            schema: None,
        }
    }

    /// Fetches the schema by introspection on the first successful connect.
    #[must_use]
    pub const fn fetch_schema_from_transport(mut self, fetch: bool) -> Self {
        self.fetch_schema_from_transport = fetch;
        self
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the client, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Returns the introspection result, once fetched.
    #[must_use]
    pub const fn schema(&self) -> Option<&serde_json::Value> {
        self.schema.as_ref()
    }

    /// Connects the transport and opens a session.
    ///
    /// If schema fetching is enabled and no schema is held yet, the
    /// introspection query runs before the session is returned. Should it
    /// fail, the transport is closed again and the failure returned; a
    /// [`QueryError`](crate::QueryError) is reported as
    /// `Error while fetching schema: <first error>`.
    ///
    /// # Errors
    ///
    /// Returns the connect failure or the schema fetch failure.
    pub fn connect(&mut self) -> Result<Session<'_, T>, TransportError> {
        self.transport.connect()?;

        if self.fetch_schema_from_transport && self.schema.is_none() {
            if let Err(error) = self.fetch_schema() {
                self.transport.close();
                return Err(error);
            }
        }

        Ok(Session {
            transport: Mutex::new(&mut self.transport),
            schema: self.schema.as_ref(),
        })
    }

    /// Runs `f` inside a session, closing the transport afterwards.
    ///
    /// # Errors
    ///
    /// Returns the connect failure or whatever `f` returns.
    pub fn with_session<R, E, F>(&mut self, f: F) -> Result<R, E>
    where
        E: From<TransportError>,
        F: FnOnce(&Session<'_, T>) -> Result<R, E>,
    {
        let session = self.connect()?;
        f(&session)
    }

    fn fetch_schema(&mut self) -> Result<(), TransportError> {
        tracing::debug!("Fetching schema from transport");
        let result = self
            .transport
            .execute(Operation::new(INTROSPECTION_QUERY), false)
            .map_err(|error| match error {
                TransportError::Query(error) => {
                    TransportError::Query(error.with_context("Error while fetching schema"))
                }
                other => other,
            })?;
        self.schema = result.data;
        Ok(())
    }
}

/// A connected transport, shareable across threads.
///
/// Operations are executed one at a time; concurrent callers wait for the
/// transport lock. The transport is closed when the session is dropped.
#[derive(Debug)]
pub struct Session<'a, T: Transport> {
    transport: Mutex<&'a mut T>,
    schema: Option<&'a serde_json::Value>,
}

impl<'a, T: Transport> Session<'a, T> {
    /// Executes an operation and returns its `data` (`null` when absent).
    ///
    /// # Errors
    ///
    /// Returns the transport failure, including [`QueryError`](crate::QueryError)
    /// when the server reports GraphQL errors.
    pub fn execute(&self, operation: Operation) -> Result<serde_json::Value, TransportError> {
        self.execute_with_result(operation)
            .map(|result| result.data.unwrap_or(serde_json::Value::Null))
    }

    /// Executes an operation and returns the full result.
    ///
    /// Uploads in the variables are rejected with
    /// [`TransportError::UnexpectedUpload`].
    ///
    /// # Errors
    ///
    /// Returns the transport failure.
    pub fn execute_with_result(&self, operation: Operation) -> Result<ExecutionResult, TransportError> {
        self.transport.lock().execute(operation, false)
    }

    /// Executes an operation, sending any uploads as a multipart request.
    ///
    /// # Errors
    ///
    /// Returns the transport failure.
    pub fn execute_with_uploads(&self, operation: Operation) -> Result<ExecutionResult, TransportError> {
        self.transport.lock().execute(operation, true)
    }

    /// Returns the schema held by the client, if any.
    #[must_use]
    pub const fn schema(&self) -> Option<&'a serde_json::Value> {
        self.schema
    }

    /// Runs `f` with exclusive access to the transport.
    pub fn with_transport<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.transport.lock();
        f(&mut **guard)
    }
}

impl<T: Transport> Drop for Session<'_, T> {
    fn drop(&mut self) {
        self.transport.get_mut().close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::errors::QueryError;
    use crate::clients::transport::ConnectionState;
    use serde_json::json;
    use std::collections::VecDeque;

    #[derive(Debug, Default)]
    struct FakeTransport {
        connected: bool,
        connects: usize,
        closes: usize,
        queries: Vec<String>,
        answers: VecDeque<Result<ExecutionResult, TransportError>>,
    }

    impl FakeTransport {
        fn answering(answers: Vec<Result<ExecutionResult, TransportError>>) -> Self {
            Self {
                answers: answers.into(),
                ..Self::default()
            }
        }
    }

    impl Transport for FakeTransport {
        fn connect(&mut self) -> Result<(), TransportError> {
            if self.connected {
                return Err(TransportError::AlreadyConnected);
            }
            self.connected = true;
            self.connects += 1;
            Ok(())
        }

        fn execute(
            &mut self,
            operation: Operation,
            _upload_files: bool,
        ) -> Result<ExecutionResult, TransportError> {
            if !self.connected {
                return Err(TransportError::Closed);
            }
            self.queries.push(operation.query().to_string());
            self.answers
                .pop_front()
                .unwrap_or_else(|| Ok(ExecutionResult::default()))
        }

        fn close(&mut self) {
            if self.connected {
                self.connected = false;
                self.closes += 1;
            }
        }

        fn state(&self) -> ConnectionState {
            if self.connected {
                ConnectionState::Connected
            } else {
                ConnectionState::Disconnected
            }
        }
    }

    fn data(value: serde_json::Value) -> Result<ExecutionResult, TransportError> {
        Ok(ExecutionResult {
            data: Some(value),
            ..ExecutionResult::default()
        })
    }

    #[test]
    fn test_session_executes_and_closes_once() {
        let mut client = Client::new(FakeTransport::answering(vec![data(json!({"a": 1}))]));

        let value = client
            .with_session(|session| session.execute(Operation::new("{ a }")))
            .unwrap();

        assert_eq!(value, json!({"a": 1}));
        assert_eq!(client.transport().connects, 1);
        assert_eq!(client.transport().closes, 1);
        assert_eq!(client.transport().state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_session_closes_once_on_error() {
        let failure = Err(QueryError::new(json!(["boom"]), None, None).into());
        let mut client = Client::new(FakeTransport::answering(vec![failure]));

        let err = client
            .with_session(|session| session.execute(Operation::new("{ a }")))
            .unwrap_err();

        assert_eq!(err.to_string(), "boom");
        assert_eq!(client.transport().closes, 1);
    }

    #[test]
    fn test_missing_data_is_null() {
        let mut client = Client::new(FakeTransport::default());
        let value = client
            .with_session(|session| session.execute(Operation::new("{ a }")))
            .unwrap();
        assert!(value.is_null());
    }

    #[test]
    fn test_connect_twice_through_session_fails() {
        let mut client = Client::new(FakeTransport::default());
        let session = client.connect().unwrap();

        let err = session.with_transport(Transport::connect).unwrap_err();
        assert!(matches!(err, TransportError::AlreadyConnected));

        drop(session);
        assert_eq!(client.transport().closes, 1);
    }

    #[test]
    fn test_schema_is_fetched_once() {
        let transport = FakeTransport::answering(vec![data(json!({"__schema": {"types": []}}))]);
        let mut client = Client::new(transport).fetch_schema_from_transport(true);

        {
            let session = client.connect().unwrap();
            assert!(session.schema().is_some());
        }
        client.with_session(|_| Ok::<_, TransportError>(())).unwrap();

        let transport = client.transport();
        assert_eq!(transport.queries.len(), 1);
        assert!(transport.queries[0].contains("__schema"));
        assert_eq!(transport.closes, 2);
        assert!(client.schema().is_some());
    }

    #[test]
    fn test_schema_failure_closes_transport() {
        let failure = Err(QueryError::new(json!(["Permission denied"]), None, None).into());
        let transport = FakeTransport::answering(vec![failure]);
        let mut client = Client::new(transport).fetch_schema_from_transport(true);

        let err = client.connect().unwrap_err();

        assert!(matches!(err, TransportError::Query(_)));
        assert_eq!(
            err.to_string(),
            "Error while fetching schema: Permission denied"
        );
        assert_eq!(client.transport().state(), ConnectionState::Disconnected);
        assert_eq!(client.transport().closes, 1);
        assert!(client.schema().is_none());
    }

    #[test]
    fn test_session_is_shareable_across_threads() {
        let answers = (0..4).map(|i| data(json!(i))).collect();
        let mut client = Client::new(FakeTransport::answering(answers));

        let mut seen = client
            .with_session(|session| {
                std::thread::scope(|scope| {
                    let handles: Vec<_> = (0..4)
                        .map(|_| scope.spawn(|| session.execute(Operation::new("{ n }"))))
                        .collect();
                    handles
                        .into_iter()
                        .map(|h| h.join().unwrap())
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .unwrap();
        seen.sort_by_key(|v| v.as_i64());

        assert_eq!(seen, [json!(0), json!(1), json!(2), json!(3)]);
        assert_eq!(client.transport().closes, 1);
    }
}
