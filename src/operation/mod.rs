//! GraphQL operations and their variables.
//!
//! An [`Operation`] is a query document (already produced by the caller; it
//! is never parsed here), an optional operation name, and an optional
//! variables tree. Variables may contain [`UploadRef`] markers, which the
//! encoder moves into multipart parts.
//!
//! # Example
//!
//! ```rust
//! use gql_http::{Operation, UploadRef, Value};
//!
//! let operation = Operation::new("mutation ($file: Upload!) { uploadFile(file: $file) { success } }")
//!     .variable("file", UploadRef::from_bytes("hello").with_content_type("text/plain"))
//!     .variable("other_var", 42);
//!
//! assert!(operation.has_uploads());
//! ```

mod upload;
mod value;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use upload::{extract_uploads, UploadEntry, UploadIndex};
pub(crate) use upload::variables_to_json;
pub use value::{UploadRef, Value};

/// Variables of an operation, keyed by variable name.
pub type Variables = BTreeMap<String, Value>;

/// A GraphQL document plus its variables, ready for transmission.
#[derive(Debug)]
pub struct Operation {
    query: String,
    operation_name: Option<String>,
    variables: Option<Variables>,
}

impl Operation {
    /// Creates an operation with no name and no variables.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: None,
        }
    }

    /// Selects which operation in the document to run.
    #[must_use]
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Replaces all variables.
    #[must_use]
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Sets a single variable.
    #[must_use]
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables
            .get_or_insert_with(Variables::new)
            .insert(name.into(), value.into());
        self
    }

    /// Returns the query document.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns the operation name, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    /// Returns the variables, if any were set.
    #[must_use]
    pub const fn variables_ref(&self) -> Option<&Variables> {
        self.variables.as_ref()
    }

    /// Returns `true` if any variable holds an upload.
    #[must_use]
    pub fn has_uploads(&self) -> bool {
        self.variables
            .as_ref()
            .is_some_and(|vars| vars.values().any(Value::contains_uploads))
    }

    pub(crate) fn into_parts(self) -> (String, Option<String>, Option<Variables>) {
        (self.query, self.operation_name, self.variables)
    }
}

/// The JSON request envelope, as sent in a JSON body or the `operations` part.
///
/// `operationName` is omitted when unset and accepted as absent or `null`
/// when decoding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphqlRequest {
    /// The query document.
    pub query: String,
    /// The operation to run.
    #[serde(
        rename = "operationName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_name: Option<String>,
    /// Variables with every upload replaced by `null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Map<String, serde_json::Value>>,
}
