//! Variable values, including file upload markers.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

/// A JSON-compatible variable value that may also hold a file upload.
///
/// Objects are kept in a `BTreeMap`, so walking a tree always visits keys in
/// the same order. This is what makes upload keys (`"0"`, `"1"`, ...) stable
/// across runs.
///
/// Values are usually built from `serde_json::Value` or from plain Rust types:
///
/// ```rust
/// use gql_http::{UploadRef, Value};
///
/// let value = Value::object([
///     ("other_var", Value::from(42)),
///     ("file", Value::from(UploadRef::from_bytes("hello"))),
/// ]);
/// assert!(value.contains_uploads());
/// ```
#[derive(Debug)]
pub enum Value {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number.
    Number(serde_json::Number),
    /// JSON string.
    String(String),
    /// Ordered sequence.
    List(Vec<Value>),
    /// String-keyed mapping.
    Object(BTreeMap<String, Value>),
    /// A file to send as a multipart part. Never serialized inline.
    Upload(UploadRef),
}

impl Value {
    /// Builds an object from key/value pairs.
    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Self>,
    {
        Self::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns `true` if this value or any nested value is an upload.
    #[must_use]
    pub fn contains_uploads(&self) -> bool {
        match self {
            Self::Upload(_) => true,
            Self::List(items) => items.iter().any(Self::contains_uploads),
            Self::Object(map) => map.values().any(Self::contains_uploads),
            _ => false,
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<UploadRef> for Value {
    fn from(upload: UploadRef) -> Self {
        Self::Upload(upload)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

/// Non-finite floats have no JSON representation and become `null`.
impl From<f64> for Value {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n).map_or(Self::Null, Self::Number)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A readable byte source standing in for a file inside a variables tree.
///
/// The source is read once, front to back, while the request body is sent.
/// Dropping the `UploadRef` drops the source. A caller that needs the source
/// afterwards (to rewind, inspect or close it) passes it through
/// [`from_shared`](Self::from_shared) and keeps the other `Arc`.
///
/// No content type is inferred from the file name. Without
/// [`with_content_type`](Self::with_content_type) the part carries no
/// `Content-Type` header.
pub struct UploadRef {
    source: Box<dyn Read + Send>,
    content_type: Option<String>,
    file_name: Option<String>,
}

impl UploadRef {
    /// Wraps any readable source.
    pub fn new(source: impl Read + Send + 'static) -> Self {
        Self {
            source: Box::new(source),
            content_type: None,
            file_name: None,
        }
    }

    /// Wraps a source the caller keeps a handle to.
    ///
    /// The transport locks the mutex for each read, so the caller must not
    /// hold the lock while the request is in flight.
    ///
    /// ```rust
    /// use std::io::Cursor;
    /// use std::sync::Arc;
    ///
    /// use gql_http::UploadRef;
    /// use parking_lot::Mutex;
    ///
    /// let shared = Arc::new(Mutex::new(Cursor::new(b"hello".to_vec())));
    /// let upload = UploadRef::from_shared(Arc::clone(&shared));
    /// # drop(upload);
    /// assert_eq!(shared.lock().position(), 0);
    /// ```
    pub fn from_shared<R>(source: Arc<Mutex<R>>) -> Self
    where
        R: Read + Send + 'static,
    {
        Self::new(SharedSource(source))
    }

    /// Wraps an in-memory buffer.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(Cursor::new(bytes.into()))
    }

    /// Opens a file on disk, using its final path component as the file name.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let upload = Self::new(file);
        Ok(match path.file_name() {
            Some(name) => upload.with_file_name(name.to_string_lossy()),
            None => upload,
        })
    }

    /// Declares the part's `Content-Type`.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Declares the part's file name.
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Returns the declared content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the declared file name.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub(crate) fn into_parts(self) -> (Box<dyn Read + Send>, Option<String>, Option<String>) {
        (self.source, self.content_type, self.file_name)
    }
}

struct SharedSource<R>(Arc<Mutex<R>>);

impl<R: Read> Read for SharedSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.lock().read(buf)
    }
}

impl fmt::Debug for UploadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRef")
            .field("content_type", &self.content_type)
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}
