//! Request body encoding.
//!
//! An [`Operation`] becomes either a JSON body or, when uploads are enabled
//! and present, a `multipart/form-data` body laid out as the GraphQL
//! multipart request convention requires:
//!
//! 1. `operations`: the JSON envelope with every upload replaced by `null`
//! 2. `map`: `{"0": ["variables.file"], ...}`
//! 3. one part per upload, named by its key, in ascending key order
//!
//! Nothing follows the last file part. Upload sources are only read when the
//! body is sent, front to back, in part order. A file part without a declared
//! file name is sent with its key as the file name.

use std::fmt;
use std::io::Read;

use mime::Mime;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use crate::clients::errors::TransportError;
use crate::operation::{
    extract_uploads, variables_to_json, GraphqlRequest, Operation, UploadEntry,
};

/// Encoded request: headers contributed by the encoder plus the body.
///
/// For a multipart body the headers are empty; the HTTP layer sets
/// `Content-Type: multipart/form-data; boundary=...` itself.
#[derive(Debug)]
pub struct EncodedRequest {
    /// Headers that override any configured header of the same name.
    pub headers: HeaderMap,
    /// The request body.
    pub body: RequestBody,
}

/// The two body shapes a request can take.
#[derive(Debug)]
pub enum RequestBody {
    /// `application/json` bytes.
    Json(Vec<u8>),
    /// `multipart/form-data` parts.
    Multipart(MultipartBody),
}

/// Multipart body parts, in wire order.
#[derive(Debug)]
pub struct MultipartBody {
    operations: String,
    map: String,
    files: Vec<FilePart>,
}

impl MultipartBody {
    /// The `operations` part.
    #[must_use]
    pub fn operations(&self) -> &str {
        &self.operations
    }

    /// The `map` part.
    #[must_use]
    pub fn map(&self) -> &str {
        &self.map
    }

    /// The file parts, in ascending key order.
    #[must_use]
    pub fn files(&self) -> &[FilePart] {
        &self.files
    }

    /// Every part name in wire order: `operations`, `map`, then the keys.
    #[must_use]
    pub fn part_names(&self) -> Vec<&str> {
        ["operations", "map"]
            .into_iter()
            .chain(self.files.iter().map(|f| f.name.as_str()))
            .collect()
    }

    /// Converts into a streaming `reqwest` form.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUpload`] if `reqwest` refuses a
    /// content type that already parsed during encoding.
    pub(crate) fn into_form(self) -> Result<Form, TransportError> {
        let mut form = Form::new()
            .text("operations", self.operations)
            .text("map", self.map);
        for file in self.files {
            let mut part = Part::reader(file.source).file_name(file.file_name);
            if let Some(content_type) = file.content_type {
                part = part.mime_str(content_type.as_ref()).map_err(|_| {
                    TransportError::InvalidUpload {
                        path: file.path,
                        content_type: content_type.to_string(),
                    }
                })?;
            }
            form = form.part(file.name, part);
        }
        Ok(form)
    }
}

/// One uploaded file, streamed from its source.
pub struct FilePart {
    name: String,
    path: String,
    content_type: Option<Mime>,
    file_name: String,
    source: Box<dyn Read + Send>,
}

impl FilePart {
    /// The part name (the upload key).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted path of the upload in the variables, e.g. `variables.file`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The declared `Content-Type`, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_ref().map(AsRef::as_ref)
    }

    /// The file name sent with the part: the declared one, else the key.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("content_type", &self.content_type)
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}

/// Encodes an operation into request headers and body.
///
/// Uploads are only looked for when `upload_files` is `true`. A multipart
/// body is produced only when at least one upload was found; otherwise the
/// body is plain JSON.
///
/// # Errors
///
/// - [`TransportError::UnexpectedUpload`] if `upload_files` is `false` and the
///   variables contain an upload
/// - [`TransportError::InvalidUpload`] if a declared content type is not a
///   valid MIME type
/// - [`TransportError::Encode`] if JSON serialization fails
pub fn encode(operation: Operation, upload_files: bool) -> Result<EncodedRequest, TransportError> {
    let (query, operation_name, variables) = operation.into_parts();

    if !upload_files {
        let variables = variables
            .map(variables_to_json)
            .transpose()
            .map_err(|path| TransportError::UnexpectedUpload { path })?;
        return json_request(GraphqlRequest {
            query,
            operation_name,
            variables,
        });
    }

    let (variables, index) = match variables {
        Some(vars) => {
            let (json, index) = extract_uploads(vars);
            (Some(json), index)
        }
        None => (None, Default::default()),
    };

    let request = GraphqlRequest {
        query,
        operation_name,
        variables,
    };
    if index.is_empty() {
        return json_request(request);
    }

    let operations = serde_json::to_string(&request)?;
    let map = index.to_map_json()?;
    let files = index
        .into_entries()
        .into_iter()
        .map(file_part)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EncodedRequest {
        headers: HeaderMap::new(),
        body: RequestBody::Multipart(MultipartBody {
            operations,
            map,
            files,
        }),
    })
}

fn file_part(entry: UploadEntry) -> Result<FilePart, TransportError> {
    let name = entry.key().to_string();
    let path = entry.path().to_string();
    let (source, content_type, file_name) = entry.into_upload().into_parts();

    let content_type = content_type
        .map(|declared| {
            declared
                .parse::<Mime>()
                .map_err(|_| TransportError::InvalidUpload {
                    path: path.clone(),
                    content_type: declared,
                })
        })
        .transpose()?;

    Ok(FilePart {
        file_name: file_name.unwrap_or_else(|| name.clone()),
        name,
        path,
        content_type,
        source,
    })
}

fn json_request(request: GraphqlRequest) -> Result<EncodedRequest, TransportError> {
    let body = serde_json::to_vec(&request)?;
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(EncodedRequest {
        headers,
        body: RequestBody::Json(body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{UploadRef, Value};
    use serde_json::json;

    const UPLOAD_MUTATION: &str = "mutation ($file: Upload!) { uploadFile(file: $file) { success } }";

    fn decode(body: &RequestBody) -> GraphqlRequest {
        match body {
            RequestBody::Json(bytes) => serde_json::from_slice(bytes).unwrap(),
            RequestBody::Multipart(_) => panic!("expected a JSON body"),
        }
    }

    #[test]
    fn test_plain_operation_encodes_as_json() {
        let operation = Operation::new("query { continents { code } }")
            .variable("code", "AF")
            .variable("limit", 3);

        let encoded = encode(operation, false).unwrap();

        assert_eq!(encoded.headers.get(CONTENT_TYPE).unwrap(), "application/json");
        let request = decode(&encoded.body);
        assert_eq!(request.query, "query { continents { code } }");
        assert_eq!(request.operation_name, None);
        assert_eq!(
            request.variables.map(serde_json::Value::Object),
            Some(json!({"code": "AF", "limit": 3}))
        );
    }

    #[test]
    fn test_json_round_trip_keeps_operation_name() {
        let operation = Operation::new("query A { a } query B { b }")
            .operation_name("B")
            .variables(Default::default());

        let encoded = encode(operation, false).unwrap();
        let request = decode(&encoded.body);

        assert_eq!(request.operation_name.as_deref(), Some("B"));
        assert_eq!(request.variables, Some(serde_json::Map::new()));
    }

    #[test]
    fn test_upload_flag_without_uploads_still_encodes_json() {
        let operation = Operation::new("query { a }").variable("x", 1);
        let encoded = encode(operation, true).unwrap();
        assert!(matches!(encoded.body, RequestBody::Json(_)));
    }

    #[test]
    fn test_upload_without_flag_is_rejected() {
        let operation =
            Operation::new(UPLOAD_MUTATION).variable("file", UploadRef::from_bytes("x"));

        let err = encode(operation, false).unwrap_err();
        assert!(
            matches!(err, TransportError::UnexpectedUpload { ref path } if path == "variables.file")
        );
    }

    #[test]
    fn test_single_upload_produces_three_parts() {
        let operation = Operation::new(UPLOAD_MUTATION)
            .variable("file", UploadRef::from_bytes("content"))
            .variable("other_var", 42);

        let encoded = encode(operation, true).unwrap();

        assert!(encoded.headers.is_empty());
        let RequestBody::Multipart(body) = encoded.body else {
            panic!("expected multipart");
        };
        assert_eq!(body.part_names(), ["operations", "map", "0"]);
        assert_eq!(body.map(), r#"{"0":["variables.file"]}"#);

        let operations: serde_json::Value = serde_json::from_str(body.operations()).unwrap();
        assert_eq!(
            operations,
            json!({"query": UPLOAD_MUTATION, "variables": {"file": null, "other_var": 42}})
        );
        let file = &body.files()[0];
        assert!(file.content_type().is_none());
        assert_eq!(file.file_name(), "0");
        assert_eq!(file.path(), "variables.file");
    }

    #[test]
    fn test_declared_content_type_and_file_name_are_kept() {
        let operation = Operation::new(UPLOAD_MUTATION).variable(
            "file",
            UploadRef::from_bytes("%PDF")
                .with_content_type("application/pdf")
                .with_file_name("doc.pdf"),
        );

        let RequestBody::Multipart(body) = encode(operation, true).unwrap().body else {
            panic!("expected multipart");
        };
        let file = &body.files()[0];
        assert_eq!(file.content_type(), Some("application/pdf"));
        assert_eq!(file.file_name(), "doc.pdf");
    }

    #[test]
    fn test_k_uploads_produce_k_plus_two_parts() {
        let files: Vec<Value> = (0..3)
            .map(|i| UploadRef::from_bytes(format!("file {i}")).into())
            .collect();
        let operation = Operation::new("mutation ($files: [Upload!]!) { up(files: $files) }")
            .variable("files", Value::List(files));

        let RequestBody::Multipart(body) = encode(operation, true).unwrap().body else {
            panic!("expected multipart");
        };

        assert_eq!(body.part_names(), ["operations", "map", "0", "1", "2"]);
        let map: serde_json::Value = serde_json::from_str(body.map()).unwrap();
        assert_eq!(
            map,
            json!({
                "0": ["variables.files.0"],
                "1": ["variables.files.1"],
                "2": ["variables.files.2"],
            })
        );
    }

    #[test]
    fn test_invalid_mime_is_rejected_while_encoding() {
        let operation = Operation::new(UPLOAD_MUTATION).variable(
            "file",
            UploadRef::from_bytes("x").with_content_type("not a mime"),
        );

        let err = encode(operation, true).unwrap_err();
        assert!(matches!(
            err,
            TransportError::InvalidUpload { ref path, ref content_type }
                if path == "variables.file" && content_type == "not a mime"
        ));
    }

    #[test]
    fn test_content_type_parameters_are_kept() {
        let operation = Operation::new(UPLOAD_MUTATION).variable(
            "file",
            UploadRef::from_bytes("x").with_content_type("text/plain; charset=utf-8"),
        );

        let RequestBody::Multipart(body) = encode(operation, true).unwrap().body else {
            panic!("expected multipart");
        };
        assert_eq!(
            body.files()[0].content_type(),
            Some("text/plain; charset=utf-8")
        );
        assert!(body.into_form().is_ok());
    }
}
