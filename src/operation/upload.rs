//! Upload discovery for the GraphQL multipart request convention.
//!
//! Walking a variables tree moves every [`UploadRef`] out of it, leaving
//! `null` in its place, and records where it was found as a dotted path
//! rooted at `variables` (`variables.file`, `variables.files.0`, ...).
//! Objects are visited in key order and lists by index, pre-order, so the
//! same tree always yields the same keys.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value as Json};

use crate::operation::{Value, Variables};
use crate::operation::value::UploadRef;

const ROOT: &str = "variables";

/// One discovered upload.
#[derive(Debug)]
pub struct UploadEntry {
    key: String,
    path: String,
    upload: UploadRef,
}

impl UploadEntry {
    /// The multipart part name (`"0"`, `"1"`, ...).
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Where the upload sat in the operation, e.g. `variables.files.1`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The upload itself.
    #[must_use]
    pub const fn upload(&self) -> &UploadRef {
        &self.upload
    }

    pub(crate) fn into_upload(self) -> UploadRef {
        self.upload
    }
}

/// Uploads found in a variables tree, in discovery order.
///
/// Keys are assigned sequentially as uploads are found, so iteration order is
/// also ascending key order.
#[derive(Debug, Default)]
pub struct UploadIndex {
    entries: Vec<UploadEntry>,
}

impl UploadIndex {
    /// Number of uploads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no uploads were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = &UploadEntry> {
        self.entries.iter()
    }

    /// Serializes the `map` part: `{"0": ["variables.file"], ...}`.
    ///
    /// Keys are written in ascending numeric order, so `"10"` follows `"9"`.
    ///
    /// # Errors
    ///
    /// Propagates the serializer error, which cannot happen for string data.
    pub fn to_map_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub(crate) fn into_entries(self) -> Vec<UploadEntry> {
        self.entries
    }
}

impl Serialize for UploadIndex {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.key, &[&entry.path])?;
        }
        map.end()
    }
}

/// Moves every upload out of `variables`, returning the nulled JSON tree and
/// the index of what was removed.
#[must_use]
pub fn extract_uploads(variables: Variables) -> (Map<String, Json>, UploadIndex) {
    let mut walker = Walker::collecting();
    let json = walker.visit_root(variables);
    // Collecting walkers never reject an upload.
    let json = json.unwrap_or_default();
    (json, UploadIndex { entries: walker.into_entries() })
}

/// Converts `variables` to JSON, failing with the path of the first upload
/// found, since an upload cannot be sent inline.
pub(crate) fn variables_to_json(variables: Variables) -> Result<Map<String, Json>, String> {
    Walker::rejecting().visit_root(variables)
}

struct Walker {
    uploads: Option<Vec<UploadEntry>>,
    path: Vec<String>,
}

impl Walker {
    const fn collecting() -> Self {
        Self {
            uploads: Some(Vec::new()),
            path: Vec::new(),
        }
    }

    const fn rejecting() -> Self {
        Self {
            uploads: None,
            path: Vec::new(),
        }
    }

    fn into_entries(self) -> Vec<UploadEntry> {
        self.uploads.unwrap_or_default()
    }

    fn visit_root(&mut self, variables: Variables) -> Result<Map<String, Json>, String> {
        self.path.push(ROOT.to_string());
        let result = self.visit_object(variables);
        self.path.pop();
        result
    }

    fn visit_object(&mut self, map: Variables) -> Result<Map<String, Json>, String> {
        let mut out = Map::new();
        for (key, value) in map {
            let json = self.visit_child(key.clone(), value)?;
            out.insert(key, json);
        }
        Ok(out)
    }

    fn visit_child(&mut self, segment: String, value: Value) -> Result<Json, String> {
        self.path.push(segment);
        let result = self.visit(value);
        self.path.pop();
        result
    }

    fn visit(&mut self, value: Value) -> Result<Json, String> {
        Ok(match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(b),
            Value::Number(n) => Json::Number(n),
            Value::String(s) => Json::String(s),
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    out.push(self.visit_child(index.to_string(), item)?);
                }
                Json::Array(out)
            }
            Value::Object(map) => Json::Object(self.visit_object(map)?),
            Value::Upload(upload) => {
                let path = self.path.join(".");
                let Some(entries) = self.uploads.as_mut() else {
                    return Err(path);
                };
                let key = entries.len().to_string();
                entries.push(UploadEntry { key, path, upload });
                Json::Null
            }
        })
    }
}
