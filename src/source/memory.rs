//! In-memory ordered collections
//!
//! Documents are JSON objects grouped by collection path. Ordered queries
//! sort by one field with the document id as tie-breaker, and skip documents
//! that lack the field.

use super::types::{DataSource, PageRequest};
use crate::error::{Error, Result, ResultExt};
use crate::types::{Cursor, JsonValue, Page, Record, SortDirection};
use async_trait::async_trait;
use serde_json::json;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Unique id within the collection
    pub id: String,
    /// Document body
    pub data: JsonValue,
}

impl Document {
    /// Create a new document
    pub fn new(id: impl Into<String>, data: JsonValue) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Data source backed by in-memory collections of JSON documents
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    collections: HashMap<String, Vec<Document>>,
    latency: Option<Duration>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection, replacing any existing one at `path`
    #[must_use]
    pub fn with_collection(mut self, path: impl Into<String>, documents: Vec<Document>) -> Self {
        self.collections.insert(path.into(), documents);
        self
    }

    /// Delay every fetch by `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Append a document to a collection, creating it if needed
    pub fn insert(&mut self, path: &str, document: Document) {
        self.collections
            .entry(path.to_string())
            .or_default()
            .push(document);
    }

    /// Number of documents stored at `path`
    pub fn len(&self, path: &str) -> usize {
        self.collections.get(path).map_or(0, Vec::len)
    }

    /// Whether no collection holds any document
    pub fn is_empty(&self) -> bool {
        self.collections.values().all(Vec::is_empty)
    }

    /// Load collections from a JSON file.
    ///
    /// The file maps collection paths to arrays of objects:
    ///
    /// ```json
    /// { "cats": [ { "id": "tom", "name": "Tom", "age": 3 } ] }
    /// ```
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            read => read.with_context(|| {
                format!("Failed to read data file '{}'", path.display())
            })?,
        };
        Self::from_json_str(&content)
    }

    /// Load collections from a JSON string (see [`MemorySource::from_json_file`]).
    ///
    /// A document's id is its `id` field when that is a string or number,
    /// otherwise its index in the array.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(content)?;
        let JsonValue::Object(map) = value else {
            return Err(Error::config(
                "Data file must be an object mapping collection paths to arrays",
            ));
        };

        let mut source = Self::new();
        for (path, docs) in map {
            let JsonValue::Array(docs) = docs else {
                return Err(Error::invalid_value(
                    path,
                    "collection must be an array of documents",
                ));
            };
            let documents = docs
                .into_iter()
                .enumerate()
                .map(|(index, data)| {
                    let id = match data.get("id") {
                        Some(JsonValue::String(s)) => s.clone(),
                        Some(JsonValue::Number(n)) => n.to_string(),
                        _ => index.to_string(),
                    };
                    Document::new(id, data)
                })
                .collect();
            source = source.with_collection(path, documents);
        }
        Ok(source)
    }

    fn query(&self, request: &PageRequest) -> Result<Page<JsonValue>> {
        let Some(docs) = self.collections.get(&request.path) else {
            debug!(path = %request.path, "Unknown collection, returning empty page");
            return Ok(Page::empty());
        };

        let mut ordered: Vec<(&JsonValue, &Document)> = docs
            .iter()
            .filter_map(|doc| doc.data.get(&request.field).map(|value| (value, doc)))
            .collect();
        ordered.sort_by(|a, b| {
            compare_keys((a.0, &a.1.id), (b.0, &b.1.id), request.direction)
        });

        let start = match &request.after {
            None => 0,
            Some(cursor) => {
                let (value, id) = decode_cursor(cursor)?;
                ordered
                    .iter()
                    .position(|(v, doc)| {
                        compare_keys((v, &doc.id), (&value, &id), request.direction)
                            == Ordering::Greater
                    })
                    .unwrap_or(ordered.len())
            }
        };

        let records = ordered
            .into_iter()
            .skip(start)
            .take(request.limit as usize)
            .map(|(value, doc)| Record::new(encode_cursor(value, &doc.id), doc.data.clone()))
            .collect();

        Ok(Page::new(records))
    }
}

#[async_trait]
impl DataSource for MemorySource {
    type Item = JsonValue;

    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<JsonValue>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.query(request)
    }
}

// ============================================================================
// Ordering and Cursors
// ============================================================================

fn encode_cursor(value: &JsonValue, id: &str) -> Cursor {
    Cursor::new(json!([value, id]).to_string())
}

fn decode_cursor(cursor: &Cursor) -> Result<(JsonValue, String)> {
    serde_json::from_str::<(JsonValue, String)>(cursor.as_str())
        .map_err(|e| Error::invalid_cursor(format!("'{cursor}': {e}")))
}

fn compare_keys(
    a: (&JsonValue, &String),
    b: (&JsonValue, &String),
    direction: SortDirection,
) -> Ordering {
    let ordering = compare_values(a.0, b.0).then_with(|| a.1.cmp(b.1));
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

/// Total order over JSON values: null < bool < number < string < array < object
fn compare_values(a: &JsonValue, b: &JsonValue) -> Ordering {
    fn rank(value: &JsonValue) -> u8 {
        match value {
            JsonValue::Null => 0,
            JsonValue::Bool(_) => 1,
            JsonValue::Number(_) => 2,
            JsonValue::String(_) => 3,
            JsonValue::Array(_) => 4,
            JsonValue::Object(_) => 5,
        }
    }

    match (a, b) {
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        (JsonValue::Array(x), JsonValue::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(x, y)| compare_values(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (JsonValue::Object(_), JsonValue::Object(_)) => a.to_string().cmp(&b.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}
