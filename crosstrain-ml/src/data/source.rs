//! Document-store boundary: the external source of raw records.
//!
//! The pipeline sees the source through the [`DocumentStore`] trait only.
//! The orchestrator constructs one handle per run and passes it by reference
//! into the ingestion stage; nothing else talks to the source.

use crate::data::frame::Dataset;
use crate::error::PipelineError;
use serde_json::Value;
use std::path::PathBuf;

/// A schema-less key/value record as the source hands it over.
pub type Document = serde_json::Map<String, Value>;

/// Wire-level identifier the source attaches to every document.
const RAW_ID_FIELD: &str = "_id";

/// Sentinel string the source uses for missing values.
const MISSING_MARKER: &str = "na";

/// Synchronous access to a collection of raw documents. Calls block; callers
/// needing timeouts add them at this boundary.
pub trait DocumentStore {
    fn fetch_all(&self, collection: &str) -> Result<Vec<Document>, PipelineError>;
}

/// Materialize fetched documents into a [`Dataset`].
///
/// Column order is first-appearance order across the documents; keys missing
/// from a document become nulls. The wire-level `_id` field is discarded and
/// the `"na"` missing-value marker is normalized to null.
pub fn materialize(documents: Vec<Document>) -> Result<Dataset, PipelineError> {
    let mut columns: Vec<String> = Vec::new();
    for doc in &documents {
        for key in doc.keys() {
            if key != RAW_ID_FIELD && !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }

    let rows: Vec<Vec<Value>> = documents
        .into_iter()
        .map(|mut doc| {
            columns
                .iter()
                .map(|col| normalize(doc.remove(col).unwrap_or(Value::Null)))
                .collect()
        })
        .collect();

    Dataset::new(columns, rows)
}

fn normalize(value: Value) -> Value {
    match value {
        Value::String(s) if s == MISSING_MARKER => Value::Null,
        other => other,
    }
}

/// File-backed document store: one collection per `<root>/<name>.jsonl` file,
/// one JSON document per line.
pub struct JsonlDocumentStore {
    root: PathBuf,
}

impl JsonlDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DocumentStore for JsonlDocumentStore {
    fn fetch_all(&self, collection: &str) -> Result<Vec<Document>, PipelineError> {
        let path = self.root.join(format!("{collection}.jsonl"));
        let content = std::fs::read_to_string(&path).map_err(|e| {
            PipelineError::data_access(format!(
                "ingestion fetch_all: collection {collection} unreachable at {}: {e}",
                path.display()
            ))
        })?;

        let mut documents = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let doc: Document = serde_json::from_str(line).map_err(|e| {
                PipelineError::data_access(format!(
                    "ingestion fetch_all: malformed document at {}:{}: {e}",
                    path.display(),
                    lineno + 1
                ))
            })?;
            documents.push(doc);
        }
        tracing::info!(collection, count = documents.len(), "Fetched documents");
        Ok(documents)
    }
}
