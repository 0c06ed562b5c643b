//! Filesystem reader for exported insight documents

use serde_json::Value;
use std::path::{Path, PathBuf};
use subreddit_insights_domain::{DocumentError, InsightDocument};
use thiserror::Error;
use time::OffsetDateTime;

/// Error type for reading an export file
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON after {parsed} document(s): {source}")]
    Json {
        parsed: usize,
        source: serde_json::Error,
    },
    #[error("Document #{index}: {source}")]
    Document {
        index: usize,
        source: DocumentError,
    },
}

/// Reader for mongoexport-style files: a JSON array, a single object, or
/// one object per line
pub struct JsonExportReader {
    path: PathBuf,
}

impl JsonExportReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read every document, stamping generated ids with `now` when a
    /// document carries no date of its own
    pub async fn read(&self, now: OffsetDateTime) -> Result<Vec<InsightDocument>, ImportError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ImportError::Io {
                path: self.path.clone(),
                source,
            })?;

        let documents = parse_export(&content, now)?;
        tracing::debug!(
            path = %self.path.display(),
            count = documents.len(),
            "Read export file"
        );
        Ok(documents)
    }
}

/// Parse export content. Top-level arrays are flattened so both
/// `mongoexport --jsonArray` and line-delimited output work.
pub fn parse_export(content: &str, now: OffsetDateTime) -> Result<Vec<InsightDocument>, ImportError> {
    let mut values = Vec::new();
    for value in serde_json::Deserializer::from_str(content).into_iter::<Value>() {
        match value.map_err(|source| ImportError::Json {
            parsed: values.len(),
            source,
        })? {
            Value::Array(items) => values.extend(items),
            other => values.push(other),
        }
    }

    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            InsightDocument::from_export(value, now)
                .map_err(|source| ImportError::Document { index, source })
        })
        .collect()
}
