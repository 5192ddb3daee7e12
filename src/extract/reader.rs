//! Newline-delimited JSON source reader

use super::location::StoreLocation;
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::info;

/// A source of raw JSON files
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Source files in processing order
    async fn list_files(&self) -> Result<Vec<String>>;

    /// Raw contents of one file
    async fn read_file(&self, file: &str) -> Result<Bytes>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

#[async_trait]
impl RecordSource for StoreLocation {
    /// Every `*.json` object below the location, in lexicographic order
    async fn list_files(&self) -> Result<Vec<String>> {
        let files = self
            .list("")
            .await?
            .iter()
            .map(|path| self.relative(path).to_string())
            .filter(|path| path.ends_with(".json"))
            .collect();
        Ok(files)
    }

    async fn read_file(&self, file: &str) -> Result<Bytes> {
        self.read(&self.child(file)).await
    }

    fn describe(&self) -> String {
        self.url().to_string()
    }
}

/// Decoded records of one source file
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile<T> {
    /// File path relative to the source
    pub file: String,
    pub records: Vec<T>,
}

/// Decode newline-delimited JSON into typed records
///
/// Blank lines are skipped. The first line that fails to parse aborts the
/// whole file.
pub fn decode_jsonl<T: DeserializeOwned>(body: &str, location: &str) -> Result<Vec<T>> {
    let mut records = Vec::new();

    for (line_num, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: T = serde_json::from_str(line)
            .map_err(|e| Error::malformed(location, line_num + 1, e.to_string()))?;

        records.push(record);
    }

    Ok(records)
}

/// Read and decode one file
pub async fn read_records<T: DeserializeOwned>(
    source: &dyn RecordSource,
    file: &str,
) -> Result<SourceFile<T>> {
    let bytes = source.read_file(file).await?;
    let body = std::str::from_utf8(&bytes)
        .map_err(|e| Error::malformed(file, 0, format!("invalid UTF-8: {e}")))?;

    Ok(SourceFile {
        file: file.to_string(),
        records: decode_jsonl(body, file)?,
    })
}

/// Read and decode every file of a source, in order
pub async fn read_all<T: DeserializeOwned>(source: &dyn RecordSource) -> Result<Vec<SourceFile<T>>> {
    let files = source.list_files().await?;
    info!("{} files found in {}", files.len(), source.describe());

    let mut decoded = Vec::with_capacity(files.len());
    for file in &files {
        decoded.push(read_records(source, file).await?);
    }
    Ok(decoded)
}
