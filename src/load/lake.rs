//! Hive-partitioned Parquet lake writer

use super::columnar::{artists_batch, songplays_batch, songs_batch, time_batch, users_batch};
use super::writer::{write_batch_to_bytes, ParquetWriterConfig};
use crate::error::{Error, Result};
use crate::extract::StoreLocation;
use crate::transform::{Activity, Catalog};
use arrow::array::{Array, AsArray, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::datatypes::{DataType, Int32Type, Int64Type};
use arrow::record_batch::RecordBatch;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Directory value used for null partition keys
pub const HIVE_DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

const PART_FILE: &str = "part-00000.parquet";

/// Result of writing one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWrite {
    pub table: String,
    pub rows: usize,
    /// Full paths of the files written
    pub files: Vec<String>,
}

/// Writes star-schema relations as Parquet below a destination location
#[derive(Debug, Clone)]
pub struct LakeWriter {
    destination: StoreLocation,
    parquet: ParquetWriterConfig,
    partitions: BTreeMap<String, Vec<String>>,
}

impl LakeWriter {
    pub fn new(
        destination: StoreLocation,
        parquet: ParquetWriterConfig,
        partitions: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            destination,
            parquet,
            partitions,
        }
    }

    /// Partition columns configured for a table (empty when unpartitioned)
    pub fn partitions_for(&self, table: &str) -> &[String] {
        self.partitions.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn destination(&self) -> &StoreLocation {
        &self.destination
    }

    /// Replace a table's files with the content of `batch`
    pub async fn write_table(&self, table: &str, batch: &RecordBatch) -> Result<TableWrite> {
        let removed = self.destination.delete_all(table).await?;
        if removed > 0 {
            debug!("Removed {removed} existing object(s) under {table}/");
        }

        let parts = partition_batch(batch, self.partitions_for(table))?;
        let mut files = Vec::with_capacity(parts.len());

        for (dir, part) in parts {
            let relative = if dir.is_empty() {
                format!("{table}/{PART_FILE}")
            } else {
                format!("{table}/{dir}/{PART_FILE}")
            };
            let bytes = write_batch_to_bytes(&part, &self.parquet)?;
            let path = self.destination.write(&relative, bytes).await?;
            debug!("Wrote {} rows to {path}", part.num_rows());
            files.push(path);
        }

        info!(
            "Table {table}: {} rows in {} file(s)",
            batch.num_rows(),
            files.len()
        );

        Ok(TableWrite {
            table: table.to_string(),
            rows: batch.num_rows(),
            files,
        })
    }

    /// Write all five star-schema tables
    pub async fn write_star(
        &self,
        catalog: &Catalog,
        activity: &Activity,
    ) -> Result<Vec<TableWrite>> {
        let tables = [
            ("songs", songs_batch(&catalog.songs)?),
            ("artists", artists_batch(&catalog.artists)?),
            ("users", users_batch(&activity.users)?),
            ("time", time_batch(&activity.time)?),
            ("songplays", songplays_batch(&activity.songplays)?),
        ];

        let mut writes = Vec::with_capacity(tables.len());
        for (table, batch) in &tables {
            writes.push(self.write_table(table, batch).await?);
        }
        Ok(writes)
    }
}

/// Split a batch into Hive partition directories
///
/// Returns `(directory, batch)` pairs ordered by directory. The returned
/// batches no longer contain the partition columns. Without partition
/// columns the whole batch is returned under an empty directory, even when
/// it has no rows.
pub fn partition_batch(
    batch: &RecordBatch,
    columns: &[String],
) -> Result<Vec<(String, RecordBatch)>> {
    if columns.is_empty() {
        return Ok(vec![(String::new(), batch.clone())]);
    }

    let schema = batch.schema();
    let mut key_indices = Vec::with_capacity(columns.len());
    for name in columns {
        let idx = schema
            .index_of(name)
            .map_err(|_| Error::output(format!("Unknown partition column '{name}'")))?;
        key_indices.push(idx);
    }

    let data_indices: Vec<usize> = (0..batch.num_columns())
        .filter(|i| !key_indices.contains(i))
        .collect();
    let data = batch.project(&data_indices)?;

    let mut groups: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    for row in 0..batch.num_rows() {
        let mut segments = Vec::with_capacity(columns.len());
        for (name, &idx) in columns.iter().zip(&key_indices) {
            let value = partition_value(batch.column(idx).as_ref(), row)?;
            let value = value.map_or_else(|| HIVE_DEFAULT_PARTITION.to_string(), |v| escape(&v));
            segments.push(format!("{name}={value}"));
        }
        groups.entry(segments.join("/")).or_default().push(row as u32);
    }

    let mut parts = Vec::with_capacity(groups.len());
    for (dir, rows) in groups {
        let indices = UInt32Array::from(rows);
        parts.push((dir, take_record_batch(&data, &indices)?));
    }
    Ok(parts)
}

fn partition_value(array: &dyn Array, row: usize) -> Result<Option<String>> {
    if array.is_null(row) {
        return Ok(None);
    }
    let value = match array.data_type() {
        DataType::Utf8 => array.as_string::<i32>().value(row).to_string(),
        DataType::Int32 => array.as_primitive::<Int32Type>().value(row).to_string(),
        DataType::Int64 => array.as_primitive::<Int64Type>().value(row).to_string(),
        other => {
            return Err(Error::output(format!(
                "Unsupported partition column type {other}"
            )))
        }
    };
    Ok(Some(value))
}

/// Percent-encode the characters Hive escapes in a `key=value` path segment
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if needs_escape(c) {
            escaped.push_str(&format!("%{:02X}", c as u32));
        } else {
            escaped.push(c);
        }
    }
    escaped
}

fn needs_escape(c: char) -> bool {
    c.is_ascii_control()
        || matches!(
            c,
            '"' | '#' | '%' | '\'' | '*' | '/' | ':' | '=' | '?' | '\\' | '{' | '[' | ']' | '^'
        )
}
