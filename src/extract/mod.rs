//! Extract module
//!
//! Lists and decodes newline-delimited JSON source files from a local
//! directory or an object store.
//!
//! # Overview
//!
//! - `StoreLocation` - A local path or `s3://`, `r2://`, `gs://`, `az://` URL
//! - `RecordSource` - Lists `*.json` files and reads their bytes
//! - `decode_jsonl` / `read_records` - Typed decoding, one record per line

mod location;
mod reader;

pub use location::StoreLocation;
pub use reader::{decode_jsonl, read_all, read_records, RecordSource, SourceFile};

#[cfg(test)]
mod tests;
