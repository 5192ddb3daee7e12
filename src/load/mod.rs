//! Load module
//!
//! Persists star-schema relations into a target store.
//!
//! # Overview
//!
//! - `RowStore` - Row-wise transactional inserts into DuckDB, one commit per
//!   source file
//! - `Warehouse` - Bulk staging copy into DuckDB followed by set-oriented
//!   `INSERT … SELECT` per table
//! - `LakeWriter` - Whole-relation overwrite as Hive-partitioned Parquet on
//!   any object store
//!
//! None of the loaders retries individual rows: a failing row aborts the
//! surrounding transaction or batch.

mod columnar;
mod database;
mod lake;
pub mod sql;
mod warehouse;
mod writer;

pub use columnar::{
    artists_batch, songplays_batch, songs_batch, time_batch, users_batch, SONGPLAY_PARTITION_COLUMNS,
};
pub use database::RowStore;
pub use lake::{partition_batch, LakeWriter, TableWrite, HIVE_DEFAULT_PARTITION};
pub use warehouse::Warehouse;
pub use writer::{write_batch_to_bytes, write_batches_to_bytes, ParquetWriterConfig};
