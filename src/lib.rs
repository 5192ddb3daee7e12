// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # songplay-etl
//!
//! Builds the "songplay" analytics star schema from raw song-catalog and
//! user-activity logs.
//!
//! ## Features
//!
//! - **Four backends**: row store, Parquet lake, staging warehouse, and an
//!   orchestrated task graph with data-quality checks
//! - **Object store input/output**: local paths or `s3://`, `r2://`, `gs://`, `az://`
//! - **DuckDB**: embedded SQL engine for the relational backends
//! - **Arrow Output**: Hive-partitioned Parquet for the lake backend
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use songplay_etl::{config::PipelineConfig, pipeline::Pipeline, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = PipelineConfig::from_file("songplay.yaml")?;
//!     let summary = Pipeline::new(&config).run().await?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Pipeline                               │
//! │   database │ lake │ warehouse │ orchestrated (Dag + quality)     │
//! └──────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────┬──────────────┬───┴──────────┬───────────┬───────────┐
//! │  Extract  │  Transform   │     Load     │  Quality  │   Schema  │
//! ├───────────┼──────────────┼──────────────┼───────────┼───────────┤
//! │ JSONL     │ Catalog      │ RowStore     │ Values    │ Records   │
//! │ Object    │ Activity     │ Warehouse    │ Non-empty │ Rows      │
//! │ store     │ Calendar     │ Lake/Parquet │           │ Tables    │
//! └───────────┴──────────────┴──────────────┴───────────┴───────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the pipeline
pub mod error;

/// Common types and type aliases
pub mod types;

/// Pipeline configuration
pub mod config;

/// Raw records, star-schema rows and table definitions
pub mod schema;

/// Source listing and JSON decoding
pub mod extract;

/// Record-to-relation transforms
pub mod transform;

/// Row store, warehouse and lake loaders
pub mod load;

/// Data quality checks
pub mod quality;

/// Task graph with retries
pub mod orchestrator;

/// Backend wiring
pub mod pipeline;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::PipelineConfig;
pub use pipeline::{Pipeline, RunSummary};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
