//! Pipeline module
//!
//! Wires extraction, transformation and loading for the configured backend.
//!
//! # Overview
//!
//! - `database` - Row-wise load into a DuckDB row store, one transaction per file
//! - `lake` - Whole-dataset transform written as Hive-partitioned Parquet
//! - `warehouse` - Bulk staging followed by set-oriented SQL
//! - `orchestrated` - The warehouse steps as a task graph with quality checks

mod types;

pub use types::RunSummary;

use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::extract::{read_all, read_records, RecordSource, SourceFile, StoreLocation};
use crate::load::{LakeWriter, RowStore, Warehouse};
use crate::orchestrator::{Dag, RetryPolicy, TaskOutcome};
use crate::schema::{LogRecord, SongRecord, STAR_TABLES};
use crate::transform::{activity, catalog, CatalogIndex};
use crate::types::Backend;
use serde::de::DeserializeOwned;
use std::cell::Cell;
use std::time::Instant;
use tracing::{info, warn};

/// Runs the ETL described by a `PipelineConfig`
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the configured backend to completion
    pub async fn run(&self) -> Result<RunSummary> {
        let start = Instant::now();
        let filter = &self.config.transform.page_filter;
        if !filter.is_canonical() {
            warn!("Using non-default page filter '{filter}'");
        }

        info!("Starting {} pipeline", self.config.backend);
        let mut summary = match self.config.backend {
            Backend::Database => self.run_database().await?,
            Backend::Lake => self.run_lake().await?,
            Backend::Warehouse => self.run_warehouse().await?,
            Backend::Orchestrated => self.run_orchestrated().await?,
        };
        summary.duration_ms = start.elapsed().as_millis() as u64;

        info!("Pipeline finished: {summary}");
        Ok(summary)
    }

    fn song_source(&self) -> Result<StoreLocation> {
        StoreLocation::parse_existing(&self.config.source.song_data)
    }

    fn log_source(&self) -> Result<StoreLocation> {
        StoreLocation::parse_existing(&self.config.source.log_data)
    }

    /// Row store: song files first, then log files, one transaction each
    pub async fn run_database(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::new(Backend::Database);
        let options = self.config.activity_options();

        let mut store = RowStore::open(&self.config.database.path)?;
        store.reset()?;

        let songs = self.song_source()?;
        let files = for_each_file::<SongRecord, _>(&songs, |file| {
            let rows = catalog::transform(&file.records);
            store.load_catalog_file(&rows)
        })
        .await?;
        summary.add_files(files);

        let index = store.catalog_index()?;
        info!("Catalog index holds {} song(s)", index.len());

        let logs = self.log_source()?;
        let files = for_each_file::<LogRecord, _>(&logs, |file| {
            let rows = activity::transform(&file.records, &index, &options);
            store.load_activity_file(&rows, options.user_dedup)
        })
        .await?;
        summary.add_files(files);

        for table in &STAR_TABLES {
            summary.add_table(table.name, store.row_count(table)?);
        }
        Ok(summary)
    }

    /// Lake: transform the whole dataset, then overwrite every table
    pub async fn run_lake(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::new(Backend::Lake);
        let options = self.config.activity_options();

        let song_files: Vec<SourceFile<SongRecord>> = read_all(&self.song_source()?).await?;
        let log_files: Vec<SourceFile<LogRecord>> = read_all(&self.log_source()?).await?;
        summary.add_files(song_files.len() + log_files.len());

        let songs: Vec<SongRecord> = song_files.into_iter().flat_map(|f| f.records).collect();
        let logs: Vec<LogRecord> = log_files.into_iter().flat_map(|f| f.records).collect();

        let catalog = catalog::transform(&songs);
        let index = CatalogIndex::from_records(&songs);
        let activity = activity::transform(&logs, &index, &options);

        let writer = LakeWriter::new(
            StoreLocation::parse(&self.config.lake.output).context("Invalid lake output")?,
            self.config.parquet_config(),
            self.config.lake.partitions.clone(),
        );
        for write in writer.write_star(&catalog, &activity).await? {
            summary.add_table(write.table, write.rows);
        }
        Ok(summary)
    }

    /// Warehouse: stage everything, then rebuild each star table
    pub async fn run_warehouse(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::new(Backend::Warehouse);

        let warehouse = Warehouse::open(&self.config.warehouse.path, self.config.activity_options())?;
        warehouse.reset()?;

        summary.add_files(stage_songs(&warehouse, &self.song_source()?).await?);
        summary.add_files(stage_events(&warehouse, &self.log_source()?).await?);
        warehouse.load_all()?;

        for table in &STAR_TABLES {
            summary.add_table(table.name, warehouse.row_count(table)?);
        }
        Ok(summary)
    }

    /// Orchestrated: the warehouse steps as a task graph, followed by checks
    pub async fn run_orchestrated(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::new(Backend::Orchestrated);

        let warehouse = Warehouse::open(&self.config.warehouse.path, self.config.activity_options())?;
        warehouse.reset()?;

        let song_source = self.song_source()?;
        let log_source = self.log_source()?;
        let checker = self.config.quality_checker();
        let retry = self.config.retry_policy();
        let song_files = Cell::new(0);
        let log_files = Cell::new(0);

        let run = {
            let warehouse = &warehouse;
            let checker = &checker;
            let (song_source, log_source) = (&song_source, &log_source);
            let (song_files, log_files) = (&song_files, &log_files);

            let mut dag = Dag::new();
            dag.add_task("stage_events", retry, move || async move {
                stage_events(warehouse, log_source).await.map(|files| {
                    log_files.set(files);
                    TaskOutcome::Succeeded
                })
            })?;
            dag.add_task("stage_songs", retry, move || async move {
                stage_songs(warehouse, song_source).await.map(|files| {
                    song_files.set(files);
                    TaskOutcome::Succeeded
                })
            })?;
            dag.add_task("load_songplays", retry, move || async move {
                warehouse.load_songplays().map(|_| TaskOutcome::Succeeded)
            })?;
            dag.add_task("load_users", retry, move || async move {
                warehouse.load_users().map(|_| TaskOutcome::Succeeded)
            })?;
            dag.add_task("load_songs", retry, move || async move {
                warehouse.load_songs().map(|_| TaskOutcome::Succeeded)
            })?;
            dag.add_task("load_artists", retry, move || async move {
                warehouse.load_artists().map(|_| TaskOutcome::Succeeded)
            })?;
            dag.add_task("load_time", retry, move || async move {
                warehouse.load_time().map(|_| TaskOutcome::Succeeded)
            })?;
            dag.add_task("run_quality_checks", RetryPolicy::none(), move || async move {
                checker.run_value_checks(warehouse.connection())
            })?;
            dag.add_task("run_empty_table_checks", RetryPolicy::none(), move || async move {
                checker.run_empty_table_checks(warehouse.connection())
            })?;

            dag.add_dependency("stage_events", "load_songplays")?;
            dag.add_dependency("stage_songs", "load_songplays")?;
            for dimension in ["load_users", "load_songs", "load_artists", "load_time"] {
                dag.add_dependency("load_songplays", dimension)?;
                dag.add_dependency(dimension, "run_quality_checks")?;
                dag.add_dependency(dimension, "run_empty_table_checks")?;
            }

            dag.run().await?
        };

        summary.tasks = run.records().to_vec();
        run.into_result()?;

        summary.add_files(song_files.get() + log_files.get());
        for table in &STAR_TABLES {
            summary.add_table(table.name, warehouse.row_count(table)?);
        }
        Ok(summary)
    }
}

/// Decode and process each file of a source in order, returning the file count
async fn for_each_file<T, F>(source: &dyn RecordSource, mut process: F) -> Result<usize>
where
    T: DeserializeOwned,
    F: FnMut(SourceFile<T>) -> Result<usize>,
{
    let files = source.list_files().await?;
    let total = files.len();
    info!("{total} files found in {}", source.describe());

    for (i, file) in files.iter().enumerate() {
        let decoded = read_records::<T>(source, file).await?;
        let rows = process(decoded)?;
        info!("{}/{total} files processed ({file}, {rows} rows)", i + 1);
    }
    Ok(total)
}

async fn stage_songs(warehouse: &Warehouse, source: &dyn RecordSource) -> Result<usize> {
    let files: Vec<SourceFile<SongRecord>> = read_all(source).await?;
    let records: Vec<SongRecord> = files.iter().flat_map(|f| f.records.iter().cloned()).collect();
    warehouse.stage_songs(&records)?;
    Ok(files.len())
}

async fn stage_events(warehouse: &Warehouse, source: &dyn RecordSource) -> Result<usize> {
    let files: Vec<SourceFile<LogRecord>> = read_all(source).await?;
    let records: Vec<LogRecord> = files.iter().flat_map(|f| f.records.iter().cloned()).collect();
    warehouse.stage_events(&records)?;
    Ok(files.len())
}

#[cfg(test)]
mod tests;
