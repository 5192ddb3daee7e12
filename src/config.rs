//! Pipeline configuration
//!
//! One YAML document selects the backend and carries the settings of every
//! stage. It is read once at start-up and passed down by reference.

use crate::error::{Error, Result};
use crate::load::{ParquetWriterConfig, SONGPLAY_PARTITION_COLUMNS};
use crate::orchestrator::RetryPolicy;
use crate::quality::{QualityChecker, ValueCheck};
use crate::schema::{is_valid_identifier, SqlType, STAR_TABLES};
use crate::transform::ActivityOptions;
use crate::types::{Backend, PageFilter, UserDedupPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete pipeline configuration loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Target store and load strategy
    #[serde(default)]
    pub backend: Backend,

    /// Where the raw JSON files live
    pub source: SourceConfig,

    #[serde(default)]
    pub transform: TransformConfig,

    /// Row store settings (`database` backend)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Warehouse settings (`warehouse` and `orchestrated` backends)
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// Parquet lake settings (`lake` backend)
    #[serde(default)]
    pub lake: LakeConfig,

    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    #[serde(default)]
    pub quality: QualityConfig,
}

// ============================================================================
// Sections
// ============================================================================

/// Raw input locations (local paths or `s3://`, `r2://`, `gs://`, `az://` URLs)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub song_data: String,
    pub log_data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Page name identifying song plays
    #[serde(default)]
    pub page_filter: PageFilter,

    #[serde(default)]
    pub user_dedup: UserDedupPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// DuckDB file, or `:memory:`
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "songplay.duckdb".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// DuckDB file, or `:memory:`
    #[serde(default = "default_warehouse_path")]
    pub path: String,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            path: default_warehouse_path(),
        }
    }
}

fn default_warehouse_path() -> String {
    "songplay_warehouse.duckdb".to_string()
}

/// Parquet compression codec
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    #[default]
    Snappy,
    Zstd,
    Gzip,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LakeConfig {
    /// Output location (local path or object store URL)
    #[serde(default = "default_lake_output")]
    pub output: String,

    #[serde(default)]
    pub compression: ParquetCompression,

    #[serde(default = "default_row_group_size")]
    pub row_group_size: usize,

    /// Partition columns per table; tables not listed are unpartitioned
    #[serde(default = "default_partitions")]
    pub partitions: BTreeMap<String, Vec<String>>,
}

impl Default for LakeConfig {
    fn default() -> Self {
        Self {
            output: default_lake_output(),
            compression: ParquetCompression::default(),
            row_group_size: default_row_group_size(),
            partitions: default_partitions(),
        }
    }
}

fn default_lake_output() -> String {
    "lake".to_string()
}

fn default_row_group_size() -> usize {
    1024 * 1024
}

fn default_partitions() -> BTreeMap<String, Vec<String>> {
    let columns = |names: &[&str]| names.iter().map(ToString::to_string).collect();
    BTreeMap::from([
        ("songs".to_string(), columns(&["year", "artist_id"])),
        ("time".to_string(), columns(&["year", "month"])),
        ("songplays".to_string(), columns(&SONGPLAY_PARTITION_COLUMNS)),
    ])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Retries after the first attempt of a staging or load task
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between attempts
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Scalar queries with expected results
    #[serde(default)]
    pub checks: Vec<ValueCheck>,

    /// Tables that must not be empty
    #[serde(default)]
    pub tables: Vec<String>,
}

// ============================================================================
// Loading & Validation
// ============================================================================

impl PipelineConfig {
    /// Load and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read config file '{}': {e}",
                    path.display()
                ))
            }
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Minimal config over the given source locations
    pub fn new(song_data: impl Into<String>, log_data: impl Into<String>) -> Self {
        Self {
            backend: Backend::default(),
            source: SourceConfig {
                song_data: song_data.into(),
                log_data: log_data.into(),
            },
            transform: TransformConfig::default(),
            database: DatabaseConfig::default(),
            warehouse: WarehouseConfig::default(),
            lake: LakeConfig::default(),
            orchestration: OrchestrationConfig::default(),
            quality: QualityConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.song_data.trim().is_empty() {
            return Err(Error::missing_field("source.song_data"));
        }
        if self.source.log_data.trim().is_empty() {
            return Err(Error::missing_field("source.log_data"));
        }

        if self.lake.row_group_size == 0 {
            return Err(Error::invalid_value(
                "lake.row_group_size",
                "must be greater than zero",
            ));
        }

        for (table, columns) in &self.lake.partitions {
            let def = STAR_TABLES
                .iter()
                .find(|t| t.name == table.as_str())
                .ok_or_else(|| {
                    Error::invalid_value("lake.partitions", format!("unknown table '{table}'"))
                })?;
            for column in columns {
                let derived =
                    def.name == "songplays" && SONGPLAY_PARTITION_COLUMNS.contains(&column.as_str());
                match def.column(column) {
                    None if !derived => {
                        return Err(Error::invalid_value(
                            "lake.partitions",
                            format!("table '{table}' has no column '{column}'"),
                        ));
                    }
                    Some(col)
                        if !matches!(
                            col.sql_type,
                            SqlType::Text | SqlType::Integer | SqlType::BigInt
                        ) =>
                    {
                        return Err(Error::invalid_value(
                            "lake.partitions",
                            format!(
                                "column '{table}.{column}' has type {} and cannot be a partition key",
                                col.sql_type.sql()
                            ),
                        ));
                    }
                    _ => {}
                }
            }
        }

        for table in &self.quality.tables {
            if !is_valid_identifier(table) {
                return Err(Error::invalid_value(
                    "quality.tables",
                    format!("'{table}' is not a plain table name"),
                ));
            }
        }

        if self.quality.checks.iter().any(|c| c.sql.trim().is_empty()) {
            return Err(Error::invalid_value("quality.checks", "empty query"));
        }

        Ok(())
    }

    pub fn activity_options(&self) -> ActivityOptions {
        ActivityOptions {
            page_filter: self.transform.page_filter.clone(),
            user_dedup: self.transform.user_dedup,
        }
    }

    /// Retry policy for staging and load tasks
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.orchestration.max_retries,
            Duration::from_secs(self.orchestration.retry_delay_secs),
        )
    }

    pub fn parquet_config(&self) -> ParquetWriterConfig {
        let config = ParquetWriterConfig::new().with_row_group_size(self.lake.row_group_size);
        match self.lake.compression {
            ParquetCompression::Snappy => config.snappy(),
            ParquetCompression::Zstd => config.zstd(),
            ParquetCompression::Gzip => config.gzip(),
            ParquetCompression::None => config.uncompressed(),
        }
    }

    pub fn quality_checker(&self) -> QualityChecker {
        QualityChecker::new(self.quality.checks.clone(), self.quality.tables.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    const MINIMAL: &str = "
source:
  song_data: data/song_data
  log_data: data/log_data
";

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = PipelineConfig::from_yaml_str(MINIMAL).unwrap();

        assert_eq!(config.backend, Backend::Database);
        assert_eq!(config.transform.page_filter, PageFilter::next_song());
        assert_eq!(config.transform.user_dedup, UserDedupPolicy::LastWins);
        assert_eq!(config.database.path, "songplay.duckdb");
        assert_eq!(config.lake.compression, ParquetCompression::Snappy);
        assert_eq!(
            config.lake.partitions["songs"],
            vec!["year".to_string(), "artist_id".to_string()]
        );
        assert!(!config.lake.partitions.contains_key("users"));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(config.quality.checks.is_empty());
        assert_eq!(config, PipelineConfig::new("data/song_data", "data/log_data"));
    }

    #[test]
    fn test_full_config() {
        let yaml = "
backend: orchestrated
source:
  song_data: s3://udacity-dend/song_data
  log_data: s3://udacity-dend/log_data
transform:
  page_filter: Next Song
  user_dedup: first_wins
warehouse:
  path: ':memory:'
lake:
  output: ./out
  compression: zstd
  row_group_size: 1000
  partitions:
    users: [level]
orchestration:
  max_retries: 1
  retry_delay_secs: 2
quality:
  checks:
    - sql: SELECT COUNT(*) FROM artists WHERE artist_id IS NULL
      expected: 0
  tables: [artists, time, users, songs, songplays]
";
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.backend, Backend::Orchestrated);
        assert_eq!(config.transform.page_filter, PageFilter::spaced_next_song());
        assert_eq!(config.activity_options().user_dedup, UserDedupPolicy::FirstWins);
        assert_eq!(config.warehouse.path, ":memory:");
        assert_eq!(config.lake.partitions.len(), 1);
        assert_eq!(config.parquet_config().row_group_size(), 1000);
        assert_eq!(
            config.retry_policy(),
            RetryPolicy::new(1, Duration::from_secs(2))
        );
        assert_eq!(config.quality.checks[0].expected, json!(0));
        assert_eq!(config.quality.tables.len(), 5);
    }

    #[test]
    fn test_missing_source_rejected() {
        assert!(matches!(
            PipelineConfig::from_yaml_str("backend: lake\n"),
            Err(Error::YamlParse(_))
        ));

        let empty = "source:\n  song_data: ''\n  log_data: logs\n";
        assert!(matches!(
            PipelineConfig::from_yaml_str(empty),
            Err(Error::MissingConfigField { .. })
        ));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let yaml = format!("backend: spark\n{MINIMAL}");
        assert!(PipelineConfig::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_partition_columns_validated() {
        let mut config = PipelineConfig::new("songs", "logs");
        config
            .lake
            .partitions
            .insert("users".to_string(), vec!["shoe_size".to_string()]);
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfigValue { .. })
        ));

        let mut config = PipelineConfig::new("songs", "logs");
        config
            .lake
            .partitions
            .insert("playlists".to_string(), vec![]);
        assert!(config.validate().is_err());
    }

    #[test_case("time", "start_time" ; "timestamp column")]
    #[test_case("songs", "duration" ; "double column")]
    #[test_case("artists", "latitude" ; "nullable double column")]
    fn test_partition_columns_need_key_types(table: &str, column: &str) {
        let mut config = PipelineConfig::new("songs", "logs");
        config
            .lake
            .partitions
            .insert(table.to_string(), vec![column.to_string()]);
        match config.validate() {
            Err(Error::InvalidConfigValue { field, .. }) => assert_eq!(field, "lake.partitions"),
            other => panic!("expected invalid partition column, got {other:?}"),
        }
    }

    #[test]
    fn test_partition_columns_accept_key_types() {
        let mut config = PipelineConfig::new("songs", "logs");
        config
            .lake
            .partitions
            .insert("users".to_string(), vec!["level".to_string(), "user_id".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_quality_tables_must_be_identifiers() {
        let mut config = PipelineConfig::new("songs", "logs");
        config.quality.tables = vec!["users; DROP TABLE users".to_string()];
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfigValue { .. })
        ));
    }

    #[test]
    fn test_from_file_not_found() {
        let result = PipelineConfig::from_file("/definitely/not/here.yaml");
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("songplay.yaml");
        std::fs::write(&path, MINIMAL).unwrap();
        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.source.log_data, "data/log_data");
    }
}
