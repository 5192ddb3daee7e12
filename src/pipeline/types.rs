//! Pipeline types
//!
//! Run summary returned by every backend.

use crate::orchestrator::TaskRecord;
use crate::types::Backend;
use std::fmt;

/// Outcome of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Backend that ran
    pub backend: Backend,
    /// Final row count per star table
    pub tables: Vec<(String, usize)>,
    /// Source files read (song files + log files)
    pub files_processed: usize,
    /// Per-task records (orchestrated backend only)
    pub tasks: Vec<TaskRecord>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl RunSummary {
    /// Create an empty summary
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            tables: Vec::new(),
            files_processed: 0,
            tasks: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Record a table's row count
    pub fn add_table(&mut self, table: impl Into<String>, rows: usize) {
        self.tables.push((table.into(), rows));
    }

    /// Add processed files
    pub fn add_files(&mut self, count: usize) {
        self.files_processed += count;
    }

    /// Row count of a table, if it was loaded
    pub fn rows(&self, table: &str) -> Option<usize> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, rows)| *rows)
    }

    /// Total rows across all tables
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, rows)| rows).sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<String> = self
            .tables
            .iter()
            .map(|(table, rows)| format!("{table}={rows}"))
            .collect();
        write!(
            f,
            "{} backend: {} file(s) processed, {} ({} ms)",
            self.backend,
            self.files_processed,
            counts.join(", "),
            self.duration_ms
        )
    }
}
