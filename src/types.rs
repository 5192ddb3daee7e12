//! Common types used throughout songplay-etl
//!
//! This module contains shared type definitions, type aliases,
//! and small enums that several modules select behavior by.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Epoch timestamp in milliseconds, as carried by activity logs
pub type EpochMillis = i64;

// ============================================================================
// Backend
// ============================================================================

/// Target store and load strategy for a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Row-wise transactional insert into a relational database
    #[default]
    Database,
    /// Bulk overwrite of partitioned Parquet files
    Lake,
    /// Bulk staging copy followed by set-oriented SQL
    Warehouse,
    /// Warehouse steps run as a task graph with data quality checks
    Orchestrated,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Database => "database",
            Backend::Lake => "lake",
            Backend::Warehouse => "warehouse",
            Backend::Orchestrated => "orchestrated",
        };
        f.write_str(name)
    }
}

// ============================================================================
// User Dedup Policy
// ============================================================================

/// Which event wins when several events carry the same `user_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserDedupPolicy {
    /// The chronologically last event wins (current subscription level)
    #[default]
    LastWins,
    /// The earliest event wins
    FirstWins,
}

// ============================================================================
// Page Filter
// ============================================================================

/// Exact, case-sensitive page name that marks a song play event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageFilter(String);

impl PageFilter {
    /// Page name emitted by the activity log for song plays
    pub const NEXT_SONG: &'static str = "NextSong";

    /// Spaced spelling used by the data lake job
    pub const SPACED_NEXT_SONG: &'static str = "Next Song";

    /// Filter on an arbitrary page literal
    pub fn new(page: impl Into<String>) -> Self {
        Self(page.into())
    }

    /// Filter on `NextSong`
    pub fn next_song() -> Self {
        Self::new(Self::NEXT_SONG)
    }

    /// Filter on `Next Song`
    pub fn spaced_next_song() -> Self {
        Self::new(Self::SPACED_NEXT_SONG)
    }

    /// Page literal this filter matches
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this filter matches the page name the activity log emits
    pub fn is_canonical(&self) -> bool {
        self.0 == Self::NEXT_SONG
    }

    /// Check a record's page against the filter
    pub fn matches(&self, page: Option<&str>) -> bool {
        page == Some(self.0.as_str())
    }
}

impl Default for PageFilter {
    fn default() -> Self {
        Self::next_song()
    }
}

impl fmt::Display for PageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_filter_is_case_sensitive() {
        let filter = PageFilter::default();
        assert!(filter.matches(Some("NextSong")));
        assert!(!filter.matches(Some("nextsong")));
        assert!(!filter.matches(Some("Next Song")));
        assert!(!filter.matches(None));
    }

    #[test]
    fn test_spaced_filter_is_not_canonical() {
        let filter = PageFilter::spaced_next_song();
        assert!(!filter.is_canonical());
        assert!(filter.matches(Some("Next Song")));
        assert!(!filter.matches(Some("NextSong")));
    }

    #[test]
    fn test_serde_names() {
        let policy: UserDedupPolicy = serde_yaml::from_str("first_wins").unwrap();
        assert_eq!(policy, UserDedupPolicy::FirstWins);

        let backend: Backend = serde_yaml::from_str("orchestrated").unwrap();
        assert_eq!(backend, Backend::Orchestrated);
        assert_eq!(backend.to_string(), "orchestrated");

        let filter: PageFilter = serde_yaml::from_str("\"Next Song\"").unwrap();
        assert_eq!(filter, PageFilter::spaced_next_song());
    }
}
