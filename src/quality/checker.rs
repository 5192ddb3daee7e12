//! Quality checker

use crate::error::{Error, Result};
use crate::load::sql::{count_rows_named, value_to_json};
use crate::orchestrator::TaskOutcome;
use crate::types::JsonValue;
use duckdb::Connection;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A query expected to return one scalar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCheck {
    #[serde(alias = "sql_check")]
    pub sql: String,
    #[serde(alias = "expect_value")]
    pub expected: JsonValue,
}

impl ValueCheck {
    pub fn new(sql: impl Into<String>, expected: impl Into<JsonValue>) -> Self {
        Self {
            sql: sql.into(),
            expected: expected.into(),
        }
    }
}

/// Runs value and empty-table checks against a DuckDB connection
#[derive(Debug, Clone, Default)]
pub struct QualityChecker {
    checks: Vec<ValueCheck>,
    tables: Vec<String>,
}

impl QualityChecker {
    pub fn new(checks: Vec<ValueCheck>, tables: Vec<String>) -> Self {
        Self { checks, tables }
    }

    /// Compare each query's first column of the first row with its expectation
    pub fn run_value_checks(&self, conn: &Connection) -> Result<TaskOutcome> {
        if self.checks.is_empty() {
            info!("No value checks configured, skipping");
            return Ok(TaskOutcome::Skipped);
        }

        for check in &self.checks {
            let value: duckdb::types::Value = conn.query_row(&check.sql, [], |row| row.get(0))?;
            let actual = value_to_json(value);
            info!(
                "Check '{}': expected {}, got {actual}",
                check.sql, check.expected
            );

            if !scalars_equal(&actual, &check.expected) {
                return Err(Error::QualityCheck {
                    query: check.sql.clone(),
                    expected: check.expected.to_string(),
                    actual: actual.to_string(),
                });
            }
        }

        info!("{} value check(s) passed", self.checks.len());
        Ok(TaskOutcome::Succeeded)
    }

    /// Fail on the first configured table without rows
    pub fn run_empty_table_checks(&self, conn: &Connection) -> Result<TaskOutcome> {
        if self.tables.is_empty() {
            info!("No tables configured for empty checks, skipping");
            return Ok(TaskOutcome::Skipped);
        }

        for table in &self.tables {
            let rows = count_rows_named(conn, table)?;
            if rows == 0 {
                return Err(Error::empty_table(table));
            }
            info!("Table {table} contains {rows} rows");
        }

        Ok(TaskOutcome::Succeeded)
    }
}

/// Numbers compare by value across integer and float; everything else by
/// JSON equality
fn scalars_equal(actual: &JsonValue, expected: &JsonValue) -> bool {
    match (actual, expected) {
        (JsonValue::Number(a), JsonValue::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        },
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::scalars_equal;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!(0), json!(0), true ; "equal ints")]
    #[test_case(json!(0), json!(0.0), true ; "int and float")]
    #[test_case(json!(2.5), json!(2.5), true ; "equal floats")]
    #[test_case(json!(1), json!(0), false ; "different ints")]
    #[test_case(json!("a"), json!("a"), true ; "equal strings")]
    #[test_case(json!("0"), json!(0), false ; "string is not a number")]
    #[test_case(json!(null), json!(null), true ; "nulls")]
    fn test_scalars_equal(actual: serde_json::Value, expected: serde_json::Value, equal: bool) {
        assert_eq!(scalars_equal(&actual, &expected), equal);
    }
}
