//! Tests for quality module

use super::*;
use crate::error::Error;
use crate::load::sql;
use crate::orchestrator::TaskOutcome;
use crate::schema::{ARTISTS, USERS};
use duckdb::Connection;
use pretty_assertions::assert_eq;
use serde_json::json;

fn loaded_connection() -> Connection {
    let conn = sql::open(sql::MEMORY).unwrap();
    sql::recreate(&conn, &[USERS, ARTISTS]).unwrap();
    conn.execute_batch("INSERT INTO users (user_id, level) VALUES (1, 'free'), (2, 'paid')")
        .unwrap();
    conn
}

#[test]
fn test_empty_check_lists_are_skipped() {
    let conn = loaded_connection();
    let checker = QualityChecker::default();
    assert_eq!(checker.run_value_checks(&conn).unwrap(), TaskOutcome::Skipped);
    assert_eq!(checker.run_empty_table_checks(&conn).unwrap(), TaskOutcome::Skipped);
}

#[test]
fn test_value_check_passes() {
    let conn = loaded_connection();
    let checker = QualityChecker::new(
        vec![
            ValueCheck::new("SELECT COUNT(*) FROM users", 2),
            ValueCheck::new("SELECT COUNT(*) FROM artists WHERE artist_id IS NULL", 0),
            ValueCheck::new("SELECT level FROM users WHERE user_id = 2", "paid"),
        ],
        vec![],
    );
    assert_eq!(checker.run_value_checks(&conn).unwrap(), TaskOutcome::Succeeded);
}

#[test]
fn test_value_check_compares_decimals_and_dates() {
    let conn = loaded_connection();
    let checker = QualityChecker::new(
        vec![
            ValueCheck::new("SELECT 1.5", 1.5),
            ValueCheck::new("SELECT CAST(0 AS DECIMAL(18,3))", 0),
            ValueCheck::new("SELECT DATE '2018-11-01'", "2018-11-01"),
        ],
        vec![],
    );
    assert_eq!(checker.run_value_checks(&conn).unwrap(), TaskOutcome::Succeeded);
}

#[test]
fn test_value_check_mismatch() {
    let conn = loaded_connection();
    let checker = QualityChecker::new(vec![ValueCheck::new("SELECT COUNT(*) FROM users", 5)], vec![]);

    match checker.run_value_checks(&conn) {
        Err(Error::QualityCheck {
            query,
            expected,
            actual,
        }) => {
            assert_eq!(query, "SELECT COUNT(*) FROM users");
            assert_eq!(expected, "5");
            assert_eq!(actual, "2");
        }
        other => panic!("expected quality failure, got {other:?}"),
    }
}

#[test]
fn test_empty_table_check_fails_on_empty_table() {
    let conn = loaded_connection();
    let checker = QualityChecker::new(vec![], vec!["users".to_string(), "artists".to_string()]);

    match checker.run_empty_table_checks(&conn) {
        Err(Error::EmptyTable { table }) => assert_eq!(table, "artists"),
        other => panic!("expected empty table failure, got {other:?}"),
    }
}

#[test]
fn test_empty_table_check_passes() {
    let conn = loaded_connection();
    let checker = QualityChecker::new(vec![], vec!["users".to_string()]);
    assert_eq!(
        checker.run_empty_table_checks(&conn).unwrap(),
        TaskOutcome::Succeeded
    );
}

#[test]
fn test_empty_table_check_rejects_unsafe_names() {
    let conn = loaded_connection();
    let checker = QualityChecker::new(vec![], vec!["users; DROP TABLE users".to_string()]);
    assert!(matches!(
        checker.run_empty_table_checks(&conn),
        Err(Error::InvalidConfigValue { .. })
    ));
    assert_eq!(sql::count_rows(&conn, &USERS).unwrap(), 2);
}

#[test]
fn test_value_check_accepts_legacy_keys() {
    let check: ValueCheck = serde_yaml::from_str(
        "sql_check: SELECT COUNT(*) FROM artists WHERE artist_id IS NULL\nexpect_value: 0\n",
    )
    .unwrap();
    assert_eq!(check.expected, json!(0));
    assert!(check.sql.starts_with("SELECT COUNT(*)"));
}
