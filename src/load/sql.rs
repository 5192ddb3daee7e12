//! DuckDB helpers shared by the row store, the warehouse and quality checks

use crate::error::{Error, Result};
use crate::schema::{is_valid_identifier, quote_ident, TableDef, SONGPLAY_ID_SEQUENCE};
use chrono::{DateTime, NaiveDate, Utc};
use duckdb::Connection;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// In-memory database marker
pub const MEMORY: &str = ":memory:";

/// Open a DuckDB database file, or an in-memory database for `:memory:`
pub fn open(path: &str) -> Result<Connection> {
    if path == MEMORY {
        return Connection::open_in_memory()
            .map_err(|e| Error::config(format!("Failed to create DuckDB connection: {e}")));
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Connection::open(path)
        .map_err(|e| Error::config(format!("Failed to open DuckDB database {path}: {e}")))
}

/// Drop and recreate tables, plus the songplay id sequence
pub fn recreate(conn: &Connection, tables: &[TableDef]) -> Result<()> {
    for table in tables {
        debug!("{}", table.drop_sql());
        conn.execute_batch(&table.drop_sql())?;
    }

    let sequence = quote_ident(SONGPLAY_ID_SEQUENCE);
    conn.execute_batch(&format!(
        "DROP SEQUENCE IF EXISTS {sequence}; CREATE SEQUENCE {sequence} START 1;"
    ))?;

    for table in tables {
        let create = table.create_sql();
        debug!("{create}");
        conn.execute_batch(&create)?;
    }

    Ok(())
}

/// Row count of a known table
pub fn count_rows(conn: &Connection, table: &TableDef) -> Result<usize> {
    let count: i64 = conn.query_row(&table.count_sql(), [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Row count of a table named in configuration
pub fn count_rows_named(conn: &Connection, table: &str) -> Result<usize> {
    if !is_valid_identifier(table) {
        return Err(Error::invalid_value(
            "table",
            format!("'{table}' is not a plain identifier"),
        ));
    }
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Render a timestamp for a `CAST(? AS TIMESTAMP)` parameter
pub fn timestamp_param(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Run statements inside one transaction, rolling back on error
pub fn in_transaction<T>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    conn.execute_batch("BEGIN TRANSACTION")?;
    match f(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                tracing::warn!("Rollback failed: {rollback}");
            }
            Err(e)
        }
    }
}

/// Convert a DuckDB value to JSON
pub fn value_to_json(value: duckdb::types::Value) -> Value {
    use duckdb::types::{TimeUnit, Value as Db};

    match value {
        Db::Null => Value::Null,
        Db::Boolean(b) => Value::Bool(b),
        Db::TinyInt(i) => Value::Number(i.into()),
        Db::SmallInt(i) => Value::Number(i.into()),
        Db::Int(i) => Value::Number(i.into()),
        Db::BigInt(i) => Value::Number(i.into()),
        Db::HugeInt(i) => i64::try_from(i)
            .map_or_else(|_| Value::String(i.to_string()), |v| Value::Number(v.into())),
        Db::UTinyInt(i) => Value::Number(i.into()),
        Db::USmallInt(i) => Value::Number(i.into()),
        Db::UInt(i) => Value::Number(i.into()),
        Db::UBigInt(i) => Value::Number(i.into()),
        Db::Float(f) => {
            serde_json::Number::from_f64(f64::from(f)).map_or(Value::Null, Value::Number)
        }
        Db::Double(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        Db::Text(s) => Value::String(s),
        Db::Timestamp(unit, i) => {
            let micros = match unit {
                TimeUnit::Second => i * 1_000_000,
                TimeUnit::Millisecond => i * 1_000,
                TimeUnit::Microsecond => i,
                TimeUnit::Nanosecond => i / 1_000,
            };
            let secs = micros.div_euclid(1_000_000);
            let nsecs = (micros.rem_euclid(1_000_000) * 1000) as u32;
            DateTime::from_timestamp(secs, nsecs)
                .map(|dt| Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()))
                .unwrap_or(Value::Number(i.into()))
        }
        Db::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map_or_else(|| Value::String(d.to_string()), Value::Number),
        Db::Date32(days) => {
            // Days since epoch; 719163 is 1970-01-01 counted from 1 CE
            NaiveDate::from_num_days_from_ce_opt(days + 719_163)
                .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Number(days.into()))
        }
        Db::Time64(unit, t) => {
            let micros = match unit {
                TimeUnit::Second => t * 1_000_000,
                TimeUnit::Millisecond => t * 1_000,
                TimeUnit::Microsecond => t,
                TimeUnit::Nanosecond => t / 1_000,
            };
            let secs = micros / 1_000_000;
            Value::String(format!(
                "{:02}:{:02}:{:02}.{:06}",
                secs / 3600,
                (secs % 3600) / 60,
                secs % 60,
                micros % 1_000_000
            ))
        }
        other => Value::String(format!("{other:?}")),
    }
}
