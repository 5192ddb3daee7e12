//! Table definitions
//!
//! Every table the pipeline writes is described once here and rendered to
//! DuckDB DDL or to an Arrow schema. Identifiers are always quoted.

use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Column type, portable between DuckDB and Arrow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    BigInt,
    Double,
    /// UTC timestamp, millisecond precision
    Timestamp,
}

impl SqlType {
    /// DuckDB type name
    pub fn sql(self) -> &'static str {
        match self {
            SqlType::Text => "VARCHAR",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Double => "DOUBLE",
            SqlType::Timestamp => "TIMESTAMP",
        }
    }

    /// Arrow data type
    pub fn arrow(self) -> DataType {
        match self {
            SqlType::Text => DataType::Utf8,
            SqlType::Integer => DataType::Int32,
            SqlType::BigInt => DataType::Int64,
            SqlType::Double => DataType::Float64,
            SqlType::Timestamp => DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
        }
    }
}

/// A single column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub nullable: bool,
    /// Raw DDL default expression
    pub default: Option<&'static str>,
}

impl ColumnDef {
    const fn nullable(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: true,
            default: None,
        }
    }

    const fn required(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: false,
            default: None,
        }
    }
}

/// A table layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    /// Natural (or surrogate) key column
    pub primary_key: Option<&'static str>,
}

/// Sequence backing `songplays.songplay_id`
pub const SONGPLAY_ID_SEQUENCE: &str = "songplay_id_seq";

pub const SONGS: TableDef = TableDef {
    name: "songs",
    columns: &[
        ColumnDef::required("song_id", SqlType::Text),
        ColumnDef::nullable("title", SqlType::Text),
        ColumnDef::required("artist_id", SqlType::Text),
        ColumnDef::nullable("year", SqlType::Integer),
        ColumnDef::nullable("duration", SqlType::Double),
    ],
    primary_key: Some("song_id"),
};

pub const ARTISTS: TableDef = TableDef {
    name: "artists",
    columns: &[
        ColumnDef::required("artist_id", SqlType::Text),
        ColumnDef::nullable("name", SqlType::Text),
        ColumnDef::nullable("location", SqlType::Text),
        ColumnDef::nullable("latitude", SqlType::Double),
        ColumnDef::nullable("longitude", SqlType::Double),
    ],
    primary_key: Some("artist_id"),
};

pub const USERS: TableDef = TableDef {
    name: "users",
    columns: &[
        ColumnDef::required("user_id", SqlType::BigInt),
        ColumnDef::nullable("first_name", SqlType::Text),
        ColumnDef::nullable("last_name", SqlType::Text),
        ColumnDef::nullable("gender", SqlType::Text),
        ColumnDef::nullable("level", SqlType::Text),
    ],
    primary_key: Some("user_id"),
};

pub const TIME: TableDef = TableDef {
    name: "time",
    columns: &[
        ColumnDef::required("start_time", SqlType::Timestamp),
        ColumnDef::required("hour", SqlType::Integer),
        ColumnDef::required("day", SqlType::Integer),
        ColumnDef::required("week", SqlType::Integer),
        ColumnDef::required("month", SqlType::Integer),
        ColumnDef::required("year", SqlType::Integer),
        ColumnDef::required("weekday", SqlType::Integer),
    ],
    primary_key: Some("start_time"),
};

pub const SONGPLAYS: TableDef = TableDef {
    name: "songplays",
    columns: &[
        ColumnDef {
            name: "songplay_id",
            sql_type: SqlType::BigInt,
            nullable: false,
            default: Some("nextval('songplay_id_seq')"),
        },
        ColumnDef::required("start_time", SqlType::Timestamp),
        ColumnDef::nullable("user_id", SqlType::BigInt),
        ColumnDef::nullable("level", SqlType::Text),
        ColumnDef::nullable("song_id", SqlType::Text),
        ColumnDef::nullable("artist_id", SqlType::Text),
        ColumnDef::nullable("session_id", SqlType::BigInt),
        ColumnDef::nullable("location", SqlType::Text),
        ColumnDef::nullable("user_agent", SqlType::Text),
    ],
    primary_key: Some("songplay_id"),
};

/// Landing table for raw activity-log events
pub const STAGING_EVENTS: TableDef = TableDef {
    name: "staging_events",
    columns: &[
        ColumnDef::required("event_seq", SqlType::BigInt),
        ColumnDef::nullable("artist", SqlType::Text),
        ColumnDef::nullable("auth", SqlType::Text),
        ColumnDef::nullable("first_name", SqlType::Text),
        ColumnDef::nullable("gender", SqlType::Text),
        ColumnDef::nullable("item_in_session", SqlType::BigInt),
        ColumnDef::nullable("last_name", SqlType::Text),
        ColumnDef::nullable("length", SqlType::Double),
        ColumnDef::nullable("level", SqlType::Text),
        ColumnDef::nullable("location", SqlType::Text),
        ColumnDef::nullable("method", SqlType::Text),
        ColumnDef::nullable("page", SqlType::Text),
        ColumnDef::nullable("registration", SqlType::Double),
        ColumnDef::nullable("session_id", SqlType::BigInt),
        ColumnDef::nullable("song", SqlType::Text),
        ColumnDef::nullable("status", SqlType::BigInt),
        ColumnDef::nullable("ts", SqlType::BigInt),
        ColumnDef::nullable("user_agent", SqlType::Text),
        ColumnDef::nullable("user_id", SqlType::BigInt),
    ],
    primary_key: None,
};

/// Landing table for raw song-metadata records
pub const STAGING_SONGS: TableDef = TableDef {
    name: "staging_songs",
    columns: &[
        ColumnDef::required("song_seq", SqlType::BigInt),
        ColumnDef::nullable("num_songs", SqlType::BigInt),
        ColumnDef::nullable("artist_id", SqlType::Text),
        ColumnDef::nullable("artist_latitude", SqlType::Double),
        ColumnDef::nullable("artist_longitude", SqlType::Double),
        ColumnDef::nullable("artist_location", SqlType::Text),
        ColumnDef::nullable("artist_name", SqlType::Text),
        ColumnDef::nullable("song_id", SqlType::Text),
        ColumnDef::nullable("title", SqlType::Text),
        ColumnDef::nullable("duration", SqlType::Double),
        ColumnDef::nullable("year", SqlType::Integer),
    ],
    primary_key: None,
};

/// The five star-schema tables, fact table first
pub const STAR_TABLES: [TableDef; 5] = [SONGPLAYS, USERS, SONGS, ARTISTS, TIME];

pub const STAGING_TABLES: [TableDef; 2] = [STAGING_EVENTS, STAGING_SONGS];

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid"));

/// Check that a configured name is a plain SQL identifier
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Quote an identifier for DuckDB
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl TableDef {
    /// Quoted table name
    pub fn quoted(&self) -> String {
        quote_ident(self.name)
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// `CREATE TABLE` statement
    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                let mut def = format!("{} {}", quote_ident(column.name), column.sql_type.sql());
                if self.primary_key == Some(column.name) {
                    def.push_str(" PRIMARY KEY");
                } else if !column.nullable {
                    def.push_str(" NOT NULL");
                }
                if let Some(default) = column.default {
                    def.push_str(" DEFAULT ");
                    def.push_str(default);
                }
                def
            })
            .collect();

        format!("CREATE TABLE {} ({})", self.quoted(), columns.join(", "))
    }

    /// `DROP TABLE IF EXISTS` statement
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quoted())
    }

    /// `SELECT COUNT(*)` statement
    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", self.quoted())
    }

    /// Parameterized `INSERT` over the given columns
    ///
    /// Timestamp parameters are bound as text and cast in SQL.
    pub fn insert_sql(&self, columns: &[&str]) -> String {
        let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let placeholders: Vec<&str> = columns
            .iter()
            .map(|c| match self.column(c).map(|def| def.sql_type) {
                Some(SqlType::Timestamp) => "CAST(? AS TIMESTAMP)",
                _ => "?",
            })
            .collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quoted(),
            names.join(", "),
            placeholders.join(", ")
        )
    }

    /// Arrow schema for the table
    pub fn arrow_schema(&self) -> Arc<Schema> {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| Field::new(c.name, c.sql_type.arrow(), c.nullable))
            .collect();
        Arc::new(Schema::new(fields))
    }
}
