//! Star schema module
//!
//! Raw source records, star-schema rows, and table definitions.
//!
//! # Overview
//!
//! The schema module provides:
//! - `SongRecord` / `LogRecord` - Raw song-metadata and activity-log records
//! - `Song`, `Artist`, `User`, `TimeRow`, `Songplay` - Star-schema rows
//! - `TableDef` - Column layout of every table, rendered to DDL or Arrow schemas

mod records;
mod rows;
mod tables;

pub use records::{LogRecord, SongRecord};
pub use rows::{Artist, Song, Songplay, TimeRow, User};
pub use tables::{
    is_valid_identifier, quote_ident, ColumnDef, SqlType, TableDef, ARTISTS, SONGPLAYS,
    SONGPLAY_ID_SEQUENCE, SONGS, STAGING_EVENTS, STAGING_SONGS, STAGING_TABLES, STAR_TABLES, TIME,
    USERS,
};
