//! Staging + set-oriented warehouse loader
//!
//! Raw records are bulk-copied into two staging tables with the DuckDB
//! appender. Each star table is then rebuilt by one `INSERT … SELECT` over
//! the staging tables, inside its own transaction, so every load step can be
//! retried on its own.

use super::sql::{self, in_transaction};
use crate::error::Result;
use crate::schema::{
    quote_ident, LogRecord, SongRecord, TableDef, ARTISTS, SONGPLAYS, SONGS, STAGING_EVENTS,
    STAGING_SONGS, STAGING_TABLES, STAR_TABLES, TIME, USERS,
};
use crate::transform::ActivityOptions;
use crate::types::UserDedupPolicy;
use duckdb::{params, Connection};
use tracing::{debug, info};

/// Star schema plus staging tables in a DuckDB database
pub struct Warehouse {
    conn: Connection,
    path: String,
    options: ActivityOptions,
}

impl Warehouse {
    /// Open (or create) the warehouse at `path`; `:memory:` for in-memory
    pub fn open(path: &str, options: ActivityOptions) -> Result<Self> {
        Ok(Self {
            conn: sql::open(path)?,
            path: path.to_string(),
            options,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Drop and recreate staging and star tables
    pub fn reset(&self) -> Result<()> {
        let mut tables = STAGING_TABLES.to_vec();
        tables.extend(STAR_TABLES);
        sql::recreate(&self.conn, &tables)
    }

    /// Replace `staging_songs` with `records`
    pub fn stage_songs(&self, records: &[SongRecord]) -> Result<usize> {
        in_transaction(&self.conn, |conn| {
            conn.execute(&format!("DELETE FROM {}", STAGING_SONGS.quoted()), [])?;
            let mut appender = conn.appender(STAGING_SONGS.name)?;
            for (seq, r) in records.iter().enumerate() {
                appender.append_row(params![
                    seq as i64,
                    r.num_songs,
                    r.artist_id,
                    r.artist_latitude,
                    r.artist_longitude,
                    r.artist_location,
                    r.artist_name,
                    r.song_id,
                    r.title,
                    r.duration,
                    r.year
                ])?;
            }
            appender.flush()?;
            Ok(())
        })?;

        info!("Staged {} song records", records.len());
        Ok(records.len())
    }

    /// Replace `staging_events` with `records`
    pub fn stage_events(&self, records: &[LogRecord]) -> Result<usize> {
        in_transaction(&self.conn, |conn| {
            conn.execute(&format!("DELETE FROM {}", STAGING_EVENTS.quoted()), [])?;
            let mut appender = conn.appender(STAGING_EVENTS.name)?;
            for (seq, r) in records.iter().enumerate() {
                appender.append_row(params![
                    seq as i64,
                    r.artist,
                    r.auth,
                    r.first_name,
                    r.gender,
                    r.item_in_session,
                    r.last_name,
                    r.length,
                    r.level,
                    r.location,
                    r.method,
                    r.page,
                    r.registration,
                    r.session_id,
                    r.song,
                    r.status,
                    r.ts,
                    r.user_agent,
                    r.user_id
                ])?;
            }
            appender.flush()?;
            Ok(())
        })?;

        info!("Staged {} log events", records.len());
        Ok(records.len())
    }

    /// Rebuild `songplays` from staged events joined to the song catalog
    ///
    /// Ids are numbered in event order. Title and artist name must match
    /// exactly; the smallest `song_id` wins among duplicates.
    pub fn load_songplays(&self) -> Result<usize> {
        let select = format!(
            "SELECT row_number() OVER (ORDER BY e.\"event_seq\"), epoch_ms(e.\"ts\"), \
             e.\"user_id\", e.\"level\", c.\"song_id\", c.\"artist_id\", e.\"session_id\", \
             e.\"location\", e.\"user_agent\" \
             FROM {events} e \
             LEFT JOIN (\
                 SELECT \"title\", \"artist_name\", min(\"song_id\") AS \"song_id\", \
                 arg_min(\"artist_id\", \"song_id\") AS \"artist_id\" \
                 FROM {songs} \
                 WHERE \"title\" IS NOT NULL AND \"artist_name\" IS NOT NULL \
                 GROUP BY \"title\", \"artist_name\"\
             ) c ON e.\"song\" = c.\"title\" AND e.\"artist\" = c.\"artist_name\" \
             WHERE e.\"page\" = ? AND e.\"ts\" IS NOT NULL",
            events = STAGING_EVENTS.quoted(),
            songs = STAGING_SONGS.quoted(),
        );
        self.rebuild(&SONGPLAYS, &select, true)
    }

    /// Rebuild `users`, one row per `user_id` under the dedup policy
    pub fn load_users(&self) -> Result<usize> {
        let order = match self.options.user_dedup {
            UserDedupPolicy::LastWins => "\"ts\" DESC NULLS LAST, \"event_seq\" DESC",
            UserDedupPolicy::FirstWins => "\"ts\" ASC NULLS LAST, \"event_seq\" ASC",
        };
        let select = format!(
            "SELECT \"user_id\", \"first_name\", \"last_name\", \"gender\", \"level\" \
             FROM {} \
             WHERE \"page\" = ? AND \"user_id\" IS NOT NULL \
             QUALIFY row_number() OVER (PARTITION BY \"user_id\" ORDER BY {order}) = 1",
            STAGING_EVENTS.quoted()
        );
        self.rebuild(&USERS, &select, true)
    }

    /// Rebuild `songs`, first staged row per `song_id`
    pub fn load_songs(&self) -> Result<usize> {
        let select = format!(
            "SELECT \"song_id\", \"title\", \"artist_id\", \"year\", \"duration\" \
             FROM {} \
             WHERE \"song_id\" IS NOT NULL AND \"artist_id\" IS NOT NULL \
             QUALIFY row_number() OVER (PARTITION BY \"song_id\" ORDER BY \"song_seq\") = 1",
            STAGING_SONGS.quoted()
        );
        self.rebuild(&SONGS, &select, false)
    }

    /// Rebuild `artists`, first staged row per `artist_id`
    pub fn load_artists(&self) -> Result<usize> {
        let select = format!(
            "SELECT \"artist_id\", \"artist_name\", \"artist_location\", \
             \"artist_latitude\", \"artist_longitude\" \
             FROM {} \
             WHERE \"artist_id\" IS NOT NULL \
             QUALIFY row_number() OVER (PARTITION BY \"artist_id\" ORDER BY \"song_seq\") = 1",
            STAGING_SONGS.quoted()
        );
        self.rebuild(&ARTISTS, &select, false)
    }

    /// Rebuild `time` from the distinct song-play timestamps
    pub fn load_time(&self) -> Result<usize> {
        let select = format!(
            "SELECT t, hour(t), day(t), weekofyear(t), month(t), year(t), dayofweek(t) \
             FROM (SELECT DISTINCT epoch_ms(\"ts\") AS t FROM {} \
                   WHERE \"page\" = ? AND \"ts\" IS NOT NULL)",
            STAGING_EVENTS.quoted()
        );
        self.rebuild(&TIME, &select, true)
    }

    /// Run every load step in dependency order
    pub fn load_all(&self) -> Result<()> {
        self.load_songplays()?;
        self.load_users()?;
        self.load_songs()?;
        self.load_artists()?;
        self.load_time()?;
        Ok(())
    }

    pub fn row_count(&self, table: &TableDef) -> Result<usize> {
        sql::count_rows(&self.conn, table)
    }

    /// Replace a table's content with the rows of `select`
    ///
    /// The table is dropped and recreated rather than emptied.
    fn rebuild(&self, table: &TableDef, select: &str, filtered: bool) -> Result<usize> {
        let columns: Vec<String> = table.columns.iter().map(|c| quote_ident(c.name)).collect();
        let insert = format!(
            "INSERT INTO {} ({}) {select}",
            table.quoted(),
            columns.join(", ")
        );
        debug!("{insert}");

        let rows = in_transaction(&self.conn, |conn| {
            conn.execute_batch(&table.drop_sql())?;
            conn.execute_batch(&table.create_sql())?;
            let rows = if filtered {
                conn.execute(&insert, params![self.options.page_filter.as_str()])?
            } else {
                conn.execute(&insert, [])?
            };
            Ok(rows)
        })?;

        info!("Loaded {rows} rows into {}", table.name);
        Ok(rows)
    }
}
