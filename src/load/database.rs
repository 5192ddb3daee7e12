//! Row-wise transactional loader
//!
//! Each source file is loaded in its own transaction: one parameterized
//! `INSERT` per row, committed after the file. A failing row rolls the
//! whole file back.

use super::sql::{self, timestamp_param};
use crate::error::Result;
use crate::schema::{
    quote_ident, TableDef, ARTISTS, SONGPLAYS, SONGS, STAR_TABLES, TIME, USERS,
};
use crate::transform::activity::replaces;
use crate::transform::{Activity, Catalog, CatalogIndex};
use crate::types::{EpochMillis, UserDedupPolicy};
use duckdb::{params, Connection};
use std::collections::HashMap;
use tracing::debug;

const SONG_COLUMNS: [&str; 5] = ["song_id", "title", "artist_id", "year", "duration"];
const ARTIST_COLUMNS: [&str; 5] = ["artist_id", "name", "location", "latitude", "longitude"];
const USER_COLUMNS: [&str; 5] = ["user_id", "first_name", "last_name", "gender", "level"];
const TIME_COLUMNS: [&str; 7] = ["start_time", "hour", "day", "week", "month", "year", "weekday"];
const SONGPLAY_COLUMNS: [&str; 8] = [
    "start_time",
    "user_id",
    "level",
    "song_id",
    "artist_id",
    "session_id",
    "location",
    "user_agent",
];

/// Star schema in a DuckDB database, loaded row by row
pub struct RowStore {
    conn: Connection,
    path: String,
    /// `ts` of the event behind each stored `users` row, across files
    user_seen: HashMap<i64, Option<EpochMillis>>,
}

impl RowStore {
    /// Open (or create) the database at `path`; `:memory:` for in-memory
    pub fn open(path: &str) -> Result<Self> {
        Ok(Self {
            conn: sql::open(path)?,
            path: path.to_string(),
            user_seen: HashMap::new(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Drop and recreate the five star tables
    pub fn reset(&mut self) -> Result<()> {
        self.user_seen.clear();
        sql::recreate(&self.conn, &STAR_TABLES)
    }

    /// Insert one song file's rows in a single transaction
    pub fn load_catalog_file(&mut self, catalog: &Catalog) -> Result<usize> {
        let song_sql = do_nothing(&SONGS, &SONG_COLUMNS);
        let artist_sql = do_nothing(&ARTISTS, &ARTIST_COLUMNS);

        let tx = self.conn.transaction()?;
        {
            let mut songs = tx.prepare(&song_sql)?;
            for song in &catalog.songs {
                songs.execute(params![
                    song.song_id,
                    song.title,
                    song.artist_id,
                    song.year,
                    song.duration
                ])?;
            }

            let mut artists = tx.prepare(&artist_sql)?;
            for artist in &catalog.artists {
                artists.execute(params![
                    artist.artist_id,
                    artist.name,
                    artist.location,
                    artist.latitude,
                    artist.longitude
                ])?;
            }
        }
        tx.commit()?;

        Ok(catalog.row_count())
    }

    /// Insert one log file's rows in a single transaction
    ///
    /// A user already stored from an earlier file is only overwritten when
    /// the new event wins under `policy` by `ts`, so the result does not
    /// depend on file order.
    pub fn load_activity_file(
        &mut self,
        activity: &Activity,
        policy: UserDedupPolicy,
    ) -> Result<usize> {
        let time_sql = do_nothing(&TIME, &TIME_COLUMNS);
        let user_sql = upsert_users();
        let winners: Vec<_> = activity
            .users
            .iter()
            .filter_map(|user| {
                let seen = activity.user_seen.get(&user.user_id).copied().flatten();
                match self.user_seen.get(&user.user_id) {
                    Some(&stored) if !replaces(policy, stored, seen) => None,
                    _ => Some((user, seen)),
                }
            })
            .collect();
        let skipped = activity.users.len() - winners.len();
        if skipped > 0 {
            debug!("Keeping {skipped} stored user row(s) that win by timestamp");
        }
        let songplay_sql = SONGPLAYS.insert_sql(&SONGPLAY_COLUMNS);

        let tx = self.conn.transaction()?;
        {
            let mut time = tx.prepare(&time_sql)?;
            for row in &activity.time {
                time.execute(params![
                    timestamp_param(&row.start_time),
                    row.hour as i32,
                    row.day as i32,
                    row.week as i32,
                    row.month as i32,
                    row.year,
                    row.weekday as i32
                ])?;
            }

            let mut users = tx.prepare(&user_sql)?;
            for (user, _) in &winners {
                users.execute(params![
                    user.user_id,
                    user.first_name,
                    user.last_name,
                    user.gender,
                    user.level
                ])?;
            }

            let mut songplays = tx.prepare(&songplay_sql)?;
            for play in &activity.songplays {
                songplays.execute(params![
                    timestamp_param(&play.start_time),
                    play.user_id,
                    play.level,
                    play.song_id,
                    play.artist_id,
                    play.session_id,
                    play.location,
                    play.user_agent
                ])?;
            }
        }
        tx.commit()?;

        for (user, seen) in winners {
            self.user_seen.insert(user.user_id, seen);
        }
        Ok(activity.row_count())
    }

    /// Read the loaded catalog back as a (title, artist name) index
    pub fn catalog_index(&self) -> Result<CatalogIndex> {
        let query = format!(
            "SELECT s.\"title\", a.\"name\", s.\"song_id\", s.\"artist_id\" \
             FROM {} s JOIN {} a ON s.\"artist_id\" = a.\"artist_id\" \
             WHERE s.\"title\" IS NOT NULL AND a.\"name\" IS NOT NULL",
            SONGS.quoted(),
            ARTISTS.quoted()
        );
        debug!("{query}");

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut index = CatalogIndex::new();
        for row in rows {
            let (title, name, song_id, artist_id) = row?;
            index.insert(&title, &name, &song_id, &artist_id);
        }
        Ok(index)
    }

    pub fn row_count(&self, table: &TableDef) -> Result<usize> {
        sql::count_rows(&self.conn, table)
    }
}

/// Insert that keeps the existing row on a key collision
fn do_nothing(table: &TableDef, columns: &[&str]) -> String {
    format!("{} ON CONFLICT DO NOTHING", table.insert_sql(columns))
}

/// Insert or overwrite a user; which event wins is decided before the call
fn upsert_users() -> String {
    let updates: Vec<String> = USER_COLUMNS[1..]
        .iter()
        .map(|c| format!("{0} = EXCLUDED.{0}", quote_ident(c)))
        .collect();
    format!(
        "{} ON CONFLICT ({}) DO UPDATE SET {}",
        USERS.insert_sql(&USER_COLUMNS),
        quote_ident("user_id"),
        updates.join(", ")
    )
}
