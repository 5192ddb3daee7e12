//! Star-schema rows to Arrow record batches

use crate::error::Result;
use crate::schema::{
    Artist, Song, Songplay, TableDef, TimeRow, User, ARTISTS, SONGPLAYS, SONGS, TIME, USERS,
};
use arrow::array::{
    ArrayRef, Float64Array, Int32Array, Int64Array, StringArray, TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Datelike;
use std::sync::Arc;

/// Columns appended to `songplays` for lake partitioning
pub const SONGPLAY_PARTITION_COLUMNS: [&str; 2] = ["year", "month"];

fn strings<'a>(values: impl Iterator<Item = Option<&'a str>>) -> ArrayRef {
    Arc::new(values.collect::<StringArray>())
}

fn timestamps(values: impl Iterator<Item = i64>) -> ArrayRef {
    Arc::new(TimestampMillisecondArray::from(values.collect::<Vec<_>>()).with_timezone("UTC"))
}

fn batch(table: &TableDef, columns: Vec<ArrayRef>) -> Result<RecordBatch> {
    Ok(RecordBatch::try_new(table.arrow_schema(), columns)?)
}

pub fn songs_batch(rows: &[Song]) -> Result<RecordBatch> {
    batch(
        &SONGS,
        vec![
            strings(rows.iter().map(|r| Some(r.song_id.as_str()))),
            strings(rows.iter().map(|r| r.title.as_deref())),
            strings(rows.iter().map(|r| Some(r.artist_id.as_str()))),
            Arc::new(rows.iter().map(|r| r.year).collect::<Int32Array>()),
            Arc::new(rows.iter().map(|r| r.duration).collect::<Float64Array>()),
        ],
    )
}

pub fn artists_batch(rows: &[Artist]) -> Result<RecordBatch> {
    batch(
        &ARTISTS,
        vec![
            strings(rows.iter().map(|r| Some(r.artist_id.as_str()))),
            strings(rows.iter().map(|r| r.name.as_deref())),
            strings(rows.iter().map(|r| r.location.as_deref())),
            Arc::new(rows.iter().map(|r| r.latitude).collect::<Float64Array>()),
            Arc::new(rows.iter().map(|r| r.longitude).collect::<Float64Array>()),
        ],
    )
}

pub fn users_batch(rows: &[User]) -> Result<RecordBatch> {
    batch(
        &USERS,
        vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.user_id))),
            strings(rows.iter().map(|r| r.first_name.as_deref())),
            strings(rows.iter().map(|r| r.last_name.as_deref())),
            strings(rows.iter().map(|r| r.gender.as_deref())),
            strings(rows.iter().map(|r| r.level.as_deref())),
        ],
    )
}

pub fn time_batch(rows: &[TimeRow]) -> Result<RecordBatch> {
    let int = |f: fn(&TimeRow) -> i32| -> ArrayRef {
        Arc::new(Int32Array::from_iter_values(rows.iter().map(f)))
    };

    batch(
        &TIME,
        vec![
            timestamps(rows.iter().map(|r| r.start_time.timestamp_millis())),
            int(|r| r.hour as i32),
            int(|r| r.day as i32),
            int(|r| r.week as i32),
            int(|r| r.month as i32),
            int(|r| r.year),
            int(|r| r.weekday as i32),
        ],
    )
}

/// Build the `songplays` batch
///
/// Rows are ordered by `start_time` (stable for ties) and numbered from 1.
/// `year` and `month` of `start_time` are appended as partition columns.
pub fn songplays_batch(rows: &[Songplay]) -> Result<RecordBatch> {
    let mut ordered: Vec<&Songplay> = rows.iter().collect();
    ordered.sort_by_key(|r| r.start_time);

    let base = SONGPLAYS.arrow_schema();
    let mut fields: Vec<Field> = base.fields().iter().map(|f| f.as_ref().clone()).collect();
    for name in SONGPLAY_PARTITION_COLUMNS {
        fields.push(Field::new(name, DataType::Int32, false));
    }
    let schema = Arc::new(Schema::new(fields));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(1..=ordered.len() as i64)),
        timestamps(ordered.iter().map(|r| r.start_time.timestamp_millis())),
        Arc::new(ordered.iter().map(|r| r.user_id).collect::<Int64Array>()),
        strings(ordered.iter().map(|r| r.level.as_deref())),
        strings(ordered.iter().map(|r| r.song_id.as_deref())),
        strings(ordered.iter().map(|r| r.artist_id.as_deref())),
        Arc::new(ordered.iter().map(|r| r.session_id).collect::<Int64Array>()),
        strings(ordered.iter().map(|r| r.location.as_deref())),
        strings(ordered.iter().map(|r| r.user_agent.as_deref())),
        Arc::new(Int32Array::from_iter_values(ordered.iter().map(|r| r.start_time.year()))),
        Arc::new(Int32Array::from_iter_values(
            ordered.iter().map(|r| r.start_time.month() as i32),
        )),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}
