//! Calendar field derivation

use crate::schema::TimeRow;
use crate::types::EpochMillis;
use chrono::{DateTime, Datelike, Timelike, Utc};

/// Convert epoch milliseconds to a UTC timestamp
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn to_timestamp(ts: EpochMillis) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts)
}

/// Derive a `time` row from epoch milliseconds
pub fn derive(ts: EpochMillis) -> Option<TimeRow> {
    to_timestamp(ts).map(from_timestamp)
}

/// Derive a `time` row from a timestamp
pub fn from_timestamp(start_time: DateTime<Utc>) -> TimeRow {
    TimeRow {
        start_time,
        hour: start_time.hour(),
        day: start_time.day(),
        week: start_time.iso_week().week(),
        month: start_time.month(),
        year: start_time.year(),
        weekday: start_time.weekday().num_days_from_sunday(),
    }
}
