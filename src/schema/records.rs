//! Raw source records
//!
//! One struct per input schema, deserialized straight from a JSON line.

use crate::types::EpochMillis;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// One song-metadata record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SongRecord {
    #[serde(default)]
    pub num_songs: Option<i64>,

    pub song_id: String,

    #[serde(default)]
    pub title: Option<String>,

    pub artist_id: String,

    #[serde(default)]
    pub artist_name: Option<String>,

    #[serde(default)]
    pub artist_location: Option<String>,

    #[serde(default)]
    pub artist_latitude: Option<f64>,

    #[serde(default)]
    pub artist_longitude: Option<f64>,

    #[serde(default)]
    pub year: Option<i32>,

    /// Track length in seconds
    #[serde(default)]
    pub duration: Option<f64>,
}

/// One activity-log event
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(default)]
    pub artist: Option<String>,

    #[serde(default)]
    pub auth: Option<String>,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub gender: Option<String>,

    #[serde(default)]
    pub item_in_session: Option<i64>,

    #[serde(default)]
    pub last_name: Option<String>,

    #[serde(default)]
    pub length: Option<f64>,

    #[serde(default)]
    pub level: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub method: Option<String>,

    #[serde(default)]
    pub page: Option<String>,

    #[serde(default)]
    pub registration: Option<f64>,

    #[serde(default)]
    pub session_id: Option<i64>,

    #[serde(default)]
    pub song: Option<String>,

    #[serde(default)]
    pub status: Option<i64>,

    #[serde(default)]
    pub ts: Option<EpochMillis>,

    #[serde(default)]
    pub user_agent: Option<String>,

    /// Logged-out events carry an empty string here
    #[serde(default, deserialize_with = "deserialize_user_id")]
    pub user_id: Option<i64>,
}

/// Accept `userId` as a number or a numeric string; empty means no user.
fn deserialize_user_id<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawUserId {
        Int(i64),
        Text(String),
    }

    match Option::<RawUserId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawUserId::Int(id)) => Ok(Some(id)),
        Some(RawUserId::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("invalid userId '{text}'")))
        }
    }
}
