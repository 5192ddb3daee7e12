//! Activity log transformer
//!
//! Filters song-play events out of an activity log batch and derives the
//! `time`, `users` and `songplays` relations from them.

use super::catalog::CatalogIndex;
use super::time;
use crate::schema::{LogRecord, Songplay, TimeRow, User};
use crate::types::{EpochMillis, PageFilter, UserDedupPolicy};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::warn;

/// Knobs that differ between pipeline variants
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityOptions {
    pub page_filter: PageFilter,
    pub user_dedup: UserDedupPolicy,
}

/// Relations derived from one batch of activity events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activity {
    /// Ordered by `start_time`, unique
    pub time: Vec<TimeRow>,
    /// Ordered by `user_id`, unique
    pub users: Vec<User>,
    /// `ts` of the event each `users` row was taken from
    pub user_seen: BTreeMap<i64, Option<EpochMillis>>,
    /// One per song-play event with a timestamp, in input order
    pub songplays: Vec<Songplay>,
}

impl Activity {
    /// Number of rows across all three relations
    pub fn row_count(&self) -> usize {
        self.time.len() + self.users.len() + self.songplays.len()
    }
}

/// Transform a batch of activity events
pub fn transform(records: &[LogRecord], index: &CatalogIndex, options: &ActivityOptions) -> Activity {
    let events = filter_song_plays(records, &options.page_filter);

    if events.is_empty() && !options.page_filter.is_canonical() {
        let canonical = records
            .iter()
            .filter(|r| r.page.as_deref() == Some(PageFilter::NEXT_SONG))
            .count();
        if canonical > 0 {
            warn!(
                "Page filter '{}' matched no events but {canonical} '{}' events are present",
                options.page_filter,
                PageFilter::NEXT_SONG
            );
        }
    }

    let missing_ts = events.iter().filter(|e| e.ts.is_none()).count();
    if missing_ts > 0 {
        warn!("Dropping {missing_ts} song play event(s) without a timestamp");
    }

    let chosen = choose_user_events(&events, options.user_dedup);
    Activity {
        time: time_rows(&events),
        users: chosen.iter().map(|(id, event)| user_row(*id, event)).collect(),
        user_seen: chosen.iter().map(|(id, event)| (*id, event.ts)).collect(),
        songplays: songplay_rows(&events, index),
    }
}

/// Keep only events whose page matches the filter
pub fn filter_song_plays<'a>(records: &'a [LogRecord], filter: &PageFilter) -> Vec<&'a LogRecord> {
    records
        .iter()
        .filter(|record| filter.matches(record.page.as_deref()))
        .collect()
}

/// Distinct `time` rows, ordered by `start_time`
pub fn time_rows(events: &[&LogRecord]) -> Vec<TimeRow> {
    let mut rows = BTreeMap::new();
    for event in events {
        if let Some(row) = event.ts.and_then(time::derive) {
            rows.entry(row.start_time).or_insert(row);
        }
    }
    rows.into_values().collect()
}

/// One `users` row per user id, chosen by the dedup policy
pub fn user_rows(events: &[&LogRecord], policy: UserDedupPolicy) -> Vec<User> {
    choose_user_events(events, policy)
        .into_iter()
        .map(|(id, event)| user_row(id, event))
        .collect()
}

/// Winning event per user id
fn choose_user_events<'a>(
    events: &[&'a LogRecord],
    policy: UserDedupPolicy,
) -> BTreeMap<i64, &'a LogRecord> {
    let mut chosen: BTreeMap<i64, &LogRecord> = BTreeMap::new();

    for &event in events {
        let Some(user_id) = event.user_id else {
            continue;
        };
        match chosen.entry(user_id) {
            Entry::Vacant(slot) => {
                slot.insert(event);
            }
            Entry::Occupied(mut slot) => {
                if replaces(policy, slot.get().ts, event.ts) {
                    slot.insert(event);
                }
            }
        }
    }

    chosen
}

fn user_row(user_id: i64, event: &LogRecord) -> User {
    User {
        user_id,
        first_name: event.first_name.clone(),
        last_name: event.last_name.clone(),
        gender: event.gender.clone(),
        level: event.level.clone(),
    }
}

/// Whether a later-seen event should replace the current one
///
/// Events without a timestamp lose to any event that has one. Ties go to
/// the candidate under `last_wins` and to the current event under
/// `first_wins`.
pub fn replaces(
    policy: UserDedupPolicy,
    current: Option<EpochMillis>,
    candidate: Option<EpochMillis>,
) -> bool {
    match (current, candidate) {
        (_, None) => current.is_none() && policy == UserDedupPolicy::LastWins,
        (None, Some(_)) => true,
        (Some(current), Some(candidate)) => match policy {
            UserDedupPolicy::LastWins => candidate >= current,
            UserDedupPolicy::FirstWins => candidate < current,
        },
    }
}

/// One `songplays` row per event, keys resolved through the catalog
pub fn songplay_rows(events: &[&LogRecord], index: &CatalogIndex) -> Vec<Songplay> {
    events
        .iter()
        .filter_map(|event| {
            let start_time = event.ts.and_then(time::to_timestamp)?;
            let matched = match (&event.song, &event.artist) {
                (Some(song), Some(artist)) => index.lookup(song, artist),
                _ => None,
            };
            Some(Songplay {
                start_time,
                user_id: event.user_id,
                level: event.level.clone(),
                song_id: matched.map(|m| m.song_id.clone()),
                artist_id: matched.map(|m| m.artist_id.clone()),
                session_id: event.session_id,
                location: event.location.clone(),
                user_agent: event.user_agent.clone(),
            })
        })
        .collect()
}
