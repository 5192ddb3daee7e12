//! Song catalog transformer
//!
//! Projects song-metadata records into the `songs` and `artists`
//! dimensions and builds the (title, artist name) lookup used to resolve
//! songplay foreign keys.

use crate::schema::{Artist, Song, SongRecord};
use std::collections::{HashMap, HashSet};

/// Deduplicated song and artist dimensions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub songs: Vec<Song>,
    pub artists: Vec<Artist>,
}

/// Project one record into its song and artist rows
pub fn project(record: &SongRecord) -> (Song, Artist) {
    let song = Song {
        song_id: record.song_id.clone(),
        title: record.title.clone(),
        artist_id: record.artist_id.clone(),
        year: record.year,
        duration: record.duration,
    };
    let artist = Artist {
        artist_id: record.artist_id.clone(),
        name: record.artist_name.clone(),
        location: record.artist_location.clone(),
        latitude: record.artist_latitude,
        longitude: record.artist_longitude,
    };
    (song, artist)
}

/// Project every record, keeping the first row seen per natural key
pub fn transform<'a>(records: impl IntoIterator<Item = &'a SongRecord>) -> Catalog {
    let mut catalog = Catalog::default();
    let mut seen_songs = HashSet::new();
    let mut seen_artists = HashSet::new();

    for record in records {
        let (song, artist) = project(record);
        if seen_songs.insert(song.song_id.clone()) {
            catalog.songs.push(song);
        }
        if seen_artists.insert(artist.artist_id.clone()) {
            catalog.artists.push(artist);
        }
    }

    catalog
}

impl Catalog {
    /// Number of rows across both dimensions
    pub fn row_count(&self) -> usize {
        self.songs.len() + self.artists.len()
    }

    /// Lookup index over songs joined to their artist's name
    pub fn index(&self) -> CatalogIndex {
        let names: HashMap<&str, &str> = self
            .artists
            .iter()
            .filter_map(|a| a.name.as_deref().map(|name| (a.artist_id.as_str(), name)))
            .collect();

        let mut index = CatalogIndex::new();
        for song in &self.songs {
            let name = names.get(song.artist_id.as_str());
            if let (Some(title), Some(name)) = (song.title.as_deref(), name) {
                index.insert(title, name, &song.song_id, &song.artist_id);
            }
        }
        index
    }
}

/// Keys of a catalog entry matched by title and artist name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogMatch {
    pub song_id: String,
    pub artist_id: String,
}

/// Exact, case-sensitive (title, artist name) lookup
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: HashMap<(String, String), CatalogMatch>,
}

impl CatalogIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index straight from raw song records
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a SongRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            if let (Some(title), Some(name)) = (&record.title, &record.artist_name) {
                index.insert(title, name, &record.song_id, &record.artist_id);
            }
        }
        index
    }

    /// Add an entry
    ///
    /// When two songs share a title and artist name, the smaller `song_id`
    /// is kept so the result does not depend on input order.
    pub fn insert(&mut self, title: &str, artist_name: &str, song_id: &str, artist_id: &str) {
        let candidate = CatalogMatch {
            song_id: song_id.to_string(),
            artist_id: artist_id.to_string(),
        };
        self.entries
            .entry((title.to_string(), artist_name.to_string()))
            .and_modify(|current| {
                if candidate.song_id < current.song_id {
                    *current = candidate.clone();
                }
            })
            .or_insert(candidate);
    }

    /// Find the catalog entry for a played song
    pub fn lookup(&self, title: &str, artist_name: &str) -> Option<&CatalogMatch> {
        self.entries
            .get(&(title.to_string(), artist_name.to_string()))
    }

    /// Number of distinct (title, artist name) pairs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
