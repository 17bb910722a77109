//! Arguments of queue and library commands

use mopidy_api::{SearchQuery, Track};
use serde::{Deserialize, Serialize};

fn provided(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

fn equals_ci(value: Option<&str>, expected: &str) -> bool {
    value
        .map(|v| v.to_lowercase() == expected.to_lowercase())
        .unwrap_or(false)
}

/// Substring criteria for removing queue entries
///
/// Every provided field must be a case-insensitive substring of the track's
/// corresponding attribute. The artist is the track's first artist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub track_name: Option<String>,
}

impl FilterCriteria {
    pub fn artist(value: impl Into<String>) -> Self {
        Self {
            artist: Some(value.into()),
            ..Default::default()
        }
    }

    /// True when no field carries a value
    pub fn is_empty(&self) -> bool {
        provided(&self.artist).is_none()
            && provided(&self.album).is_none()
            && provided(&self.genre).is_none()
            && provided(&self.track_name).is_none()
    }

    pub fn matches(&self, track: &Track) -> bool {
        let checks = [
            (provided(&self.artist), track.first_artist()),
            (provided(&self.album), track.album_name()),
            (provided(&self.genre), track.genre.as_deref()),
            (provided(&self.track_name), track.name.as_deref()),
        ];
        checks
            .iter()
            .all(|(wanted, actual)| wanted.map_or(true, |w| contains_ci(*actual, w)))
    }
}

/// Exact-match library query
///
/// Results are re-filtered so every provided field equals (ignoring case) the
/// track's first artist, album name or title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExactQuery {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_name: Option<String>,
}

impl ExactQuery {
    pub fn artist(value: impl Into<String>) -> Self {
        Self {
            artist: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        provided(&self.artist).is_none()
            && provided(&self.album).is_none()
            && provided(&self.track_name).is_none()
    }

    /// The Mopidy search query for the provided fields
    pub fn to_search_query(&self) -> SearchQuery {
        let mut query = SearchQuery::new();
        for (field, value) in [
            ("artist", &self.artist),
            ("album", &self.album),
            ("track_name", &self.track_name),
        ] {
            if let Some(value) = provided(value) {
                query.insert(field.to_string(), vec![value.to_string()]);
            }
        }
        query
    }

    pub fn matches_exactly(&self, track: &Track) -> bool {
        let checks = [
            (provided(&self.artist), track.first_artist()),
            (provided(&self.album), track.album_name()),
            (provided(&self.track_name), track.name.as_deref()),
        ];
        checks
            .iter()
            .all(|(wanted, actual)| wanted.map_or(true, |w| equals_ci(*actual, w)))
    }
}

/// Queue positions to remove (1-based)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoveTracks {
    pub position: Option<usize>,
    pub positions: Vec<usize>,
}

impl RemoveTracks {
    pub fn at(position: usize) -> Self {
        Self {
            position: Some(position),
            positions: Vec::new(),
        }
    }

    pub fn positions(positions: Vec<usize>) -> Self {
        Self {
            position: None,
            positions,
        }
    }

    /// All requested positions, highest first, without duplicates
    pub(crate) fn descending(&self) -> Vec<usize> {
        let mut all: Vec<usize> = self.position.into_iter().chain(self.positions.iter().copied()).collect();
        all.sort_unstable_by(|a, b| b.cmp(a));
        all.dedup();
        all
    }
}

/// What a media id refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// A single playable uri
    Track,
    /// A stored playlist, expanded to its track uris
    Playlist,
    /// A library directory, expanded to its children
    Directory,
}

/// Where newly queued media goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnqueueMode {
    /// Stop, clear the queue, queue and play
    Replace,
    /// Append, starting playback when not already playing
    Add,
    /// Insert after the current entry, starting playback when not already playing
    Next,
    /// Insert at the current entry and play the first inserted item
    Play,
}

impl Default for EnqueueMode {
    fn default() -> Self {
        EnqueueMode::Replace
    }
}
