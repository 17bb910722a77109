//! Typed versions of the models exchanged with the Mopidy core
//!
//! Every field the server may omit is optional (or an empty collection) so a
//! sparse payload never fails to decode.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Transient list id of a queue entry
pub type Tlid = u64;

/// An artist reference attached to a track or album
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Artist {
    pub uri: Option<String>,
    pub name: Option<String>,
}

/// Album metadata attached to a track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Album {
    pub uri: Option<String>,
    pub name: Option<String>,
    pub artists: Vec<Artist>,
    pub date: Option<String>,
}

/// Track metadata as reported by the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    pub uri: Option<String>,
    pub name: Option<String>,
    pub artists: Vec<Artist>,
    pub album: Option<Album>,
    pub genre: Option<String>,
    pub track_no: Option<u32>,
    pub date: Option<String>,
    /// Duration in milliseconds
    pub length: Option<u64>,
}

impl Track {
    /// Create a track with just a uri and a title
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Artist names joined for display, `None` when the track has no artists
    pub fn artist_names(&self) -> Option<String> {
        let names: Vec<&str> = self
            .artists
            .iter()
            .filter_map(|a| a.name.as_deref())
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(names.join(", "))
        }
    }

    /// Name of the first listed artist
    pub fn first_artist(&self) -> Option<&str> {
        self.artists.first().and_then(|a| a.name.as_deref())
    }

    pub fn album_name(&self) -> Option<&str> {
        self.album.as_ref().and_then(|a| a.name.as_deref())
    }

    /// Duration in whole seconds
    pub fn duration_secs(&self) -> Option<u64> {
        self.length.map(|ms| ms / 1000)
    }

    /// Uri scheme (the backend extension), e.g. `local` for `local:track:x`
    pub fn scheme(&self) -> Option<&str> {
        self.uri.as_deref().map(uri_scheme)
    }
}

/// Returns the part of a uri before the first `:`
pub fn uri_scheme(uri: &str) -> &str {
    uri.split_once(':').map(|(scheme, _)| scheme).unwrap_or(uri)
}

/// A track as it sits in the tracklist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TlTrack {
    pub tlid: Tlid,
    #[serde(default)]
    pub track: Track,
}

impl TlTrack {
    pub fn new(tlid: Tlid, track: Track) -> Self {
        Self { tlid, track }
    }
}

/// Kind of object a [`Ref`] points to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefType {
    Album,
    Artist,
    Directory,
    Playlist,
    Track,
    #[serde(other)]
    Unknown,
}

impl Default for RefType {
    fn default() -> Self {
        RefType::Unknown
    }
}

/// Lightweight reference returned by browse and playlist listings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ref {
    pub uri: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: RefType,
}

/// Artwork for a uri
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Image {
    pub uri: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A stored playlist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Playlist {
    pub uri: Option<String>,
    pub name: Option<String>,
    pub tracks: Vec<Track>,
    pub last_modified: Option<i64>,
}

/// One backend's answer to a library search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub uri: Option<String>,
    pub tracks: Vec<Track>,
    pub artists: Vec<Artist>,
    pub albums: Vec<Album>,
}

/// A previously played track
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub played_at: DateTime<Utc>,
    pub track: Ref,
}

impl HistoryEntry {
    /// Build from the `[timestamp_ms, ref]` pair the server returns
    pub fn from_pair(timestamp_ms: i64, track: Ref) -> Self {
        let played_at = Utc
            .timestamp_millis_opt(timestamp_ms)
            .single()
            .unwrap_or_else(Utc::now);
        Self { played_at, track }
    }
}
