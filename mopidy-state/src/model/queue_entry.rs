//! Queue entry type

use mopidy_api::{uri_scheme, Tlid, Track};
use serde::{Deserialize, Serialize};

/// One occurrence of a track in the queue, keyed by its tlid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub tlid: Tlid,
    pub uri: Option<String>,
    /// Backend extension serving the track (uri scheme)
    pub source: Option<String>,
    /// Zero-based position as of the last reconciliation
    pub index: Option<usize>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album_name: Option<String>,
    /// Duration in seconds
    pub duration: Option<u64>,
    pub number: Option<u32>,
    pub is_stream: bool,
    pub playlist_name: Option<String>,
    pub playlist_uri: Option<String>,
}

impl QueueEntry {
    pub fn new(tlid: Tlid) -> Self {
        Self {
            tlid,
            ..Default::default()
        }
    }

    /// Copy the metadata present on `track`, keeping fields it lacks
    pub fn apply_track(&mut self, track: &Track) {
        if let Some(uri) = &track.uri {
            self.source = Some(uri_scheme(uri).to_string());
            self.uri = Some(uri.clone());
        }
        if let Some(number) = track.track_no {
            self.number = Some(number);
        }
        if let Some(seconds) = track.duration_secs() {
            self.duration = Some(seconds);
        }
        if let Some(album) = track.album_name() {
            self.album_name = Some(album.to_string());
        }
        if let Some(artists) = track.artist_names() {
            self.album_artist = track
                .album
                .as_ref()
                .and_then(album_artist_names)
                .or_else(|| Some(artists.clone()));
            self.artist = Some(artists);
        }
        if let Some(name) = &track.name {
            self.title = Some(name.clone());
        }
    }
}

fn album_artist_names(album: &mopidy_api::Album) -> Option<String> {
    let names: Vec<&str> = album
        .artists
        .iter()
        .filter_map(|a| a.name.as_deref())
        .collect();
    (!names.is_empty()).then(|| names.join(", "))
}
