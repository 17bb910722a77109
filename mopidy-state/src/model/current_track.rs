//! Pointer to the track currently loaded in the player

use chrono::{DateTime, Utc};
use mopidy_api::Tlid;
use serde::{Deserialize, Serialize};

use super::QueueEntry;

/// Display fields of the current track plus its sampled position
///
/// The position and the time it was sampled are only written together, by
/// [`CurrentTrack::sample_position`], so elapsed time can be extrapolated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentTrack {
    pub tlid: Option<Tlid>,
    pub uri: Option<String>,
    pub album_artist: Option<String>,
    pub album_name: Option<String>,
    pub artist: Option<String>,
    pub duration: Option<u64>,
    pub source: Option<String>,
    pub playlist_name: Option<String>,
    pub title: Option<String>,
    pub number: Option<u32>,
    pub is_stream: bool,
    pub artwork_url: Option<String>,
    position: Option<u64>,
    position_sampled_at: DateTime<Utc>,
}

impl CurrentTrack {
    /// An empty pointer sampled at `now`
    pub fn cleared(now: DateTime<Utc>) -> Self {
        Self {
            tlid: None,
            uri: None,
            album_artist: None,
            album_name: None,
            artist: None,
            duration: None,
            source: None,
            playlist_name: None,
            title: None,
            number: None,
            is_stream: false,
            artwork_url: None,
            position: None,
            position_sampled_at: now,
        }
    }

    /// Point at `entry` and copy its display fields
    pub fn point_at(&mut self, entry: &QueueEntry) {
        self.tlid = Some(entry.tlid);
        self.uri = entry.uri.clone();
        self.album_artist = entry.album_artist.clone();
        self.album_name = entry.album_name.clone();
        self.artist = entry.artist.clone();
        self.duration = entry.duration;
        self.source = entry.source.clone();
        self.playlist_name = entry.playlist_name.clone();
        self.title = entry.title.clone();
        self.number = entry.number;
        self.is_stream = entry.is_stream;
    }

    /// Record the position (seconds) observed at `now`
    pub fn sample_position(&mut self, seconds: u64, now: DateTime<Utc>) {
        self.position = Some(seconds);
        self.position_sampled_at = now;
    }

    /// Position in seconds as of the last sample
    pub fn position(&self) -> Option<u64> {
        self.position
    }

    pub fn position_sampled_at(&self) -> DateTime<Utc> {
        self.position_sampled_at
    }

    /// Position extrapolated to `now`; only advances while playing
    pub fn elapsed(&self, playing: bool, now: DateTime<Utc>) -> Option<u64> {
        let position = self.position?;
        if !playing {
            return Some(position);
        }
        let delta = (now - self.position_sampled_at).num_seconds().max(0) as u64;
        Some(position + delta)
    }
}
