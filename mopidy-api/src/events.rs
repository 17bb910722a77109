//! Push notifications emitted by the Mopidy core
//!
//! Mopidy sends every core listener callback over its event channel as a JSON
//! object carrying an `event` member plus the callback's keyword arguments:
//!
//! ```json
//! {"event": "volume_changed", "volume": 42}
//! ```
//!
//! [`Event::from_json`] turns such a message into a typed [`Event`]. Messages
//! for kinds this crate does not track (playlist notifications, JSON-RPC
//! replies sharing the socket) decode to `None` rather than an error.

use serde::Deserialize;
use serde_json::Value;

use crate::models::TlTrack;
use crate::{ApiError, Result};

/// The push notification kinds a speaker client listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MuteChanged,
    OptionsChanged,
    PlaybackStateChanged,
    Seeked,
    StreamTitleChanged,
    TrackPlaybackPaused,
    TrackPlaybackResumed,
    TrackPlaybackStarted,
    TracklistChanged,
    VolumeChanged,
}

impl EventKind {
    /// Every tracked kind, in subscription order
    pub const ALL: [EventKind; 10] = [
        EventKind::OptionsChanged,
        EventKind::MuteChanged,
        EventKind::PlaybackStateChanged,
        EventKind::Seeked,
        EventKind::StreamTitleChanged,
        EventKind::TrackPlaybackPaused,
        EventKind::TrackPlaybackResumed,
        EventKind::TrackPlaybackStarted,
        EventKind::TracklistChanged,
        EventKind::VolumeChanged,
    ];

    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MuteChanged => "mute_changed",
            EventKind::OptionsChanged => "options_changed",
            EventKind::PlaybackStateChanged => "playback_state_changed",
            EventKind::Seeked => "seeked",
            EventKind::StreamTitleChanged => "stream_title_changed",
            EventKind::TrackPlaybackPaused => "track_playback_paused",
            EventKind::TrackPlaybackResumed => "track_playback_resumed",
            EventKind::TrackPlaybackStarted => "track_playback_started",
            EventKind::TracklistChanged => "tracklist_changed",
            EventKind::VolumeChanged => "volume_changed",
        }
    }

    /// Look up a kind by wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == name)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded push notification
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    MuteChanged {
        mute: bool,
    },
    OptionsChanged,
    PlaybackStateChanged {
        #[serde(default)]
        old_state: Option<String>,
        new_state: String,
    },
    /// `time_position` is in milliseconds
    Seeked {
        time_position: u64,
    },
    StreamTitleChanged {
        #[serde(default)]
        title: String,
    },
    TrackPlaybackPaused {
        tl_track: TlTrack,
        #[serde(default)]
        time_position: u64,
    },
    TrackPlaybackResumed {
        tl_track: TlTrack,
        #[serde(default)]
        time_position: u64,
    },
    TrackPlaybackStarted {
        tl_track: TlTrack,
    },
    TracklistChanged,
    VolumeChanged {
        volume: u8,
    },
}

impl Event {
    /// Decode a raw event message
    ///
    /// Returns `Ok(None)` for messages that are not events or are of a kind
    /// not listed in [`EventKind`].
    pub fn from_json(text: &str) -> Result<Option<Event>> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Decode an already parsed event message
    pub fn from_value(value: Value) -> Result<Option<Event>> {
        let name = match value.get("event").and_then(Value::as_str) {
            Some(name) => name,
            None => return Ok(None),
        };
        let kind = match EventKind::from_name(name) {
            Some(kind) => kind,
            None => return Ok(None),
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ApiError::ParseError(format!("{} payload: {}", kind, e)))
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::MuteChanged { .. } => EventKind::MuteChanged,
            Event::OptionsChanged => EventKind::OptionsChanged,
            Event::PlaybackStateChanged { .. } => EventKind::PlaybackStateChanged,
            Event::Seeked { .. } => EventKind::Seeked,
            Event::StreamTitleChanged { .. } => EventKind::StreamTitleChanged,
            Event::TrackPlaybackPaused { .. } => EventKind::TrackPlaybackPaused,
            Event::TrackPlaybackResumed { .. } => EventKind::TrackPlaybackResumed,
            Event::TrackPlaybackStarted { .. } => EventKind::TrackPlaybackStarted,
            Event::TracklistChanged => EventKind::TracklistChanged,
            Event::VolumeChanged { .. } => EventKind::VolumeChanged,
        }
    }
}
