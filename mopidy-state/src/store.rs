//! Shared mutable state of one speaker
//!
//! Everything the poll path, the push path and commands mutate lives in one
//! `SpeakerStore` behind a single `RwLock`, so a full reconciliation and an
//! event-driven partial update never interleave mid-mutation.

use chrono::{DateTime, Utc};

use crate::model::{Phase, RepeatMode, Snapshot};
use crate::queue::QueueModel;

#[derive(Debug)]
pub struct SpeakerStore {
    pub available: bool,
    pub version: Option<String>,
    pub uri_schemes: Option<Vec<String>>,
    pub consume: Option<bool>,
    /// Playlist names, offered as selectable sources
    pub sources: Option<Vec<String>>,
    pub volume: Option<u8>,
    pub muted: Option<bool>,
    pub phase: Option<Phase>,
    pub repeat: Option<RepeatMode>,
    pub shuffle: Option<bool>,
    pub queue: QueueModel,
    pub snapshot: Option<Snapshot>,
}

impl SpeakerStore {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            available: false,
            version: None,
            uri_schemes: None,
            consume: None,
            sources: None,
            volume: None,
            muted: None,
            phase: None,
            repeat: None,
            shuffle: None,
            queue: QueueModel::new(cache_capacity),
            snapshot: None,
        }
    }

    /// Forget every server-derived value and mark the speaker unavailable
    ///
    /// The queue table and a pending snapshot survive; the current-track
    /// pointer is reset.
    pub fn clear(&mut self) {
        self.available = false;
        self.version = None;
        self.uri_schemes = None;
        self.consume = None;
        self.sources = None;
        self.volume = None;
        self.muted = None;
        self.phase = None;
        self.repeat = None;
        self.shuffle = None;
        self.queue.clear_current();
    }

    pub fn is_playing(&self) -> bool {
        self.phase == Some(Phase::Playing)
    }

    pub fn snapshot_taken_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot.as_ref().map(|s| s.captured_at)
    }
}

/// Assign `value` to `slot`, reporting whether it changed
pub(crate) fn update<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
