//! Point-in-time capture of a speaker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Phase, RepeatMode};

/// Everything needed to put a speaker back the way it was
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Queue uris in queue order
    pub uris: Vec<String>,
    /// Zero-based index of the entry that was current
    pub queue_index: Option<usize>,
    pub volume: Option<u8>,
    pub muted: Option<bool>,
    pub repeat: Option<RepeatMode>,
    pub shuffle: Option<bool>,
    pub phase: Option<Phase>,
    /// Elapsed position in seconds
    pub position: Option<u64>,
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Whether restoring should resume playback
    pub fn resumes_playback(&self) -> bool {
        self.phase.map(|p| p.is_active()).unwrap_or(false)
    }
}
