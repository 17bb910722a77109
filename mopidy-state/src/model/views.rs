//! Read-only views handed to callers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the ordered queue listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTrackItem {
    /// 1-based position
    pub position: usize,
    pub uri: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Duration in seconds
    pub duration: Option<u64>,
}

/// A recently played track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub uri: String,
    pub track_name: Option<String>,
    pub played_at: DateTime<Utc>,
}
