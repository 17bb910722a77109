//! Playback phase enumeration

use serde::{Deserialize, Serialize};

/// Playback phase of a speaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Stopped, nothing current
    Idle,
    Playing,
    Paused,
}

impl Phase {
    /// Parse from a Mopidy playback state string
    ///
    /// Returns `None` for values Mopidy does not define.
    pub fn from_remote(state: &str) -> Option<Self> {
        match state {
            "playing" => Some(Phase::Playing),
            "paused" => Some(Phase::Paused),
            "stopped" => Some(Phase::Idle),
            _ => None,
        }
    }

    /// Whether a track is loaded (playing or paused)
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Playing | Phase::Paused)
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}
