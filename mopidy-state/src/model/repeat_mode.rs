//! Repeat mode derived from Mopidy's `repeat` and `single` flags

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatMode {
    Off,
    /// Repeat the whole queue
    All,
    /// Repeat the current track
    One,
}

impl RepeatMode {
    pub fn from_flags(repeat: bool, single: bool) -> Self {
        match (repeat, single) {
            (true, true) => RepeatMode::One,
            (true, false) => RepeatMode::All,
            _ => RepeatMode::Off,
        }
    }

    /// The `(repeat, single)` flags that select this mode
    pub fn to_flags(self) -> (bool, bool) {
        match self {
            RepeatMode::Off => (false, false),
            RepeatMode::All => (true, false),
            RepeatMode::One => (true, true),
        }
    }
}

impl Default for RepeatMode {
    fn default() -> Self {
        RepeatMode::Off
    }
}
