//! Commands a speaker supports

use serde::{Deserialize, Serialize};

/// A capability of the speaker's command surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    BrowseMedia,
    ClearQueue,
    Enqueue,
    NextTrack,
    Pause,
    Play,
    PlayMedia,
    PreviousTrack,
    SetRepeat,
    Seek,
    SetShuffle,
    Stop,
    SelectSource,
    Mute,
    SetVolume,
}

impl Feature {
    /// Every feature a Mopidy speaker offers
    pub const ALL: [Feature; 15] = [
        Feature::BrowseMedia,
        Feature::ClearQueue,
        Feature::Enqueue,
        Feature::NextTrack,
        Feature::Pause,
        Feature::Play,
        Feature::PlayMedia,
        Feature::PreviousTrack,
        Feature::SetRepeat,
        Feature::Seek,
        Feature::SetShuffle,
        Feature::Stop,
        Feature::SelectSource,
        Feature::Mute,
        Feature::SetVolume,
    ];
}
