//! Model types for mopidy-state

mod current_track;
mod feature;
mod phase;
mod queue_entry;
mod repeat_mode;
mod requests;
mod snapshot;
mod views;

pub use current_track::CurrentTrack;
pub use feature::Feature;
pub use phase::Phase;
pub use queue_entry::QueueEntry;
pub use repeat_mode::RepeatMode;
pub use requests::{EnqueueMode, ExactQuery, FilterCriteria, MediaKind, RemoveTracks};
pub use snapshot::Snapshot;
pub use views::{HistoryItem, QueueTrackItem};

/// Convert a 1-based user position to a 0-based queue index
///
/// Positions are validated before conversion, so `position >= 1`.
pub fn api_position(position: usize) -> usize {
    position.saturating_sub(1)
}

/// Convert a 0-based queue index to a 1-based user position
pub fn user_position(index: usize) -> usize {
    index + 1
}
