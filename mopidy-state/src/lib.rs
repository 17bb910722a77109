//! Mopidy State Management
//!
//! A sync-first client that keeps a local model of a Mopidy server's playback
//! state, queue and library metadata.
//!
//! # Features
//!
//! - **Two update channels**: periodic polls and push events merge into one store
//! - **Queue model**: entries keyed by tlid, reconciled against every listing
//! - **Position tracking**: elapsed time extrapolated from the last sample
//! - **Snapshots**: capture and restore with bounded retry polling
//! - **Change iterator**: blocking or non-blocking change notifications
//!
//! # Architecture
//!
//! ```text
//! Commands / update() ──► SpeakerContext ──► MopidyClient ──► server
//!                              │
//!                         SpeakerStore (one RwLock)
//!                              ▲
//! EventSource ──► EventDispatcher ──► refresh worker
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use mopidy_state::{ChangeKind, MediaKind, EnqueueMode, Speaker};
//!
//! let speaker = Speaker::new("mopidy.local", 6680)?;
//! speaker.update();
//!
//! speaker.play_media(MediaKind::Playlist, "m3u:Morning.m3u8", EnqueueMode::Replace)?;
//! speaker.move_track(3, 1)?;
//!
//! // Poll periodically, react to changes in between
//! loop {
//!     for event in speaker.iter().try_iter() {
//!         if event.kind == ChangeKind::CurrentTrack {
//!             println!("{:?}", speaker.current_track().title);
//!         }
//!     }
//!     std::thread::sleep(Duration::from_secs(10));
//!     speaker.update();
//! }
//! ```

pub mod artwork;
pub mod cache;
pub mod config;
pub mod error;
pub mod failure;
pub mod iter;
pub mod logging;
pub mod model;
pub mod queue;
pub mod snapshot;
pub mod speaker;
pub mod store;

mod commands;
mod context;
mod dispatcher;

pub use artwork::expand_url;
pub use cache::MetadataCache;
pub use config::{SpeakerConfig, DEFAULT_PORT};
pub use error::{Result, StateError};
pub use iter::{ChangeEvent, ChangeIterator, ChangeKind, TryIter};
pub use logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};
pub use model::{
    api_position, user_position, CurrentTrack, EnqueueMode, ExactQuery, Feature, FilterCriteria,
    HistoryItem, MediaKind, Phase, QueueEntry, QueueTrackItem, RemoveTracks, RepeatMode,
    Snapshot,
};
pub use queue::QueueModel;
pub use snapshot::{RestoreHandle, RestoreOutcome};
pub use speaker::{Speaker, SpeakerBuilder};
pub use store::SpeakerStore;

// Re-exported so callers need only this crate
pub use mopidy_api::{
    ApiError, Event, EventHub, EventKind, EventSource, RpcError, RpcTransport, SearchQuery,
    TlTrack, Tlid, Track,
};
