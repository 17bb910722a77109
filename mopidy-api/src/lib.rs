//! High-level Mopidy API for speaker control
//!
//! This crate provides typed access to the Mopidy core. It uses the private
//! `rpc-client` crate for low-level JSON-RPC communication.
//!
//! # Remote calls
//!
//! ```rust,no_run
//! use mopidy_api::MopidyClient;
//!
//! let client = MopidyClient::connect("192.168.1.20", 6680);
//! client.set_volume(40)?;
//! if let Some(current) = client.get_current_tl_track()? {
//!     println!("Now playing {:?}", current.track.name);
//! }
//! # Ok::<(), mopidy_api::ApiError>(())
//! ```
//!
//! # Push events
//!
//! Events arrive as JSON messages on the Mopidy event socket. Feed them into
//! an [`EventHub`], which decodes them and calls the handlers registered per
//! [`EventKind`]:
//!
//! ```rust
//! use std::sync::Arc;
//! use mopidy_api::{Event, EventHub, EventKind, EventSource};
//!
//! let hub = EventHub::new();
//! hub.subscribe(EventKind::VolumeChanged, Arc::new(|event: &Event| {
//!     println!("{:?}", event);
//! }));
//! hub.deliver_raw(r#"{"event":"volume_changed","volume":30}"#)?;
//! # Ok::<(), mopidy_api::ApiError>(())
//! ```

pub mod client;
pub mod error;
pub mod events;
pub mod models;
pub mod subscription;

pub use client::{MopidyClient, SearchQuery};
pub use error::{ApiError, Result};
pub use events::{Event, EventKind};
pub use models::{
    uri_scheme, Album, Artist, HistoryEntry, Image, Playlist, Ref, RefType, SearchResult,
    TlTrack, Tlid, Track,
};
pub use subscription::{EventHandler, EventHub, EventSource, SubscriptionId};

// Re-exported so callers can plug their own transport without naming the private crate
pub use rpc_client::{RpcError, RpcTransport};
