//! Shared plumbing behind a speaker
//!
//! `SpeakerContext` is shared (through an `Arc`) by the speaker facade, the
//! event dispatcher and its worker thread, and the snapshot manager. It owns
//! the single store lock and implements every targeted refresh: fetch from
//! the server without holding the lock, then apply the result in one write
//! section and emit change events after the lock is released.

use std::sync::{mpsc, Arc};

use chrono::Local;
use mopidy_api::{ApiError, MopidyClient, TlTrack, Tlid};
use parking_lot::RwLock;

use crate::artwork::expand_url;
use crate::config::SpeakerConfig;
use crate::error::{Result, StateError};
use crate::failure::FailureLog;
use crate::iter::{ChangeEvent, ChangeKind};
use crate::model::{Phase, QueueTrackItem, RepeatMode};
use crate::store::{update, SpeakerStore};

pub(crate) struct SpeakerContext {
    pub(crate) config: SpeakerConfig,
    pub(crate) client: MopidyClient,
    pub(crate) store: Arc<RwLock<SpeakerStore>>,
    failures: FailureLog,
    changes: mpsc::SyncSender<ChangeEvent>,
}

impl SpeakerContext {
    pub(crate) fn new(
        config: SpeakerConfig,
        client: MopidyClient,
        changes: mpsc::SyncSender<ChangeEvent>,
    ) -> Arc<Self> {
        let store = SpeakerStore::new(config.cache_capacity);
        Arc::new(Self {
            config,
            client,
            store: Arc::new(RwLock::new(store)),
            failures: FailureLog::new(),
            changes,
        })
    }

    /// `host:port`, for log messages
    pub(crate) fn server(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    pub(crate) fn emit(&self, kind: ChangeKind) {
        match self.changes.try_send(ChangeEvent::new(kind)) {
            Ok(()) => {}
            Err(mpsc::TrySendError::Full(_)) => {
                tracing::trace!("Change channel full, dropping {:?}", kind);
            }
            // Nobody listens once every iterator is gone
            Err(mpsc::TrySendError::Disconnected(_)) => {}
        }
    }

    /// Mutate the store in one write section, then emit the returned kinds
    pub(crate) fn apply_all<F>(&self, mutate: F)
    where
        F: FnOnce(&mut SpeakerStore) -> Vec<ChangeKind>,
    {
        let changed = {
            let mut store = self.store.write();
            mutate(&mut store)
        };
        for kind in changed {
            self.emit(kind);
        }
    }

    /// Mutate the store and emit `kind` when `mutate` reports a change
    pub(crate) fn apply<F>(&self, kind: ChangeKind, mutate: F) -> bool
    where
        F: FnOnce(&mut SpeakerStore) -> bool,
    {
        let changed = {
            let mut store = self.store.write();
            mutate(&mut store)
        };
        if changed {
            self.emit(kind);
        }
        changed
    }

    pub(crate) fn mark_unavailable(&self) {
        self.apply(ChangeKind::Availability, |s| update(&mut s.available, false));
    }

    /// Unwrap the result of a background read
    ///
    /// Failures are logged (throttled for connectivity) and yield `None`, so
    /// the caller keeps its prior value.
    pub(crate) fn read<T>(&self, operation: &'static str, result: mopidy_api::Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.failures.record_success(operation);
                Some(value)
            }
            Err(err) if err.is_connectivity() => {
                self.failures.record_failure(operation, &self.server(), &err);
                self.mark_unavailable();
                None
            }
            Err(err) => {
                tracing::warn!("Failed to {} on Mopidy server at {}: {}", operation, self.server(), err);
                None
            }
        }
    }

    /// Unwrap the result of a command's remote call
    ///
    /// Connectivity failures mark the speaker unavailable before they are
    /// returned to the caller.
    pub(crate) fn command<T>(&self, operation: &'static str, result: mopidy_api::Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.failures.record_success(operation);
                Ok(value)
            }
            Err(err) => {
                if err.is_connectivity() {
                    self.failures.record_failure(operation, &self.server(), &err);
                    self.mark_unavailable();
                } else {
                    tracing::warn!("Failed to {} on Mopidy server at {}: {}", operation, self.server(), err);
                }
                Err(StateError::from(err))
            }
        }
    }

    // ========================================================================
    // Scalar refreshes
    // ========================================================================

    /// Probe the server; on failure every derived field is cleared
    ///
    /// Returns whether the server answered.
    pub(crate) fn refresh_version(&self) -> bool {
        const OPERATION: &str = "get software version";
        match self.client.get_version() {
            Ok(version) => {
                self.failures.record_success(OPERATION);
                self.apply_all(|s| {
                    let mut kinds = Vec::new();
                    if update(&mut s.available, true) {
                        kinds.push(ChangeKind::Availability);
                    }
                    if update(&mut s.version, Some(version)) {
                        kinds.push(ChangeKind::Capabilities);
                    }
                    kinds
                });
                true
            }
            Err(err) => {
                if err.is_connectivity() {
                    self.failures.record_failure(OPERATION, &self.server(), &err);
                } else {
                    tracing::warn!("Failed to {} on Mopidy server at {}: {}", OPERATION, self.server(), err);
                }
                self.apply_all(|s| {
                    let was_available = s.available;
                    let had_track = s.queue.current().tlid.is_some();
                    s.clear();
                    let mut kinds = Vec::new();
                    if was_available {
                        kinds.push(ChangeKind::Availability);
                    }
                    if had_track {
                        kinds.push(ChangeKind::CurrentTrack);
                    }
                    kinds
                });
                false
            }
        }
    }

    pub(crate) fn refresh_uri_schemes(&self) {
        if let Some(schemes) = self.read("get uri schemes", self.client.get_uri_schemes()) {
            self.apply(ChangeKind::Capabilities, |s| update(&mut s.uri_schemes, Some(schemes)));
        }
    }

    pub(crate) fn refresh_consume(&self) {
        if let Some(consume) = self.read("get consume mode", self.client.get_consume()) {
            self.apply(ChangeKind::Options, |s| update(&mut s.consume, Some(consume)));
        }
    }

    /// Playlist names; a backend without playlists offers no sources
    pub(crate) fn refresh_sources(&self) {
        let names = match self.client.playlists() {
            Err(ApiError::Unsupported(_)) => Some(Vec::new()),
            result => self
                .read("get playlists", result)
                .map(|refs| refs.into_iter().filter_map(|r| r.name).collect::<Vec<_>>()),
        };
        if let Some(names) = names {
            self.apply(ChangeKind::Sources, |s| update(&mut s.sources, Some(names)));
        }
    }

    pub(crate) fn refresh_volume(&self) {
        if let Some(volume) = self.read("get volume", self.client.get_volume()) {
            let volume = volume.map(|v| v.min(100));
            self.apply(ChangeKind::Volume, |s| update(&mut s.volume, volume));
        }
        if let Some(muted) = self.read("get mute", self.client.get_mute()) {
            self.apply(ChangeKind::Mute, |s| update(&mut s.muted, muted));
        }
    }

    pub(crate) fn refresh_shuffle(&self) {
        if let Some(random) = self.read("get shuffle mode", self.client.get_random()) {
            self.apply(ChangeKind::Options, |s| update(&mut s.shuffle, Some(random)));
        }
    }

    pub(crate) fn refresh_phase(&self) {
        let state = match self.read("get playback state", self.client.get_state()) {
            Some(state) => state,
            None => return,
        };
        match Phase::from_remote(&state) {
            Some(phase) => self.set_phase(phase),
            None => tracing::warn!("Unknown playback state '{}' from {}", state, self.server()),
        }
    }

    /// Both flags must be read for the derived mode to be trusted
    pub(crate) fn refresh_repeat(&self) {
        let repeat = self.read("get repeat mode", self.client.get_repeat());
        let single = self.read("get single mode", self.client.get_single());
        if let (Some(repeat), Some(single)) = (repeat, single) {
            let mode = RepeatMode::from_flags(repeat, single);
            self.apply(ChangeKind::Options, |s| update(&mut s.repeat, Some(mode)));
        }
    }

    /// Consume, repeat and shuffle in one write section
    ///
    /// Returns whether anything changed (and `Options` was emitted).
    pub(crate) fn refresh_options(&self) -> bool {
        let consume = self.read("get consume mode", self.client.get_consume());
        let repeat = self.read("get repeat mode", self.client.get_repeat());
        let single = self.read("get single mode", self.client.get_single());
        let random = self.read("get shuffle mode", self.client.get_random());

        self.apply(ChangeKind::Options, |s| {
            let mut changed = false;
            if let Some(consume) = consume {
                changed |= update(&mut s.consume, Some(consume));
            }
            if let (Some(repeat), Some(single)) = (repeat, single) {
                changed |= update(&mut s.repeat, Some(RepeatMode::from_flags(repeat, single)));
            }
            if let Some(random) = random {
                changed |= update(&mut s.shuffle, Some(random));
            }
            changed
        })
    }

    /// Record a phase; entering idle clears the current-track pointer
    pub(crate) fn set_phase(&self, phase: Phase) {
        self.apply_all(|s| {
            let mut kinds = Vec::new();
            if update(&mut s.phase, Some(phase)) {
                kinds.push(ChangeKind::Playback);
            }
            if phase == Phase::Idle && s.queue.current().tlid.is_some() {
                s.queue.clear_current();
                kinds.push(ChangeKind::CurrentTrack);
            }
            kinds
        });
    }

    // ========================================================================
    // Queue refreshes
    // ========================================================================

    /// Index, length and a full reconciliation of the entry table
    ///
    /// Returns whether anything changed (and `Queue` was emitted).
    pub(crate) fn refresh_queue_info(&self) -> bool {
        let index = self.read("get queue index", self.client.index());
        let length = self.read("get queue length", self.client.get_length());
        let listing = self.read("get queue tracks", self.client.get_tl_tracks());

        self.apply(ChangeKind::Queue, |s| {
            let mut changed = false;
            if let Some(index) = index {
                if s.queue.index() != index {
                    s.queue.set_index(index);
                    changed = true;
                }
            }
            if let Some(length) = length {
                if s.queue.length() != Some(length) {
                    s.queue.set_length(Some(length));
                    changed = true;
                }
            }
            if let Some(listing) = &listing {
                changed |= s.queue.reconcile_full_queue(listing);
            }
            changed
        })
    }

    /// Reconcile the entry table only; returns the listing that was applied
    pub(crate) fn refresh_tracks(&self) -> Option<Vec<TlTrack>> {
        let listing = self.read("get queue tracks", self.client.get_tl_tracks())?;
        self.apply(ChangeKind::Queue, |s| {
            let mut changed = s.queue.reconcile_full_queue(&listing);
            changed |= update_length(s, listing.len());
            changed
        });
        Some(listing)
    }

    /// Re-read the current track, its artwork, position and stream title
    ///
    /// Each step applies only while the player is not idle and the pointer
    /// still holds the tlid read first, so a stop delivered mid-refresh wins.
    pub(crate) fn refresh_current_track(&self) {
        let current = match self.read("get current track", self.client.get_current_tl_track()) {
            Some(Some(current)) => current,
            _ => return,
        };
        if !self.set_current(current.tlid, &current.track) {
            tracing::trace!("Player is stopped, not pointing at tlid {}", current.tlid);
            return;
        }

        self.refresh_artwork(None);
        self.refresh_position(current.tlid);
        self.refresh_stream_info(current.tlid);
    }

    /// Point the current-track pointer at `tlid` unless the player is idle
    ///
    /// Returns whether the pointer now holds `tlid`.
    pub(crate) fn set_current(&self, tlid: Tlid, track: &mopidy_api::Track) -> bool {
        let mut pointed = false;
        self.apply(ChangeKind::CurrentTrack, |s| {
            if s.phase == Some(Phase::Idle) {
                return false;
            }
            let before = s.queue.current().clone();
            s.queue.set_current(tlid, track);
            pointed = true;
            *s.queue.current() != before
        });
        pointed
    }

    pub(crate) fn refresh_position(&self, tlid: Tlid) {
        if let Some(millis) = self.read("get time position", self.client.get_time_position()) {
            self.apply(ChangeKind::Position, |s| {
                if !points_at(s, tlid) {
                    return false;
                }
                s.queue.sample_position(millis);
                true
            });
        }
    }

    pub(crate) fn refresh_stream_info(&self, tlid: Tlid) {
        let title = match self.read("get stream title", self.client.get_stream_title()) {
            Some(title) => title,
            None => return,
        };
        self.apply(ChangeKind::CurrentTrack, |s| {
            if !points_at(s, tlid) {
                return false;
            }
            let before = s.queue.current().clone();
            match &title {
                Some(title) => s.queue.set_stream_title(title),
                None => s.queue.clear_stream_flag(),
            }
            *s.queue.current() != before
        });
    }

    /// Resolve artwork for `uri` (default: the current uri) and store it on
    /// the pointer if that uri is still current
    pub(crate) fn refresh_artwork(&self, uri: Option<String>) {
        let (uri, is_stream) = {
            let store = self.store.read();
            let current = store.queue.current();
            (uri.or_else(|| current.uri.clone()), current.is_stream)
        };
        let uri = match uri {
            Some(uri) => uri,
            None => return,
        };

        let url = self.resolve_artwork(&uri, is_stream);
        self.apply(ChangeKind::Artwork, |s| {
            let current = s.queue.current();
            if current.uri.as_deref() != Some(uri.as_str()) || current.artwork_url == url {
                return false;
            }
            s.queue.set_artwork(url);
            true
        });
    }

    /// Artwork url for `uri`, from the cache or the server
    ///
    /// Relative urls are expanded against the server's base url. Streams
    /// without artwork and failed lookups yield `None`.
    pub(crate) fn resolve_artwork(&self, uri: &str, is_stream: bool) -> Option<String> {
        let cache = self.store.read().queue.artwork_cache();
        if let Some(url) = cache.get(uri) {
            return Some(url);
        }

        let images = self.read("get images", self.client.get_images(&[uri.to_string()]))?;
        match images.get(uri).and_then(|images| images.first()) {
            Some(image) => {
                let url = expand_url(&self.config.base_url(), &image.uri, Local::now().date_naive());
                cache.set(uri, url.clone());
                Some(url)
            }
            None => {
                if !is_stream {
                    tracing::warn!("No artwork found for {}", uri);
                }
                None
            }
        }
    }

    /// Rows for a fresh queue listing; empty when the server is unreachable
    pub(crate) fn queue_tracks_array(&self) -> Vec<QueueTrackItem> {
        match self.read("get queue tracks", self.client.get_tl_tracks()) {
            Some(listing) => self.store.read().queue.to_ordered_array(&listing),
            None => Vec::new(),
        }
    }
}

/// Whether a refresh started for `tlid` may still write to the pointer
fn points_at(store: &SpeakerStore, tlid: Tlid) -> bool {
    store.phase != Some(Phase::Idle) && store.queue.current().tlid == Some(tlid)
}

fn update_length(store: &mut SpeakerStore, length: usize) -> bool {
    if store.queue.length() == Some(length) {
        false
    } else {
        store.queue.set_length(Some(length));
        true
    }
}
