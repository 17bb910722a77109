//! In-memory model of the remote queue
//!
//! `QueueModel` owns the queue-entry table (keyed by tlid), the current-track
//! pointer and the title/artwork caches. It never talks to the server itself:
//! [`crate::context::SpeakerContext`] fetches remote data outside the store
//! lock and applies it here in one write section.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mopidy_api::{TlTrack, Tlid, Track};

use crate::cache::MetadataCache;
use crate::model::{user_position, CurrentTrack, QueueEntry, QueueTrackItem};

#[derive(Debug)]
pub struct QueueModel {
    entries: HashMap<Tlid, QueueEntry>,
    current: CurrentTrack,
    /// Index of the current entry as reported by the server
    index: Option<usize>,
    /// Queue length as reported by the server
    length: Option<usize>,
    titles: Arc<MetadataCache<String>>,
    artwork: Arc<MetadataCache<String>>,
}

impl QueueModel {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            current: CurrentTrack::cleared(Utc::now()),
            index: None,
            length: None,
            titles: Arc::new(MetadataCache::new(cache_capacity)),
            artwork: Arc::new(MetadataCache::new(cache_capacity)),
        }
    }

    /// Replace the entry table from a fresh listing
    ///
    /// Listed tlids get their uri and dense zero-based index; unknown tlids are
    /// created and tlids absent from the listing are purged. Returns whether
    /// the table changed.
    pub fn reconcile_full_queue(&mut self, remote: &[TlTrack]) -> bool {
        let mut changed = false;
        let mut kept: HashMap<Tlid, QueueEntry> = HashMap::with_capacity(remote.len());
        for (index, tl_track) in remote.iter().enumerate() {
            let mut entry = match self.entries.remove(&tl_track.tlid) {
                Some(entry) => entry,
                None => {
                    changed = true;
                    QueueEntry::new(tl_track.tlid)
                }
            };
            if entry.uri != tl_track.track.uri || entry.index != Some(index) {
                changed = true;
            }
            entry.uri = tl_track.track.uri.clone();
            entry.index = Some(index);
            kept.insert(tl_track.tlid, entry);
        }

        if !self.entries.is_empty() {
            tracing::debug!("Purging {} stale queue entries", self.entries.len());
            changed = true;
        }
        self.entries = kept;
        changed
    }

    /// Create or update the entry for `tlid` without moving the pointer
    pub fn parse_track(&mut self, tlid: Tlid, track: &Track) -> &QueueEntry {
        let entry = self
            .entries
            .entry(tlid)
            .or_insert_with(|| QueueEntry::new(tlid));
        entry.apply_track(track);
        entry
    }

    /// Update the entry for `tlid` and make it the current track
    pub fn set_current(&mut self, tlid: Tlid, track: &Track) {
        self.parse_track(tlid, track);
        if let Some(entry) = self.entries.get(&tlid) {
            self.current.point_at(entry);
        }
    }

    /// Store a position reported in milliseconds, stamped with the current time
    pub fn sample_position(&mut self, raw_millis: u64) {
        self.current.sample_position(raw_millis / 1000, Utc::now());
    }

    /// Override the current title with a live stream title
    pub fn set_stream_title(&mut self, title: &str) {
        self.current.title = Some(title.to_string());
        self.current.is_stream = true;
        if let Some(uri) = &self.current.uri {
            self.titles.set(uri.clone(), title.to_string());
        }
        if let Some(entry) = self
            .current
            .tlid
            .and_then(|tlid| self.entries.get_mut(&tlid))
        {
            entry.title = Some(title.to_string());
            entry.is_stream = true;
        }
    }

    /// The server reports no stream title for the current entry
    pub fn clear_stream_flag(&mut self) {
        self.current.is_stream = false;
        if let Some(entry) = self
            .current
            .tlid
            .and_then(|tlid| self.entries.get_mut(&tlid))
        {
            entry.is_stream = false;
        }
    }

    /// Reset the current-track pointer
    pub fn clear_current(&mut self) {
        self.current = CurrentTrack::cleared(Utc::now());
    }

    pub fn set_artwork(&mut self, url: Option<String>) {
        self.current.artwork_url = url;
    }

    pub fn set_queue_info(&mut self, index: Option<usize>, length: Option<usize>) {
        self.index = index;
        self.length = length;
    }

    pub fn set_index(&mut self, index: Option<usize>) {
        self.index = index;
    }

    pub fn set_length(&mut self, length: Option<usize>) {
        self.length = length;
    }

    /// Tag entries queued from a playlist
    pub fn set_playlist_context(&mut self, tlids: &[Tlid], name: Option<&str>, uri: Option<&str>) {
        for tlid in tlids {
            let entry = self
                .entries
                .entry(*tlid)
                .or_insert_with(|| QueueEntry::new(*tlid));
            entry.playlist_name = name.map(str::to_string);
            entry.playlist_uri = uri.map(str::to_string);
        }
    }

    /// Queue uris in index order
    pub fn uri_list(&self) -> Vec<String> {
        self.ordered_entries()
            .into_iter()
            .filter_map(|entry| entry.uri.clone())
            .collect()
    }

    /// Entries with a known index, in index order
    pub fn ordered_entries(&self) -> Vec<&QueueEntry> {
        let mut ordered: Vec<&QueueEntry> =
            self.entries.values().filter(|e| e.index.is_some()).collect();
        ordered.sort_by_key(|e| e.index);
        ordered
    }

    /// Rows for `listing`, preferring entry metadata, then cached titles, then
    /// the listing's own track fields
    pub fn to_ordered_array(&self, listing: &[TlTrack]) -> Vec<QueueTrackItem> {
        listing
            .iter()
            .enumerate()
            .map(|(index, tl_track)| {
                let entry = self.entries.get(&tl_track.tlid);
                let track = &tl_track.track;
                let uri = entry
                    .and_then(|e| e.uri.clone())
                    .or_else(|| track.uri.clone())
                    .unwrap_or_default();
                let title = entry
                    .and_then(|e| e.title.clone())
                    .or_else(|| self.titles.get(&uri))
                    .or_else(|| track.name.clone());
                QueueTrackItem {
                    position: user_position(index),
                    title,
                    artist: entry
                        .and_then(|e| e.artist.clone())
                        .or_else(|| track.artist_names()),
                    album: entry
                        .and_then(|e| e.album_name.clone())
                        .or_else(|| track.album_name().map(str::to_string)),
                    duration: entry.and_then(|e| e.duration).or_else(|| track.duration_secs()),
                    uri,
                }
            })
            .collect()
    }

    /// Elapsed seconds of the current track extrapolated to `now`
    pub fn media_position(&self, playing: bool, now: DateTime<Utc>) -> Option<u64> {
        self.current.elapsed(playing, now)
    }

    pub fn entry(&self, tlid: Tlid) -> Option<&QueueEntry> {
        self.entries.get(&tlid)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn current(&self) -> &CurrentTrack {
        &self.current
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn length(&self) -> Option<usize> {
        self.length
    }

    pub fn titles(&self) -> Arc<MetadataCache<String>> {
        Arc::clone(&self.titles)
    }

    pub fn artwork_cache(&self) -> Arc<MetadataCache<String>> {
        Arc::clone(&self.artwork)
    }
}
