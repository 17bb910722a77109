//! Queue mutation commands

use mopidy_api::{uri_scheme, TlTrack, Tlid};

use super::{require_queue, validate_position};
use crate::error::{Result, StateError};
use crate::model::{api_position, EnqueueMode, FilterCriteria, MediaKind, RemoveTracks};
use crate::Speaker;

impl Speaker {
    pub fn clear_queue(&self) -> Result<()> {
        let ctx = &self.context;
        ctx.command("clear queue", ctx.client.clear())?;
        ctx.refresh_tracks();
        Ok(())
    }

    /// Add `uris` at zero-based `at_position` (appended when `None`)
    ///
    /// Returns the entries the server created.
    pub fn queue_tracks(&self, uris: &[String], at_position: Option<usize>) -> Result<Vec<TlTrack>> {
        if uris.is_empty() {
            return Ok(Vec::new());
        }
        let ctx = &self.context;
        let added = ctx.command("queue tracks", ctx.client.add(uris, at_position))?;
        ctx.refresh_tracks();
        Ok(added)
    }

    /// Move the entry at 1-based `from` to 1-based `to`
    pub fn move_track(&self, from: usize, to: usize) -> Result<()> {
        let ctx = &self.context;
        let length = ctx.store.read().queue.length();
        validate_position(from, length)?;
        validate_position(to, length)?;

        let start = api_position(from);
        ctx.command(
            "move track",
            ctx.client.move_tracks(start, start + 1, api_position(to)),
        )?;
        ctx.refresh_tracks();
        Ok(())
    }

    /// Remove entries by 1-based position, highest position first
    pub fn remove_track(&self, request: RemoveTracks) -> Result<()> {
        let positions = request.descending();
        if positions.is_empty() {
            return Err(StateError::validation(
                "Either position or positions must be provided",
            ));
        }

        let ctx = &self.context;
        let length = require_queue(ctx.store.read().queue.length())?;
        for position in &positions {
            validate_position(*position, Some(length))?;
        }

        let listing = ctx.command("get queue tracks", ctx.client.get_tl_tracks())?;
        let tlids: Vec<Tlid> = positions
            .iter()
            .filter_map(|position| listing.get(api_position(*position)).map(|t| t.tlid))
            .collect();

        if !tlids.is_empty() {
            ctx.command("remove tracks", ctx.client.remove_tlids(&tlids))?;
            ctx.refresh_tracks();
        }
        Ok(())
    }

    /// Remove every entry matching `criteria`; returns how many were removed
    pub fn filter_tracks(&self, criteria: &FilterCriteria) -> Result<usize> {
        if criteria.is_empty() {
            return Err(StateError::validation(
                "At least one criteria field must be provided",
            ));
        }

        let ctx = &self.context;
        require_queue(ctx.store.read().queue.length())?;

        let listing = ctx.command("get queue tracks", ctx.client.get_tl_tracks())?;
        let tlids: Vec<Tlid> = listing
            .iter()
            .filter(|t| criteria.matches(&t.track))
            .map(|t| t.tlid)
            .collect();

        if !tlids.is_empty() {
            ctx.command("remove tracks", ctx.client.remove_tlids(&tlids))?;
            ctx.refresh_tracks();
        }
        tracing::debug!("Filtered {} tracks from the queue", tlids.len());
        Ok(tlids.len())
    }

    /// Play the entry at 1-based `position` without reordering the queue
    pub fn play_track_at_position(&self, position: usize) -> Result<()> {
        let ctx = &self.context;
        validate_position(position, ctx.store.read().queue.length())?;

        let listing = ctx.command("get queue tracks", ctx.client.get_tl_tracks())?;
        let tlid = listing
            .get(api_position(position))
            .map(|t| t.tlid)
            .ok_or_else(|| {
                StateError::validation(format!(
                    "Position {} is out of range. Valid range is 1 to {}",
                    position,
                    listing.len()
                ))
            })?;

        ctx.command("start playback", ctx.client.play(Some(tlid)))?;
        ctx.refresh_queue_info();
        Ok(())
    }

    /// Queue the media behind `id` according to `mode`
    pub fn play_media(&self, kind: MediaKind, id: &str, mode: EnqueueMode) -> Result<()> {
        let uris = self.media_uris(kind, id)?;
        if uris.is_empty() {
            tracing::error!("No media for {} ({:?}) could be found", id, kind);
            return Err(StateError::validation(format!("No media found for {}", id)));
        }

        let ctx = &self.context;
        let (index, length, playing) = {
            let store = ctx.store.read();
            (store.queue.index(), store.queue.length(), store.is_playing())
        };

        let queued = match mode {
            EnqueueMode::Add => {
                let queued = self.queue_tracks(&uris, None)?;
                if !playing {
                    self.play()?;
                }
                queued
            }
            EnqueueMode::Next => {
                let queued = self.queue_tracks(&uris, index.map(|i| i + 1))?;
                if !playing {
                    self.play()?;
                }
                queued
            }
            EnqueueMode::Play => {
                // Without a current entry, insert after the last known one
                let queued = self.queue_tracks(&uris, index.or(length))?;
                let first = queued.first().map(|t| t.tlid);
                ctx.command("start playback", ctx.client.play(first))?;
                queued
            }
            EnqueueMode::Replace => {
                self.stop()?;
                self.clear_queue()?;
                let queued = self.queue_tracks(&uris, None)?;
                self.play()?;
                queued
            }
        };

        if kind == MediaKind::Playlist {
            self.tag_playlist_entries(id, &queued);
        }
        Ok(())
    }

    /// Replace the queue with the playlist called `name` and play it
    pub fn select_source(&self, name: &str) -> Result<()> {
        let ctx = &self.context;
        let playlists = ctx.command("get playlists", ctx.client.playlists())?;
        match playlists.iter().find(|p| p.name.as_deref() == Some(name)) {
            Some(playlist) => self.play_media(MediaKind::Playlist, &playlist.uri, EnqueueMode::Replace),
            None => Err(StateError::validation(format!(
                "Could not find source '{}'",
                name
            ))),
        }
    }

    /// Playable uris behind a media id
    fn media_uris(&self, kind: MediaKind, id: &str) -> Result<Vec<String>> {
        let ctx = &self.context;
        match kind {
            MediaKind::Track => Ok(vec![id.to_string()]),
            // m3u playlists list their tracks; other backends expose them by browsing
            MediaKind::Playlist if uri_scheme(id) == "m3u" => {
                let playlist = ctx.command("look up playlist", ctx.client.lookup_playlist(id))?;
                Ok(playlist
                    .map(|p| p.tracks.into_iter().filter_map(|t| t.uri).collect())
                    .unwrap_or_default())
            }
            MediaKind::Playlist | MediaKind::Directory => {
                let refs = ctx.command("browse library", ctx.client.browse(Some(id)))?;
                Ok(refs.into_iter().map(|r| r.uri).collect())
            }
        }
    }

    fn tag_playlist_entries(&self, uri: &str, queued: &[TlTrack]) {
        let ctx = &self.context;
        let playlist = ctx
            .read("look up playlist", ctx.client.lookup_playlist(uri))
            .flatten();
        let name = playlist.as_ref().and_then(|p| p.name.clone());
        let playlist_uri = playlist
            .and_then(|p| p.uri)
            .unwrap_or_else(|| uri.to_string());
        let tlids: Vec<Tlid> = queued.iter().map(|t| t.tlid).collect();

        ctx.apply(crate::iter::ChangeKind::Queue, |s| {
            s.queue
                .set_playlist_context(&tlids, name.as_deref(), Some(&playlist_uri));
            !tlids.is_empty()
        });
    }
}
