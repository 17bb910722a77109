//! Stored playlist commands
//!
//! Backends without playlist support answer with "method not found"; that
//! surfaces as [`StateError::Unsupported`], distinct from connectivity errors.

use mopidy_api::{Playlist, Track};

use super::require_queue;
use crate::error::{Result, StateError};
use crate::Speaker;

impl Speaker {
    /// Store the queue as playlist `name`, overwriting one with that name
    pub fn create_playlist(&self, name: &str) -> Result<()> {
        let ctx = &self.context;
        let tracks = self.queue_as_tracks()?;

        let existing = ctx
            .command("get playlists", ctx.client.playlists())?
            .into_iter()
            .find(|p| p.name.as_deref() == Some(name));

        let uri = match existing {
            Some(playlist) => playlist.uri,
            None => {
                let created = ctx.command("create playlist", ctx.client.create_playlist(name, None))?;
                created.and_then(|p| p.uri).ok_or_else(|| {
                    StateError::Unsupported(
                        "Playlist creation is not supported by this backend".to_string(),
                    )
                })?
            }
        };

        self.store_playlist(Playlist {
            uri: Some(uri),
            name: Some(name.to_string()),
            tracks,
            last_modified: None,
        })
    }

    /// Overwrite the playlist at `uri` with the queue
    pub fn save_playlist(&self, uri: &str) -> Result<()> {
        let ctx = &self.context;
        let tracks = self.queue_as_tracks()?;

        let playlist = ctx
            .command("look up playlist", ctx.client.lookup_playlist(uri))?
            .ok_or_else(|| StateError::validation(format!("Playlist not found: {}", uri)))?;
        let name = playlist
            .name
            .unwrap_or_else(|| uri.rsplit(':').next().unwrap_or(uri).to_string());

        self.store_playlist(Playlist {
            uri: Some(uri.to_string()),
            name: Some(name),
            tracks,
            last_modified: None,
        })
    }

    pub fn delete_playlist(&self, uri: &str) -> Result<()> {
        let ctx = &self.context;
        if !ctx.command("delete playlist", ctx.client.delete_playlist(uri))? {
            tracing::warn!("Mopidy server at {} did not delete playlist {}", ctx.server(), uri);
        }
        ctx.refresh_sources();
        Ok(())
    }

    /// Ask backends to reload their playlists, then refresh the source list
    pub fn refresh_playlists(&self) -> Result<()> {
        let ctx = &self.context;
        ctx.command("refresh playlists", ctx.client.refresh_playlists(None))?;
        ctx.refresh_sources();
        Ok(())
    }

    fn queue_as_tracks(&self) -> Result<Vec<Track>> {
        let store = self.context.store.read();
        require_queue(store.queue.length())?;
        Ok(store
            .queue
            .uri_list()
            .into_iter()
            .map(|uri| Track {
                uri: Some(uri),
                ..Default::default()
            })
            .collect())
    }

    fn store_playlist(&self, playlist: Playlist) -> Result<()> {
        let ctx = &self.context;
        let saved = ctx.command("save playlist", ctx.client.save_playlist(&playlist))?;
        if saved.is_none() {
            return Err(StateError::Unsupported(
                "Playlist save is not supported by this backend".to_string(),
            ));
        }
        tracing::info!(
            "Saved {} tracks to playlist {:?} on {}",
            playlist.tracks.len(),
            playlist.name,
            ctx.server()
        );
        ctx.refresh_sources();
        Ok(())
    }
}
