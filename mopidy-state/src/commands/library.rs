//! Library, search and history commands

use mopidy_api::{uri_scheme, Ref, SearchQuery, SearchResult, Track};

use crate::error::{Result, StateError};
use crate::model::{ExactQuery, HistoryItem};
use crate::Speaker;

impl Speaker {
    /// Search the library
    ///
    /// `sources` restricts the search to backends; bare scheme names such as
    /// `"local"` are accepted and sources with an unsupported scheme are
    /// dropped. No remaining source searches every backend.
    pub fn search(&self, sources: &[String], query: &SearchQuery, exact: bool) -> Result<Vec<SearchResult>> {
        let ctx = &self.context;
        let schemes = match ctx.store.read().uri_schemes.clone() {
            Some(schemes) => schemes,
            None => ctx.command("get uri schemes", ctx.client.get_uri_schemes())?,
        };

        let uris: Vec<String> = sources
            .iter()
            .map(|source| {
                if source.contains(':') {
                    source.clone()
                } else {
                    format!("{}:", source)
                }
            })
            .filter(|source| schemes.iter().any(|s| s == uri_scheme(source)))
            .collect();
        let uris = if uris.is_empty() { None } else { Some(uris.as_slice()) };

        ctx.command("search library", ctx.client.search(query, uris, exact))
    }

    /// Uris of the tracks a search returns
    pub fn search_tracks(&self, sources: &[String], query: &SearchQuery, exact: bool) -> Result<Vec<String>> {
        Ok(self
            .search(sources, query, exact)?
            .into_iter()
            .flat_map(|result| result.tracks)
            .filter_map(|track| track.uri)
            .collect())
    }

    /// Uris of tracks whose fields equal every provided query field, ignoring case
    pub fn find_exact(&self, query: &ExactQuery) -> Result<Vec<String>> {
        if query.is_empty() {
            return Err(StateError::validation(
                "At least one query field must be provided",
            ));
        }

        let ctx = &self.context;
        let results = ctx.command(
            "find exact tracks",
            ctx.client.search(&query.to_search_query(), None, true),
        )?;
        Ok(results
            .into_iter()
            .flat_map(|result| result.tracks)
            .filter(|track| query.matches_exactly(track))
            .filter_map(|track| track.uri)
            .collect())
    }

    /// Recently played tracks, most recent first
    ///
    /// `limit` defaults to the configured history limit.
    pub fn get_history(&self, limit: Option<usize>) -> Result<Vec<HistoryItem>> {
        let ctx = &self.context;
        let limit = limit.unwrap_or(ctx.config.history_limit);
        let history = ctx.command("get playback history", ctx.client.get_history())?;
        Ok(history
            .into_iter()
            .take(limit)
            .map(|entry| HistoryItem {
                uri: entry.track.uri,
                track_name: entry.track.name,
                played_at: entry.played_at,
            })
            .collect())
    }

    /// Queue and play the history entry at `index` (0 is the most recent)
    pub fn play_from_history(&self, index: usize) -> Result<()> {
        let ctx = &self.context;
        let history = ctx.command("get playback history", ctx.client.get_history())?;
        let entry = history.get(index).ok_or_else(|| {
            StateError::validation(format!(
                "History index {} is out of range. History has {} entries.",
                index,
                history.len()
            ))
        })?;
        if entry.track.uri.is_empty() {
            return Err(StateError::validation("Track URI not found in history entry"));
        }

        let queued = self.queue_tracks(&[entry.track.uri.clone()], None)?;
        let tlid = queued.first().map(|t| t.tlid);
        ctx.command("start playback", ctx.client.play(tlid))
    }

    /// Full metadata of one track
    pub fn lookup_track(&self, uri: &str) -> Result<Track> {
        let ctx = &self.context;
        let mut found = ctx.command("look up track", ctx.client.lookup(&[uri.to_string()]))?;
        found
            .remove(uri)
            .and_then(|tracks| tracks.into_iter().next())
            .ok_or_else(|| StateError::validation(format!("Track not found: {}", uri)))
    }

    /// Children of a library directory, or the library root when `None`
    pub fn browse(&self, uri: Option<&str>) -> Result<Vec<Ref>> {
        let ctx = &self.context;
        ctx.command("browse library", ctx.client.browse(uri))
    }
}
