use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rpc_client::{RpcClient, RpcTransport};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::models::{HistoryEntry, Image, Playlist, Ref, SearchResult, TlTrack, Tlid, Track};
use crate::{ApiError, Result};

/// Search query: field name (`artist`, `album`, `track_name`, `genre`, `any`) to values
pub type SearchQuery = BTreeMap<String, Vec<String>>;

/// A client for executing typed Mopidy core calls
///
/// This client bridges the gap between the raw JSON-RPC transport and the
/// typed models of this crate. It is cheap to clone; clones share the same
/// underlying transport.
///
/// # Example
///
/// ```rust,no_run
/// use mopidy_api::MopidyClient;
///
/// let client = MopidyClient::connect("192.168.1.20", 6680);
/// let version = client.get_version()?;
/// let queue = client.get_tl_tracks()?;
/// println!("Mopidy {} with {} queued tracks", version, queue.len());
/// # Ok::<(), mopidy_api::ApiError>(())
/// ```
#[derive(Clone)]
pub struct MopidyClient {
    transport: Arc<dyn RpcTransport>,
}

impl std::fmt::Debug for MopidyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MopidyClient").finish_non_exhaustive()
    }
}

impl MopidyClient {
    /// Create a client talking JSON-RPC over HTTP to `host:port`
    pub fn connect(host: &str, port: u16) -> Self {
        Self::with_transport(Arc::new(RpcClient::new(host, port)))
    }

    /// Create a client on top of any transport (used by tests and custom frontends)
    pub fn with_transport(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let value = self.transport.call(method, params)?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::ParseError(format!("{}: {}", method, e)))
    }

    fn call_unit(&self, method: &str, params: Value) -> Result<()> {
        self.transport.call(method, params)?;
        Ok(())
    }

    // ========================================================================
    // Core
    // ========================================================================

    pub fn get_version(&self) -> Result<String> {
        self.call("core.get_version", Value::Null)
    }

    pub fn get_uri_schemes(&self) -> Result<Vec<String>> {
        self.call("core.get_uri_schemes", Value::Null)
    }

    // ========================================================================
    // Tracklist
    // ========================================================================

    /// Add uris to the queue, at `at_position` or appended when `None`
    pub fn add(&self, uris: &[String], at_position: Option<usize>) -> Result<Vec<TlTrack>> {
        self.call(
            "core.tracklist.add",
            json!({ "uris": uris, "at_position": at_position }),
        )
    }

    /// Remove the entries with the given tlids
    pub fn remove_tlids(&self, tlids: &[Tlid]) -> Result<Vec<TlTrack>> {
        self.call("core.tracklist.remove", json!({ "criteria": { "tlid": tlids } }))
    }

    /// Move the slice `[start, end)` so it begins at `to_position`
    pub fn move_tracks(&self, start: usize, end: usize, to_position: usize) -> Result<()> {
        self.call_unit(
            "core.tracklist.move",
            json!({ "start": start, "end": end, "to_position": to_position }),
        )
    }

    pub fn clear(&self) -> Result<()> {
        self.call_unit("core.tracklist.clear", Value::Null)
    }

    /// Index of the current entry, `None` when nothing is current
    pub fn index(&self) -> Result<Option<usize>> {
        self.call("core.tracklist.index", Value::Null)
    }

    pub fn get_length(&self) -> Result<usize> {
        self.call("core.tracklist.get_length", Value::Null)
    }

    pub fn get_tl_tracks(&self) -> Result<Vec<TlTrack>> {
        self.call("core.tracklist.get_tl_tracks", Value::Null)
    }

    pub fn get_consume(&self) -> Result<bool> {
        self.call("core.tracklist.get_consume", Value::Null)
    }

    pub fn set_consume(&self, value: bool) -> Result<()> {
        self.call_unit("core.tracklist.set_consume", json!({ "value": value }))
    }

    pub fn get_repeat(&self) -> Result<bool> {
        self.call("core.tracklist.get_repeat", Value::Null)
    }

    pub fn set_repeat(&self, value: bool) -> Result<()> {
        self.call_unit("core.tracklist.set_repeat", json!({ "value": value }))
    }

    pub fn get_single(&self) -> Result<bool> {
        self.call("core.tracklist.get_single", Value::Null)
    }

    pub fn set_single(&self, value: bool) -> Result<()> {
        self.call_unit("core.tracklist.set_single", json!({ "value": value }))
    }

    pub fn get_random(&self) -> Result<bool> {
        self.call("core.tracklist.get_random", Value::Null)
    }

    pub fn set_random(&self, value: bool) -> Result<()> {
        self.call_unit("core.tracklist.set_random", json!({ "value": value }))
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Start playback, optionally of a specific queue entry
    pub fn play(&self, tlid: Option<Tlid>) -> Result<()> {
        let params = match tlid {
            Some(tlid) => json!({ "tlid": tlid }),
            None => Value::Null,
        };
        self.call_unit("core.playback.play", params)
    }

    pub fn pause(&self) -> Result<()> {
        self.call_unit("core.playback.pause", Value::Null)
    }

    pub fn resume(&self) -> Result<()> {
        self.call_unit("core.playback.resume", Value::Null)
    }

    pub fn stop(&self) -> Result<()> {
        self.call_unit("core.playback.stop", Value::Null)
    }

    pub fn next(&self) -> Result<()> {
        self.call_unit("core.playback.next", Value::Null)
    }

    pub fn previous(&self) -> Result<()> {
        self.call_unit("core.playback.previous", Value::Null)
    }

    /// Seek to `time_position` milliseconds into the current track
    pub fn seek(&self, time_position: u64) -> Result<bool> {
        let value = self
            .transport
            .call("core.playback.seek", json!({ "time_position": time_position }))?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Raw playback state string (`playing`, `paused`, `stopped`)
    pub fn get_state(&self) -> Result<String> {
        self.call("core.playback.get_state", Value::Null)
    }

    /// Position in the current track, in milliseconds
    pub fn get_time_position(&self) -> Result<u64> {
        let value: Option<u64> = self.call("core.playback.get_time_position", Value::Null)?;
        Ok(value.unwrap_or(0))
    }

    pub fn get_stream_title(&self) -> Result<Option<String>> {
        self.call("core.playback.get_stream_title", Value::Null)
    }

    pub fn get_current_tl_track(&self) -> Result<Option<TlTrack>> {
        self.call("core.playback.get_current_tl_track", Value::Null)
    }

    // ========================================================================
    // Mixer
    // ========================================================================

    pub fn get_volume(&self) -> Result<Option<u8>> {
        self.call("core.mixer.get_volume", Value::Null)
    }

    pub fn set_volume(&self, volume: u8) -> Result<bool> {
        let value = self
            .transport
            .call("core.mixer.set_volume", json!({ "volume": volume }))?;
        Ok(value.as_bool().unwrap_or(true))
    }

    pub fn get_mute(&self) -> Result<Option<bool>> {
        self.call("core.mixer.get_mute", Value::Null)
    }

    pub fn set_mute(&self, mute: bool) -> Result<bool> {
        let value = self
            .transport
            .call("core.mixer.set_mute", json!({ "mute": mute }))?;
        Ok(value.as_bool().unwrap_or(true))
    }

    // ========================================================================
    // Library
    // ========================================================================

    /// Browse a directory uri, or the library root when `None`
    pub fn browse(&self, uri: Option<&str>) -> Result<Vec<Ref>> {
        self.call("core.library.browse", json!({ "uri": uri }))
    }

    pub fn search(
        &self,
        query: &SearchQuery,
        uris: Option<&[String]>,
        exact: bool,
    ) -> Result<Vec<SearchResult>> {
        self.call(
            "core.library.search",
            json!({ "query": query, "uris": uris, "exact": exact }),
        )
    }

    pub fn lookup(&self, uris: &[String]) -> Result<HashMap<String, Vec<Track>>> {
        self.call("core.library.lookup", json!({ "uris": uris }))
    }

    pub fn get_images(&self, uris: &[String]) -> Result<HashMap<String, Vec<Image>>> {
        self.call("core.library.get_images", json!({ "uris": uris }))
    }

    // ========================================================================
    // Playlists
    // ========================================================================

    pub fn playlists(&self) -> Result<Vec<Ref>> {
        self.call("core.playlists.as_list", Value::Null)
    }

    pub fn lookup_playlist(&self, uri: &str) -> Result<Option<Playlist>> {
        self.call("core.playlists.lookup", json!({ "uri": uri }))
    }

    /// Create an empty playlist; `None` when no backend accepted it
    pub fn create_playlist(&self, name: &str, uri_scheme: Option<&str>) -> Result<Option<Playlist>> {
        self.call(
            "core.playlists.create",
            json!({ "name": name, "uri_scheme": uri_scheme }),
        )
    }

    /// Persist `playlist`; `None` when the backend refused it
    pub fn save_playlist(&self, playlist: &Playlist) -> Result<Option<Playlist>> {
        self.call("core.playlists.save", json!({ "playlist": playlist_payload(playlist) }))
    }

    pub fn delete_playlist(&self, uri: &str) -> Result<bool> {
        let value = self.transport.call("core.playlists.delete", json!({ "uri": uri }))?;
        Ok(value.as_bool().unwrap_or(true))
    }

    pub fn refresh_playlists(&self, uri_scheme: Option<&str>) -> Result<()> {
        self.call_unit("core.playlists.refresh", json!({ "uri_scheme": uri_scheme }))
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Playback history, most recent first
    pub fn get_history(&self) -> Result<Vec<HistoryEntry>> {
        let pairs: Vec<(i64, Ref)> = self.call("core.history.get_history", Value::Null)?;
        Ok(pairs
            .into_iter()
            .map(|(ts, track)| HistoryEntry::from_pair(ts, track))
            .collect())
    }
}

/// Mopidy only decodes objects tagged with `__model__` back into models
fn playlist_payload(playlist: &Playlist) -> Value {
    let tracks: Vec<Value> = playlist
        .tracks
        .iter()
        .map(|t| json!({ "__model__": "Track", "uri": t.uri, "name": t.name }))
        .collect();
    json!({
        "__model__": "Playlist",
        "uri": playlist.uri,
        "name": playlist.name,
        "tracks": tracks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rpc_client::RpcError;

    /// Records every call and answers with a canned value
    struct Recorder {
        calls: Mutex<Vec<(String, Value)>>,
        reply: Value,
    }

    impl RpcTransport for Recorder {
        fn call(&self, method: &str, params: Value) -> std::result::Result<Value, RpcError> {
            self.calls.lock().push((method.to_string(), params));
            Ok(self.reply.clone())
        }
    }

    fn recorder(reply: Value) -> (Arc<Recorder>, MopidyClient) {
        let transport = Arc::new(Recorder {
            calls: Mutex::new(Vec::new()),
            reply,
        });
        let client = MopidyClient::with_transport(transport.clone());
        (transport, client)
    }

    #[test]
    fn test_remove_sends_tlid_criteria() {
        let (transport, client) = recorder(json!([]));
        client.remove_tlids(&[4, 2]).unwrap();
        let calls = transport.calls.lock();
        assert_eq!(calls[0].0, "core.tracklist.remove");
        assert_eq!(calls[0].1, json!({"criteria": {"tlid": [4, 2]}}));
    }

    #[test]
    fn test_play_without_tlid_sends_no_params() {
        let (transport, client) = recorder(Value::Null);
        client.play(None).unwrap();
        client.play(Some(7)).unwrap();
        let calls = transport.calls.lock();
        assert_eq!(calls[0].1, Value::Null);
        assert_eq!(calls[1].1, json!({"tlid": 7}));
    }

    #[test]
    fn test_index_null_is_none() {
        let (_, client) = recorder(Value::Null);
        assert_eq!(client.index().unwrap(), None);
    }

    #[test]
    fn test_history_pairs_decode() {
        let (_, client) = recorder(json!([
            [1_700_000_000_000i64, {"__model__": "Ref", "uri": "local:track:a", "name": "A", "type": "track"}]
        ]));
        let history = client.get_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].track.uri, "local:track:a");
    }

    #[test]
    fn test_save_playlist_tags_models() {
        let (transport, client) = recorder(Value::Null);
        let playlist = Playlist {
            uri: Some("m3u:mix.m3u8".to_string()),
            name: Some("mix".to_string()),
            tracks: vec![Track::new("local:track:a", "A")],
            last_modified: None,
        };
        assert_eq!(client.save_playlist(&playlist).unwrap(), None);
        let calls = transport.calls.lock();
        assert_eq!(calls[0].1["playlist"]["__model__"], "Playlist");
        assert_eq!(calls[0].1["playlist"]["tracks"][0]["__model__"], "Track");
    }

    #[test]
    fn test_unexpected_shape_is_parse_error() {
        let (_, client) = recorder(json!({"not": "a list"}));
        assert!(matches!(client.get_tl_tracks(), Err(ApiError::ParseError(_))));
    }
}
