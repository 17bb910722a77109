//! Integration tests for typed calls over a scripted transport
//!
//! The transport answers each method with a canned JSON value so the typed
//! decoding of real Mopidy payloads can be checked without a server.

use std::collections::HashMap;
use std::sync::Arc;

use mopidy_api::{
    ApiError, Event, EventHub, EventKind, EventSource, MopidyClient, RefType, RpcError,
    RpcTransport, SearchQuery,
};
use parking_lot::Mutex;
use rstest::rstest;
use serde_json::{json, Value};

#[derive(Default)]
struct ScriptedTransport {
    replies: Mutex<HashMap<String, Result<Value, RpcError>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    fn reply(&self, method: &str, value: Value) {
        self.replies.lock().insert(method.to_string(), Ok(value));
    }

    fn fail(&self, method: &str, error: RpcError) {
        self.replies.lock().insert(method.to_string(), Err(error));
    }
}

impl RpcTransport for ScriptedTransport {
    fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.calls.lock().push((method.to_string(), params));
        match self.replies.lock().get(method) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(error)) => Err(error.clone()),
            None => Ok(Value::Null),
        }
    }
}

fn scripted() -> (Arc<ScriptedTransport>, MopidyClient) {
    let transport = Arc::new(ScriptedTransport::default());
    let client = MopidyClient::with_transport(transport.clone());
    (transport, client)
}

#[test]
fn test_tracklist_listing_decodes_models() {
    let (transport, client) = scripted();
    transport.reply(
        "core.tracklist.get_tl_tracks",
        json!([
            {"__model__": "TlTrack", "tlid": 1, "track": {
                "__model__": "Track", "uri": "local:track:one.mp3", "name": "One",
                "artists": [{"__model__": "Artist", "name": "Cher"}],
                "album": {"__model__": "Album", "name": "Believe",
                          "artists": [{"__model__": "Artist", "name": "Cher"}]},
                "length": 180500, "track_no": 4
            }},
            {"__model__": "TlTrack", "tlid": 2, "track": {"__model__": "Track", "uri": "http://radio/stream"}}
        ]),
    );

    let tracks = client.get_tl_tracks().unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].tlid, 1);
    assert_eq!(tracks[0].track.artist_names().as_deref(), Some("Cher"));
    assert_eq!(tracks[0].track.duration_secs(), Some(180));
    assert_eq!(tracks[1].track.scheme(), Some("http"));
    assert!(tracks[1].track.name.is_none());
}

#[test]
fn test_lookup_and_images_are_keyed_by_uri() {
    let (transport, client) = scripted();
    transport.reply(
        "core.library.get_images",
        json!({"local:track:a": [{"__model__": "Image", "uri": "/local/abc.jpeg", "width": 300}]}),
    );
    transport.reply(
        "core.library.lookup",
        json!({"local:track:a": [{"__model__": "Track", "uri": "local:track:a", "name": "A"}]}),
    );

    let uris = vec!["local:track:a".to_string()];
    let images = client.get_images(&uris).unwrap();
    assert_eq!(images["local:track:a"][0].uri, "/local/abc.jpeg");

    let tracks = client.lookup(&uris).unwrap();
    assert_eq!(tracks["local:track:a"][0].name.as_deref(), Some("A"));
}

#[test]
fn test_search_sends_query_and_scopes() {
    let (transport, client) = scripted();
    transport.reply(
        "core.library.search",
        json!([{"__model__": "SearchResult", "uri": "local:search",
                "tracks": [{"__model__": "Track", "uri": "local:track:a", "name": "A"}]}]),
    );

    let mut query = SearchQuery::new();
    query.insert("artist".to_string(), vec!["Cher".to_string()]);
    let scopes = vec!["local:".to_string()];
    let results = client.search(&query, Some(&scopes), true).unwrap();

    assert_eq!(results[0].tracks.len(), 1);
    let calls = transport.calls.lock();
    assert_eq!(
        calls[0].1,
        json!({"query": {"artist": ["Cher"]}, "uris": ["local:"], "exact": true})
    );
}

#[test]
fn test_browse_refs_keep_their_type() {
    let (transport, client) = scripted();
    transport.reply(
        "core.library.browse",
        json!([
            {"__model__": "Ref", "uri": "local:directory?type=track", "name": "Tracks", "type": "directory"},
            {"__model__": "Ref", "uri": "local:track:a", "name": "A", "type": "track"}
        ]),
    );

    let refs = client.browse(Some("local:directory")).unwrap();
    assert_eq!(refs[0].kind, RefType::Directory);
    assert_eq!(refs[1].kind, RefType::Track);
}

#[rstest]
#[case(RpcError::Network("refused".to_string()), true)]
#[case(RpcError::Parse("garbage".to_string()), false)]
#[case(RpcError::Http(500), false)]
#[case(RpcError::Fault { code: -32000, message: "boom".to_string() }, false)]
fn test_error_classification(#[case] error: RpcError, #[case] connectivity: bool) {
    let (transport, client) = scripted();
    transport.fail("core.get_version", error);
    let err = client.get_version().unwrap_err();
    assert_eq!(err.is_connectivity(), connectivity);
}

#[test]
fn test_missing_playlist_method_is_unsupported() {
    let (transport, client) = scripted();
    transport.fail(
        "core.playlists.create",
        RpcError::Fault {
            code: RpcError::METHOD_NOT_FOUND,
            message: "Method not found".to_string(),
        },
    );
    assert!(matches!(
        client.create_playlist("mix", None),
        Err(ApiError::Unsupported(_))
    ));
}

#[rstest]
#[case(r#"{"event":"mute_changed","mute":false}"#, EventKind::MuteChanged)]
#[case(r#"{"event":"options_changed"}"#, EventKind::OptionsChanged)]
#[case(r#"{"event":"playback_state_changed","old_state":"stopped","new_state":"playing"}"#, EventKind::PlaybackStateChanged)]
#[case(r#"{"event":"seeked","time_position":1000}"#, EventKind::Seeked)]
#[case(r#"{"event":"stream_title_changed","title":"Live"}"#, EventKind::StreamTitleChanged)]
#[case(r#"{"event":"track_playback_paused","tl_track":{"tlid":1,"track":{}},"time_position":5}"#, EventKind::TrackPlaybackPaused)]
#[case(r#"{"event":"track_playback_resumed","tl_track":{"tlid":1,"track":{}},"time_position":5}"#, EventKind::TrackPlaybackResumed)]
#[case(r#"{"event":"track_playback_started","tl_track":{"tlid":1,"track":{}}}"#, EventKind::TrackPlaybackStarted)]
#[case(r#"{"event":"tracklist_changed"}"#, EventKind::TracklistChanged)]
#[case(r#"{"event":"volume_changed","volume":55}"#, EventKind::VolumeChanged)]
fn test_every_event_kind_reaches_its_handler(#[case] raw: &str, #[case] kind: EventKind) {
    let hub = EventHub::new();
    let seen: Arc<Mutex<Vec<EventKind>>> = Arc::new(Mutex::new(Vec::new()));
    for subscribed in EventKind::ALL {
        let seen = Arc::clone(&seen);
        hub.subscribe(
            subscribed,
            Arc::new(move |event: &Event| seen.lock().push(event.kind())),
        );
    }

    assert_eq!(hub.deliver_raw(raw).unwrap(), 1);
    assert_eq!(*seen.lock(), vec![kind]);
}
