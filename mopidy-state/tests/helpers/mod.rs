//! Test helpers: an in-memory Mopidy core behind the `RpcTransport` seam
//!
//! `FakeMopidy` keeps a tracklist, mixer, options, playlists and history and
//! answers the JSON-RPC methods `MopidyClient` sends, so speaker tests run
//! without a server.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mopidy_api::{Playlist, Ref, RefType, RpcError, RpcTransport, TlTrack, Tlid, Track};
use mopidy_state::Speaker;
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Mutable server state; tests poke at it through [`FakeMopidy::with_state`]
#[derive(Debug)]
pub struct FakeState {
    pub tracklist: Vec<TlTrack>,
    pub next_tlid: Tlid,
    pub current: Option<Tlid>,
    pub state: String,
    pub time_position: u64,
    pub stream_title: Option<String>,
    pub volume: Option<u8>,
    pub mute: Option<bool>,
    pub consume: bool,
    pub repeat: bool,
    pub single: bool,
    pub random: bool,
    /// Known library tracks by uri
    pub library: HashMap<String, Track>,
    /// Children returned by `library.browse`
    pub directories: HashMap<String, Vec<Ref>>,
    /// Tracks returned by every search
    pub search_results: Vec<Track>,
    pub images: HashMap<String, String>,
    pub playlists: Vec<Playlist>,
    pub playlists_supported: bool,
    /// `(timestamp_ms, ref)`, most recent first
    pub history: Vec<(i64, Ref)>,
    /// Every call fails with a network error
    pub offline: bool,
    /// Calls to these methods fail with the given error
    pub failing: HashMap<String, RpcError>,
    /// `play` is accepted but the state never leaves `stopped`
    pub stuck: bool,
    pub calls: Vec<(String, Value)>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            tracklist: Vec::new(),
            next_tlid: 1,
            current: None,
            state: "stopped".to_string(),
            time_position: 0,
            stream_title: None,
            volume: Some(50),
            mute: Some(false),
            consume: false,
            repeat: false,
            single: false,
            random: false,
            library: HashMap::new(),
            directories: HashMap::new(),
            search_results: Vec::new(),
            images: HashMap::new(),
            playlists: Vec::new(),
            playlists_supported: true,
            history: Vec::new(),
            offline: false,
            failing: HashMap::new(),
            stuck: false,
            calls: Vec::new(),
        }
    }
}

impl FakeState {
    fn track_for(&self, uri: &str) -> Track {
        self.library.get(uri).cloned().unwrap_or_else(|| Track {
            uri: Some(uri.to_string()),
            ..Default::default()
        })
    }

    fn current_index(&self) -> Option<usize> {
        let current = self.current?;
        self.tracklist.iter().position(|t| t.tlid == current)
    }

    fn current_tl_track(&self) -> Option<&TlTrack> {
        let current = self.current?;
        self.tracklist.iter().find(|t| t.tlid == current)
    }

    /// Queue `uris` at `at_position` (appended when `None`)
    pub fn add(&mut self, uris: &[&str], at_position: Option<usize>) -> Vec<TlTrack> {
        let mut position = at_position
            .unwrap_or(self.tracklist.len())
            .min(self.tracklist.len());
        let mut added = Vec::new();
        for uri in uris {
            let tl_track = TlTrack::new(self.next_tlid, self.track_for(uri));
            self.next_tlid += 1;
            self.tracklist.insert(position, tl_track.clone());
            position += 1;
            added.push(tl_track);
        }
        added
    }

    pub fn queue_uris(&self) -> Vec<String> {
        self.tracklist
            .iter()
            .filter_map(|t| t.track.uri.clone())
            .collect()
    }

    fn play(&mut self, tlid: Option<Tlid>) {
        match tlid {
            Some(tlid) if self.tracklist.iter().any(|t| t.tlid == tlid) => self.current = Some(tlid),
            Some(_) => return,
            None if self.current.is_none() => {
                self.current = self.tracklist.first().map(|t| t.tlid);
            }
            None => {}
        }
        if self.current.is_none() {
            return;
        }
        self.time_position = 0;
        if !self.stuck {
            self.state = "playing".to_string();
        }
    }

    fn step(&mut self, forward: bool) {
        let index = match self.current_index() {
            Some(index) => index,
            None => return,
        };
        let target = if forward {
            index + 1
        } else {
            index.saturating_sub(1)
        };
        if let Some(tl_track) = self.tracklist.get(target) {
            self.current = Some(tl_track.tlid);
            self.time_position = 0;
        }
    }

    fn playlist_ref(playlist: &Playlist) -> Ref {
        Ref {
            uri: playlist.uri.clone().unwrap_or_default(),
            name: playlist.name.clone(),
            kind: RefType::Playlist,
        }
    }

    fn handle(&mut self, method: &str, params: &Value) -> Result<Value, RpcError> {
        let value = match method {
            "core.get_version" => json!("3.4.2"),
            "core.get_uri_schemes" => json!(["file", "local", "m3u"]),

            "core.tracklist.add" => {
                let uris: Vec<String> = serde_json::from_value(params["uris"].clone()).unwrap_or_default();
                let uris: Vec<&str> = uris.iter().map(String::as_str).collect();
                let at = params["at_position"].as_u64().map(|p| p as usize);
                json!(self.add(&uris, at))
            }
            "core.tracklist.remove" => {
                let tlids: Vec<Tlid> =
                    serde_json::from_value(params["criteria"]["tlid"].clone()).unwrap_or_default();
                let (removed, kept): (Vec<TlTrack>, Vec<TlTrack>) = self
                    .tracklist
                    .drain(..)
                    .partition(|t| tlids.contains(&t.tlid));
                self.tracklist = kept;
                if self.current.map_or(false, |c| tlids.contains(&c)) {
                    self.current = None;
                    self.state = "stopped".to_string();
                }
                json!(removed)
            }
            "core.tracklist.move" => {
                let start = params["start"].as_u64().unwrap_or(0) as usize;
                let end = params["end"].as_u64().unwrap_or(0) as usize;
                let to = params["to_position"].as_u64().unwrap_or(0) as usize;
                if start < end && end <= self.tracklist.len() {
                    let moved: Vec<TlTrack> = self.tracklist.drain(start..end).collect();
                    let to = to.min(self.tracklist.len());
                    for (offset, tl_track) in moved.into_iter().enumerate() {
                        self.tracklist.insert(to + offset, tl_track);
                    }
                }
                Value::Null
            }
            "core.tracklist.clear" => {
                self.tracklist.clear();
                self.current = None;
                Value::Null
            }
            "core.tracklist.index" => json!(self.current_index()),
            "core.tracklist.get_length" => json!(self.tracklist.len()),
            "core.tracklist.get_tl_tracks" => json!(self.tracklist),
            "core.tracklist.get_consume" => json!(self.consume),
            "core.tracklist.set_consume" => {
                self.consume = params["value"].as_bool().unwrap_or(false);
                Value::Null
            }
            "core.tracklist.get_repeat" => json!(self.repeat),
            "core.tracklist.set_repeat" => {
                self.repeat = params["value"].as_bool().unwrap_or(false);
                Value::Null
            }
            "core.tracklist.get_single" => json!(self.single),
            "core.tracklist.set_single" => {
                self.single = params["value"].as_bool().unwrap_or(false);
                Value::Null
            }
            "core.tracklist.get_random" => json!(self.random),
            "core.tracklist.set_random" => {
                self.random = params["value"].as_bool().unwrap_or(false);
                Value::Null
            }

            "core.playback.play" => {
                self.play(params["tlid"].as_u64());
                Value::Null
            }
            "core.playback.pause" => {
                if self.state == "playing" {
                    self.state = "paused".to_string();
                }
                Value::Null
            }
            "core.playback.resume" => {
                if self.state == "paused" {
                    self.state = "playing".to_string();
                }
                Value::Null
            }
            "core.playback.stop" => {
                self.state = "stopped".to_string();
                self.time_position = 0;
                Value::Null
            }
            "core.playback.next" => {
                self.step(true);
                Value::Null
            }
            "core.playback.previous" => {
                self.step(false);
                Value::Null
            }
            "core.playback.seek" => {
                self.time_position = params["time_position"].as_u64().unwrap_or(0);
                json!(true)
            }
            "core.playback.get_state" => json!(self.state),
            "core.playback.get_time_position" => json!(self.time_position),
            "core.playback.get_stream_title" => json!(self.stream_title),
            "core.playback.get_current_tl_track" => json!(self.current_tl_track()),

            "core.mixer.get_volume" => json!(self.volume),
            "core.mixer.set_volume" => {
                self.volume = params["volume"].as_u64().map(|v| v as u8);
                json!(true)
            }
            "core.mixer.get_mute" => json!(self.mute),
            "core.mixer.set_mute" => {
                self.mute = params["mute"].as_bool();
                json!(true)
            }

            "core.library.browse" => {
                let uri = params["uri"].as_str().unwrap_or_default();
                json!(self.directories.get(uri).cloned().unwrap_or_default())
            }
            "core.library.search" => {
                json!([{ "uri": "local:search", "tracks": self.search_results }])
            }
            "core.library.lookup" => {
                let uris: Vec<String> = serde_json::from_value(params["uris"].clone()).unwrap_or_default();
                let found: HashMap<String, Vec<Track>> = uris
                    .into_iter()
                    .filter_map(|uri| self.library.get(&uri).map(|t| (uri, vec![t.clone()])))
                    .collect();
                json!(found)
            }
            "core.library.get_images" => {
                let uris: Vec<String> = serde_json::from_value(params["uris"].clone()).unwrap_or_default();
                let found: HashMap<String, Value> = uris
                    .into_iter()
                    .filter_map(|uri| {
                        self.images
                            .get(&uri)
                            .map(|image| (uri, json!([{ "uri": image }])))
                    })
                    .collect();
                json!(found)
            }

            method if method.starts_with("core.playlists.") && !self.playlists_supported => {
                return Err(RpcError::Fault {
                    code: RpcError::METHOD_NOT_FOUND,
                    message: format!("Method not found: {}", method),
                });
            }
            "core.playlists.as_list" => {
                let refs: Vec<Ref> = self.playlists.iter().map(Self::playlist_ref).collect();
                json!(refs)
            }
            "core.playlists.lookup" => {
                let uri = params["uri"].as_str().unwrap_or_default();
                let found = self.playlists.iter().find(|p| p.uri.as_deref() == Some(uri));
                json!(found)
            }
            "core.playlists.create" => {
                let name = params["name"].as_str().unwrap_or_default().to_string();
                let playlist = Playlist {
                    uri: Some(format!("m3u:{}.m3u8", name)),
                    name: Some(name),
                    tracks: Vec::new(),
                    last_modified: None,
                };
                self.playlists.push(playlist.clone());
                json!(playlist)
            }
            "core.playlists.save" => {
                let playlist: Playlist =
                    serde_json::from_value(params["playlist"].clone()).map_err(|e| RpcError::Parse(e.to_string()))?;
                self.playlists.retain(|p| p.uri != playlist.uri);
                self.playlists.push(playlist.clone());
                json!(playlist)
            }
            "core.playlists.delete" => {
                let uri = params["uri"].as_str().unwrap_or_default();
                let before = self.playlists.len();
                self.playlists.retain(|p| p.uri.as_deref() != Some(uri));
                json!(self.playlists.len() != before)
            }
            "core.playlists.refresh" => Value::Null,

            "core.history.get_history" => json!(self.history),

            method => {
                return Err(RpcError::Fault {
                    code: RpcError::METHOD_NOT_FOUND,
                    message: format!("Method not found: {}", method),
                })
            }
        };
        Ok(value)
    }
}

/// Runs once, before the call it was registered for is answered
pub type CallHook = Box<dyn FnOnce() + Send>;

/// In-memory Mopidy core
#[derive(Default)]
pub struct FakeMopidy {
    state: Mutex<FakeState>,
    hooks: Mutex<HashMap<String, CallHook>>,
}

impl std::fmt::Debug for FakeMopidy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeMopidy")
            .field("state", &self.state)
            .field("hooks", &self.hooks.lock().len())
            .finish()
    }
}

impl FakeMopidy {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A server whose library knows `uris`, each titled by its last segment
    pub fn with_library(uris: &[&str]) -> Arc<Self> {
        let fake = Self::new();
        fake.with_state(|s| {
            for uri in uris {
                s.library.insert(uri.to_string(), library_track(uri));
            }
        });
        fake
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn set_offline(&self, offline: bool) {
        self.with_state(|s| s.offline = offline);
    }

    /// Make every call to `method` fail with `error`
    pub fn fail(&self, method: &str, error: RpcError) {
        self.with_state(|s| s.failing.insert(method.to_string(), error));
    }

    /// Run `hook` the next time `method` is called, while no lock is held
    ///
    /// The hook may call back into the fake or deliver events to a speaker.
    pub fn on_next_call(&self, method: &str, hook: impl FnOnce() + Send + 'static) {
        self.hooks.lock().insert(method.to_string(), Box::new(hook));
    }

    /// Names of the methods called so far, in order
    pub fn methods(&self) -> Vec<String> {
        self.with_state(|s| s.calls.iter().map(|(m, _)| m.clone()).collect())
    }

    /// Parameters of every call to `method`
    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter(|(m, _)| m == method)
                .map(|(_, p)| p.clone())
                .collect()
        })
    }

    pub fn reset_calls(&self) {
        self.with_state(|s| s.calls.clear());
    }

    pub fn queue_uris(&self) -> Vec<String> {
        self.with_state(|s| s.queue_uris())
    }
}

impl RpcTransport for FakeMopidy {
    fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let hook = self.hooks.lock().remove(method);
        if let Some(hook) = hook {
            hook();
        }

        let mut state = self.state.lock();
        state.calls.push((method.to_string(), params.clone()));
        if state.offline {
            return Err(RpcError::Network("connection refused".to_string()));
        }
        if let Some(error) = state.failing.get(method) {
            return Err(error.clone());
        }
        state.handle(method, &params)
    }
}

/// A library track titled by the last segment of its uri
pub fn library_track(uri: &str) -> Track {
    let name = uri.rsplit(':').next().unwrap_or(uri);
    Track::new(uri, name)
}

/// Speaker wired to `fake` with a fast restore retry budget
pub fn speaker_for(fake: &Arc<FakeMopidy>) -> Speaker {
    Speaker::builder()
        .host("mopidy.test")
        .with_transport(fake.clone())
        .restore_retry(Duration::from_millis(5), 3)
        .build()
        .expect("speaker builds")
}

/// Speaker with `uris` queued on the server and one poll applied
pub fn speaker_with_queue(uris: &[&str]) -> (Arc<FakeMopidy>, Speaker) {
    let fake = FakeMopidy::with_library(uris);
    fake.with_state(|s| {
        s.add(uris, None);
    });
    let speaker = speaker_for(&fake);
    speaker.update();
    fake.reset_calls();
    (fake, speaker)
}
