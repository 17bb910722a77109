//! Push event dispatch
//!
//! The dispatcher registers one handler per [`EventKind`] with the speaker's
//! [`EventSource`]. Handlers only touch local state; anything that needs a
//! remote round trip is queued as a [`RefreshJob`] for a background worker
//! thread, so the delivery thread never waits on the server.

use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use mopidy_api::{Event, EventHandler, EventKind, EventSource, SubscriptionId};
use parking_lot::Mutex;

use crate::context::SpeakerContext;
use crate::error::Result;
use crate::iter::ChangeKind;
use crate::model::Phase;
use crate::store::update;

/// Follow-up work scheduled by an event handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RefreshJob {
    /// Consume, repeat and shuffle flags
    Options,
    /// Current track, its artwork, position and stream title
    CurrentTrack,
    /// Artwork of the given uri (the current uri when `None`)
    Artwork(Option<String>),
    /// Queue index, length and entries
    QueueInfo,
    Shutdown,
}

/// Applies events to the shared state; shared by all registered handlers
struct EventRouter {
    context: Arc<SpeakerContext>,
    jobs: mpsc::Sender<RefreshJob>,
}

impl EventRouter {
    fn schedule(&self, job: RefreshJob) {
        if self.jobs.send(job).is_err() {
            tracing::debug!("Refresh worker stopped, dropping job");
        }
    }

    fn handle(&self, event: &Event) {
        tracing::debug!("Handling {} from {}", event.kind(), self.context.server());
        let ctx = &self.context;

        match event {
            Event::MuteChanged { mute } => {
                ctx.apply(ChangeKind::Mute, |s| update(&mut s.muted, Some(*mute)));
            }
            Event::OptionsChanged => {
                self.schedule(RefreshJob::Options);
            }
            Event::PlaybackStateChanged { new_state, .. } => {
                match Phase::from_remote(new_state) {
                    Some(phase) => ctx.set_phase(phase),
                    None => tracing::warn!("Unknown playback state '{}'", new_state),
                }
                if new_state == "playing" {
                    self.schedule(RefreshJob::CurrentTrack);
                }
            }
            Event::Seeked { time_position } => {
                ctx.apply(ChangeKind::Position, |s| {
                    s.queue.sample_position(*time_position);
                    true
                });
            }
            Event::StreamTitleChanged { title } => {
                ctx.apply(ChangeKind::CurrentTrack, |s| {
                    s.queue.set_stream_title(title);
                    true
                });
                self.schedule(RefreshJob::CurrentTrack);
            }
            Event::TrackPlaybackPaused { .. } => {
                ctx.set_phase(Phase::Paused);
            }
            Event::TrackPlaybackResumed {
                tl_track,
                time_position,
            } => {
                ctx.apply_all(|s| {
                    let mut kinds = vec![ChangeKind::CurrentTrack, ChangeKind::Position];
                    if update(&mut s.phase, Some(Phase::Playing)) {
                        kinds.insert(0, ChangeKind::Playback);
                    }
                    s.queue.set_current(tl_track.tlid, &tl_track.track);
                    s.queue.sample_position(*time_position);
                    kinds
                });
            }
            Event::TrackPlaybackStarted { tl_track } => {
                ctx.apply(ChangeKind::CurrentTrack, |s| {
                    s.queue.set_current(tl_track.tlid, &tl_track.track);
                    true
                });
                self.schedule(RefreshJob::Artwork(tl_track.track.uri.clone()));
                self.schedule(RefreshJob::CurrentTrack);
            }
            Event::TracklistChanged => {
                self.schedule(RefreshJob::QueueInfo);
            }
            Event::VolumeChanged { volume } => {
                let volume = (*volume).min(100);
                ctx.apply(ChangeKind::Volume, |s| update(&mut s.volume, Some(volume)));
            }
        }
    }
}

/// Spawns the refresh worker thread
///
/// The worker runs jobs in order until it receives [`RefreshJob::Shutdown`]
/// or every sender is gone.
fn spawn_refresh_worker(
    context: Arc<SpeakerContext>,
    jobs: mpsc::Receiver<RefreshJob>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        tracing::debug!("Refresh worker started for {}", context.server());

        for job in jobs {
            tracing::trace!("Running {:?}", job);
            match job {
                // One notification per job, changed or not
                RefreshJob::Options => {
                    if !context.refresh_options() {
                        context.emit(ChangeKind::Options);
                    }
                }
                RefreshJob::CurrentTrack => context.refresh_current_track(),
                RefreshJob::Artwork(uri) => context.refresh_artwork(uri),
                RefreshJob::QueueInfo => {
                    if !context.refresh_queue_info() {
                        context.emit(ChangeKind::Queue);
                    }
                }
                RefreshJob::Shutdown => break,
            }
        }

        tracing::debug!("Refresh worker stopped for {}", context.server());
    })
}

/// Owns the speaker's subscriptions and its refresh worker
pub(crate) struct EventDispatcher {
    router: Arc<EventRouter>,
    source: Arc<dyn EventSource>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventDispatcher {
    /// Start the refresh worker; no subscriptions are made yet
    pub(crate) fn start(context: Arc<SpeakerContext>, source: Arc<dyn EventSource>) -> Self {
        let (tx, rx) = mpsc::channel();
        let worker = spawn_refresh_worker(Arc::clone(&context), rx);
        Self {
            router: Arc::new(EventRouter { context, jobs: tx }),
            source,
            subscriptions: Mutex::new(Vec::new()),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Register a handler for every tracked kind, replacing earlier ones
    pub(crate) fn subscribe_all(&self) -> usize {
        self.unsubscribe_all();

        let mut subscriptions = self.subscriptions.lock();
        for kind in EventKind::ALL {
            let router = Arc::clone(&self.router);
            let handler: EventHandler = Arc::new(move |event: &Event| router.handle(event));
            subscriptions.push(self.source.subscribe(kind, handler));
        }
        tracing::debug!("Subscribed to {} event kinds", subscriptions.len());
        subscriptions.len()
    }

    /// Drop every registration, returning how many the source still knew
    pub(crate) fn unsubscribe_all(&self) -> usize {
        let ids: Vec<SubscriptionId> = self.subscriptions.lock().drain(..).collect();
        ids.into_iter()
            .filter(|id| self.source.unsubscribe(*id))
            .count()
    }

    pub(crate) fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Reconnect a dead event connection and subscribe again
    ///
    /// Returns whether a reconnect happened.
    pub(crate) fn ensure_connected(&self) -> Result<bool> {
        if self.source.is_alive() {
            return Ok(false);
        }
        tracing::warn!(
            "Event connection to {} was interrupted, re-creating it",
            self.router.context.server()
        );
        self.source.reconnect()?;
        // Registrations died with the old connection
        self.subscriptions.lock().clear();
        self.subscribe_all();
        Ok(true)
    }

    /// Apply an event directly, bypassing the source
    #[cfg(test)]
    pub(crate) fn handle(&self, event: &Event) {
        self.router.handle(event);
    }

    fn shutdown(&self) {
        self.unsubscribe_all();
        self.router.schedule(RefreshJob::Shutdown);
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::warn!("Refresh worker panicked");
            }
        }
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpeakerConfig;
    use crate::iter::{ChangeEvent, ChangeIterator};
    use mopidy_api::{EventHub, MopidyClient, RpcError, RpcTransport, TlTrack, Track};
    use serde_json::Value;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Transport that refuses every call
    struct Offline;

    impl RpcTransport for Offline {
        fn call(&self, _method: &str, _params: Value) -> std::result::Result<Value, RpcError> {
            Err(RpcError::Network("connection refused".to_string()))
        }
    }

    /// Transport answering with one queued track and repeat on
    struct OneTrack;

    impl RpcTransport for OneTrack {
        fn call(&self, method: &str, _params: Value) -> std::result::Result<Value, RpcError> {
            Ok(match method {
                "core.tracklist.index" => serde_json::json!(0),
                "core.tracklist.get_length" => serde_json::json!(1),
                "core.tracklist.get_tl_tracks" => serde_json::json!([
                    {"tlid": 1, "track": {"uri": "local:track:a", "name": "A"}}
                ]),
                "core.tracklist.get_repeat" => Value::Bool(true),
                _ => Value::Bool(false),
            })
        }
    }

    fn setup() -> (Arc<SpeakerContext>, Arc<EventHub>, EventDispatcher, ChangeIterator) {
        setup_with(Arc::new(Offline))
    }

    fn setup_with(
        transport: Arc<dyn RpcTransport>,
    ) -> (Arc<SpeakerContext>, Arc<EventHub>, EventDispatcher, ChangeIterator) {
        let (tx, rx) = mpsc::sync_channel::<ChangeEvent>(64);
        let client = MopidyClient::with_transport(transport);
        let context = SpeakerContext::new(SpeakerConfig::new("localhost", 6680), client, tx);
        let hub = Arc::new(EventHub::new());
        let dispatcher = EventDispatcher::start(Arc::clone(&context), hub.clone());
        (context, hub, dispatcher, ChangeIterator::new(Arc::new(StdMutex::new(rx))))
    }

    #[test]
    fn test_subscribe_all_registers_every_kind() {
        let (_ctx, hub, dispatcher, _iter) = setup();
        assert_eq!(dispatcher.subscribe_all(), EventKind::ALL.len());
        assert_eq!(hub.handler_count(), EventKind::ALL.len());

        // Subscribing again replaces rather than duplicates
        dispatcher.subscribe_all();
        assert_eq!(hub.handler_count(), EventKind::ALL.len());

        assert_eq!(dispatcher.unsubscribe_all(), EventKind::ALL.len());
        assert_eq!(hub.handler_count(), 0);
    }

    #[test]
    fn test_volume_and_mute_events_update_store() {
        let (ctx, hub, dispatcher, iter) = setup();
        dispatcher.subscribe_all();

        hub.deliver(&Event::VolumeChanged { volume: 120 });
        hub.deliver(&Event::MuteChanged { mute: true });

        let store = ctx.store.read();
        assert_eq!(store.volume, Some(100));
        assert_eq!(store.muted, Some(true));
        drop(store);

        let kinds: Vec<ChangeKind> = iter.try_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Volume, ChangeKind::Mute]);
    }

    #[test]
    fn test_stopped_clears_pointer() {
        let (ctx, _hub, dispatcher, _iter) = setup();
        dispatcher.handle(&Event::TrackPlaybackStarted {
            tl_track: TlTrack::new(7, Track::new("local:track:a", "A")),
        });
        assert_eq!(ctx.store.read().queue.current().tlid, Some(7));

        dispatcher.handle(&Event::PlaybackStateChanged {
            old_state: Some("playing".to_string()),
            new_state: "stopped".to_string(),
        });

        let store = ctx.store.read();
        assert_eq!(store.phase, Some(Phase::Idle));
        assert_eq!(store.queue.current().tlid, None);
    }

    #[test]
    fn test_resumed_sets_track_phase_and_position() {
        let (ctx, _hub, dispatcher, _iter) = setup();
        dispatcher.handle(&Event::TrackPlaybackResumed {
            tl_track: TlTrack::new(3, Track::new("local:track:b", "B")),
            time_position: 61_500,
        });

        let store = ctx.store.read();
        assert_eq!(store.phase, Some(Phase::Playing));
        assert_eq!(store.queue.current().title.as_deref(), Some("B"));
        assert_eq!(store.queue.current().position(), Some(61));
    }

    #[test]
    fn test_tracklist_changed_notifies_after_refresh() {
        let (_ctx, _hub, dispatcher, iter) = setup();
        dispatcher.handle(&Event::TracklistChanged);

        let event = iter.wait_for(ChangeKind::Queue, Duration::from_secs(2));
        assert!(event.is_some());
    }

    #[test]
    fn test_refresh_jobs_notify_once() {
        let (_ctx, _hub, dispatcher, iter) = setup_with(Arc::new(OneTrack));
        dispatcher.handle(&Event::TracklistChanged);
        dispatcher.handle(&Event::OptionsChanged);
        // Nothing left to change the second time
        dispatcher.handle(&Event::TracklistChanged);

        let mut kinds = Vec::new();
        while kinds.iter().filter(|k| **k == ChangeKind::Queue).count() < 2 {
            match iter.recv_timeout(Duration::from_secs(2)) {
                Some(event) => kinds.push(event.kind),
                None => break,
            }
        }
        kinds.extend(iter.try_iter().map(|e| e.kind));
        kinds.retain(|k| matches!(k, ChangeKind::Queue | ChangeKind::Options));

        assert_eq!(kinds, vec![ChangeKind::Queue, ChangeKind::Options, ChangeKind::Queue]);
    }
}
