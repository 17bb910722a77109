//! Speaker - main entry point for mopidy-state
//!
//! A [`Speaker`] keeps a local model of one Mopidy server in sync through
//! periodic polls ([`Speaker::update`]) and push events, and exposes the
//! command surface. Commands live in [`crate::commands`].

use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use mopidy_api::{EventHub, EventSource, MopidyClient, RpcTransport};

use crate::config::SpeakerConfig;
use crate::context::SpeakerContext;
use crate::dispatcher::EventDispatcher;
use crate::error::Result;
use crate::iter::{ChangeEvent, ChangeIterator, CHANGE_CHANNEL_CAPACITY};
use crate::model::{CurrentTrack, Feature, Phase, QueueEntry, QueueTrackItem, RepeatMode, Snapshot};
use crate::snapshot::{RestoreHandle, RestoreOutcome, SnapshotManager};

/// A synchronized Mopidy speaker
///
/// # Example
///
/// ```rust,ignore
/// use mopidy_state::{ChangeKind, Speaker};
///
/// let speaker = Speaker::new("mopidy.local", 6680)?;
/// speaker.update();
///
/// println!("Volume: {:?}", speaker.volume());
/// speaker.set_volume(40)?;
///
/// for event in speaker.iter() {
///     if event.kind == ChangeKind::CurrentTrack {
///         println!("Now playing {:?}", speaker.current_track().title);
///     }
/// }
/// ```
pub struct Speaker {
    pub(crate) context: Arc<SpeakerContext>,
    dispatcher: EventDispatcher,
    snapshots: SnapshotManager,
    hub: Option<Arc<EventHub>>,
    changes: Arc<Mutex<mpsc::Receiver<ChangeEvent>>>,
}

impl Speaker {
    /// Connect to `host:port` with default settings
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::builder().host(host).port(port).build()
    }

    pub fn builder() -> SpeakerBuilder {
        SpeakerBuilder::default()
    }

    pub fn config(&self) -> &SpeakerConfig {
        &self.context.config
    }

    /// The built-in event hub, when no custom event source was configured
    ///
    /// Feed messages read from the Mopidy event socket into
    /// [`EventHub::deliver_raw`].
    pub fn event_hub(&self) -> Option<Arc<EventHub>> {
        self.hub.clone()
    }

    /// Iterator over change notifications
    pub fn iter(&self) -> ChangeIterator {
        ChangeIterator::new(Arc::clone(&self.changes))
    }

    /// Run one poll cycle
    ///
    /// An unreachable server clears every derived field and ends the cycle.
    /// A dead event connection is re-created before the remaining refreshes.
    pub fn update(&self) {
        let ctx = &self.context;
        if !ctx.refresh_version() {
            return;
        }

        match self.dispatcher.ensure_connected() {
            Ok(true) => tracing::info!("Event connection to {} restored", ctx.server()),
            Ok(false) => {}
            Err(e) => tracing::warn!("Failed to reconnect events for {}: {}", ctx.server(), e),
        }

        ctx.refresh_uri_schemes();
        ctx.refresh_consume();
        ctx.refresh_sources();
        ctx.refresh_volume();
        ctx.refresh_shuffle();
        ctx.refresh_phase();
        ctx.refresh_repeat();

        ctx.refresh_queue_info();
        ctx.refresh_current_track();
    }

    /// Number of live event subscriptions
    pub fn subscription_count(&self) -> usize {
        self.dispatcher.subscription_count()
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Poll, then capture the current state as the pending snapshot
    pub fn take_snapshot(&self) -> Snapshot {
        self.update();
        self.snapshots.capture()
    }

    /// Restore the pending snapshot, blocking until done
    ///
    /// Fails with a validation error when no snapshot is pending. Playback
    /// that never starts is reported as [`RestoreOutcome::RetriesExhausted`].
    pub fn restore_snapshot(&self) -> Result<RestoreOutcome> {
        self.snapshots.restore()
    }

    /// Restore the pending snapshot on a background thread
    pub fn restore_snapshot_in_background(&self) -> Result<RestoreHandle> {
        self.snapshots.restore_in_background()
    }

    pub fn pending_snapshot(&self) -> Option<Snapshot> {
        self.context.store.read().snapshot.clone()
    }

    pub fn snapshot_taken_at(&self) -> Option<DateTime<Utc>> {
        self.context.store.read().snapshot_taken_at()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn is_available(&self) -> bool {
        self.context.store.read().available
    }

    pub fn software_version(&self) -> Option<String> {
        self.context.store.read().version.clone()
    }

    /// Commands this speaker supports
    pub fn features(&self) -> &'static [Feature] {
        &Feature::ALL
    }

    pub fn supported_uri_schemes(&self) -> Option<Vec<String>> {
        self.context.store.read().uri_schemes.clone()
    }

    pub fn consume_mode(&self) -> Option<bool> {
        self.context.store.read().consume
    }

    /// Playlist names offered as sources
    pub fn source_list(&self) -> Option<Vec<String>> {
        self.context.store.read().sources.clone()
    }

    pub fn volume(&self) -> Option<u8> {
        self.context.store.read().volume
    }

    pub fn is_muted(&self) -> Option<bool> {
        self.context.store.read().muted
    }

    pub fn phase(&self) -> Option<Phase> {
        self.context.store.read().phase
    }

    pub fn repeat_mode(&self) -> Option<RepeatMode> {
        self.context.store.read().repeat
    }

    pub fn is_shuffled(&self) -> Option<bool> {
        self.context.store.read().shuffle
    }

    pub fn current_track(&self) -> CurrentTrack {
        self.context.store.read().queue.current().clone()
    }

    /// Zero-based index of the current entry
    pub fn queue_position(&self) -> Option<usize> {
        self.context.store.read().queue.index()
    }

    pub fn queue_length(&self) -> Option<usize> {
        self.context.store.read().queue.length()
    }

    /// Queue uris in queue order, as of the last reconciliation
    pub fn queue_uris(&self) -> Vec<String> {
        self.context.store.read().queue.uri_list()
    }

    pub fn queue_entry(&self, tlid: mopidy_api::Tlid) -> Option<QueueEntry> {
        self.context.store.read().queue.entry(tlid).cloned()
    }

    /// Ordered queue rows built from a fresh listing
    pub fn queue_tracks_array(&self) -> Vec<QueueTrackItem> {
        self.context.queue_tracks_array()
    }

    /// Elapsed seconds of the current track, extrapolated while playing
    pub fn media_position(&self) -> Option<u64> {
        let store = self.context.store.read();
        store.queue.media_position(store.is_playing(), Utc::now())
    }
}

// ============================================================================
// SpeakerBuilder
// ============================================================================

/// Builder for [`Speaker`]
#[derive(Default)]
pub struct SpeakerBuilder {
    config: SpeakerConfig,
    transport: Option<Arc<dyn RpcTransport>>,
    event_source: Option<Arc<dyn EventSource>>,
}

impl SpeakerBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Replace every setting, including host and port
    pub fn config(mut self, config: SpeakerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    pub fn volume_step(mut self, step: u8) -> Self {
        self.config.volume_step = step;
        self
    }

    /// Pause between playback polls and the poll budget of a restore
    pub fn restore_retry(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.config.restore_retry_interval_ms = interval.as_millis() as u64;
        self.config.restore_retry_max = max_attempts;
        self
    }

    /// Use a custom transport instead of JSON-RPC over HTTP
    pub fn with_transport(mut self, transport: Arc<dyn RpcTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom push event source instead of a fresh [`EventHub`]
    pub fn with_event_source(mut self, source: Arc<dyn EventSource>) -> Self {
        self.event_source = Some(source);
        self
    }

    /// Build the speaker and subscribe to push events
    ///
    /// No remote call is made; call [`Speaker::update`] to populate state.
    pub fn build(self) -> Result<Speaker> {
        self.config.validate()?;

        let client = match self.transport {
            Some(transport) => MopidyClient::with_transport(transport),
            None => MopidyClient::connect(&self.config.host, self.config.port),
        };

        let (hub, source): (Option<Arc<EventHub>>, Arc<dyn EventSource>) = match self.event_source {
            Some(source) => (None, source),
            None => {
                let hub = Arc::new(EventHub::new());
                (Some(Arc::clone(&hub)), hub as Arc<dyn EventSource>)
            }
        };

        let (tx, rx) = mpsc::sync_channel(CHANGE_CHANNEL_CAPACITY);
        let context = SpeakerContext::new(self.config, client, tx);
        let dispatcher = EventDispatcher::start(Arc::clone(&context), source);
        let subscribed = dispatcher.subscribe_all();
        tracing::info!(
            "Speaker for {} ready with {} event subscriptions",
            context.server(),
            subscribed
        );

        Ok(Speaker {
            snapshots: SnapshotManager::new(Arc::clone(&context)),
            context,
            dispatcher,
            hub,
            changes: Arc::new(Mutex::new(rx)),
        })
    }
}
