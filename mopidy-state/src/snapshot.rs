//! Snapshot capture and restore
//!
//! A capture records what is needed to put the speaker back later: queue
//! uris, index, volume, mute, repeat, shuffle, phase and elapsed position.
//! Restoring replays that state and, when the speaker was playing or paused,
//! waits for playback to start by polling the playback state a bounded number
//! of times. The store lock is never held while sleeping between polls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::Utc;

use crate::context::SpeakerContext;
use crate::error::{Result, StateError};
use crate::iter::ChangeKind;
use crate::model::{Phase, Snapshot};
use crate::store::update;

/// How a restore ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Everything was replayed
    Completed,
    /// Playback never started within the retry budget; the snapshot is gone
    RetriesExhausted,
    /// [`RestoreHandle::cancel`] was called while waiting for playback
    Cancelled,
}

/// A restore running on its own thread
pub struct RestoreHandle {
    cancel: Arc<AtomicBool>,
    thread: JoinHandle<Result<RestoreOutcome>>,
}

impl RestoreHandle {
    /// Ask the restore to stop before its next playback state poll
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the restore to end
    pub fn join(self) -> Result<RestoreOutcome> {
        match self.thread.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

#[derive(Clone)]
pub(crate) struct SnapshotManager {
    context: Arc<SpeakerContext>,
}

impl SnapshotManager {
    pub(crate) fn new(context: Arc<SpeakerContext>) -> Self {
        Self { context }
    }

    /// Record the current state, replacing any unrestored snapshot
    ///
    /// Callers refresh the store first so the capture is current.
    pub(crate) fn capture(&self) -> Snapshot {
        let now = Utc::now();
        let snapshot = {
            let mut store = self.context.store.write();
            let snapshot = Snapshot {
                uris: store.queue.uri_list(),
                queue_index: store.queue.index(),
                volume: store.volume,
                muted: store.muted,
                repeat: store.repeat,
                shuffle: store.shuffle,
                phase: store.phase,
                position: store.queue.media_position(store.is_playing(), now),
                captured_at: now,
            };
            if store.snapshot.replace(snapshot.clone()).is_some() {
                tracing::debug!("Overwriting unrestored snapshot");
            }
            snapshot
        };
        self.context.emit(ChangeKind::Snapshot);
        tracing::info!(
            "Captured snapshot of {} with {} queued tracks",
            self.context.server(),
            snapshot.uris.len()
        );
        snapshot
    }

    /// Restore the pending snapshot on the calling thread
    pub(crate) fn restore(&self) -> Result<RestoreOutcome> {
        let snapshot = self.take()?;
        self.run(snapshot, &AtomicBool::new(false))
    }

    /// Restore the pending snapshot on a new thread
    ///
    /// Fails immediately when no snapshot is pending.
    pub(crate) fn restore_in_background(&self) -> Result<RestoreHandle> {
        let snapshot = self.take()?;
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let manager = self.clone();
        let thread = thread::spawn(move || manager.run(snapshot, &flag));
        Ok(RestoreHandle { cancel, thread })
    }

    fn take(&self) -> Result<Snapshot> {
        let snapshot = self.context.store.write().snapshot.take();
        match snapshot {
            Some(snapshot) => {
                self.context.emit(ChangeKind::Snapshot);
                Ok(snapshot)
            }
            None => {
                tracing::error!(
                    "Cannot restore snapshot: no snapshot available for {}",
                    self.context.server()
                );
                Err(StateError::validation("No snapshot available to restore"))
            }
        }
    }

    /// Replay `snapshot`; a connectivity failure hands it back to the store
    /// unless a newer capture took its place
    fn run(&self, snapshot: Snapshot, cancel: &AtomicBool) -> Result<RestoreOutcome> {
        match self.replay(&snapshot, cancel) {
            Err(err) if err.is_connectivity() => {
                let returned = {
                    let mut store = self.context.store.write();
                    if store.snapshot.is_none() {
                        store.snapshot = Some(snapshot);
                        true
                    } else {
                        false
                    }
                };
                if returned {
                    self.context.emit(ChangeKind::Snapshot);
                }
                Err(err)
            }
            result => result,
        }
    }

    fn replay(&self, snapshot: &Snapshot, cancel: &AtomicBool) -> Result<RestoreOutcome> {
        let ctx = &self.context;
        let client = &ctx.client;

        ctx.command("stop playback", client.stop())?;
        ctx.command("clear queue", client.clear())?;
        if !snapshot.uris.is_empty() {
            ctx.command("queue tracks", client.add(&snapshot.uris, None))?;
        }
        ctx.refresh_tracks();

        if let Some(volume) = snapshot.volume {
            ctx.command("set volume", client.set_volume(volume))?;
            ctx.apply(ChangeKind::Volume, |s| update(&mut s.volume, Some(volume)));
        }
        if let Some(muted) = snapshot.muted {
            ctx.command("set mute", client.set_mute(muted))?;
            ctx.apply(ChangeKind::Mute, |s| update(&mut s.muted, Some(muted)));
        }
        if let Some(mode) = snapshot.repeat {
            let (repeat, single) = mode.to_flags();
            ctx.command("set repeat mode", client.set_repeat(repeat))?;
            ctx.command("set single mode", client.set_single(single))?;
            ctx.apply(ChangeKind::Options, |s| update(&mut s.repeat, Some(mode)));
        }
        if let Some(shuffle) = snapshot.shuffle {
            ctx.command("set shuffle mode", client.set_random(shuffle))?;
            ctx.apply(ChangeKind::Options, |s| update(&mut s.shuffle, Some(shuffle)));
        }

        if !snapshot.resumes_playback() {
            tracing::info!("Restored snapshot of {}", ctx.server());
            return Ok(RestoreOutcome::Completed);
        }

        let listing = ctx.command("get queue tracks", client.get_tl_tracks())?;
        let index = snapshot.queue_index.unwrap_or(0);
        let tlid = listing.get(index).map(|t| t.tlid);
        if tlid.is_none() {
            tracing::warn!("Queue index {} missing after restore, playing from the start", index);
        }
        ctx.command("start playback", client.play(tlid))?;

        if let Some(outcome) = self.wait_for_playback(cancel)? {
            return Ok(outcome);
        }

        if let Some(position) = snapshot.position.filter(|p| *p > 0) {
            ctx.command("seek", client.seek(position.saturating_mul(1000)))?;
        }
        if snapshot.phase == Some(Phase::Paused) {
            ctx.command("pause playback", client.pause())?;
        }
        ctx.refresh_queue_info();

        tracing::info!("Restored snapshot of {}", ctx.server());
        Ok(RestoreOutcome::Completed)
    }

    /// Poll until the player reports playing or paused
    ///
    /// Returns `None` once playback started, otherwise the terminal outcome.
    fn wait_for_playback(&self, cancel: &AtomicBool) -> Result<Option<RestoreOutcome>> {
        let ctx = &self.context;
        let max = ctx.config.restore_retry_max;
        let interval = ctx.config.restore_retry_interval();
        let mut attempts = 0;

        loop {
            if cancel.load(Ordering::SeqCst) {
                tracing::info!("Snapshot restore of {} cancelled", ctx.server());
                return Ok(Some(RestoreOutcome::Cancelled));
            }

            let state = ctx.command("get playback state", ctx.client.get_state())?;
            if let Some(phase) = Phase::from_remote(&state).filter(Phase::is_active) {
                ctx.set_phase(phase);
                return Ok(None);
            }

            if attempts >= max {
                tracing::error!(
                    "Media player is not playing after {} retries, restoring the snapshot failed for {}",
                    max,
                    ctx.server()
                );
                return Ok(Some(RestoreOutcome::RetriesExhausted));
            }
            attempts += 1;
            thread::sleep(interval);
        }
    }
}
