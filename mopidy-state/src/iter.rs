//! Sync-first change notifications
//!
//! Every mutation that alters what a caller would display emits a
//! [`ChangeEvent`]. Callers drain them through a [`ChangeIterator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use mopidy_state::Speaker;
//!
//! let speaker = Speaker::new("mopidy.local", 6680)?;
//!
//! // Blocking iteration
//! for event in speaker.iter() {
//!     println!("{:?} changed", event.kind);
//! }
//!
//! // Non-blocking check
//! for event in speaker.iter().try_iter() {
//!     println!("{:?} changed", event.kind);
//! }
//! ```

use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

/// Bound of the change channel; notifications beyond it are dropped
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// What part of the speaker changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Availability,
    /// Software version or supported uri schemes
    Capabilities,
    Volume,
    Mute,
    Playback,
    Position,
    CurrentTrack,
    Artwork,
    Queue,
    /// Consume, repeat or shuffle
    Options,
    Sources,
    Snapshot,
}

/// A change notification
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub timestamp: Instant,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind) -> Self {
        Self {
            kind,
            timestamp: Instant::now(),
        }
    }
}

/// Blocking iterator over change events
///
/// All clones share one receiver, so each event is delivered once.
#[derive(Clone)]
pub struct ChangeIterator {
    rx: Arc<Mutex<mpsc::Receiver<ChangeEvent>>>,
}

impl ChangeIterator {
    pub(crate) fn new(rx: Arc<Mutex<mpsc::Receiver<ChangeEvent>>>) -> Self {
        Self { rx }
    }

    /// Block until the next event is available
    ///
    /// Returns `None` if the channel is closed.
    pub fn recv(&self) -> Option<ChangeEvent> {
        self.rx.lock().ok()?.recv().ok()
    }

    /// Block until the next event or timeout expires
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        self.rx.lock().ok()?.recv_timeout(timeout).ok()
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<ChangeEvent> {
        self.rx.lock().ok()?.try_recv().ok()
    }

    /// Iterator over the events already queued
    pub fn try_iter(&self) -> TryIter<'_> {
        TryIter { inner: self }
    }

    /// Wait up to `timeout` for an event of `kind`, discarding others
    pub fn wait_for(&self, kind: ChangeKind, timeout: Duration) -> Option<ChangeEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let event = self.recv_timeout(remaining)?;
            if event.kind == kind {
                return Some(event);
            }
        }
    }
}

impl Iterator for ChangeIterator {
    type Item = ChangeEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

/// Non-blocking iterator over currently available events
pub struct TryIter<'a> {
    inner: &'a ChangeIterator,
}

impl<'a> Iterator for TryIter<'a> {
    type Item = ChangeEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.try_recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn channel() -> (mpsc::SyncSender<ChangeEvent>, ChangeIterator) {
        let (tx, rx) = mpsc::sync_channel(CHANGE_CHANNEL_CAPACITY);
        (tx, ChangeIterator::new(Arc::new(Mutex::new(rx))))
    }

    #[test]
    fn test_try_recv_empty() {
        let (_tx, iter) = channel();
        assert!(iter.try_recv().is_none());
    }

    #[test]
    fn test_try_iter_drains_queued_events() {
        let (tx, iter) = channel();
        tx.send(ChangeEvent::new(ChangeKind::Volume)).unwrap();
        tx.send(ChangeEvent::new(ChangeKind::Mute)).unwrap();

        let kinds: Vec<ChangeKind> = iter.try_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Volume, ChangeKind::Mute]);
    }

    #[test]
    fn test_recv_timeout_expires() {
        let (_tx, iter) = channel();
        let start = Instant::now();
        assert!(iter.recv_timeout(Duration::from_millis(50)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn test_wait_for_skips_other_kinds() {
        let (tx, iter) = channel();
        thread::spawn(move || {
            tx.send(ChangeEvent::new(ChangeKind::Volume)).unwrap();
            thread::sleep(Duration::from_millis(10));
            tx.send(ChangeEvent::new(ChangeKind::Queue)).unwrap();
        });

        let event = iter.wait_for(ChangeKind::Queue, Duration::from_secs(2));
        assert_eq!(event.map(|e| e.kind), Some(ChangeKind::Queue));
    }

    #[test]
    fn test_recv_none_when_closed() {
        let (tx, iter) = channel();
        drop(tx);
        assert!(iter.recv().is_none());
    }
}
