//! The update-event stream a consumer subscribes to after `open`.
//! Fan-out is a broadcast-by-cloning over
//! `crossbeam_channel`, matching the teacher's own channel-per-subscriber
//! fan-out in `watcher/mod.rs`; `SkipReason`/`DiagnosticStage` are reused
//! from [`crate::diagnostics::watch_diagnostics`] rather than redefined,
//! since they already model exactly the skip/error taxonomy needed.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::diagnostics::watch_diagnostics::{DiagnosticStage, SkipReason};

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    /// Emitted once, synchronously, right after `open` returns on a fresh
    /// (non-cached) build.
    Initial {
        file_count: usize,
        symbol_count: usize,
        from_cache: bool,
        duration_ms: u64,
    },
    /// A fresh-from-cache open where every file hash still matched.
    Cached {
        file_count: usize,
        symbol_count: usize,
        checked_files: usize,
    },
    /// An open that found file-level drift against a loaded cache.
    Incremental {
        added: usize,
        changed: usize,
        removed: usize,
        file_count: usize,
        symbol_count: usize,
    },
    /// A single file's index entries were refreshed after a watch event.
    FileUpdated { path: PathBuf, symbol_count: usize },
    /// A file disappeared and its index entries were dropped.
    FileRemoved { path: PathBuf },
    /// A file was skipped rather than indexed.
    Skipped { path: PathBuf, reason: SkipReason },
    /// A file failed to index; its previous entries (if any) are kept.
    Error {
        message: String,
        path: Option<PathBuf>,
        stage: Option<DiagnosticStage>,
    },
}

/// Fan-out broadcaster: one [`Sender`] per subscriber. A full/disconnected
/// subscriber channel is dropped rather than allowed to block the indexer
/// — the writer must never block on a slow reader.
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<UpdateEvent>>>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        EventBus {
            subscribers: Mutex::new(Vec::new()),
            capacity,
        }
    }

    pub fn subscribe(&self) -> Receiver<UpdateEvent> {
        let (tx, rx) = crossbeam_channel::bounded(self.capacity);
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Send to every live subscriber, dropping any whose channel is full or
    /// disconnected and logging a backpressure warning for the former.
    pub fn publish(&self, event: UpdateEvent) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("update-event subscriber lagging, dropping channel");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new(256)
    }
}

/// Blocking helper for consumers that want a single next event with a
/// timeout, rather than integrating the raw `Receiver` into their own loop.
pub fn recv_timeout(rx: &Receiver<UpdateEvent>, timeout: Duration) -> Option<UpdateEvent> {
    rx.recv_timeout(timeout).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_receives_published_event() {
        let bus = EventBus::new(8);
        let rx = bus.subscribe();
        bus.publish(UpdateEvent::Initial {
            file_count: 1,
            symbol_count: 3,
            from_cache: false,
            duration_ms: 12,
        });
        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(
            event,
            UpdateEvent::Initial {
                file_count: 1,
                symbol_count: 3,
                from_cache: false,
                duration_ms: 12,
            }
        );
    }

    #[test]
    fn full_subscriber_channel_is_dropped_not_blocked() {
        let bus = EventBus::new(1);
        let _rx = bus.subscribe();
        bus.publish(UpdateEvent::FileUpdated {
            path: "a.rs".into(),
            symbol_count: 1,
        });
        bus.publish(UpdateEvent::FileUpdated {
            path: "b.rs".into(),
            symbol_count: 1,
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn multiple_subscribers_each_get_their_own_copy() {
        let bus = EventBus::new(8);
        let rx1 = bus.subscribe();
        let rx2 = bus.subscribe();
        bus.publish(UpdateEvent::FileRemoved { path: "gone.rs".into() });
        assert!(rx1.recv_timeout(Duration::from_secs(1)).is_ok());
        assert!(rx2.recv_timeout(Duration::from_secs(1)).is_ok());
    }
}
