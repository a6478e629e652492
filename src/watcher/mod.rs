//! Filesystem watcher with debounced batch events. Event coalescing stays exactly as the teacher built it: all
//! events within a debounce window are collected, de-duplicated, sorted
//! lexicographically, and emitted as a single batch, so the final index
//! state is independent of event arrival order. Generalized from the
//! teacher's path-only batches to typed [`FileChange`] values so the
//! indexer can distinguish create/modify/delete without re-`stat`-ing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use ignore::gitignore::Gitignore;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;

use crate::binding::{FileChange, FileChangeType};

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub root_path: PathBuf,
    pub debounce_ms: u64,
    pub gitignore_aware: bool,
    pub extensions: Vec<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        WatcherConfig {
            root_path: PathBuf::from("."),
            debounce_ms: 500,
            gitignore_aware: true,
            extensions: Vec::new(),
        }
    }
}

/// Filesystem watcher that emits debounced batches of [`FileChange`]s.
pub struct FileSystemWatcher {
    _watcher_thread: thread::JoinHandle<()>,
    batch_receiver: Receiver<Vec<FileChange>>,
    shutdown: Arc<AtomicBool>,
}

impl FileSystemWatcher {
    pub fn new(path: PathBuf, config: WatcherConfig, shutdown: Arc<AtomicBool>) -> Result<Self> {
        let (batch_tx, batch_rx) = mpsc::channel();
        let config = WatcherConfig {
            root_path: path.clone(),
            ..config
        };
        let shutdown_for_thread = shutdown.clone();

        let thread = thread::spawn(move || {
            if let Err(e) = run_watcher(path, batch_tx, config, shutdown_for_thread) {
                tracing::error!(error = %e, "filesystem watcher terminated");
            }
        });

        Ok(FileSystemWatcher {
            _watcher_thread: thread,
            batch_receiver: batch_rx,
            shutdown,
        })
    }

    pub fn recv_batch(&self) -> Option<Vec<FileChange>> {
        self.batch_receiver.recv().ok()
    }

    pub fn try_recv_batch(&self) -> Option<Vec<FileChange>> {
        self.batch_receiver.try_recv().ok()
    }

    pub fn recv_batch_timeout(&self, timeout: Duration) -> Result<Option<Vec<FileChange>>> {
        match self.batch_receiver.recv_timeout(timeout) {
            Ok(batch) => Ok(Some(batch)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    pub fn shutdown(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self._watcher_thread.join();
    }
}

fn run_watcher(
    path: PathBuf,
    tx: Sender<Vec<FileChange>>,
    config: WatcherConfig,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let debounce_duration = Duration::from_millis(config.debounce_ms);
    let root_path = config.root_path.clone();

    let gitignore = if config.gitignore_aware {
        let (gi, _) = Gitignore::new(root_path.join(".gitignore"));
        Some(gi)
    } else {
        None
    };
    let extensions = config.extensions.clone();

    let mut debouncer = new_debouncer(
        debounce_duration,
        move |result: notify_debouncer_mini::DebounceEventResult| match result {
            Ok(events) => {
                let changes = classify_events(&events, &root_path, gitignore.as_ref(), &extensions);
                if !changes.is_empty() {
                    let _ = tx.send(changes);
                }
            }
            Err(error) => {
                tracing::error!(?error, "watcher debounce error");
            }
        },
    )?;

    debouncer.watcher().watch(&path, RecursiveMode::Recursive)?;

    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
    }

    Ok(())
}

/// Classify raw debounced events into deduplicated, sorted [`FileChange`]s.
/// `notify-debouncer-mini` only reports "something changed here"; whether
/// that is a create, modify, or delete is decided by stat'ing the path at
/// flush time, not by trusting the notify event kind.
fn classify_events(
    events: &[notify_debouncer_mini::DebouncedEvent],
    root: &Path,
    gitignore: Option<&Gitignore>,
    extensions: &[String],
) -> Vec<FileChange> {
    let mut by_path: BTreeMap<PathBuf, ()> = BTreeMap::new();

    for event in events {
        let path = &event.path;
        if is_internal_file(path) {
            continue;
        }
        if let Some(gi) = gitignore {
            if gi.matched(path, path.is_dir()).is_ignore() {
                continue;
            }
        }
        if !extensions.is_empty() {
            let matches_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.iter().any(|allowed| allowed == e))
                .unwrap_or(false);
            if !matches_ext {
                continue;
            }
        }
        by_path.insert(path.clone(), ());
    }

    by_path
        .into_keys()
        .map(|path| {
            let change_type = if path.exists() {
                FileChangeType::Modify
            } else {
                FileChangeType::Delete
            };
            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            FileChange {
                path: relative,
                change_type,
                previous_path: None,
            }
        })
        .collect()
}

/// Skip paths the indexer itself writes to, avoiding a write-triggers-watch
/// feedback loop (the cache directory and VCS metadata).
fn is_internal_file(path: &Path) -> bool {
    path.components().any(|c| {
        matches!(
            c.as_os_str().to_str(),
            Some(".git") | Some(".scip-cache") | Some("target")
        )
    })
}
