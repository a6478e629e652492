//! Per-package incremental indexer, grounded on the teacher's
//! own `indexer.rs` coordinator: a small synchronous loop wiring watcher
//! events to index mutations, "deterministic update-or-delete regardless of
//! event type" kept verbatim as the live-update policy, generalized from a
//! single sqlitegraph-backed `CodeGraph` to a `ScipIndex` + `Cache` pair and
//! from hard-coded file events to the binding-agnostic [`FileChange`] taxonomy.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::binding::{AnalyzerAdapter, FileChange, FileChangeType};
use crate::cache::Cache;
use crate::diagnostics::watch_diagnostics::DiagnosticStage;
use crate::error::IndexError;
use crate::events::{EventBus, UpdateEvent};
use crate::index::ScipIndex;
use crate::watcher::{FileSystemWatcher, WatcherConfig};

pub struct PackageIndexerOptions {
    pub use_cache: bool,
    pub extensions: Vec<String>,
    pub cache_max_bytes: u64,
}

impl Default for PackageIndexerOptions {
    fn default() -> Self {
        PackageIndexerOptions {
            use_cache: true,
            extensions: Vec::new(),
            cache_max_bytes: 256 * 1024 * 1024,
        }
    }
}

/// Owns a [`ScipIndex`], the file-hash table that drives incremental
/// classification, a [`Cache`], and the binding it delegates file analysis
/// to. Single-writer: all mutating methods take `&mut self`.
pub struct PackageIndexer {
    pub index: ScipIndex,
    file_hashes: HashMap<String, String>,
    cache: Cache,
    binding: Arc<dyn AnalyzerAdapter>,
    events: Arc<EventBus>,
    extensions: Vec<String>,
}

impl PackageIndexer {
    /// The open flow (load cache, discover files, hash, diff, reindex,
    /// persist). `package_root` is both the
    /// index's `project_root` and, for local packages, its `source_root`.
    pub fn open(
        package_root: PathBuf,
        cache_dir: PathBuf,
        binding: Arc<dyn AnalyzerAdapter>,
        events: Arc<EventBus>,
        options: PackageIndexerOptions,
    ) -> Result<Self, IndexError> {
        let start = Instant::now();
        let cache = Cache::new(cache_dir, options.cache_max_bytes);

        let loaded = if options.use_cache {
            cache.load(&package_root, Some(package_root.clone()))
        } else {
            None
        };

        let discovered = discover_files(package_root.as_path(), binding.as_ref(), &options.extensions);
        let mut current_hashes = HashMap::new();
        for path in &discovered {
            if let Some(hash) = hash_file(path) {
                let rel = relative_key(package_root.as_path(), path);
                current_hashes.insert(rel, hash);
            }
        }

        let (mut index, prior_hashes, from_cache) = match loaded {
            Some(loaded) => (loaded.index, loaded.file_hashes, true),
            None => (ScipIndex::new(package_root.clone(), Some(package_root.clone())), HashMap::new(), false),
        };

        let mut added = 0usize;
        let mut changed = 0usize;
        let mut removed = 0usize;

        for removed_path in prior_hashes.keys().filter(|p| !current_hashes.contains_key(*p)) {
            index.remove_document(removed_path);
            removed += 1;
        }

        for (rel_path, hash) in &current_hashes {
            match prior_hashes.get(rel_path) {
                Some(prior_hash) if prior_hash == hash => continue,
                Some(_) => changed += 1,
                None => added += 1,
            }
            let full_path = package_root.join(rel_path);
            apply_document(&mut index, binding.as_ref(), &full_path, rel_path, DiagnosticStage::Parse, &events);
        }

        let mut indexer = PackageIndexer {
            index,
            file_hashes: current_hashes,
            cache,
            binding,
            events,
            extensions: options.extensions,
        };

        indexer.persist_cache()?;

        let stats = indexer.index.stats();
        let event = if !from_cache {
            UpdateEvent::Initial {
                file_count: stats.files,
                symbol_count: stats.symbols,
                from_cache: false,
                duration_ms: start.elapsed().as_millis() as u64,
            }
        } else if added == 0 && changed == 0 && removed == 0 {
            UpdateEvent::Cached {
                file_count: stats.files,
                symbol_count: stats.symbols,
                checked_files: indexer.file_hashes.len(),
            }
        } else {
            UpdateEvent::Incremental {
                added,
                changed,
                removed,
                file_count: stats.files,
                symbol_count: stats.symbols,
            }
        };
        indexer.events.publish(event);

        Ok(indexer)
    }

    fn persist_cache(&self) -> Result<(), IndexError> {
        self.cache.save(&self.index, &self.file_hashes)
    }

    /// Recompute a file's hash and re-index only if it changed (live
    /// update, `create`/`modify`).
    pub fn update_file(&mut self, absolute_path: &Path) -> Result<(), IndexError> {
        let rel = relative_key(self.index.project_root.as_path(), absolute_path);
        let Some(hash) = hash_file(absolute_path) else {
            return Ok(());
        };
        if self.file_hashes.get(&rel) == Some(&hash) {
            return Ok(());
        }
        apply_document(
            &mut self.index,
            self.binding.as_ref(),
            absolute_path,
            &rel,
            DiagnosticStage::Parse,
            &self.events,
        );
        self.file_hashes.insert(rel.clone(), hash);
        let symbol_count = self.index.symbols_in_file(&rel).count();
        self.events.publish(UpdateEvent::FileUpdated { path: PathBuf::from(&rel), symbol_count });
        self.persist_cache()
    }

    /// Drop a file's entries entirely (live update, `delete`).
    pub fn remove_file(&mut self, absolute_path: &Path) -> Result<(), IndexError> {
        let rel = relative_key(self.index.project_root.as_path(), absolute_path);
        self.index.remove_document(&rel);
        self.file_hashes.remove(&rel);
        self.events.publish(UpdateEvent::FileRemoved { path: PathBuf::from(&rel) });
        self.persist_cache()
    }

    /// Apply one watcher- or binding-sourced change: `delete` →
    /// remove, `create`/`modify` → update, `move(src→dst)` → remove src then
    /// update dst.
    pub fn apply_change(&mut self, change: FileChange) -> Result<(), IndexError> {
        let path_str = change.path.to_string_lossy();
        if crate::validation::has_suspicious_traversal(&path_str) {
            self.events.publish(UpdateEvent::Error {
                message: "rejected path with suspicious traversal pattern".to_string(),
                path: Some(change.path),
                stage: Some(DiagnosticStage::Other),
            });
            return Ok(());
        }
        let absolute = self.index.project_root.join(&change.path);
        match change.change_type {
            FileChangeType::Delete => self.remove_file(&absolute),
            FileChangeType::Create | FileChangeType::Modify => self.update_file(&absolute),
            FileChangeType::Move => {
                if let Some(prev) = &change.previous_path {
                    self.remove_file(&self.index.project_root.join(prev))?;
                }
                self.update_file(&absolute)
            }
        }
    }

    /// Blocking live-update loop driven by an internal filesystem watcher.
    /// Returns when the watcher's channel disconnects (i.e. after
    /// `shutdown`).
    pub fn run_watch_loop(&mut self, watcher: &FileSystemWatcher) {
        while let Some(changes) = watcher.recv_batch() {
            for change in changes {
                if let Err(e) = self.apply_change(change.clone()) {
                    self.events.publish(UpdateEvent::Error {
                        message: e.to_string(),
                        path: Some(change.path),
                        stage: Some(DiagnosticStage::Other),
                    });
                }
            }
        }
    }

    /// Drain an externally-injected change stream instead of the internal
    /// watcher.
    pub fn apply_external_changes(&mut self, changes: impl Iterator<Item = FileChange>) {
        for change in changes {
            if let Err(e) = self.apply_change(change.clone()) {
                self.events.publish(UpdateEvent::Error {
                    message: e.to_string(),
                    path: Some(change.path),
                    stage: Some(DiagnosticStage::Other),
                });
            }
        }
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            root_path: self.index.project_root.clone(),
            debounce_ms: 500,
            gitignore_aware: true,
            extensions: self.extensions.clone(),
        }
    }

    pub fn dispose(&mut self) {
        let _ = self.persist_cache();
    }
}

fn apply_document(
    index: &mut ScipIndex,
    binding: &dyn AnalyzerAdapter,
    absolute_path: &Path,
    rel_path: &str,
    stage: DiagnosticStage,
    events: &EventBus,
) {
    match binding.get_resolved_unit(absolute_path) {
        Ok(Some(doc)) => index.update_document(doc),
        Ok(None) => {}
        Err(e) => events.publish(UpdateEvent::Error {
            message: e.to_string(),
            path: Some(PathBuf::from(rel_path)),
            stage: Some(stage),
        }),
    }
}

/// File discovery: delegate to the binding's
/// `list_files` when provided, else a recursive walk filtered to the
/// allowed extensions, excluding any path whose first relative segment
/// starts with `.` or equals `build`.
fn discover_files(root: &Path, binding: &dyn AnalyzerAdapter, extensions: &[String]) -> Vec<PathBuf> {
    if let Some(files) = binding.list_files() {
        return files.into_iter().map(|p| if p.is_absolute() { p } else { root.join(p) }).collect();
    }

    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let first_segment = rel.components().next().and_then(|c| c.as_os_str().to_str()).unwrap_or("");
        if first_segment.starts_with('.') || first_segment == "build" {
            continue;
        }
        if !extensions.is_empty() {
            let matches = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.iter().any(|allowed| allowed == e))
                .unwrap_or(false);
            if !matches {
                continue;
            }
        }
        out.push(entry.path().to_path_buf());
    }
    out
}

fn hash_file(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Some(hex::encode(hasher.finalize()))
}

fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).to_string_lossy().replace('\\', "/")
}

/// Run the indexer's watch loop for a bounded number of live changes, used
/// by tests and bounded batch-mode callers. Returns the number of changes
/// processed.
pub fn run_watch_n(indexer: &mut PackageIndexer, watcher: &FileSystemWatcher, max_changes: usize) -> usize {
    let mut processed = 0;
    let idle_timeout = Duration::from_secs(2);
    let idle_step = Duration::from_millis(10);
    let mut idle_for = Duration::from_secs(0);

    while processed < max_changes {
        if let Some(changes) = watcher.try_recv_batch() {
            for change in changes {
                let _ = indexer.apply_change(change);
                processed += 1;
            }
            idle_for = Duration::from_secs(0);
            continue;
        }
        if idle_for >= idle_timeout {
            break;
        }
        std::thread::sleep(idle_step);
        idle_for += idle_step;
    }
    processed
}
