//! End-to-end `PackageIndexer` tests driven through a local
//! `AnalyzerAdapter`, in the teacher's `tests/indexer_tests.rs` style
//! (real `TempDir`, no mocking of the index or cache layers).
//!
//! `scip_index::binding::test_support::TestBinding` is `#[cfg(test)]`-gated
//! inside the library crate and therefore unreachable from an external
//! integration test binary, so this file defines its own minimal binding.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use scip_index::{
    AnalyzerAdapter, Document, EventBus, FileChange, FileChangeType, IndexError, OccurrenceInfo, PackageIndexer,
    PackageIndexerOptions, Range, SymbolInfo, SymbolKind, UpdateEvent,
};

struct FakeBinding {
    documents: Mutex<HashMap<PathBuf, Document>>,
    root: PathBuf,
}

impl FakeBinding {
    fn new(root: impl Into<PathBuf>) -> Self {
        FakeBinding { documents: Mutex::new(HashMap::new()), root: root.into() }
    }

    fn set_document(&self, path: impl Into<PathBuf>, doc: Document) {
        self.documents.lock().unwrap().insert(path.into(), doc);
    }
}

impl AnalyzerAdapter for FakeBinding {
    fn project_root(&self) -> &Path {
        &self.root
    }

    fn get_resolved_unit(&self, path: &Path) -> Result<Option<Document>, IndexError> {
        Ok(self.documents.lock().unwrap().get(path).cloned())
    }

    fn list_files(&self) -> Option<Vec<PathBuf>> {
        Some(self.documents.lock().unwrap().keys().cloned().collect())
    }
}

fn class_doc(path: &str, name: &str) -> Document {
    let id: scip_index::SymbolId = format!("pkg {path}/{name}#").into();
    Document {
        relative_path: path.to_string(),
        language: "dart".to_string(),
        symbols: vec![SymbolInfo {
            id: id.clone(),
            kind: SymbolKind::Class,
            display_name: Some(name.to_string()),
            documentation: vec![],
            relationships: vec![],
            file: Some(path.to_string()),
            language: Some("dart".to_string()),
        }],
        occurrences: vec![OccurrenceInfo {
            file: path.to_string(),
            symbol: id,
            range: Range { start_line: 0, start_col: 0, end_line: 0, end_col: name.len() as i32 },
            is_definition: true,
            enclosing_end_line: Some(3),
        }],
    }
}

#[test]
fn open_discovers_and_indexes_all_files_in_one_pass() {
    let tmp = TempDir::new().unwrap();
    let project_root = tmp.path().join("proj");
    std::fs::create_dir_all(&project_root).unwrap();
    std::fs::write(project_root.join("a.dart"), "class Foo {}\n").unwrap();
    std::fs::write(project_root.join("b.dart"), "class Bar {}\n").unwrap();

    let binding = Arc::new(FakeBinding::new(&project_root));
    binding.set_document(project_root.join("a.dart"), class_doc("a.dart", "Foo"));
    binding.set_document(project_root.join("b.dart"), class_doc("b.dart", "Bar"));

    let cache_dir = tmp.path().join("cache");
    let events = Arc::new(EventBus::new(16));
    let rx = events.subscribe();

    let indexer = PackageIndexer::open(
        project_root.clone(),
        cache_dir,
        binding,
        events,
        PackageIndexerOptions::default(),
    )
    .unwrap();

    assert_eq!(indexer.index.stats().files, 2);
    assert_eq!(indexer.index.stats().symbols, 2);

    let event = rx.recv_timeout(std::time::Duration::from_secs(1)).unwrap();
    match event {
        UpdateEvent::Initial { file_count, symbol_count, from_cache, .. } => {
            assert_eq!(file_count, 2);
            assert_eq!(symbol_count, 2);
            assert!(!from_cache);
        }
        other => panic!("expected Initial, got {other:?}"),
    }
}

#[test]
fn reopening_unchanged_project_loads_from_cache() {
    let tmp = TempDir::new().unwrap();
    let project_root = tmp.path().join("proj");
    std::fs::create_dir_all(&project_root).unwrap();
    std::fs::write(project_root.join("a.dart"), "class Foo {}\n").unwrap();

    let binding = Arc::new(FakeBinding::new(&project_root));
    binding.set_document(project_root.join("a.dart"), class_doc("a.dart", "Foo"));
    let cache_dir = tmp.path().join("cache");

    let events1 = Arc::new(EventBus::new(16));
    PackageIndexer::open(project_root.clone(), cache_dir.clone(), binding.clone(), events1, PackageIndexerOptions::default())
        .unwrap();

    let events2 = Arc::new(EventBus::new(16));
    let rx2 = events2.subscribe();
    let reopened =
        PackageIndexer::open(project_root, cache_dir, binding, events2, PackageIndexerOptions::default()).unwrap();

    assert_eq!(reopened.index.stats().symbols, 1);
    let event = rx2.recv_timeout(std::time::Duration::from_secs(1)).unwrap();
    assert!(matches!(event, UpdateEvent::Cached { .. }), "expected Cached, got {event:?}");
}

#[test]
fn apply_change_move_relocates_symbols_to_new_path() {
    let tmp = TempDir::new().unwrap();
    let project_root = tmp.path().join("proj");
    std::fs::create_dir_all(&project_root).unwrap();
    std::fs::write(project_root.join("old.dart"), "class Foo {}\n").unwrap();

    let binding = Arc::new(FakeBinding::new(&project_root));
    binding.set_document(project_root.join("old.dart"), class_doc("old.dart", "Foo"));
    let cache_dir = tmp.path().join("cache");
    let events = Arc::new(EventBus::new(16));

    let mut indexer = PackageIndexer::open(
        project_root.clone(),
        cache_dir,
        binding.clone(),
        events,
        PackageIndexerOptions::default(),
    )
    .unwrap();

    std::fs::rename(project_root.join("old.dart"), project_root.join("new.dart")).unwrap();
    binding.set_document(project_root.join("new.dart"), class_doc("new.dart", "Foo"));

    indexer
        .apply_change(FileChange {
            path: PathBuf::from("new.dart"),
            change_type: FileChangeType::Move,
            previous_path: Some(PathBuf::from("old.dart")),
        })
        .unwrap();

    assert_eq!(indexer.index.symbols_in_file("old.dart").count(), 0);
    assert_eq!(indexer.index.symbols_in_file("new.dart").count(), 1);
}

#[test]
fn path_traversal_in_a_file_change_is_rejected_without_touching_the_index() {
    let tmp = TempDir::new().unwrap();
    let project_root = tmp.path().join("proj");
    std::fs::create_dir_all(&project_root).unwrap();
    std::fs::write(project_root.join("a.dart"), "class Foo {}\n").unwrap();

    let binding = Arc::new(FakeBinding::new(&project_root));
    binding.set_document(project_root.join("a.dart"), class_doc("a.dart", "Foo"));
    let cache_dir = tmp.path().join("cache");
    let events = Arc::new(EventBus::new(16));
    let rx = events.subscribe();

    let mut indexer = PackageIndexer::open(
        project_root.clone(),
        cache_dir,
        binding,
        events,
        PackageIndexerOptions::default(),
    )
    .unwrap();

    let before = indexer.index.stats().symbols;
    indexer
        .apply_change(FileChange {
            path: PathBuf::from("../../../etc/passwd"),
            change_type: FileChangeType::Modify,
            previous_path: None,
        })
        .unwrap();

    assert_eq!(indexer.index.stats().symbols, before);
    let event = rx.recv_timeout(std::time::Duration::from_secs(1)).unwrap();
    assert!(matches!(event, UpdateEvent::Error { .. }), "expected Error event, got {event:?}");
}
