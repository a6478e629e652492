//! The language binding contract — the boundary the core depends
//! on but never implements. Plain traits; no concrete language binding ships
//! in this crate (out of scope). Grounded structurally on the
//! teacher's own AST-visitor boundary (`ingest/` producing `SymbolNode`s the
//! graph consumes) generalized into an opaque `Document`-producing contract
//! so the core never touches AST types.

use std::path::{Path, PathBuf};

use crate::error::IndexError;
use crate::model::Document;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChangeType {
    Create,
    Modify,
    Delete,
    /// A rename/move; `previous_path` carries the old relative path.
    Move,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub change_type: FileChangeType,
    pub previous_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DiscoveredPackage {
    pub name: String,
    pub path: PathBuf,
    pub version: Option<String>,
}

/// The boundary the core depends on: `language_id`/`extensions` drive file
/// discovery and watch filtering; `create_context`/`create_indexer` are
/// higher-level entry points a binding exposes to its own CLI or IDE plugin.
/// The core itself only ever calls through [`AnalyzerAdapter`].
pub trait LanguageBinding: Send + Sync {
    fn language_id(&self) -> &str;
    fn extensions(&self) -> &[&str];
    fn package_manifest_filename(&self) -> &str;
    fn supports_incremental(&self) -> bool;
    fn supports_dependencies(&self) -> bool;

    fn discover_packages(&self, root: &Path) -> Vec<DiscoveredPackage>;
}

/// Used by a binding, not the core. The indexer loop
/// requests a resolved-unit-equivalent through `get_resolved_unit` and treats
/// the binding as a black box.
pub trait AnalyzerAdapter: Send + Sync {
    fn project_root(&self) -> &Path;

    /// Produce the canonical `Document` for a file, or an error if analysis
    /// failed (`BindingFailure` — the indexer skips the file and
    /// does not record its hash, so a later open retries it).
    fn get_resolved_unit(&self, path: &Path) -> Result<Option<Document>, IndexError>;

    /// An externally-injected stream of file changes, substituting for the
    /// internal filesystem watcher.
    fn file_changes(&self) -> Option<Box<dyn Iterator<Item = FileChange> + Send>> {
        None
    }

    fn notify_file_change(&self, _change: FileChange) {}

    fn list_files(&self) -> Option<Vec<PathBuf>> {
        None
    }
}

/// Per-package indexer entry point a binding exposes.
pub trait PackageIndexer: Send + Sync {
    fn update_file(&mut self, path: &Path) -> Result<(), IndexError>;
    fn remove_file(&mut self, path: &Path) -> Result<(), IndexError>;
    fn dispose(&mut self) {}
}

#[cfg(test)]
pub mod test_support {
    //! A minimal in-memory binding for exercising the indexer loop end to
    //! end without tree-sitter, grounded on the teacher's
    //! own `tests/` fixture style.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub struct TestBinding {
        pub documents: Mutex<HashMap<PathBuf, Document>>,
        pub root: PathBuf,
    }

    impl TestBinding {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            TestBinding {
                documents: Mutex::new(HashMap::new()),
                root: root.into(),
            }
        }

        pub fn set_document(&self, path: impl Into<PathBuf>, doc: Document) {
            self.documents.lock().unwrap().insert(path.into(), doc);
        }
    }

    impl AnalyzerAdapter for TestBinding {
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

    #[test]
    fn test_binding_returns_registered_document() {
        let binding = TestBinding::new("/proj");
        binding.set_document(
            "a.rs",
            Document {
                relative_path: "a.rs".to_string(),
                language: "rust".to_string(),
                symbols: vec![],
                occurrences: vec![],
            },
        );
        let doc = binding.get_resolved_unit(Path::new("a.rs")).unwrap();
        assert!(doc.is_some());
    }
}
