//! scip-index: an incremental, queryable SCIP-based semantic code-intelligence index.
//!
//! Observes a project's files (via a language binding), maintains an
//! in-memory [`index::ScipIndex`] plus an on-disk cache, and answers a
//! piped query DSL against it. The core is language-agnostic: a
//! [`binding::AnalyzerAdapter`] is the only boundary that knows how to turn
//! a file into symbols and occurrences.

pub mod binding;
pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod index;
pub mod indexer;
pub mod logging;
pub mod model;
pub mod query;
pub mod registry;
pub mod server;
pub mod validation;
pub mod version;
pub mod watcher;

pub use binding::{AnalyzerAdapter, DiscoveredPackage, FileChange, FileChangeType, LanguageBinding, PackageIndexer as PackageIndexerTrait};
pub use cache::Cache;
pub use config::Settings;
pub use diagnostics::{DiagnosticStage, SkipReason, WatchDiagnostic};
pub use error::{IndexError, IndexResult};
pub use events::{EventBus, UpdateEvent};
pub use index::{IndexStats, ScipIndex};
pub use indexer::{PackageIndexer, PackageIndexerOptions};
pub use model::{Document, OccurrenceInfo, Range, Relationship, Role, SymbolId, SymbolInfo, SymbolKind};
pub use query::wire::QueryResult;
pub use registry::{Provider, Registry, Scope};
pub use watcher::{FileSystemWatcher, WatcherConfig};
