//! Structured diagnostics for the watch/index pipeline.
//!
//! Deterministic, sortable diagnostic types for skip reasons and errors,
//! consumed by the indexer to report per-file outcomes
//! without aborting the run.

pub mod watch_diagnostics;

// Re-export main diagnostic types
pub use watch_diagnostics::{DiagnosticStage, SkipReason, WatchDiagnostic};
