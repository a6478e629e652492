//! Error types produced by the index core.
//!
//! Query-side failures are values (`ParseFailure`, `NotFound`) returned inside
//! result envelopes, never panics. I/O-adjacent failures (`IoFailure`,
//! `CorruptCache`, `BindingFailure`) are surfaced to observers via the update
//! stream or an `Error` result but never abort the indexer.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::SymbolId;

#[derive(Error, Debug)]
pub enum IndexError {
    /// The query DSL could not be parsed.
    #[error("could not parse query '{query}': {reason}")]
    ParseFailure { query: String, reason: String },

    /// A pattern or lookup matched nothing.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Filesystem or cache I/O failed.
    #[error("io failure on '{path}': {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The on-disk cache is unreadable or incompatible and must be rebuilt.
    #[error("cache corrupt at '{path}': {reason}")]
    CorruptCache { path: PathBuf, reason: String },

    /// The language binding failed to produce a document for a file.
    #[error("binding failed for '{path}': {reason}")]
    BindingFailure { path: PathBuf, reason: String },

    #[error("symbol '{0}' is unknown to this index")]
    UnknownSymbol(SymbolId),
}

impl From<protobuf::Error> for IndexError {
    fn from(source: protobuf::Error) -> Self {
        IndexError::CorruptCache {
            path: PathBuf::new(),
            reason: source.to_string(),
        }
    }
}

impl IndexError {
    /// A short, user-facing hint for CLI/server surfaces. Mirrors the shape
    /// (not the exact wording) of `recovery_suggestions` in the codebase
    /// intelligence crate this crate's error handling is patterned after.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            IndexError::CorruptCache { .. } => {
                Some("the cache will be rebuilt on the next open")
            }
            IndexError::BindingFailure { .. } => {
                Some("the file was skipped and will be retried on the next open")
            }
            IndexError::IoFailure { .. } => Some("check that the path exists and is readable"),
            _ => None,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::IoFailure {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        IndexError::NotFound {
            message: message.into(),
        }
    }

    pub fn parse_failure(query: impl Into<String>, reason: impl Into<String>) -> Self {
        IndexError::ParseFailure {
            query: query.into(),
            reason: reason.into(),
        }
    }
}

pub type IndexResult<T> = Result<T, IndexError>;
