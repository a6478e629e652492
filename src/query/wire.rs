//! Query result wire shapes. Grounded on the teacher's
//! `output/command.rs` JSON envelope (schema_version + typed payload) and
//! `codanna`'s storage manifest "tag every payload with a type" convention,
//! generalized from Magellan's single `JsonResponse<T>` wrapper into one
//! tagged enum's result catalogue.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DefinitionEntry {
    pub symbol: String,
    pub name: String,
    pub kind: String,
    pub file: Option<String>,
    pub line: Option<i32>,
    pub column: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceEntry {
    pub file: String,
    pub line: i32,
    pub column: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchEntry {
    pub symbol: String,
    pub name: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberEntry {
    pub symbol: String,
    pub name: String,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum QueryResult {
    #[serde(rename = "definitions")]
    Definition { count: usize, results: Vec<DefinitionEntry> },

    #[serde(rename = "references")]
    References {
        symbol: String,
        name: String,
        count: usize,
        results: Vec<ReferenceEntry>,
    },

    #[serde(rename = "search")]
    Search { count: usize, results: Vec<SearchEntry> },

    #[serde(rename = "members")]
    Members {
        symbol: String,
        name: String,
        count: usize,
        results: Vec<MemberEntry>,
    },

    #[serde(rename = "hierarchy")]
    Hierarchy {
        symbol: String,
        name: String,
        supertypes: Vec<String>,
        subtypes: Vec<String>,
    },

    #[serde(rename = "source")]
    Source {
        symbol: String,
        file: String,
        #[serde(rename = "startLine")]
        start_line: i32,
        source: String,
    },

    #[serde(rename = "signature")]
    Signature { file: String, line: i32, signature: String },

    #[serde(rename = "call_graph")]
    CallGraph {
        direction: &'static str,
        connections: Vec<String>,
    },

    #[serde(rename = "stats")]
    Stats { stats: crate::index::IndexStats },

    #[serde(rename = "pipeline")]
    Pipeline { action: String, results: Vec<QueryResult> },

    #[serde(rename = "not_found")]
    NotFound { message: String },

    #[serde(rename = "error")]
    Error { message: String },
}

impl QueryResult {
    pub fn count(&self) -> usize {
        match self {
            QueryResult::Definition { count, .. } => *count,
            QueryResult::References { count, .. } => *count,
            QueryResult::Search { count, .. } => *count,
            QueryResult::Members { count, .. } => *count,
            QueryResult::Hierarchy { supertypes, subtypes, .. } => supertypes.len() + subtypes.len(),
            QueryResult::Source { .. } | QueryResult::Signature { .. } => 1,
            QueryResult::CallGraph { connections, .. } => connections.len(),
            QueryResult::Stats { .. } => 1,
            QueryResult::Pipeline { results, .. } => results.len(),
            QueryResult::NotFound { .. } | QueryResult::Error { .. } => 0,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
