//! Multi-index registry and the Provider contract. New
//! composition layer — the teacher (`magellan`) is single-project — grounded
//! structurally on `CodeGraph`'s "one struct wrapping several op modules"
//! shape (`files`/`symbols`/`references` sub-structs in `graph/mod.rs`),
//! generalized here to "one struct wrapping several named `ScipIndex`
//! instances".

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::IndexError;
use crate::index::grep::{GrepMatch, GrepOptions};
use crate::index::ScipIndex;
use crate::model::{OccurrenceInfo, SymbolId, SymbolInfo};

/// Whether external (SDK/hosted/git/flutter) packages participate in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Project,
    ProjectAndLoaded,
}

/// A named package index with its own `project_root`/`source_root`, as
/// required for external packages: `source_root != project_root`
/// — index lives in the global cache, sources in the package manager's own
/// cache.
pub struct IndexedPackage {
    pub name: String,
    pub index: ScipIndex,
}

#[derive(Default)]
pub struct Registry {
    pub project_index: Option<ScipIndex>,
    pub local_package_indexes: HashMap<String, ScipIndex>,
    pub sdk_index: Option<ScipIndex>,
    pub hosted_packages: HashMap<String, ScipIndex>,
    pub git_packages: HashMap<String, ScipIndex>,
    pub flutter_packages: HashMap<String, ScipIndex>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn external_indexes(&self) -> impl Iterator<Item = &ScipIndex> {
        self.sdk_index
            .iter()
            .chain(self.hosted_packages.values())
            .chain(self.git_packages.values())
            .chain(self.flutter_packages.values())
    }

    fn local_indexes(&self) -> impl Iterator<Item = &ScipIndex> {
        self.project_index.iter().chain(self.local_package_indexes.values())
    }

    fn all_in_scope(&self, scope: Scope) -> Vec<&ScipIndex> {
        let mut indexes: Vec<&ScipIndex> = self.local_indexes().collect();
        if scope == Scope::ProjectAndLoaded {
            indexes.extend(self.external_indexes());
        }
        indexes
    }

    /// First index whose symbols contain `id`; the project index wins ties.
    pub fn find_owning_index(&self, id: &SymbolId) -> Option<&ScipIndex> {
        if let Some(project) = &self.project_index {
            if project.get_symbol(id).is_some() {
                return Some(project);
            }
        }
        self.local_package_indexes
            .values()
            .chain(self.external_indexes())
            .find(|idx| idx.get_symbol(id).is_some())
    }
}

/// The contract the query executor depends on. Implemented directly by [`Registry`]; kept as a trait so the
/// executor and query tests can be exercised against a lighter fake.
pub trait Provider {
    fn project_index(&self) -> Option<&ScipIndex>;
    fn local_indexes(&self) -> Vec<&ScipIndex>;
    fn external_indexes(&self) -> Vec<&ScipIndex>;
    fn all_indexes(&self, scope: Scope) -> Vec<&ScipIndex>;
    fn get_symbol(&self, id: &SymbolId) -> Option<&SymbolInfo>;
    fn find_symbols(&self, regex: &regex::Regex, scope: Scope) -> Vec<&SymbolInfo>;
    fn find_qualified(&self, container: &regex::Regex, member: &regex::Regex, scope: Scope) -> Vec<&SymbolInfo>;
    fn find_all_references(&self, id: &SymbolId, scope: Scope) -> Vec<(&ScipIndex, &OccurrenceInfo)>;
    fn get_source(&self, id: &SymbolId) -> Result<Option<(String, String)>, IndexError>;
    fn grep(&self, regex: &regex::Regex, opts: &GrepOptions, include_external: bool) -> Vec<GrepMatch>;
}

impl Provider for Registry {
    fn project_index(&self) -> Option<&ScipIndex> {
        self.project_index.as_ref()
    }

    fn local_indexes(&self) -> Vec<&ScipIndex> {
        self.local_indexes().collect()
    }

    fn external_indexes(&self) -> Vec<&ScipIndex> {
        self.external_indexes().collect()
    }

    fn all_indexes(&self, scope: Scope) -> Vec<&ScipIndex> {
        self.all_in_scope(scope)
    }

    fn get_symbol(&self, id: &SymbolId) -> Option<&SymbolInfo> {
        self.find_owning_index(id).and_then(|idx| idx.get_symbol(id))
    }

    /// Dedup by SymbolId across all participating indexes.
    fn find_symbols(&self, regex: &regex::Regex, scope: Scope) -> Vec<&SymbolInfo> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for idx in self.all_in_scope(scope) {
            for sym in idx.find_symbols(regex) {
                if seen.insert(sym.id.clone()) {
                    out.push(sym);
                }
            }
        }
        out
    }

    fn find_qualified(&self, container: &regex::Regex, member: &regex::Regex, scope: Scope) -> Vec<&SymbolInfo> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for idx in self.all_in_scope(scope) {
            for sym in idx.find_qualified(container, member) {
                if seen.insert(sym.id.clone()) {
                    out.push(sym);
                }
            }
        }
        out
    }

    /// Aggregates across indexes; dedups by `(file, line, column)`.
    fn find_all_references(&self, id: &SymbolId, scope: Scope) -> Vec<(&ScipIndex, &OccurrenceInfo)> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for idx in self.all_in_scope(scope) {
            for occ in idx.find_references(id) {
                let key = (occ.file.clone(), occ.range.start_line, occ.range.start_col);
                if seen.insert(key) {
                    out.push((idx, occ));
                }
            }
        }
        out
    }

    /// Dispatches to the owning index's `source_root` — external packages
    /// read source from `source_root`, not `project_root`.
    fn get_source(&self, id: &SymbolId) -> Result<Option<(String, String)>, IndexError> {
        match self.find_owning_index(id) {
            Some(idx) => idx.get_source(id),
            None => Ok(None),
        }
    }

    fn grep(&self, regex: &regex::Regex, opts: &GrepOptions, include_external: bool) -> Vec<GrepMatch> {
        let scope = if include_external {
            Scope::ProjectAndLoaded
        } else {
            Scope::Project
        };
        self.all_in_scope(scope).into_iter().flat_map(|idx| idx.grep(regex, opts)).collect()
    }
}

/// Naming convention for global external-package cache directories:
/// `sdk/<version>/…`, `hosted/<name>-<version>/…`,
/// `git/<repo>-<short-commit>/…`, `flutter/<version>/<package>/…`.
pub fn external_cache_subpath(kind: ExternalKind) -> PathBuf {
    match kind {
        ExternalKind::Sdk { version } => PathBuf::from("sdk").join(version),
        ExternalKind::Hosted { name, version } => PathBuf::from("hosted").join(format!("{name}-{version}")),
        ExternalKind::Git { repo, short_commit } => PathBuf::from("git").join(format!("{repo}-{short_commit}")),
        ExternalKind::Flutter { version, package } => PathBuf::from("flutter").join(version).join(package),
    }
}

pub enum ExternalKind {
    Sdk { version: String },
    Hosted { name: String, version: String },
    Git { repo: String, short_commit: String },
    Flutter { version: String, package: String },
}
