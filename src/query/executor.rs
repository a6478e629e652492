//! Executes a parsed pipeline against a [`Provider`]. New code, following the teacher's module-per-concern layout.

use regex::Regex;

use crate::index::grep::GrepOptions;
use crate::model::{SymbolId, SymbolInfo, SymbolKind};
use crate::registry::{Provider, Scope};

use super::parser::{Action, Stage};
use super::pattern::Pattern;
use super::wire::{DefinitionEntry, MemberEntry, QueryResult, ReferenceEntry, SearchEntry};

pub fn execute(provider: &dyn Provider, stages: &[Stage]) -> QueryResult {
    let mut working: Option<Vec<SymbolId>> = None;

    for (idx, stage) in stages.iter().enumerate() {
        let is_last = idx == stages.len() - 1;
        let (results, next_symbols) = execute_stage(provider, stage, working.as_deref());
        if is_last && stages.len() == 1 {
            // A lone stage returns its sole result bare; an ambiguous direct
            // match (e.g. `members Foo*` hitting two `Foo`s) still surfaces
            // as a pipeline envelope so no sub-result is silently dropped.
            return match results.len() {
                1 => results.into_iter().next().unwrap(),
                _ => QueryResult::Pipeline {
                    action: action_name(stage.action).to_string(),
                    results,
                },
            };
        }
        working = next_symbols;
        if is_last {
            return QueryResult::Pipeline {
                action: action_name(stage.action).to_string(),
                results,
            };
        }
    }

    QueryResult::NotFound {
        message: "empty pipeline".to_string(),
    }
}

fn action_name(action: Action) -> &'static str {
    match action {
        Action::Def => "def",
        Action::Refs => "refs",
        Action::Sig => "sig",
        Action::Members => "members",
        Action::Impls => "impls",
        Action::Supertypes => "supertypes",
        Action::Subtypes => "subtypes",
        Action::Hierarchy => "hierarchy",
        Action::Source => "source",
        Action::Find => "find",
        Action::Which => "which",
        Action::Grep => "grep",
        Action::Calls => "calls",
        Action::Callers => "callers",
        Action::Imports => "imports",
        Action::Exports => "exports",
        Action::Deps => "deps",
        Action::Symbols => "symbols",
        Action::Get => "get",
        Action::Files => "files",
        Action::Stats => "stats",
    }
}

fn scope_for(stage: &Stage) -> Scope {
    // DSL surfaces no explicit scope switch today; default to project-only,
    // matching the conservative default (`scope` defaults to
    // `project` unless a caller widens it).
    let _ = stage;
    Scope::Project
}

/// Resolve the input symbol set for a stage: either the previous stage's
/// carried-over symbol identities, or a fresh resolution from this stage's
/// own patterns.
fn resolve_symbols(provider: &dyn Provider, stage: &Stage, carried: Option<&[SymbolId]>) -> Vec<SymbolId> {
    if let Some(carried) = carried {
        return carried.to_vec();
    }
    resolve_pattern_symbols(provider, stage)
}

fn resolve_pattern_symbols(provider: &dyn Provider, stage: &Stage) -> Vec<SymbolId> {
    let scope = scope_for(stage);
    let mut out = Vec::new();

    for id in &stage.symbol_ids {
        out.push(SymbolId::from(id.as_str()));
    }

    for pattern in &stage.patterns {
        let matched: Vec<&SymbolInfo> = match pattern {
            Pattern::Glob(re) | Pattern::Bare(re) => provider.find_symbols(re, scope),
            Pattern::Regex(re) => provider.find_symbols(re, scope),
            Pattern::Qualified(container, member) => provider.find_qualified(container, member, scope),
            Pattern::Fuzzy(name) => provider
                .local_indexes()
                .into_iter()
                .flat_map(|idx| idx.find_symbols_fuzzy(name, 2))
                .collect(),
        };
        out.extend(apply_filters(matched, stage).into_iter().map(|s| s.id.clone()));
    }

    out
}

fn apply_filters<'a>(symbols: Vec<&'a SymbolInfo>, stage: &Stage) -> Vec<&'a SymbolInfo> {
    symbols
        .into_iter()
        .filter(|s| {
            if let Some(kind) = &stage.filters.kind {
                if !SymbolKind::from_str_ci(kind).map_or(false, |k| k == s.kind) {
                    return false;
                }
            }
            if let Some(prefix) = &stage.filters.in_path {
                if !s.file.as_deref().map_or(false, |f| f.starts_with(prefix.as_str())) {
                    return false;
                }
            }
            if let Some(lang) = &stage.filters.lang {
                if s.language.as_deref() != Some(lang.as_str()) {
                    return false;
                }
            }
            true
        })
        .collect()
}

/// Actions that resolve to one result (or, when fed more than one carried
/// symbol from a prior pipeline stage, one result *per* symbol — see spec
/// §4.C's "`find … | members` expands each matched class's members") return
/// `Vec<QueryResult>` of length `ids.len()` (empty only via `not_found`).
fn execute_stage(provider: &dyn Provider, stage: &Stage, carried: Option<&[SymbolId]>) -> (Vec<QueryResult>, Option<Vec<SymbolId>>) {
    match stage.action {
        Action::Find => {
            let ids = resolve_symbols(provider, stage, carried);
            let entries: Vec<SearchEntry> = ids
                .iter()
                .filter_map(|id| provider.get_symbol(id))
                .map(|s| SearchEntry {
                    symbol: s.id.to_string(),
                    name: s.name(),
                    kind: s.kind.to_string(),
                    file: s.file.clone(),
                    container: s.id.parent().map(|p| p.to_string()),
                })
                .collect();
            (
                vec![QueryResult::Search {
                    count: entries.len(),
                    results: entries,
                }],
                Some(ids),
            )
        }

        Action::Symbols => {
            let ids = resolve_symbols(provider, stage, carried);
            let entries: Vec<SearchEntry> = ids
                .iter()
                .filter_map(|id| provider.get_symbol(id))
                .map(|s| SearchEntry {
                    symbol: s.id.to_string(),
                    name: s.name(),
                    kind: s.kind.to_string(),
                    file: s.file.clone(),
                    container: None,
                })
                .collect();
            (
                vec![QueryResult::Search {
                    count: entries.len(),
                    results: entries,
                }],
                Some(ids),
            )
        }

        Action::Get | Action::Def | Action::Which => {
            let ids = resolve_symbols(provider, stage, carried);
            // Disambiguation (spec §4.C) only applies when this stage
            // resolved its own pattern; carried identities from a prior
            // stage are already specific and fan out as-is.
            let resolved = if carried.is_none() { disambiguate(provider, ids) } else { Resolved::One(ids) };
            match resolved {
                Resolved::Empty => (vec![not_found_result()], None),
                Resolved::Ambiguous(ids) => (vec![search_result(provider, &ids)], Some(ids)),
                Resolved::One(ids) if ids.len() == 1 => (vec![definition_result(provider, &ids)], Some(ids)),
                Resolved::One(ids) => fan_out(provider, ids, |provider, id| definition_result(provider, std::slice::from_ref(id))),
            }
        }

        Action::Source => {
            let ids = resolve_symbols(provider, stage, carried);
            let resolved = if carried.is_none() { disambiguate(provider, ids) } else { Resolved::One(ids) };
            match resolved {
                Resolved::Empty => (vec![not_found_result()], None),
                Resolved::Ambiguous(ids) => (vec![search_result(provider, &ids)], Some(ids)),
                Resolved::One(ids) => fan_out(provider, ids, |provider, id| match provider.get_source(id) {
                    Ok(Some((file, source))) => QueryResult::Source {
                        symbol: id.to_string(),
                        file,
                        start_line: 0,
                        source,
                    },
                    Ok(None) => not_found_result(),
                    Err(e) => QueryResult::Error { message: e.to_string() },
                }),
            }
        }

        Action::Sig => {
            let ids = resolve_symbols(provider, stage, carried);
            let resolved = if carried.is_none() { disambiguate(provider, ids) } else { Resolved::One(ids) };
            match resolved {
                Resolved::Empty => (vec![not_found_result()], None),
                Resolved::Ambiguous(ids) => (vec![search_result(provider, &ids)], Some(ids)),
                Resolved::One(ids) => fan_out(provider, ids, |provider, id| {
                    let name = provider.get_symbol(id).map(|s| s.name()).unwrap_or_default();
                    let file = provider.get_symbol(id).and_then(|s| s.file.clone()).unwrap_or_default();
                    QueryResult::Signature {
                        file,
                        line: 0,
                        signature: name,
                    }
                }),
            }
        }

        Action::Refs => {
            let ids = resolve_symbols(provider, stage, carried);
            fan_out(provider, ids, |provider, id| {
                let refs = provider.find_all_references(id, scope_for(stage));
                let name = provider.get_symbol(id).map(|s| s.name()).unwrap_or_default();
                let results: Vec<ReferenceEntry> = refs
                    .iter()
                    .map(|(_, occ)| ReferenceEntry {
                        file: occ.file.clone(),
                        line: occ.range.start_line,
                        column: occ.range.start_col,
                        context: None,
                    })
                    .collect();
                QueryResult::References {
                    symbol: id.to_string(),
                    name,
                    count: results.len(),
                    results,
                }
            })
        }

        Action::Members => {
            let ids = resolve_symbols(provider, stage, carried);
            let mut next = Vec::new();
            let (results, _) = fan_out(provider, ids, |provider, id| {
                let name = provider.get_symbol(id).map(|s| s.name()).unwrap_or_default();
                let members = provider
                    .local_indexes()
                    .into_iter()
                    .flat_map(|idx| idx.members_of(id))
                    .map(|s| MemberEntry {
                        symbol: s.id.to_string(),
                        name: s.name(),
                        kind: s.kind.to_string(),
                    })
                    .collect::<Vec<_>>();
                next.extend(members.iter().map(|m| SymbolId::from(m.symbol.as_str())));
                QueryResult::Members {
                    symbol: id.to_string(),
                    name,
                    count: members.len(),
                    results: members,
                }
            });
            (results, Some(next))
        }

        Action::Impls | Action::Subtypes => {
            let ids = resolve_symbols(provider, stage, carried);
            fan_out(provider, ids, |provider, id| {
                let subtypes: Vec<String> = provider
                    .local_indexes()
                    .into_iter()
                    .flat_map(|idx| idx.find_implementations(id))
                    .map(|s| s.id.to_string())
                    .collect();
                let name = provider.get_symbol(id).map(|s| s.name()).unwrap_or_default();
                QueryResult::Hierarchy {
                    symbol: id.to_string(),
                    name,
                    supertypes: vec![],
                    subtypes,
                }
            })
        }

        Action::Supertypes | Action::Hierarchy => {
            let ids = resolve_symbols(provider, stage, carried);
            fan_out(provider, ids, |provider, id| {
                let supertypes: Vec<String> = provider
                    .local_indexes()
                    .into_iter()
                    .flat_map(|idx| idx.supertypes_of(id))
                    .map(|s| s.to_string())
                    .collect();
                let subtypes: Vec<String> = provider
                    .local_indexes()
                    .into_iter()
                    .flat_map(|idx| idx.find_implementations(id))
                    .map(|s| s.id.to_string())
                    .collect();
                let name = provider.get_symbol(id).map(|s| s.name()).unwrap_or_default();
                QueryResult::Hierarchy {
                    symbol: id.to_string(),
                    name,
                    supertypes,
                    subtypes,
                }
            })
        }

        Action::Calls | Action::Callers | Action::Imports | Action::Exports | Action::Deps => {
            let ids = resolve_symbols(provider, stage, carried);
            let direction = if stage.action == Action::Callers { "callers" } else { "calls" };
            fan_out(provider, ids, |provider, id| {
                let connections: Vec<String> = provider
                    .local_indexes()
                    .into_iter()
                    .flat_map(|idx| if direction == "callers" { idx.get_callers(id) } else { idx.get_calls(id) })
                    .map(|s| s.to_string())
                    .collect();
                QueryResult::CallGraph { direction, connections }
            })
        }

        Action::Grep => {
            let opts = GrepOptions {
                path_filter: stage.filters.in_path.clone(),
                include_glob: stage.flags.include.clone(),
                exclude_glob: stage.flags.exclude.clone(),
                lines_before: stage.flags.context_before.unwrap_or(0),
                lines_after: stage.flags.context_after.unwrap_or(0),
                invert: stage.flags.invert,
                max_per_file: stage.flags.max_count,
                multiline: stage.flags.multiline,
                only_matching: stage.flags.only_matching,
            };
            let regex = stage
                .patterns
                .iter()
                .find_map(|p| match p {
                    Pattern::Regex(re) | Pattern::Glob(re) | Pattern::Bare(re) => Some(re.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| Regex::new("$^").unwrap());
            let matches = provider.grep(&regex, &opts, false);
            let entries: Vec<ReferenceEntry> = matches
                .into_iter()
                .map(|m| ReferenceEntry {
                    file: m.file,
                    line: m.line as i32,
                    column: 0,
                    context: Some(m.before.into_iter().chain(std::iter::once(m.text)).chain(m.after).collect()),
                })
                .collect();
            (
                vec![QueryResult::Search {
                    count: entries.len(),
                    results: entries
                        .into_iter()
                        .map(|e| SearchEntry {
                            symbol: String::new(),
                            name: e.file,
                            kind: "grep".to_string(),
                            file: None,
                            container: None,
                        })
                        .collect(),
                }],
                None,
            )
        }

        Action::Files => {
            let files: Vec<String> = provider.local_indexes().into_iter().flat_map(|idx| idx.files().cloned()).collect();
            (
                vec![QueryResult::Search {
                    count: files.len(),
                    results: files
                        .into_iter()
                        .map(|f| SearchEntry {
                            symbol: String::new(),
                            name: f,
                            kind: "file".to_string(),
                            file: None,
                            container: None,
                        })
                        .collect(),
                }],
                None,
            )
        }

        Action::Stats => {
            let stats = provider.project_index().map(|idx| idx.stats()).unwrap_or_default();
            (vec![QueryResult::Stats { stats }], None)
        }
    }
}

/// Preference order for disambiguating `def`/`source`/`sig`/`get`/`which`
/// when a pattern matches more than one symbol (spec §4.C): class-like
/// declarations outrank parameters/variables. Symbols of equal rank leave
/// the match ambiguous.
enum Resolved {
    Empty,
    One(Vec<SymbolId>),
    Ambiguous(Vec<SymbolId>),
}

fn disambiguate(provider: &dyn Provider, ids: Vec<SymbolId>) -> Resolved {
    if ids.is_empty() {
        return Resolved::Empty;
    }
    if ids.len() == 1 {
        return Resolved::One(ids);
    }
    fn rank(kind: SymbolKind) -> u8 {
        match kind {
            SymbolKind::Class | SymbolKind::Interface | SymbolKind::Mixin | SymbolKind::Enum => 0,
            SymbolKind::Parameter | SymbolKind::Variable => 2,
            _ => 1,
        }
    }
    let best_rank = ids
        .iter()
        .filter_map(|id| provider.get_symbol(id).map(|s| rank(s.kind)))
        .min()
        .unwrap_or(1);
    let best: Vec<SymbolId> = ids.into_iter().filter(|id| provider.get_symbol(id).map_or(true, |s| rank(s.kind) == best_rank)).collect();
    if best.len() == 1 {
        Resolved::One(best)
    } else {
        Resolved::Ambiguous(best)
    }
}

/// Run `f` once per carried symbol id, producing one `QueryResult` each
/// (spec §4.C pipeline fan-out: `find … | members` expands every matched
/// class's members rather than only the first match).
fn fan_out(
    provider: &dyn Provider,
    ids: Vec<SymbolId>,
    f: impl Fn(&dyn Provider, &SymbolId) -> QueryResult,
) -> (Vec<QueryResult>, Option<Vec<SymbolId>>) {
    if ids.is_empty() {
        return (vec![not_found_result()], None);
    }
    let results = ids.iter().map(|id| f(provider, id)).collect();
    (results, Some(ids))
}

fn search_result(provider: &dyn Provider, ids: &[SymbolId]) -> QueryResult {
    let entries: Vec<SearchEntry> = ids
        .iter()
        .filter_map(|id| provider.get_symbol(id))
        .map(|s| SearchEntry {
            symbol: s.id.to_string(),
            name: s.name(),
            kind: s.kind.to_string(),
            file: s.file.clone(),
            container: s.id.parent().map(|p| p.to_string()),
        })
        .collect();
    QueryResult::Search {
        count: entries.len(),
        results: entries,
    }
}

fn definition_result(provider: &dyn Provider, ids: &[SymbolId]) -> QueryResult {
    let entries: Vec<DefinitionEntry> = ids
        .iter()
        .filter_map(|id| {
            let info = provider.get_symbol(id)?;
            let owning = provider.local_indexes().into_iter().find_map(|idx| idx.find_definition(id));
            Some(DefinitionEntry {
                symbol: id.to_string(),
                name: info.name(),
                kind: info.kind.to_string(),
                file: owning.map(|o| o.file.clone()),
                line: owning.map(|o| o.range.start_line),
                column: owning.map(|o| o.range.start_col),
                source: None,
            })
        })
        .collect();
    if entries.is_empty() {
        return not_found_result();
    }
    QueryResult::Definition {
        count: entries.len(),
        results: entries,
    }
}

fn not_found_result() -> QueryResult {
    QueryResult::NotFound {
        message: "no match".to_string(),
    }
}
