//! Recursive-descent-ish parser producing an AST of pipeline stages (spec
//! §4.C grammar). New code — no direct teacher analog — following the
//! teacher's module-per-concern layout under `src/query/`.

use super::pattern::{parse_pattern, Pattern, PatternError};
use super::tokenizer::{split_pipeline, split_tokens};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Def,
    Refs,
    Sig,
    Members,
    Impls,
    Supertypes,
    Subtypes,
    Hierarchy,
    Source,
    Find,
    Which,
    Grep,
    Calls,
    Callers,
    Imports,
    Exports,
    Deps,
    Symbols,
    Get,
    Files,
    Stats,
}

impl Action {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "def" => Action::Def,
            "refs" => Action::Refs,
            "sig" => Action::Sig,
            "members" => Action::Members,
            "impls" => Action::Impls,
            "supertypes" => Action::Supertypes,
            "subtypes" => Action::Subtypes,
            "hierarchy" => Action::Hierarchy,
            "source" => Action::Source,
            "find" => Action::Find,
            "which" => Action::Which,
            "grep" => Action::Grep,
            "calls" => Action::Calls,
            "callers" => Action::Callers,
            "imports" => Action::Imports,
            "exports" => Action::Exports,
            "deps" => Action::Deps,
            "symbols" => Action::Symbols,
            "get" => Action::Get,
            "files" => Action::Files,
            "stats" => Action::Stats,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub kind: Option<String>,
    pub in_path: Option<String>,
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Flags {
    pub ignore_case: bool,
    pub invert: bool,
    pub whole_word: bool,
    pub files_with_matches: bool,
    pub files_without_matches: bool,
    pub count_only: bool,
    pub only_matching: bool,
    pub fixed_strings: bool,
    pub multiline: bool,
    pub dotall: bool,
    pub context_before: Option<usize>,
    pub context_after: Option<usize>,
    pub max_count: Option<usize>,
    pub include: Option<String>,
    pub exclude: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Stage {
    pub action: Action,
    pub patterns: Vec<Pattern>,
    pub symbol_ids: Vec<String>,
    pub filters: Filters,
    pub flags: Flags,
}

#[derive(Debug)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for ParseError {}

impl From<PatternError> for ParseError {
    fn from(e: PatternError) -> Self {
        ParseError(e.0)
    }
}

pub fn parse_query(query: &str) -> Result<Vec<Stage>, ParseError> {
    split_pipeline(query).iter().map(|stage| parse_stage(stage)).collect()
}

fn parse_stage(stage: &str) -> Result<Stage, ParseError> {
    let tokens = split_tokens(stage);
    let (action_token, rest) = tokens
        .split_first()
        .ok_or_else(|| ParseError("empty stage".to_string()))?;
    let action = Action::parse(action_token).ok_or_else(|| ParseError(format!("unknown action '{action_token}'")))?;

    let mut filters = Filters::default();
    let mut flags = Flags::default();
    let mut patterns = Vec::new();
    let mut symbol_ids = Vec::new();

    let mut iter = rest.iter().peekable();
    while let Some(token) = iter.next() {
        if let Some(kind) = token.strip_prefix("kind:") {
            filters.kind = Some(kind.to_string());
        } else if let Some(path) = token.strip_prefix("in:") {
            filters.in_path = Some(path.to_string());
        } else if let Some(lang) = token.strip_prefix("lang:") {
            filters.lang = Some(lang.to_string());
        } else if let Some(glob) = token.strip_prefix("--include:") {
            flags.include = Some(glob.to_string());
        } else if let Some(glob) = token.strip_prefix("--exclude:") {
            flags.exclude = Some(glob.to_string());
        } else if let Some(n) = token.strip_prefix("-C:") {
            flags.context_before = n.parse().ok();
            flags.context_after = n.parse().ok();
        } else if let Some(n) = token.strip_prefix("-A:") {
            flags.context_after = n.parse().ok();
        } else if let Some(n) = token.strip_prefix("-B:") {
            flags.context_before = n.parse().ok();
        } else if let Some(n) = token.strip_prefix("-m:") {
            flags.max_count = n.parse().ok();
        } else if let Some(rest) = parse_bare_flag(token, &mut flags) {
            if rest {
                continue;
            }
        } else if let Some(id) = unquote_symbol_id(token) {
            symbol_ids.push(id);
        } else if looks_like_symbol_id(token) {
            symbol_ids.push(token.clone());
        } else {
            patterns.push(parse_pattern(token)?);
        }
    }

    Ok(Stage {
        action,
        patterns,
        symbol_ids,
        filters,
        flags,
    })
}

/// Returns `Some(true)` if `token` was a recognized bare flag (already
/// applied to `flags`); `None` if it wasn't a flag at all.
fn parse_bare_flag(token: &str, flags: &mut Flags) -> Option<bool> {
    match token {
        "-i" => flags.ignore_case = true,
        "-v" => flags.invert = true,
        "-w" => flags.whole_word = true,
        "-l" => flags.files_with_matches = true,
        "-L" => flags.files_without_matches = true,
        "-c" => flags.count_only = true,
        "-o" => flags.only_matching = true,
        "-F" => flags.fixed_strings = true,
        "-M" => flags.multiline = true,
        "-D" => flags.dotall = true,
        _ => return None,
    }
    Some(true)
}

/// A SCIP symbol id's `<scheme> <manager> <package> <version>
/// <descriptor-chain>` form (spec §3) is space-delimited, but
/// [`split_tokens`] already breaks unquoted pipeline arguments on every
/// top-level space — a real id can only survive tokenization whole if the
/// caller quotes it (`get "scip-index rust pkg 1.0 a.rs/Foo#"`). Strip a
/// matching pair of `"…"`/`'…'` quotes and hand back the raw id.
fn unquote_symbol_id(token: &str) -> Option<String> {
    let mut chars = token.chars();
    let first = chars.next()?;
    if first != '"' && first != '\'' {
        return None;
    }
    let inner = &token[1..];
    let rest = inner.strip_suffix(first)?;
    (!rest.is_empty()).then(|| rest.to_string())
}

/// Fallback for an unquoted single token that still looks like a whole id
/// (no unescaped spaces survive tokenization, but a descriptor chain with no
/// spaces at all, e.g. a scheme-less bare id, is still possible).
fn looks_like_symbol_id(token: &str) -> bool {
    token.split(' ').count() >= 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_find_with_kind_filter() {
        let stages = parse_query("find * kind:class").unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].action, Action::Find);
        assert_eq!(stages[0].filters.kind.as_deref(), Some("class"));
    }

    #[test]
    fn parses_pipeline_into_multiple_stages() {
        let stages = parse_query("find * kind:class | members").unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[1].action, Action::Members);
    }

    #[test]
    fn parses_context_flags_with_counts() {
        let stages = parse_query("grep /TODO/ -C:2 -m:5").unwrap();
        assert_eq!(stages[0].flags.context_before, Some(2));
        assert_eq!(stages[0].flags.context_after, Some(2));
        assert_eq!(stages[0].flags.max_count, Some(5));
    }

    #[test]
    fn unknown_action_is_a_parse_error() {
        assert!(parse_query("bogus foo").is_err());
    }

    #[test]
    fn recognizes_quoted_symbol_id_argument() {
        let stages = parse_query(r#"get "scip-index rust pkg 1.0 a.rs/Foo#""#).unwrap();
        assert_eq!(stages[0].symbol_ids.len(), 1);
        assert_eq!(stages[0].symbol_ids[0], "scip-index rust pkg 1.0 a.rs/Foo#");
    }

    #[test]
    fn recognizes_single_quoted_symbol_id_argument() {
        let stages = parse_query("get 'scip-index rust pkg 1.0 a.rs/Foo#'").unwrap();
        assert_eq!(stages[0].symbol_ids.len(), 1);
        assert_eq!(stages[0].symbol_ids[0], "scip-index rust pkg 1.0 a.rs/Foo#");
    }
}
