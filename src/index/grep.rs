//! Content grep engine. Grounded structurally on the teacher's
//! glob-to-regex conversion idiom (`find_cmd.rs`/`refs_cmd.rs`, reusing
//! `globset`) for `--include`/`--exclude` path filters; the search regex
//! itself is compiled directly via `regex::Regex` per spec.

use regex::Regex;
use std::collections::HashMap;

use crate::index::ScipIndex;

#[derive(Debug, Clone, Default)]
pub struct GrepOptions {
    pub path_filter: Option<String>,
    pub include_glob: Option<String>,
    pub exclude_glob: Option<String>,
    pub lines_before: usize,
    pub lines_after: usize,
    pub invert: bool,
    pub max_per_file: Option<usize>,
    pub multiline: bool,
    pub only_matching: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepMatch {
    pub file: String,
    pub line: usize,
    pub text: String,
    pub before: Vec<String>,
    pub after: Vec<String>,
    pub symbol_context: Option<String>,
    pub match_line_count: usize,
}

/// Escapes regex metacharacters `.+^$[]{}|\`, maps `*`→`.*`, `?`→`.`,
/// matching the full path case-insensitively (this is the
/// include/exclude glob filter, distinct from the alternation-aware DSL glob
/// in [`crate::query::pattern`]).
pub fn glob_to_regex(glob: &str) -> Regex {
    let mut pattern = String::from("(?i)^");
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            '.' | '+' | '^' | '$' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\' => {
                pattern.push('\\');
                pattern.push(c);
            }
            other => pattern.push(other),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).unwrap_or_else(|_| Regex::new("^$").unwrap())
}

fn path_included(path: &str, opts: &GrepOptions) -> bool {
    if let Some(prefix) = &opts.path_filter {
        if !path.starts_with(prefix.as_str()) {
            return false;
        }
    }
    if let Some(include) = &opts.include_glob {
        if !glob_to_regex(include).is_match(path) {
            return false;
        }
    }
    if let Some(exclude) = &opts.exclude_glob {
        if glob_to_regex(exclude).is_match(path) {
            return false;
        }
    }
    true
}

/// Resolve the enclosing symbol name for a grep hit line:
/// the symbol `s` such that `def(s).line <= line <= enclosing_end_line(s)
/// (or def(s).line + 100 if unknown)`.
fn symbol_context_for_line(index: &ScipIndex, file: &str, line: usize) -> Option<String> {
    let mut best: Option<(i32, String)> = None;
    for sym in index.symbols_in_file(file) {
        let Some(def) = index.find_definition(sym) else {
            continue;
        };
        let start = def.range.start_line as usize;
        if start > line {
            continue;
        }
        let end = def
            .enclosing_end_line
            .map(|e| e as usize)
            .unwrap_or(start + 100);
        if line > end {
            continue;
        }
        let span = end.saturating_sub(start) as i32;
        if best.as_ref().map_or(true, |(best_span, _)| span < *best_span) {
            let info = index.get_symbol(sym)?;
            best = Some((span, info.name()));
        }
    }
    best.map(|(_, name)| name)
}

pub fn grep(index: &ScipIndex, regex: &Regex, opts: &GrepOptions) -> Vec<GrepMatch> {
    let mut results = Vec::new();

    let mut files: Vec<&String> = index.files().collect();
    files.sort();

    for file in files {
        if !path_included(file, opts) {
            continue;
        }
        let Some(content) = index.read_source_file(file) else {
            continue;
        };

        let mut emitted = 0usize;
        let cap = opts.max_per_file.unwrap_or(usize::MAX);

        if opts.multiline {
            let offsets = line_start_offsets(&content);
            for m in regex.find_iter(&content) {
                if emitted >= cap {
                    break;
                }
                let start_line = offset_to_line(&offsets, m.start());
                let end_line = offset_to_line(&offsets, m.end().saturating_sub(1).max(m.start()));
                results.push(GrepMatch {
                    file: file.clone(),
                    line: start_line,
                    text: m.as_str().to_string(),
                    before: vec![],
                    after: vec![],
                    symbol_context: symbol_context_for_line(index, file, start_line),
                    match_line_count: end_line.saturating_sub(start_line) + 1,
                });
                emitted += 1;
            }
            continue;
        }

        let lines: Vec<&str> = content.lines().collect();
        for (idx, line) in lines.iter().enumerate() {
            if emitted >= cap {
                break;
            }
            let is_match = regex.is_match(line);
            let include = is_match != opts.invert;
            if !include {
                continue;
            }

            if opts.only_matching {
                for m in regex.find_iter(line) {
                    if emitted >= cap {
                        break;
                    }
                    results.push(GrepMatch {
                        file: file.clone(),
                        line: idx,
                        text: m.as_str().to_string(),
                        before: vec![],
                        after: vec![],
                        symbol_context: None,
                        match_line_count: 1,
                    });
                    emitted += 1;
                }
                continue;
            }

            let before_start = idx.saturating_sub(opts.lines_before);
            let after_end = (idx + opts.lines_after + 1).min(lines.len());
            let before = lines[before_start..idx].iter().map(|s| s.to_string()).collect();
            let after = lines[(idx + 1).min(lines.len())..after_end]
                .iter()
                .map(|s| s.to_string())
                .collect();

            results.push(GrepMatch {
                file: file.clone(),
                line: idx,
                text: line.to_string(),
                before,
                after,
                symbol_context: symbol_context_for_line(index, file, idx),
                match_line_count: 1,
            });
            emitted += 1;
        }
    }

    results
}

pub fn counts_by_file(matches: &[GrepMatch]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for m in matches {
        *counts.entry(m.file.clone()).or_insert(0) += 1;
    }
    counts
}

fn line_start_offsets(content: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    for (i, c) in content.char_indices() {
        if c == '\n' {
            offsets.push(i + 1);
        }
    }
    offsets
}

fn offset_to_line(offsets: &[usize], byte_offset: usize) -> usize {
    match offsets.binary_search(&byte_offset) {
        Ok(line) => line,
        Err(insertion) => insertion.saturating_sub(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_glob_matches_full_path_case_insensitively() {
        let re = glob_to_regex("*.RS");
        assert!(re.is_match("src/main.rs"));
        assert!(!re.is_match("src/main.rs.bak"));
    }

    #[test]
    fn counts_by_file_tally_matches() {
        let matches = vec![
            GrepMatch {
                file: "a.rs".to_string(),
                line: 0,
                text: String::new(),
                before: vec![],
                after: vec![],
                symbol_context: None,
                match_line_count: 1,
            },
            GrepMatch {
                file: "a.rs".to_string(),
                line: 1,
                text: String::new(),
                before: vec![],
                after: vec![],
                symbol_context: None,
                match_line_count: 1,
            },
        ];
        let counts = counts_by_file(&matches);
        assert_eq!(counts.get("a.rs"), Some(&2));
    }
}
