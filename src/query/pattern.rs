//! Pattern compilation for the query DSL. No teacher file
//! implements a piped mini-language; this is new code following the
//! teacher's general module-per-concern layout.

use regex::Regex;

#[derive(Debug, Clone)]
pub enum Pattern {
    /// Anchored glob/alternation, already compiled to `^(?:...)$`.
    Glob(Regex),
    /// User-supplied regex body, compiled as-given (optionally case-insensitive).
    Regex(Regex),
    /// `~identifier` fuzzy match.
    Fuzzy(String),
    /// `Container.Member`, each side may itself contain `*`.
    Qualified(Regex, Regex),
    /// A bare identifier with no wildcards — still compiled as an anchored glob.
    Bare(Regex),
}

#[derive(Debug)]
pub struct PatternError(pub String);

impl std::fmt::Display for PatternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for PatternError {}

/// Glob → anchored regex: `.`→`\.`, `*`→`.*`, `?`→`.`, wrapped
/// `^(?:…)$` so that `|` alternation binds to the anchors on both sides
/// (`Scip*|*Index` matches `ScipX`/`AIndex`, not `ScipIndexX`). Case-insensitive.
pub fn glob_to_anchored_regex(glob: &str) -> Result<Regex, PatternError> {
    let mut inner = String::new();
    for c in glob.chars() {
        match c {
            '*' => inner.push_str(".*"),
            '?' => inner.push('.'),
            '.' => inner.push_str("\\."),
            '|' => inner.push('|'),
            other => inner.push(other),
        }
    }
    let pattern = format!("(?i)^(?:{inner})$");
    Regex::new(&pattern).map_err(|e| PatternError(e.to_string()))
}

/// Parse a single pattern argument per the grammar.
pub fn parse_pattern(raw: &str) -> Result<Pattern, PatternError> {
    if let Some(rest) = raw.strip_prefix('/') {
        return parse_regex_literal(rest);
    }
    if let Some(name) = raw.strip_prefix('~') {
        return Ok(Pattern::Fuzzy(name.to_string()));
    }
    if let Some((container, member)) = split_qualified(raw) {
        let container_re = glob_to_anchored_regex(container)?;
        let member_re = glob_to_anchored_regex(member)?;
        return Ok(Pattern::Qualified(container_re, member_re));
    }
    if raw.contains('*') || raw.contains('?') || raw.contains('|') {
        return Ok(Pattern::Glob(glob_to_anchored_regex(raw)?));
    }
    Ok(Pattern::Bare(glob_to_anchored_regex(raw)?))
}

fn parse_regex_literal(rest: &str) -> Result<Pattern, PatternError> {
    let end = rest
        .rfind('/')
        .ok_or_else(|| PatternError("unterminated regex literal".to_string()))?;
    let body = &rest[..end];
    let flags = &rest[end + 1..];
    let case_insensitive = flags.contains('i');
    let pattern = if case_insensitive {
        format!("(?i){body}")
    } else {
        body.to_string()
    };
    Regex::new(&pattern).map(Pattern::Regex).map_err(|e| PatternError(e.to_string()))
}

/// `Container.Member`, where the dot is the *last* unescaped `.` not part of
/// a glob segment — found by splitting on the first `.` that isn't itself a
/// glob wildcard escape target, matching spec's `container "." member` rule.
fn split_qualified(raw: &str) -> Option<(&str, &str)> {
    let dot = raw.find('.')?;
    if dot == 0 || dot == raw.len() - 1 {
        return None;
    }
    Some((&raw[..dot], &raw[dot + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternation_anchors_both_sides() {
        let re = glob_to_anchored_regex("Scip*|*Index").unwrap();
        assert!(re.is_match("ScipX"));
        assert!(re.is_match("AIndex"));
        assert!(!re.is_match("ScipIndexX"));
    }

    #[test]
    fn empty_pattern_yields_empty_match_not_error() {
        let re = glob_to_anchored_regex("").unwrap();
        assert!(re.is_match(""));
        assert!(!re.is_match("anything"));
    }

    #[test]
    fn regex_literal_with_trailing_i_flag_is_case_insensitive() {
        let pattern = parse_pattern("/foo/i").unwrap();
        match pattern {
            Pattern::Regex(re) => assert!(re.is_match("FOO")),
            _ => panic!("expected regex pattern"),
        }
    }

    #[test]
    fn fuzzy_prefix_produces_fuzzy_pattern() {
        match parse_pattern("~Symbl").unwrap() {
            Pattern::Fuzzy(s) => assert_eq!(s, "Symbl"),
            _ => panic!("expected fuzzy pattern"),
        }
    }

    #[test]
    fn qualified_pattern_splits_container_and_member() {
        match parse_pattern("Foo*.bar").unwrap() {
            Pattern::Qualified(container, member) => {
                assert!(container.is_match("FooImpl"));
                assert!(member.is_match("bar"));
            }
            _ => panic!("expected qualified pattern"),
        }
    }
}
