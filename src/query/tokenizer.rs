//! Splits a pipeline string into stages on top-level `|`, respecting `/…/`
//! regex literals (which may themselves contain `|` for alternation) and
//! quoted arguments.

pub fn split_pipeline(query: &str) -> Vec<String> {
    let mut stages = Vec::new();
    let mut current = String::new();
    let mut in_regex = false;
    let mut in_quotes: Option<char> = None;
    let mut chars = query.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_regex => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '/' if in_quotes.is_none() => {
                in_regex = !in_regex;
                current.push(c);
            }
            '\'' | '"' if !in_regex => {
                match in_quotes {
                    Some(q) if q == c => in_quotes = None,
                    None => in_quotes = Some(c),
                    _ => {}
                }
                current.push(c);
            }
            '|' if !in_regex && in_quotes.is_none() => {
                stages.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() || stages.is_empty() {
        stages.push(current.trim().to_string());
    }
    stages.into_iter().filter(|s| !s.is_empty()).collect()
}

/// Splits a single stage into whitespace-separated tokens, keeping `/…/flags`
/// regex literals and single/double-quoted strings intact.
pub fn split_tokens(stage: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_regex = false;
    let mut in_quotes: Option<char> = None;
    let mut chars = stage.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_regex => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '/' if in_quotes.is_none() => {
                in_regex = !in_regex;
                current.push(c);
            }
            '\'' | '"' if !in_regex => {
                match in_quotes {
                    Some(q) if q == c => {
                        in_quotes = None;
                        current.push(c);
                    }
                    None => {
                        in_quotes = Some(c);
                        current.push(c);
                    }
                    _ => current.push(c),
                }
            }
            c if c.is_whitespace() && !in_regex && in_quotes.is_none() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
