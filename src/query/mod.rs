//! Query DSL: tokenize, parse, execute; patterns; filters; pipelines.
//! New code — no teacher file implements a piped mini-language
//! — laid out as the teacher's own modules are, one file per concern.

pub mod executor;
pub mod parser;
pub mod pattern;
pub mod tokenizer;
pub mod wire;

use crate::error::IndexError;
use crate::registry::Provider;
use wire::QueryResult;

/// Parse and execute a full pipeline string against a provider, returning a
/// query-error-as-value result on parse failure — a parse failure is
/// surfaced as an `ErrorResult`, never a panic or propagated error.
pub fn run(provider: &dyn Provider, query: &str) -> QueryResult {
    match parser::parse_query(query) {
        Ok(stages) => executor::execute(provider, &stages),
        Err(e) => QueryResult::Error {
            message: IndexError::parse_failure(query, e.to_string()).to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, SymbolInfo, SymbolKind};
    use crate::registry::Registry;

    fn fixture_registry() -> Registry {
        let mut registry = Registry::new();
        let mut project = crate::index::ScipIndex::new("/proj", None);
        project.update_document(Document {
            relative_path: "lib/auth.dart".to_string(),
            language: "dart".to_string(),
            symbols: vec![
                SymbolInfo {
                    id: "pkg auth.dart/AuthService#".into(),
                    kind: SymbolKind::Class,
                    display_name: Some("AuthService".to_string()),
                    documentation: vec![],
                    relationships: vec![],
                    file: Some("lib/auth.dart".to_string()),
                    language: Some("dart".to_string()),
                },
                SymbolInfo {
                    id: "pkg auth.dart/AuthService#login.".into(),
                    kind: SymbolKind::Method,
                    display_name: Some("login".to_string()),
                    documentation: vec![],
                    relationships: vec![],
                    file: Some("lib/auth.dart".to_string()),
                    language: Some("dart".to_string()),
                },
            ],
            occurrences: vec![],
        });
        registry.project_index = Some(project);
        registry
    }

    #[test]
    fn runs_a_single_find_stage() {
        let registry = fixture_registry();
        let result = run(&registry, "find Auth*");
        assert_eq!(result.count(), 1);
    }

    #[test]
    fn parse_failure_becomes_error_result_not_panic() {
        let registry = fixture_registry();
        let result = run(&registry, "bogus-action");
        match result {
            QueryResult::Error { .. } => {}
            other => panic!("expected error result, got {other:?}"),
        }
    }

    #[test]
    fn pipeline_expands_members_of_matched_class() {
        let registry = fixture_registry();
        let result = run(&registry, "find AuthService | members");
        match result {
            QueryResult::Pipeline { results, .. } => {
                assert_eq!(results.len(), 1);
                assert_eq!(results[0].count(), 1);
            }
            other => panic!("expected pipeline result, got {other:?}"),
        }
    }
}
