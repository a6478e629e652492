//! Integration tests for the query pipeline DSL against a hand-built
//! `ScipIndex`, exercised the way `tests/cli_query_tests.rs` exercises
//! the teacher's own query layer — build real state over real files on
//! disk, run the public entry point, assert on the wire result.

use tempfile::TempDir;

use scip_index::{Document, OccurrenceInfo, Range, Registry, ScipIndex, SymbolInfo, SymbolKind};

fn sample_registry(root: &TempDir) -> Registry {
    std::fs::create_dir_all(root.path().join("src")).unwrap();
    std::fs::write(
        root.path().join("src/widget.rs"),
        "struct Widget;\n\nimpl Widget {\n    fn render(&self) {}\n}\n",
    )
    .unwrap();
    std::fs::write(root.path().join("src/app.rs"), "fn main() {\n    let _ = Widget;\n}\n").unwrap();

    let mut index = ScipIndex::new(root.path(), Some(root.path().to_path_buf()));

    let widget_id: scip_index::SymbolId = "pkg rust-analyzer proj 1.0 src/widget.rs/Widget#".into();
    let render_id: scip_index::SymbolId = "pkg rust-analyzer proj 1.0 src/widget.rs/Widget#render().".into();

    index.update_document(Document {
        relative_path: "src/widget.rs".to_string(),
        language: "rust".to_string(),
        symbols: vec![
            SymbolInfo {
                id: widget_id.clone(),
                kind: SymbolKind::Class,
                display_name: Some("Widget".to_string()),
                documentation: vec!["A drawable widget.".to_string()],
                relationships: vec![],
                file: Some("src/widget.rs".to_string()),
                language: Some("rust".to_string()),
            },
            SymbolInfo {
                id: render_id.clone(),
                kind: SymbolKind::Method,
                display_name: Some("render".to_string()),
                documentation: vec![],
                relationships: vec![],
                file: Some("src/widget.rs".to_string()),
                language: Some("rust".to_string()),
            },
        ],
        occurrences: vec![
            OccurrenceInfo {
                file: "src/widget.rs".to_string(),
                symbol: widget_id.clone(),
                range: Range { start_line: 0, start_col: 7, end_line: 0, end_col: 13 },
                is_definition: true,
                enclosing_end_line: Some(0),
            },
            OccurrenceInfo {
                file: "src/widget.rs".to_string(),
                symbol: render_id.clone(),
                range: Range { start_line: 3, start_col: 7, end_line: 3, end_col: 13 },
                is_definition: true,
                enclosing_end_line: Some(4),
            },
        ],
    });

    index.update_document(Document {
        relative_path: "src/app.rs".to_string(),
        language: "rust".to_string(),
        symbols: vec![],
        occurrences: vec![OccurrenceInfo {
            file: "src/app.rs".to_string(),
            symbol: widget_id,
            range: Range { start_line: 1, start_col: 12, end_line: 1, end_col: 18 },
            is_definition: false,
            enclosing_end_line: None,
        }],
    });

    let mut registry = Registry::new();
    registry.project_index = Some(index);
    registry
}

#[test]
fn find_matches_glob_against_display_name() {
    let tmp = TempDir::new().unwrap();
    let registry = sample_registry(&tmp);
    let result = scip_index::query::run(&registry, "find Widget*");
    assert_eq!(result.count(), 1);
}

#[test]
fn find_then_members_pipeline_returns_the_methods_of_the_matched_type() {
    let tmp = TempDir::new().unwrap();
    let registry = sample_registry(&tmp);
    let result = scip_index::query::run(&registry, "find Widget | members");
    // A multi-stage pipeline wraps its final stage's result under a tagged
    // envelope rather than returning it bare (`QueryResult::Pipeline`).
    let json = result.to_json();
    assert_eq!(json["type"], "pipeline");
    assert_eq!(json["results"][0]["count"], 1);
    assert_eq!(json["results"][0]["results"][0]["name"], "render");
}

#[test]
fn find_then_refs_counts_both_definition_and_usage_occurrences() {
    let tmp = TempDir::new().unwrap();
    let registry = sample_registry(&tmp);
    let result = scip_index::query::run(&registry, "find Widget | refs");
    let json = result.to_json();
    assert_eq!(json["results"][0]["count"], 2);
}

#[test]
fn kind_filter_excludes_non_matching_symbols() {
    let tmp = TempDir::new().unwrap();
    let registry = sample_registry(&tmp);
    let result = scip_index::query::run(&registry, "find * kind:method");
    assert_eq!(result.count(), 1);
}

#[test]
fn grep_finds_occurrences_of_a_literal_across_files_on_disk() {
    let tmp = TempDir::new().unwrap();
    let registry = sample_registry(&tmp);
    let result = scip_index::query::run(&registry, "grep /Widget/");
    // "Widget" appears on two lines of widget.rs (`struct Widget;`,
    // `impl Widget {`) plus one line of app.rs.
    assert_eq!(result.count(), 3);
}

#[test]
fn grep_include_glob_restricts_to_matching_paths() {
    let tmp = TempDir::new().unwrap();
    let registry = sample_registry(&tmp);
    let result = scip_index::query::run(&registry, "grep /Widget/ --include:*/app.rs");
    assert_eq!(result.count(), 1);
}

#[test]
fn stats_reports_file_and_symbol_totals() {
    let tmp = TempDir::new().unwrap();
    let registry = sample_registry(&tmp);
    let result = scip_index::query::run(&registry, "stats");
    let json = result.to_json();
    assert_eq!(json["stats"]["files"], 2);
    assert_eq!(json["stats"]["symbols"], 2);
}

#[test]
fn unknown_action_surfaces_as_an_error_result_not_a_panic() {
    let tmp = TempDir::new().unwrap();
    let registry = sample_registry(&tmp);
    let result = scip_index::query::run(&registry, "bogus Widget");
    assert!(matches!(result, scip_index::QueryResult::Error { .. }));
}

#[test]
fn find_then_members_pipeline_expands_every_matched_class_not_just_the_first() {
    // Spec §8 scenario 4: `find * kind:class | members` over {AuthService
    // (members: login, logout), UserRepo (members: fetch)} must produce a
    // pipeline with one MembersResult per matched class and total count 3.
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("src")).unwrap();
    std::fs::write(tmp.path().join("src/auth.rs"), "struct AuthService;\n").unwrap();

    let mut index = ScipIndex::new(tmp.path(), Some(tmp.path().to_path_buf()));
    let auth_id: scip_index::SymbolId = "pkg rust-analyzer proj 1.0 src/auth.rs/AuthService#".into();
    let login_id: scip_index::SymbolId = "pkg rust-analyzer proj 1.0 src/auth.rs/AuthService#login().".into();
    let logout_id: scip_index::SymbolId = "pkg rust-analyzer proj 1.0 src/auth.rs/AuthService#logout().".into();
    let repo_id: scip_index::SymbolId = "pkg rust-analyzer proj 1.0 src/auth.rs/UserRepo#".into();
    let fetch_id: scip_index::SymbolId = "pkg rust-analyzer proj 1.0 src/auth.rs/UserRepo#fetch().".into();

    let sym = |id: &scip_index::SymbolId, kind: SymbolKind, name: &str| SymbolInfo {
        id: id.clone(),
        kind,
        display_name: Some(name.to_string()),
        documentation: vec![],
        relationships: vec![],
        file: Some("src/auth.rs".to_string()),
        language: Some("rust".to_string()),
    };
    let def = |id: &scip_index::SymbolId, line: i32| OccurrenceInfo {
        file: "src/auth.rs".to_string(),
        symbol: id.clone(),
        range: Range { start_line: line, start_col: 0, end_line: line, end_col: 1 },
        is_definition: true,
        enclosing_end_line: Some(line + 1),
    };

    index.update_document(Document {
        relative_path: "src/auth.rs".to_string(),
        language: "rust".to_string(),
        symbols: vec![
            sym(&auth_id, SymbolKind::Class, "AuthService"),
            sym(&login_id, SymbolKind::Method, "login"),
            sym(&logout_id, SymbolKind::Method, "logout"),
            sym(&repo_id, SymbolKind::Class, "UserRepo"),
            sym(&fetch_id, SymbolKind::Method, "fetch"),
        ],
        occurrences: vec![def(&auth_id, 0), def(&login_id, 1), def(&logout_id, 2), def(&repo_id, 3), def(&fetch_id, 4)],
    });

    let mut registry = Registry::new();
    registry.project_index = Some(index);

    let result = scip_index::query::run(&registry, "find * kind:class | members");
    let json = result.to_json();
    assert_eq!(json["type"], "pipeline");
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    let total: u64 = results.iter().map(|r| r["count"].as_u64().unwrap()).sum();
    assert_eq!(total, 3);
}

#[test]
fn find_with_no_matches_surfaces_as_not_found() {
    let tmp = TempDir::new().unwrap();
    let registry = sample_registry(&tmp);
    let result = scip_index::query::run(&registry, "find Nonexistent | members");
    // The pipeline envelope survives even when the final stage comes up
    // empty; the `not_found` tag lives on the wrapped inner result.
    let json = result.to_json();
    assert_eq!(json["results"][0]["type"], "not_found");
}
