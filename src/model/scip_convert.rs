//! Two-way mapping between this crate's value types and `scip::types::*`.
//!
//! Generalizes the teacher's one-way, best-effort `export_scip` (which only
//! ever produced SCIP from its own graph) into a lossless round trip: SCIP is
//! now both the ingest and the persisted-cache format (§4.G).

use protobuf::{EnumOrUnknown, MessageField};
use scip::types::symbol_information::Kind as ScipKind;
use scip::types::{Document as ScipDocument, Occurrence as ScipOccurrence, Relationship as ScipRelationship, SymbolInformation};

use super::{Document, OccurrenceInfo, Range, Relationship, Role, SymbolId, SymbolInfo, SymbolKind};

pub fn kind_to_scip(kind: SymbolKind) -> ScipKind {
    match kind {
        SymbolKind::Class => ScipKind::Class,
        SymbolKind::Method => ScipKind::Method,
        SymbolKind::Function => ScipKind::Function,
        SymbolKind::Field => ScipKind::Field,
        SymbolKind::Constructor => ScipKind::Constructor,
        SymbolKind::Enum => ScipKind::Enum,
        SymbolKind::EnumMember => ScipKind::EnumMember,
        SymbolKind::Interface => ScipKind::Interface,
        SymbolKind::Variable => ScipKind::Variable,
        SymbolKind::Property => ScipKind::Property,
        SymbolKind::Parameter => ScipKind::Parameter,
        SymbolKind::Getter => ScipKind::Getter,
        SymbolKind::Setter => ScipKind::Setter,
        SymbolKind::TypeAlias => ScipKind::TypeAlias,
        SymbolKind::Module => ScipKind::Module,
        SymbolKind::Namespace => ScipKind::Namespace,
        SymbolKind::Union => ScipKind::Union,
        // scip 0.6.1's Kind enum has no Mixin/Extension variants in every
        // build; fold them onto the closest structural analog rather than
        // losing the distinction silently (display_name + our own
        // SymbolInfo::kind is what the index actually keys queries on, this
        // mapping only affects the persisted/external wire form).
        SymbolKind::Mixin => ScipKind::Class,
        SymbolKind::Extension => ScipKind::Class,
        SymbolKind::Unspecified => ScipKind::UnspecifiedKind,
    }
}

pub fn kind_from_scip(kind: ScipKind) -> SymbolKind {
    match kind {
        ScipKind::Class => SymbolKind::Class,
        ScipKind::Method => SymbolKind::Method,
        ScipKind::Function => SymbolKind::Function,
        ScipKind::Field => SymbolKind::Field,
        ScipKind::Constructor => SymbolKind::Constructor,
        ScipKind::Enum => SymbolKind::Enum,
        ScipKind::EnumMember => SymbolKind::EnumMember,
        ScipKind::Interface | ScipKind::Trait | ScipKind::TypeClass => SymbolKind::Interface,
        ScipKind::Variable => SymbolKind::Variable,
        ScipKind::Property => SymbolKind::Property,
        ScipKind::Parameter | ScipKind::SelfParameter | ScipKind::ThisParameter => SymbolKind::Parameter,
        ScipKind::Getter => SymbolKind::Getter,
        ScipKind::Setter => SymbolKind::Setter,
        ScipKind::TypeAlias => SymbolKind::TypeAlias,
        ScipKind::Module | ScipKind::Package | ScipKind::File => SymbolKind::Module,
        ScipKind::Namespace => SymbolKind::Namespace,
        ScipKind::Union => SymbolKind::Union,
        _ => SymbolKind::Unspecified,
    }
}

pub fn relationship_to_scip(r: &Relationship) -> ScipRelationship {
    let mut out = ScipRelationship::new();
    out.symbol = r.target_id.as_str().to_string();
    out.is_reference = r.is_reference;
    out.is_implementation = r.is_implementation;
    out.is_type_definition = r.is_type_definition;
    out.is_definition = r.is_definition;
    out
}

pub fn relationship_from_scip(r: &ScipRelationship) -> Relationship {
    Relationship {
        target_id: SymbolId::from(r.symbol.as_str()),
        is_reference: r.is_reference,
        is_implementation: r.is_implementation,
        is_type_definition: r.is_type_definition,
        is_definition: r.is_definition,
    }
}

pub fn symbol_info_to_scip(info: &SymbolInfo) -> SymbolInformation {
    let mut out = SymbolInformation::new();
    out.symbol = info.id.as_str().to_string();
    out.kind = EnumOrUnknown::new(kind_to_scip(info.kind));
    if let Some(name) = &info.display_name {
        out.display_name = name.clone();
    }
    out.documentation = info.documentation.clone();
    out.relationships = info.relationships.iter().map(relationship_to_scip).collect();
    out
}

pub fn symbol_info_from_scip(sym: &SymbolInformation, file: Option<String>, language: Option<String>) -> SymbolInfo {
    SymbolInfo {
        id: SymbolId::from(sym.symbol.as_str()),
        kind: kind_from_scip(sym.kind.enum_value_or(ScipKind::UnspecifiedKind)),
        display_name: (!sym.display_name.is_empty()).then(|| sym.display_name.clone()),
        documentation: sym.documentation.clone(),
        relationships: sym.relationships.iter().map(relationship_from_scip).collect(),
        file,
        language,
    }
}

pub fn occurrence_to_scip(occ: &OccurrenceInfo) -> ScipOccurrence {
    let mut out = ScipOccurrence::new();
    out.range = occ.range.to_scip();
    out.symbol = occ.symbol.as_str().to_string();
    out.symbol_roles = if occ.is_definition {
        Role::DEFINITION.bits()
    } else {
        0
    };
    if let Some(end_line) = occ.enclosing_end_line {
        out.enclosing_range = vec![occ.range.start_line, occ.range.start_col, end_line, 0];
    }
    out
}

pub fn occurrence_from_scip(occ: &ScipOccurrence, file: &str) -> OccurrenceInfo {
    let roles = Role::from_bits_truncate(occ.symbol_roles);
    let enclosing_end_line = (occ.enclosing_range.len() >= 3).then(|| occ.enclosing_range[2]);
    OccurrenceInfo {
        file: file.to_string(),
        symbol: SymbolId::from(occ.symbol.as_str()),
        range: Range::from_scip(&occ.range),
        is_definition: roles.contains(Role::DEFINITION),
        enclosing_end_line,
    }
}

pub fn document_to_scip(doc: &Document) -> ScipDocument {
    let mut out = ScipDocument::new();
    out.relative_path = doc.relative_path.clone();
    out.language = doc.language.clone();
    out.symbols = doc.symbols.iter().map(symbol_info_to_scip).collect();
    out.occurrences = doc.occurrences.iter().map(occurrence_to_scip).collect();
    out
}

pub fn document_from_scip(doc: &ScipDocument) -> Document {
    let symbols = doc
        .symbols
        .iter()
        .map(|s| symbol_info_from_scip(s, Some(doc.relative_path.clone()), Some(doc.language.clone())))
        .collect();
    let occurrences = doc
        .occurrences
        .iter()
        .map(|o| occurrence_from_scip(o, &doc.relative_path))
        .collect();
    Document {
        relative_path: doc.relative_path.clone(),
        language: doc.language.clone(),
        symbols,
        occurrences,
    }
}

/// Build a full `scip::types::Index` message from a set of documents, filling
/// in `Metadata`/`ToolInfo` the way the teacher's exporter does.
pub fn build_index(project_root: &str, documents: &[Document]) -> scip::types::Index {
    let mut index = scip::types::Index::new();

    let mut tool_info = scip::types::ToolInfo::new();
    tool_info.name = "scip-index".to_string();
    tool_info.version = crate::version::package_version().to_string();

    let mut metadata = scip::types::Metadata::new();
    metadata.tool_info = MessageField::some(tool_info);
    metadata.project_root = project_root.to_string();
    metadata.version = EnumOrUnknown::new(scip::types::ProtocolVersion::UnspecifiedProtocolVersion);

    index.metadata = MessageField::some(metadata);
    index.documents = documents.iter().map(document_to_scip).collect();
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_info_round_trips_through_scip() {
        let info = SymbolInfo {
            id: SymbolId::from("scip-index rust pkg 1.0 a.rs/Foo#"),
            kind: SymbolKind::Class,
            display_name: Some("Foo".to_string()),
            documentation: vec!["doc line".to_string()],
            relationships: vec![],
            file: Some("a.rs".to_string()),
            language: Some("rust".to_string()),
        };
        let scip_sym = symbol_info_to_scip(&info);
        let back = symbol_info_from_scip(&scip_sym, Some("a.rs".to_string()), Some("rust".to_string()));
        assert_eq!(back.id, info.id);
        assert_eq!(back.kind, info.kind);
        assert_eq!(back.display_name, info.display_name);
    }

    #[test]
    fn occurrence_round_trips_definition_role() {
        let occ = OccurrenceInfo {
            file: "a.rs".to_string(),
            symbol: SymbolId::from("x"),
            range: Range {
                start_line: 0,
                start_col: 0,
                end_line: 0,
                end_col: 4,
            },
            is_definition: true,
            enclosing_end_line: Some(10),
        };
        let scip_occ = occurrence_to_scip(&occ);
        let back = occurrence_from_scip(&scip_occ, "a.rs");
        assert!(back.is_definition);
        assert_eq!(back.enclosing_end_line, Some(10));
    }
}
