//! SCIP value types: Symbol, Occurrence, Document, Relationship, Kind, Role.
//!
//! Plain newtypes over the wire format the `scip` crate already gives us
//! (`scip::types::*`), generalized from the teacher's one-way, best-effort
//! exporter (`graph/export/scip.rs`) into a lossless two-way mapping — see
//! [`scip_convert`]. This module carries no I/O and no indexing logic; it is
//! the "Symbol, Occurrence, Document" vocabulary everything else builds on.

pub mod scip_convert;

use std::fmt;
use std::sync::Arc;

/// Opaque SCIP symbol identity. Cheap to clone (`Arc<str>` backed) since it is
/// used as a hash map key throughout the index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(Arc<str>);

impl SymbolId {
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        SymbolId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parent derivation from the SymbolId string: the enclosing
    /// type is `S[0..=last_hash]` when the last `#` occurs after the last `/`
    /// and at least one character follows it. Otherwise there is no parent.
    pub fn parent(&self) -> Option<SymbolId> {
        let s = self.as_str();
        let last_slash = s.rfind('/');
        let last_hash = s.rfind('#')?;
        let after_slash = last_slash.map_or(true, |ls| last_hash > ls);
        if after_slash && last_hash + 1 < s.len() {
            Some(SymbolId::new(&s[..=last_hash]))
        } else {
            None
        }
    }

    /// Name derivation fallback chain, used when
    /// `SymbolInfo::display_name` is empty.
    pub fn derive_name(&self) -> String {
        let s = self.as_str();

        if let Some(name) = extract_backtick_accessor(s, "<get>").or_else(|| extract_backtick_accessor(s, "<set>")) {
            return name;
        }

        if s.contains("`<constructor>`") {
            if let Some(name) = extract_constructor_class_name(s) {
                return name;
            }
        }

        if let Some(name) = extract_any_backtick(s) {
            return name;
        }

        if let Some(name) = extract_trailing_identifier(s) {
            return name;
        }

        s.to_string()
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SymbolId {
    fn from(s: String) -> Self {
        SymbolId(s.into())
    }
}

impl From<&str> for SymbolId {
    fn from(s: &str) -> Self {
        SymbolId(Arc::from(s))
    }
}

fn extract_backtick_accessor(s: &str, marker: &str) -> Option<String> {
    // Matches `` `<get>NAME` `` / `` `<set>NAME` ``.
    let needle = format!("`{marker}");
    let start = s.find(&needle)? + needle.len();
    let rest = &s[start..];
    let end = rest.find('`')?;
    let name = &rest[..end];
    (!name.is_empty()).then(|| name.to_string())
}

fn extract_constructor_class_name(s: &str) -> Option<String> {
    // `(NAME)#` preceding `` `<constructor>` ``.
    let ctor_pos = s.find("`<constructor>`")?;
    let before = &s[..ctor_pos];
    let hash_pos = before.rfind('#')?;
    let before_hash = &before[..hash_pos];
    let slash_pos = before_hash.rfind('/').map(|p| p + 1).unwrap_or(0);
    let name = &before_hash[slash_pos..];
    (!name.is_empty()).then(|| name.to_string())
}

fn extract_any_backtick(s: &str) -> Option<String> {
    let start = s.find('`')? + 1;
    let rest = &s[start..];
    let end = rest.find('`')?;
    let name = &rest[..end];
    (!name.is_empty()).then(|| name.to_string())
}

fn extract_trailing_identifier(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut end = bytes.len();
    while end > 0 {
        let c = bytes[end - 1] as char;
        if c.is_ascii_alphanumeric() || c == '_' {
            break;
        }
        end -= 1;
    }
    if end == 0 {
        return None;
    }
    let mut start = end;
    while start > 0 {
        let c = bytes[start - 1] as char;
        if c.is_ascii_alphanumeric() || c == '_' {
            start -= 1;
        } else {
            break;
        }
    }
    let ident = &s[start..end];
    let first = ident.chars().next()?;
    if first.is_ascii_digit() {
        return None;
    }
    (!ident.is_empty()).then(|| ident.to_string())
}

/// A zero-based half-open-on-lines range: `(start_line, start_col, end_line, end_col)`.
/// SCIP's 3-element shorthand (same end line) is normalized to 4 on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start_line: i32,
    pub start_col: i32,
    pub end_line: i32,
    pub end_col: i32,
}

impl Range {
    pub fn from_scip(range: &[i32]) -> Self {
        match range {
            [start_line, start_col, end_col] => Range {
                start_line: *start_line,
                start_col: *start_col,
                end_line: *start_line,
                end_col: *end_col,
            },
            [start_line, start_col, end_line, end_col] => Range {
                start_line: *start_line,
                start_col: *start_col,
                end_line: *end_line,
                end_col: *end_col,
            },
            _ => Range {
                start_line: 0,
                start_col: 0,
                end_line: 0,
                end_col: 0,
            },
        }
    }

    pub fn to_scip(self) -> Vec<i32> {
        if self.start_line == self.end_line {
            vec![self.start_line, self.start_col, self.end_col]
        } else {
            vec![self.start_line, self.start_col, self.end_line, self.end_col]
        }
    }
}

/// Symbol kind, matching the set enumerated. A superset of what
/// the `scip` crate's `symbol_information::Kind` carries; conversion lives in
/// [`scip_convert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Class,
    Method,
    Function,
    Field,
    Constructor,
    Enum,
    EnumMember,
    Interface,
    Variable,
    Property,
    Parameter,
    Mixin,
    Extension,
    Getter,
    Setter,
    TypeAlias,
    Module,
    Namespace,
    Union,
    Unspecified,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "Class",
            SymbolKind::Method => "Method",
            SymbolKind::Function => "Function",
            SymbolKind::Field => "Field",
            SymbolKind::Constructor => "Constructor",
            SymbolKind::Enum => "Enum",
            SymbolKind::EnumMember => "EnumMember",
            SymbolKind::Interface => "Interface",
            SymbolKind::Variable => "Variable",
            SymbolKind::Property => "Property",
            SymbolKind::Parameter => "Parameter",
            SymbolKind::Mixin => "Mixin",
            SymbolKind::Extension => "Extension",
            SymbolKind::Getter => "Getter",
            SymbolKind::Setter => "Setter",
            SymbolKind::TypeAlias => "TypeAlias",
            SymbolKind::Module => "Module",
            SymbolKind::Namespace => "Namespace",
            SymbolKind::Union => "Union",
            SymbolKind::Unspecified => "Unspecified",
        }
    }

    pub fn from_str_ci(s: &str) -> Option<Self> {
        Some(match s.to_lowercase().as_str() {
            "class" | "struct" => SymbolKind::Class,
            "method" => SymbolKind::Method,
            "function" | "fn" => SymbolKind::Function,
            "field" => SymbolKind::Field,
            "constructor" | "ctor" => SymbolKind::Constructor,
            "enum" => SymbolKind::Enum,
            "enummember" | "enum member" | "variant" => SymbolKind::EnumMember,
            "interface" | "trait" => SymbolKind::Interface,
            "variable" | "var" => SymbolKind::Variable,
            "property" | "prop" => SymbolKind::Property,
            "parameter" | "param" => SymbolKind::Parameter,
            "mixin" => SymbolKind::Mixin,
            "extension" => SymbolKind::Extension,
            "getter" => SymbolKind::Getter,
            "setter" => SymbolKind::Setter,
            "typealias" | "type alias" | "type" => SymbolKind::TypeAlias,
            "module" | "mod" => SymbolKind::Module,
            "namespace" | "ns" => SymbolKind::Namespace,
            "union" => SymbolKind::Union,
            "unspecified" | "unknown" => SymbolKind::Unspecified,
            _ => return None,
        })
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

bitflags::bitflags! {
    /// Occurrence role bits, mirroring `scip::types::SymbolRole`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Role: i32 {
        const DEFINITION = 0x1;
        const IMPORT = 0x2;
        const WRITE_ACCESS = 0x4;
        const READ_ACCESS = 0x8;
        const GENERATED = 0x10;
        const TEST = 0x20;
        const FORWARD_DEFINITION = 0x40;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub target_id: SymbolId,
    pub is_reference: bool,
    pub is_implementation: bool,
    pub is_type_definition: bool,
    pub is_definition: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub id: SymbolId,
    pub kind: SymbolKind,
    pub display_name: Option<String>,
    pub documentation: Vec<String>,
    pub relationships: Vec<Relationship>,
    pub file: Option<String>,
    pub language: Option<String>,
}

impl SymbolInfo {
    /// Resolved name: `display_name` if present, else derived from the id
    /// (name derivation chain).
    pub fn name(&self) -> String {
        match &self.display_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self.id.derive_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceInfo {
    pub file: String,
    pub symbol: SymbolId,
    pub range: Range,
    pub is_definition: bool,
    pub enclosing_end_line: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub relative_path: String,
    pub language: String,
    pub symbols: Vec<SymbolInfo>,
    pub occurrences: Vec<OccurrenceInfo>,
}
