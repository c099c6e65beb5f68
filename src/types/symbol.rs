//! Symbol Model
//!
//! Language-neutral representation of one parsed source file. Every parser
//! produces a [`SourceUnit`]; everything downstream (prompting, validation,
//! output layout) reads only this model.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analyzer::parser::Language;

/// Kind of documentable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Module,
    Class,
    Object,
    Function,
    Field,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Class => "class",
            Self::Object => "object",
            Self::Function => "function",
            Self::Field => "field",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// A declared type, or `unknown` when the source does not state one
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeName {
    Known(String),
    Unknown,
}

impl TypeName {
    /// Normalizes whitespace; empty text becomes `Unknown`.
    pub fn from_source(text: &str) -> Self {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            Self::Unknown
        } else {
            Self::Known(collapsed)
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// `void`, `Unit`, `None` and `()` declare that nothing is returned
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Known(t) if matches!(t.as_str(), "void" | "Unit" | "None" | "()"))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(t) => t,
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: TypeName,
    pub description: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_name: TypeName) -> Self {
        Self {
            name: name.into(),
            type_name,
            description: None,
        }
    }
}

/// 1-based inclusive line range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: u32,
    pub end: u32,
}

impl LineSpan {
    pub fn from_node(node: tree_sitter::Node) -> Self {
        Self {
            start: node.start_position().row as u32 + 1,
            end: node.end_position().row as u32 + 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// Simple name as written in the source
    pub name: String,
    /// Dotted path from the outermost declaration, unique within the unit
    pub qualified_name: String,
    pub parameters: Vec<Parameter>,
    /// `None` for non-callables and constructors
    pub return_type: Option<TypeName>,
    /// Text of the doc comment immediately preceding the declaration
    pub doc_comment: String,
    pub span: LineSpan,
    pub visibility: Visibility,
    /// Declaring keyword, e.g. `case class`, `trait`, `def`, `val`
    pub declared_as: String,
    pub parent: Option<String>,
    /// Simple names of the types a class extends or implements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supertypes: Vec<String>,
}

impl Symbol {
    pub fn new(kind: SymbolKind, name: impl Into<String>, span: LineSpan) -> Self {
        let name = name.into();
        Self {
            kind,
            qualified_name: name.clone(),
            name,
            parameters: Vec::new(),
            return_type: None,
            doc_comment: String::new(),
            span,
            visibility: Visibility::Public,
            declared_as: kind.as_str().to_string(),
            parent: None,
            supertypes: Vec::new(),
        }
    }

    pub fn within(mut self, parent: Option<&str>) -> Self {
        if let Some(parent) = parent {
            self.qualified_name = format!("{}.{}", parent, self.name);
            self.parent = Some(parent.to_string());
        }
        self
    }

    pub fn declared_as(mut self, keyword: impl Into<String>) -> Self {
        self.declared_as = keyword.into();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_doc(mut self, doc: String) -> Self {
        self.doc_comment = doc;
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn extending(mut self, supertypes: Vec<String>) -> Self {
        self.supertypes = supertypes;
        self
    }

    pub fn returning(mut self, return_type: TypeName) -> Self {
        self.return_type = Some(return_type);
        self
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// Whether documentation must include a return slot for this symbol
    pub fn needs_return_doc(&self) -> bool {
        self.kind.is_callable() && self.return_type.as_ref().is_some_and(|t| !t.is_void())
    }

    /// Compact one-line signature used in prompts and CLI listings
    pub fn signature(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.type_name))
            .collect::<Vec<_>>()
            .join(", ");
        match (&self.kind, &self.return_type) {
            (SymbolKind::Function, Some(ret)) => {
                format!("{} {}({}) -> {}", self.declared_as, self.name, params, ret)
            }
            (SymbolKind::Function, None) | (SymbolKind::Class, _) if !params.is_empty() => {
                format!("{} {}({})", self.declared_as, self.name, params)
            }
            (SymbolKind::Field, Some(ty)) => format!("{} {}: {}", self.declared_as, self.name, ty),
            _ => format!("{} {}", self.declared_as, self.name),
        }
    }
}

/// One parsed input file. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub language: Language,
    pub text: String,
    pub package: Option<String>,
    pub imports: Vec<String>,
    symbols: Vec<Symbol>,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, language: Language, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language,
            text: text.into(),
            package: None,
            imports: Vec::new(),
            symbols: Vec::new(),
        }
    }

    /// Appends a symbol in declaration order, suffixing `#n` onto repeated
    /// qualified names (overloads) so every name stays unique.
    pub fn push_symbol(&mut self, mut symbol: Symbol) {
        let base = symbol.qualified_name.clone();
        let mut n = 1;
        while self
            .symbols
            .iter()
            .any(|s| s.qualified_name == symbol.qualified_name)
        {
            n += 1;
            symbol.qualified_name = format!("{}#{}", base, n);
        }
        self.symbols.push(symbol);
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Public symbols, in declaration order
    pub fn documentable_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.is_public())
    }

    pub fn find(&self, qualified_name: &str) -> Option<&Symbol> {
        self.symbols
            .iter()
            .find(|s| s.qualified_name == qualified_name)
    }

    /// Top-level declaration used for titles; falls back to the file stem.
    pub fn primary_name(&self) -> String {
        self.symbols
            .iter()
            .find(|s| s.parent.is_none() && matches!(s.kind, SymbolKind::Class | SymbolKind::Object))
            .map(|s| s.name.clone())
            .unwrap_or_else(|| self.stem())
    }

    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("index")
            .to_string()
    }

    pub fn file_name(&self) -> &Path {
        self.path.file_name().map(Path::new).unwrap_or(&self.path)
    }

    /// Symbol count by kind, for summaries
    pub fn kind_counts(&self) -> HashMap<SymbolKind, usize> {
        let mut counts = HashMap::new();
        for symbol in &self.symbols {
            *counts.entry(symbol.kind).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> LineSpan {
        LineSpan { start: 1, end: 1 }
    }

    #[test]
    fn test_qualified_names_unique_with_overloads() {
        let mut unit = SourceUnit::new("A.scala", Language::Scala, "");
        unit.push_symbol(Symbol::new(SymbolKind::Object, "A", span()));
        unit.push_symbol(Symbol::new(SymbolKind::Function, "send", span()).within(Some("A")));
        unit.push_symbol(Symbol::new(SymbolKind::Function, "send", span()).within(Some("A")));
        unit.push_symbol(Symbol::new(SymbolKind::Function, "send", span()).within(Some("A")));

        let names: Vec<_> = unit
            .symbols()
            .iter()
            .map(|s| s.qualified_name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "A.send", "A.send#2", "A.send#3"]);
    }

    #[test]
    fn test_type_name_from_source() {
        assert_eq!(TypeName::from_source("  "), TypeName::Unknown);
        assert_eq!(
            TypeName::from_source("Map[String,\n   Int]"),
            TypeName::Known("Map[String, Int]".into())
        );
        assert!(TypeName::Known("Unit".into()).is_void());
        assert!(!TypeName::Unknown.is_void());
    }

    #[test]
    fn test_needs_return_doc() {
        let unknown = Symbol::new(SymbolKind::Function, "f", span()).returning(TypeName::Unknown);
        let void = Symbol::new(SymbolKind::Function, "g", span())
            .returning(TypeName::Known("void".into()));
        let ctor = Symbol::new(SymbolKind::Function, "__init__", span());
        assert!(unknown.needs_return_doc());
        assert!(!void.needs_return_doc());
        assert!(!ctor.needs_return_doc());
    }

    #[test]
    fn test_signature_rendering() {
        let sym = Symbol::new(SymbolKind::Function, "sendData", span())
            .declared_as("def")
            .with_parameters(vec![Parameter::new(
                "data",
                TypeName::Known("String".into()),
            )])
            .returning(TypeName::Known("Boolean".into()));
        assert_eq!(sym.signature(), "def sendData(data: String) -> Boolean");
    }

    #[test]
    fn test_primary_name_falls_back_to_stem() {
        let unit = SourceUnit::new("pkg/helpers.py", Language::Python, "");
        assert_eq!(unit.primary_name(), "helpers");
    }
}
