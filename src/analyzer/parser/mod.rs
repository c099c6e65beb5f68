//! Language Parser Module
//!
//! Tree-sitter based parsers producing the shared symbol model.
//!
//! ## Parser Factory
//!
//! Dispatch is a fixed table from [`Language`] to a parser. Adding a language
//! means adding one variant and one arm in [`create_parser`].
//!
//! ```rust,ignore
//! use autodoc::analyzer::parser::{Language, parse_source};
//!
//! let unit = parse_source(Path::new("Transmission.scala"), content, Language::Scala)?;
//! for symbol in unit.symbols() {
//!     println!("{}", symbol.qualified_name);
//! }
//! ```

pub mod java;
pub mod language;
pub mod python;
pub mod rust_lang;
pub mod scala;
pub mod traits;

pub use java::JavaParser;
pub use language::Language;
pub use python::PythonParser;
pub use rust_lang::RustParser;
pub use scala::ScalaParser;
pub use traits::{
    SourceParser, check_syntax, clean_doc_comment, create_ts_parser, declaration_header,
    describe_parameters, field_text, get_node_text, header_visibility, param_descriptions,
    parse_tree, preceding_block_doc, preceding_line_docs, query_texts, supertype_names,
};

use std::path::Path;

use crate::types::{AutodocError, Result, SourceUnit};

/// Create a parser for the given language.
///
/// Languages without a parser yield `AutodocError::UnsupportedLanguage`.
pub fn create_parser(language: Language) -> Result<Box<dyn SourceParser>> {
    match language {
        Language::Scala => Ok(Box::new(ScalaParser::new()?)),
        Language::Python => Ok(Box::new(PythonParser::new()?)),
        Language::Java => Ok(Box::new(JavaParser::new()?)),
        Language::Rust => Ok(Box::new(RustParser::new()?)),
        _ => Err(AutodocError::UnsupportedLanguage {
            language: language.tag().to_string(),
            path: String::new(),
        }),
    }
}

/// Parse `content` as `language`, attributing errors to `path`.
pub fn parse_source(path: &Path, content: &str, language: Language) -> Result<SourceUnit> {
    let parser = create_parser(language).map_err(|e| match e {
        AutodocError::UnsupportedLanguage { language, .. } => AutodocError::UnsupportedLanguage {
            language,
            path: path.display().to_string(),
        },
        other => other,
    })?;
    let unit = parser.parse(path, content)?;
    tracing::debug!(
        path = %path.display(),
        language = %language,
        symbols = unit.symbols().len(),
        "Parsed source unit"
    );
    Ok(unit)
}

/// Resolve a language from an explicit tag, falling back to the extension.
///
/// An explicit tag that names no known language is reported as unsupported
/// rather than silently replaced by extension detection.
pub fn resolve_language(path: &Path, explicit: Option<&str>) -> Result<Language> {
    let language = match explicit {
        Some(tag) => tag
            .parse::<Language>()
            .map_err(|_| AutodocError::UnsupportedLanguage {
                language: tag.to_string(),
                path: path.display().to_string(),
            })?,
        None => Language::from_path(path),
    };

    if !language.has_parser_support() {
        let tag = match (explicit, language) {
            (Some(tag), _) => tag.to_string(),
            (None, Language::Unknown) => path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{}", e))
                .unwrap_or_else(|| "unknown".to_string()),
            (None, lang) => lang.tag().to_string(),
        };
        return Err(AutodocError::UnsupportedLanguage {
            language: tag,
            path: path.display().to_string(),
        });
    }
    Ok(language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_parser_dispatch() {
        for language in Language::supported() {
            let parser = create_parser(language).unwrap();
            assert_eq!(parser.language(), language);
        }
    }

    #[test]
    fn test_create_parser_unsupported() {
        let err = create_parser(Language::Kotlin).err().unwrap();
        assert!(matches!(err, AutodocError::UnsupportedLanguage { .. }));
    }

    #[test]
    fn test_resolve_language() {
        assert_eq!(
            resolve_language(Path::new("a/B.scala"), None).unwrap(),
            Language::Scala
        );
        assert_eq!(
            resolve_language(Path::new("script"), Some("py")).unwrap(),
            Language::Python
        );
        assert!(resolve_language(Path::new("a.kt"), None).unwrap_err().is_skip());
        assert!(resolve_language(Path::new("a.txt"), None).unwrap_err().is_skip());
        assert!(
            resolve_language(Path::new("a.scala"), Some("cobol"))
                .unwrap_err()
                .is_skip()
        );
    }

    #[test]
    fn test_parse_source_attributes_path() {
        let err = parse_source(Path::new("x.go"), "package main", Language::Go).unwrap_err();
        match err {
            AutodocError::UnsupportedLanguage { path, .. } => assert_eq!(path, "x.go"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
