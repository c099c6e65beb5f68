//! Language Detection Module
//!
//! Single table mapping extensions and tag aliases to a [`Language`].
//! Languages listed without a parser are recognized (so the batch report can
//! name them) but rejected with `UnsupportedLanguage` at parse time.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// Language Metadata Table
// =============================================================================

struct LanguageMeta {
    /// Display name (human-readable)
    display_name: &'static str,
    /// Lowercase tag, used in output paths and code fences
    tag: &'static str,
    extensions: &'static [&'static str],
    aliases: &'static [&'static str],
    has_parser: bool,
}

macro_rules! lang_meta {
    ($display:literal, $tag:literal, [$($ext:literal),*], [$($alias:literal),*], $parser:literal) => {
        LanguageMeta {
            display_name: $display,
            tag: $tag,
            extensions: &[$($ext),*],
            aliases: &[$($alias),*],
            has_parser: $parser,
        }
    };
}

impl Language {
    fn meta(&self) -> LanguageMeta {
        match self {
            Language::Scala => lang_meta!("Scala", "scala", ["scala", "sc"], ["scala"], true),
            Language::Python => lang_meta!("Python", "python", ["py", "pyi"], ["python", "py", "python3"], true),
            Language::Java => lang_meta!("Java", "java", ["java"], ["java"], true),
            Language::Rust => lang_meta!("Rust", "rust", ["rs"], ["rust", "rs"], true),

            Language::Kotlin => lang_meta!("Kotlin", "kotlin", ["kt", "kts"], ["kotlin", "kt"], false),
            Language::Go => lang_meta!("Go", "go", ["go"], ["go", "golang"], false),
            Language::TypeScript => lang_meta!("TypeScript", "typescript", ["ts", "tsx", "mts"], ["typescript", "ts"], false),
            Language::JavaScript => lang_meta!("JavaScript", "javascript", ["js", "jsx", "mjs", "cjs"], ["javascript", "js"], false),
            Language::C => lang_meta!("C", "c", ["c", "h"], ["c"], false),
            Language::Cpp => lang_meta!("C++", "cpp", ["cpp", "cc", "cxx", "hpp"], ["cpp", "c++"], false),
            Language::Ruby => lang_meta!("Ruby", "ruby", ["rb"], ["ruby", "rb"], false),

            Language::Unknown => lang_meta!("Unknown", "text", [], ["unknown", "text"], false),
        }
    }
}

// =============================================================================
// Language Enum Definition
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    // With parser
    Scala,
    Python,
    Java,
    Rust,

    // Recognized only
    Kotlin,
    Go,
    TypeScript,
    JavaScript,
    C,
    Cpp,
    Ruby,

    #[default]
    Unknown,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        self.meta().display_name
    }

    /// Lowercase tag (`scala`, `python`, ...)
    pub fn tag(&self) -> &'static str {
        self.meta().tag
    }

    pub fn from_extension(ext: &str) -> Self {
        let ext_lower = ext.to_lowercase();
        Self::all_variants()
            .iter()
            .copied()
            .find(|lang| lang.meta().extensions.contains(&ext_lower.as_str()))
            .unwrap_or(Language::Unknown)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Language::Unknown)
    }

    pub fn has_parser_support(&self) -> bool {
        self.meta().has_parser
    }

    /// Languages that have a parser
    pub fn supported() -> impl Iterator<Item = Language> {
        Self::all_variants()
            .iter()
            .copied()
            .filter(|l| l.has_parser_support())
    }

    fn all_variants() -> &'static [Language] {
        &[
            Language::Scala, Language::Python, Language::Java, Language::Rust,
            Language::Kotlin, Language::Go, Language::TypeScript, Language::JavaScript,
            Language::C, Language::Cpp, Language::Ruby,
        ]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Language {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s_lower = s.trim().to_lowercase();
        Self::all_variants()
            .iter()
            .copied()
            .find(|lang| lang.meta().aliases.contains(&s_lower.as_str()))
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Language::from_extension("scala"), Language::Scala);
        assert_eq!(Language::from_extension("SC"), Language::Scala);
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("java"), Language::Java);
        assert_eq!(Language::from_extension("rs"), Language::Rust);
        assert_eq!(Language::from_extension("kt"), Language::Kotlin);
        assert_eq!(Language::from_extension("xyz"), Language::Unknown);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            Language::from_path("src/main/scala/Transmission.scala"),
            Language::Scala
        );
        assert_eq!(Language::from_path("README"), Language::Unknown);
    }

    #[test]
    fn test_from_str_aliases() {
        assert_eq!("python3".parse::<Language>(), Ok(Language::Python));
        assert_eq!("RS".parse::<Language>(), Ok(Language::Rust));
        assert_eq!("golang".parse::<Language>(), Ok(Language::Go));
        assert!("cobol".parse::<Language>().is_err());
    }

    #[test]
    fn test_parser_support() {
        assert!(Language::Scala.has_parser_support());
        assert!(!Language::Kotlin.has_parser_support());
        assert!(!Language::Unknown.has_parser_support());
        assert_eq!(Language::supported().count(), 4);
    }
}
