//! Symbols Command
//!
//! Prints the symbol outline the parsers extract from one file, without
//! contacting a model.

use std::fs;
use std::path::Path;

use crate::analyzer::parser::{parse_source, resolve_language};
use crate::cli::ui::Output;
use crate::types::{Result, SourceUnit};

/// Parse `path` and return its unit
pub fn load(path: &Path, language: Option<&str>) -> Result<SourceUnit> {
    let language = resolve_language(path, language)?;
    let content = fs::read_to_string(path)?;
    parse_source(path, &content, language)
}

pub fn run(path: &Path, language: Option<&str>, format: &str) -> Result<()> {
    let unit = load(path, language)?;
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(unit.symbols())?);
    } else {
        let out = Output::new();
        out.outline(&unit);
        out.info(&format!(
            "{} symbols, {} documentable",
            unit.symbols().len(),
            unit.documentable_symbols().count()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AutodocError;
    use tempfile::TempDir;

    #[test]
    fn test_load_python_outline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("helpers.py");
        fs::write(
            &path,
            "def greet(name: str) -> str:\n    return 'hi ' + name\n\ndef _hidden():\n    pass\n",
        )
        .unwrap();

        let unit = load(&path, None).unwrap();
        let names: Vec<_> = unit.documentable_symbols().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["greet"]);
    }

    #[test]
    fn test_load_unsupported_is_skip_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.go");
        fs::write(&path, "package main\n").unwrap();

        let err = load(&path, None).unwrap_err();
        assert!(err.is_skip());
        assert!(matches!(err, AutodocError::UnsupportedLanguage { .. }));
    }
}
