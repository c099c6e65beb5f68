use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output documentation format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocFormat {
    /// reStructuredText laid out for a Sphinx tree
    #[default]
    Sphinx,
    Markdown,
}

impl DocFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sphinx => "sphinx",
            Self::Markdown => "markdown",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Sphinx => "rst",
            Self::Markdown => "md",
        }
    }

    /// Markup name used when talking to the model
    pub fn markup_name(&self) -> &'static str {
        match self {
            Self::Sphinx => "reStructuredText (RST)",
            Self::Markdown => "Markdown",
        }
    }
}

impl fmt::Display for DocFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DocFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sphinx" | "rst" => Ok(Self::Sphinx),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!(
                "unknown format '{}' (expected sphinx or markdown)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Validated,
}

/// Validated documentation ready to persist.
///
/// Only the response validator constructs these; the output writer takes
/// them by value, so a record is written at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentationRecord {
    /// Path of the source unit this record documents
    pub source: PathBuf,
    /// Qualified name of the primary symbol, if any
    pub subject: Option<String>,
    pub text: String,
    pub format: DocFormat,
    pub status: ValidationStatus,
}

impl DocumentationRecord {
    pub(crate) fn validated(
        source: PathBuf,
        subject: Option<String>,
        text: String,
        format: DocFormat,
    ) -> Self {
        Self {
            source,
            subject,
            text,
            format,
            status: ValidationStatus::Validated,
        }
    }

    pub fn is_validated(&self) -> bool {
        self.status == ValidationStatus::Validated
    }

    /// Append a generated section after the validated text
    pub fn with_appendix(mut self, section: &str) -> Self {
        let section = section.trim_matches('\n');
        if !section.is_empty() {
            self.text.truncate(self.text.trim_end().len());
            self.text.push_str("\n\n");
            self.text.push_str(section);
            self.text.push('\n');
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str_aliases() {
        assert_eq!("RST".parse::<DocFormat>(), Ok(DocFormat::Sphinx));
        assert_eq!("md".parse::<DocFormat>(), Ok(DocFormat::Markdown));
        assert!("html".parse::<DocFormat>().is_err());
    }

    #[test]
    fn test_appendix_follows_text() {
        let record = DocumentationRecord::validated(
            PathBuf::from("a.scala"),
            None,
            "Title\n=====\n\n".to_string(),
            DocFormat::Sphinx,
        );
        let record = record.with_appendix("\nExtra\n-----\n");
        assert_eq!(record.text, "Title\n=====\n\nExtra\n-----\n");
        assert!(record.is_validated());

        let unchanged = record.clone().with_appendix("");
        assert_eq!(unchanged, record);
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(DocFormat::Sphinx.extension(), "rst");
        assert_eq!(DocFormat::Markdown.extension(), "md");
    }
}
