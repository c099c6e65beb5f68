//! Documentation Response Validation
//!
//! Ordered structural completeness checks on a documentation payload:
//!
//! 1. disclaimer banner
//! 2. top-level heading
//! 3. an entry for every public symbol
//! 4. no debug or log text
//! 5. a parameter slot for every parameter and a return slot for every
//!    non-void callable
//!
//! The first failing check wins, and its error names exactly one missing
//! element. That error text becomes the model's correction message.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::sanitize::{adornment_char, is_underline, sanitize};
use crate::constants::validation::{BANNER_MARKERS, DEBUG_PHRASES};
use crate::types::{
    DocFormat, DocumentationRecord, SourceUnit, Symbol, SymbolKind, ValidationError,
    ValidationErrorKind,
};

static RE_RETURN_SLOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:[-*+]\s+)?(?::returns?:|:rtype:|\*{0,2}returns?\b)").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    Heading,
    Adornment,
    Directive,
    Definition,
    Text,
}

impl LineKind {
    fn is_boundary(self) -> bool {
        matches!(self, Self::Heading | Self::Directive)
    }

    fn is_entry(self) -> bool {
        matches!(self, Self::Heading | Self::Directive | Self::Definition)
    }
}

/// Line-level structure of a document
struct Outline<'a> {
    lines: Vec<&'a str>,
    kinds: Vec<LineKind>,
    has_top_level: bool,
}

impl<'a> Outline<'a> {
    fn new(text: &'a str, format: DocFormat) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        let mut kinds = vec![LineKind::Text; lines.len()];
        let mut has_top_level = false;
        let mut in_fence = false;

        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if format == DocFormat::Markdown && trimmed.starts_with("```") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                continue;
            }
            let kind = if trimmed.is_empty() {
                LineKind::Blank
            } else if i > 0 && kinds[i - 1] == LineKind::Text && is_underline(line, lines[i - 1])
            {
                kinds[i - 1] = LineKind::Heading;
                match format {
                    DocFormat::Sphinx => has_top_level = true,
                    DocFormat::Markdown => has_top_level |= adornment_char(line) == Some('='),
                }
                LineKind::Adornment
            } else if format == DocFormat::Sphinx && adornment_char(line).is_some() {
                LineKind::Adornment
            } else if format == DocFormat::Markdown && markdown_heading_level(trimmed).is_some() {
                has_top_level |= markdown_heading_level(trimmed) == Some(1);
                LineKind::Heading
            } else if format == DocFormat::Sphinx && trimmed.starts_with(".. ") {
                LineKind::Directive
            } else if is_definition(trimmed) {
                LineKind::Definition
            } else {
                LineKind::Text
            };
            kinds[i] = kind;
        }

        Self {
            lines,
            kinds,
            has_top_level,
        }
    }

    fn entries(&self) -> impl Iterator<Item = (usize, &'a str)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .filter(|(i, _)| self.kinds[*i].is_entry())
            .map(|(i, line)| (i, *line))
    }

    /// Lines belonging to the section opened at `start`
    fn section(&self, start: usize) -> &[&'a str] {
        let end = (start + 1..self.lines.len())
            .find(|&i| self.kinds[i].is_boundary())
            .unwrap_or(self.lines.len());
        &self.lines[start..end]
    }

    /// Where the documentation of `symbol` begins.
    ///
    /// Headings and directives come first; the n-th overload takes the n-th
    /// of them when there are enough. A definition line is the fallback.
    fn locate(&self, symbol: &Symbol) -> Option<usize> {
        let overload = symbol
            .qualified_name
            .rsplit_once('#')
            .and_then(|(_, n)| n.parse::<usize>().ok())
            .unwrap_or(1);

        let headed: Vec<usize> = self
            .entries()
            .filter(|(i, line)| {
                self.kinds[*i].is_boundary() && contains_word(line, &symbol.name)
            })
            .map(|(i, _)| i)
            .collect();

        headed
            .get(overload.saturating_sub(1))
            .or_else(|| headed.first())
            .copied()
            .or_else(|| {
                self.entries()
                    .find(|(_, line)| contains_word(line, &symbol.name))
                    .map(|(i, _)| i)
            })
    }
}

fn markdown_heading_level(trimmed: &str) -> Option<usize> {
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    let rest = &trimmed[level..];
    ((1..=6).contains(&level) && (rest.is_empty() || rest.starts_with([' ', '\t'])))
        .then_some(level)
}

fn is_definition(trimmed: &str) -> bool {
    trimmed.starts_with([':', '-', '*', '+', '|', '`'])
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whole-word containment; `word` may itself contain non-word characters.
pub(crate) fn contains_word(line: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    line.match_indices(word).any(|(i, _)| {
        let before = line[..i].chars().next_back();
        let after = line[i + word.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

/// Whether `text` carries a top-level heading in `format`
pub fn has_top_level_heading(text: &str, format: DocFormat) -> bool {
    let cleaned = sanitize(text, format);
    Outline::new(&cleaned, format).has_top_level
}

/// Validates documentation payloads against the symbols of one unit
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    format: DocFormat,
    debug_phrases: Vec<String>,
}

impl ResponseValidator {
    pub fn new(format: DocFormat) -> Self {
        Self {
            format,
            debug_phrases: DEBUG_PHRASES.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Add phrases on top of the built-in debug list
    pub fn with_extra_debug_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for phrase in phrases {
            let phrase = phrase.into();
            if !phrase.is_empty() && !self.debug_phrases.contains(&phrase) {
                self.debug_phrases.push(phrase);
            }
        }
        self
    }

    pub fn format(&self) -> DocFormat {
        self.format
    }

    /// Validate a raw payload for `unit`.
    ///
    /// Pure: the same input always yields the same result.
    pub fn validate(
        &self,
        raw: &str,
        unit: &SourceUnit,
    ) -> std::result::Result<DocumentationRecord, ValidationError> {
        let text = sanitize(raw, self.format);
        let outline = Outline::new(&text, self.format);

        self.check_banner(&text)?;
        self.check_heading(&outline)?;
        self.check_symbols(&outline, unit)?;
        self.check_debug_text(&text)?;
        self.check_slots(&outline, unit)?;

        let subject = unit
            .symbols()
            .iter()
            .find(|s| s.parent.is_none() && matches!(s.kind, SymbolKind::Class | SymbolKind::Object))
            .map(|s| s.qualified_name.clone());

        Ok(DocumentationRecord::validated(
            unit.path.clone(),
            subject,
            text,
            self.format,
        ))
    }

    fn check_banner(&self, text: &str) -> std::result::Result<(), ValidationError> {
        let lower = text.to_lowercase();
        if BANNER_MARKERS.iter().any(|m| lower.contains(m)) {
            return Ok(());
        }
        Err(ValidationError::new(
            ValidationErrorKind::MissingBanner,
            "disclaimer banner",
            "the document must state that it was auto-generated",
        ))
    }

    fn check_heading(&self, outline: &Outline<'_>) -> std::result::Result<(), ValidationError> {
        if outline.has_top_level {
            return Ok(());
        }
        let expected = match self.format {
            DocFormat::Sphinx => "an RST title underlined with `=`",
            DocFormat::Markdown => "a `# ` heading",
        };
        Err(ValidationError::new(
            ValidationErrorKind::MissingHeading,
            "top-level heading",
            format!("no top-level heading found; expected {}", expected),
        ))
    }

    fn check_symbols(
        &self,
        outline: &Outline<'_>,
        unit: &SourceUnit,
    ) -> std::result::Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for symbol in unit.documentable_symbols() {
            if !seen.insert(symbol.name.as_str()) {
                continue;
            }
            let documented = outline
                .entries()
                .any(|(_, line)| contains_word(line, &symbol.name));
            if !documented {
                return Err(ValidationError::new(
                    ValidationErrorKind::MissingSymbol,
                    &symbol.qualified_name,
                    format!(
                        "{} `{}` has no documentation entry (heading, directive or definition line)",
                        symbol.kind, symbol.name
                    ),
                ));
            }
        }
        Ok(())
    }

    fn check_debug_text(&self, text: &str) -> std::result::Result<(), ValidationError> {
        match self.debug_phrases.iter().find(|p| text.contains(p.as_str())) {
            Some(phrase) => Err(ValidationError::new(
                ValidationErrorKind::DebugText,
                phrase,
                format!("debug or log text `{}` must be removed", phrase),
            )),
            None => Ok(()),
        }
    }

    fn check_slots(
        &self,
        outline: &Outline<'_>,
        unit: &SourceUnit,
    ) -> std::result::Result<(), ValidationError> {
        for symbol in unit
            .documentable_symbols()
            .filter(|s| s.kind.is_callable())
        {
            let Some(start) = outline.locate(symbol) else {
                continue;
            };
            let section = outline.section(start);
            let body = &section[1..];

            for param in &symbol.parameters {
                let has_slot = body.iter().any(|line| {
                    let trimmed = line.trim();
                    (is_definition(trimmed) && contains_word(trimmed, &param.name))
                        || trimmed
                            .strip_prefix(param.name.as_str())
                            .is_some_and(|rest| !rest.starts_with(is_ident_char))
                });
                if !has_slot {
                    return Err(ValidationError::new(
                        ValidationErrorKind::MissingParameter,
                        format!("{}.{}", symbol.qualified_name, param.name),
                        format!(
                            "parameter `{}` ({}) of `{}` is not documented",
                            param.name, param.type_name, symbol.name
                        ),
                    ));
                }
            }

            if symbol.needs_return_doc() && !body.iter().any(|line| RE_RETURN_SLOT.is_match(line))
            {
                let ret = symbol
                    .return_type
                    .as_ref()
                    .map(|t| t.to_string())
                    .unwrap_or_default();
                return Err(ValidationError::new(
                    ValidationErrorKind::MissingReturn,
                    &symbol.qualified_name,
                    format!(
                        "return value ({}) of `{}` is not documented",
                        ret, symbol.name
                    ),
                ));
            }
        }
        Ok(())
    }
}
