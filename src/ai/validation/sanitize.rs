//! Payload normalization
//!
//! Cleans up the formatting slips models make most often before any
//! structural check runs:
//! - a code fence wrapped around the whole document
//! - `// filepath:` header lines
//! - RST underlines shorter or longer than their title
//! - long runs of blank lines

use std::sync::LazyLock;

use regex::Regex;

use crate::types::DocFormat;

static RE_FILEPATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?://|#|<!--|\.\.)?[ \t]*filepath:.*(?:\r?\n|$)").unwrap()
});

static RE_BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){3,}").unwrap());

/// Characters RST accepts as section adornment
pub(crate) const ADORNMENT_CHARS: &[char] = &['=', '-', '~', '^', '*', '#', '+', '"', '\'', '_'];

/// Normalize a raw documentation payload
pub fn sanitize(raw: &str, format: DocFormat) -> String {
    let mut text = raw.trim_start_matches('\u{feff}').trim().replace("\r\n", "\n");

    if let Some(inner) = strip_wrapping_fence(&text) {
        text = inner;
    }

    text = RE_FILEPATH.replace_all(&text, "").into_owned();

    if format == DocFormat::Sphinx {
        text = fix_underlines(&text);
    }

    text = RE_BLANK_RUN.replace_all(&text, "\n\n").into_owned();

    let mut text = text.trim().to_string();
    text.push('\n');
    text
}

/// Inner text of a fence that spans the whole document
fn strip_wrapping_fence(s: &str) -> Option<String> {
    if !s.starts_with("```") || !s.ends_with("```") {
        return None;
    }
    let first_newline = s.find('\n')?;
    let last_newline = s.rfind('\n')?;
    if last_newline <= first_newline || s[last_newline..].trim() != "```" {
        return None;
    }
    Some(s[first_newline + 1..last_newline].to_string())
}

/// Underline-shaped line: one repeated adornment character at column 0
pub(crate) fn adornment_char(line: &str) -> Option<char> {
    let line = line.trim_end();
    let first = line.chars().next()?;
    if !ADORNMENT_CHARS.contains(&first) || !line.chars().all(|c| c == first) {
        return None;
    }
    Some(first)
}

/// Whether `line` underlines `title`
pub(crate) fn is_underline(line: &str, title: &str) -> bool {
    let title = title.trim_end();
    if title.trim().is_empty() || title.starts_with([' ', '\t']) || adornment_char(title).is_some()
    {
        return false;
    }
    let len = line.trim_end().chars().count();
    adornment_char(line).is_some() && (len >= 2 || len >= title.chars().count())
}

/// Resize every RST underline (and matching overline) to its title width
fn fix_underlines(text: &str) -> String {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();

    for i in 1..lines.len() {
        if !is_underline(&lines[i], &lines[i - 1]) {
            continue;
        }
        let Some(ch) = adornment_char(&lines[i]) else {
            continue;
        };
        let width = lines[i - 1].trim_end().chars().count();
        let fixed = ch.to_string().repeat(width);
        if i >= 2 && adornment_char(&lines[i - 2]) == Some(ch) {
            lines[i - 2] = fixed.clone();
        }
        lines[i] = fixed;
    }

    lines.join("\n")
}
