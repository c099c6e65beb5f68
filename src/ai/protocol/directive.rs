//! Tool directive recognition
//!
//! Models are inconsistent about how they phrase a tool call, so recognition
//! is tolerant about form and strict about outcome: anything that does not
//! resolve to a complete [`ToolCall`] is treated as no call at all.
//!
//! Accepted forms:
//!
//! ```text
//! read_file("src/Link.scala")
//! read_file(path='src/Link.scala')
//! save_documentation("docs/Link.rst") -> <<<
//! ...document...
//! >>>
//! save_documentation(docs/Link.rst) -> ```rst
//! ...document...
//! ```
//! save_documentation("docs/Link.rst", """...document...""")
//! save_documentation("docs/Link.rst", content="Link\n====\n...")
//! {"tool": "read_file", "path": "src/Link.scala"}
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::ToolCall;
use crate::ai::validation::has_top_level_heading;
use crate::constants::protocol::REFUSAL_MARKERS;
use crate::types::DocFormat;

/// Opening marker of a `save_documentation` payload
pub const PAYLOAD_OPEN: &str = "<<<";
/// Closing marker of a `save_documentation` payload, on a line of its own
pub const PAYLOAD_CLOSE: &str = ">>>";

static RE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\b(read_file|save_documentation)\s*\(\s*(?:path\s*=\s*)?(?:"([^"\n]*)"|'([^'\n]*)'|([^\s"'(),]+))\s*\)"#,
    )
    .unwrap()
});

/// Head of the two-argument form, up to the opening quote of the content
static RE_SAVE_INLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\bsave_documentation\s*\(\s*(?:path\s*=\s*)?(?:"([^"\n]*)"|'([^'\n]*)')\s*,\s*(?:content\s*=\s*)?"#,
    )
    .unwrap()
});

static RE_JSON_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{\s*"tool"\s*:"#).unwrap());

static RE_ARROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*(?:->|=>|:)?[ \t]*(?:\r?\n[ \t]*)*").unwrap());

/// What a model reply amounts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// One or more tool calls, in the order they appear
    Calls(Vec<ToolCall>),
    /// No directive, but the text is itself a document
    Document(String),
    /// The model says it cannot go on
    Refusal(String),
    /// Nothing actionable
    Empty,
}

/// Classify a model reply.
///
/// Tool directives win over everything else; a reply without any is checked
/// for a top-level heading in `format`, then for a refusal.
pub fn parse_reply(text: &str, format: DocFormat) -> Reply {
    let calls = parse_tool_calls(text);
    if !calls.is_empty() {
        return Reply::Calls(calls);
    }
    if has_top_level_heading(text, format) {
        return Reply::Document(text.to_string());
    }
    let lower = text.to_lowercase();
    if REFUSAL_MARKERS.iter().any(|m| lower.contains(m)) {
        return Reply::Refusal(text.trim().to_string());
    }
    Reply::Empty
}

/// Extract every well-formed tool call, in order of appearance.
///
/// Text inside a recognized save payload is never scanned for further calls.
pub fn parse_tool_calls(text: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    let mut cursor = 0;

    while cursor < text.len() {
        let rest = &text[cursor..];
        let call = RE_CALL.captures(rest);
        let call_start = call
            .as_ref()
            .and_then(|c| c.get(0))
            .map_or(usize::MAX, |m| m.start());
        let inline = RE_SAVE_INLINE.captures(rest);
        let inline_start = inline
            .as_ref()
            .and_then(|c| c.get(0))
            .map_or(usize::MAX, |m| m.start());
        let json_start = RE_JSON_START.find(rest).map_or(usize::MAX, |m| m.start());

        if call_start == usize::MAX && json_start == usize::MAX && inline_start == usize::MAX {
            break;
        }

        if json_start < call_start && json_start < inline_start {
            match parse_json_call(&rest[json_start..]) {
                Some((tool_call, consumed)) => {
                    calls.push(tool_call);
                    cursor += json_start + consumed;
                }
                None => cursor += json_start + 1,
            }
            continue;
        }

        if inline_start < call_start {
            let Some(caps) = inline else { break };
            let Some(head) = caps.get(0) else { break };
            let path = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            let after = cursor + head.end();
            match inline_argument(&text[after..]) {
                Some((content, consumed)) if !path.is_empty() => {
                    calls.push(ToolCall::SaveDocumentation { path, content });
                    cursor = after + consumed;
                }
                _ => {
                    tracing::debug!(path = %path, "save directive with a malformed content argument");
                    cursor = after;
                }
            }
            continue;
        }

        let Some(caps) = call else { break };
        let Some(whole) = caps.get(0) else { break };
        let path = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        let after = cursor + whole.end();

        if path.is_empty() {
            cursor = after;
            continue;
        }

        if &caps[1] == crate::constants::protocol::READ_FILE {
            calls.push(ToolCall::ReadFile { path });
            cursor = after;
        } else {
            match parse_payload(&text[after..]) {
                Some((content, consumed)) => {
                    calls.push(ToolCall::SaveDocumentation { path, content });
                    cursor = after + consumed;
                }
                None => {
                    tracing::debug!(path = %path, "save directive without a terminated payload");
                    cursor = after;
                }
            }
        }
    }

    calls
}

/// Parse a JSON tool object at the start of `text`.
///
/// Arguments may sit at the top level or under an `arguments` object.
fn parse_json_call(text: &str) -> Option<(ToolCall, usize)> {
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    let mut value = stream.next()?.ok()?;
    let consumed = stream.byte_offset();

    if let Some(Value::Object(args)) = value.get("arguments").cloned()
        && let Value::Object(obj) = &mut value
    {
        obj.remove("arguments");
        for (k, v) in args {
            obj.entry(k).or_insert(v);
        }
    }

    let call: ToolCall = serde_json::from_value(value).ok()?;
    if call.path().trim().is_empty() {
        return None;
    }
    Some((call, consumed))
}

/// Parse the payload that follows a save directive.
///
/// Returns the payload and the number of bytes consumed from `text`.
fn parse_payload(text: &str) -> Option<(String, usize)> {
    let lead = RE_ARROW.find(text).map_or(0, |m| m.end());
    let body = &text[lead..];

    if let Some(after_open) = body.strip_prefix(PAYLOAD_OPEN) {
        let start = lead + PAYLOAD_OPEN.len();
        let (content, len) = until_close_marker(after_open)?;
        return Some((content, start + len));
    }
    if body.starts_with("```") {
        let (content, len) = fenced_block(body)?;
        return Some((content, lead + len));
    }
    None
}

/// Quoted content argument followed by the closing parenthesis.
///
/// Triple-quoted content is taken verbatim; a single- or double-quoted
/// string has its backslash escapes resolved.
fn inline_argument(text: &str) -> Option<(String, usize)> {
    let (content, len) = if let Some(quote) = ["\"\"\"", "'''"]
        .into_iter()
        .find(|q| text.starts_with(q))
    {
        let body = &text[quote.len()..];
        let end = body.find(quote)?;
        (
            body[..end].trim_matches('\n').to_string(),
            quote.len() + end + quote.len(),
        )
    } else {
        let quote = text.chars().next().filter(|&c| c == '"' || c == '\'')?;
        let (content, len) = escaped_string(&text[1..], quote)?;
        (content.trim_matches('\n').to_string(), 1 + len)
    };

    let tail = &text[len..];
    let close = tail.len() - tail.trim_start().len();
    tail[close..]
        .starts_with(')')
        .then_some((content, len + close + 1))
}

/// Body of a string literal up to the unescaped `quote`, and the bytes it spans.
fn escaped_string(text: &str, quote: char) -> Option<(String, usize)> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == quote {
            return Some((out, i + c.len_utf8()));
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        let (_, escaped) = chars.next()?;
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' | '"' | '\'' => out.push(escaped),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    None
}

/// Content up to a line reading `>>>` (or ending in it, for `text>>>`).
///
/// A line that starts with `>>>` is content; doctest prompts look like that.
fn until_close_marker(text: &str) -> Option<(String, usize)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed == PAYLOAD_CLOSE {
            let content = text[..offset].trim_matches('\n').to_string();
            return Some((content, offset + line.len()));
        }
        if trimmed.ends_with(PAYLOAD_CLOSE) && !trimmed.starts_with(PAYLOAD_CLOSE) {
            let marker = offset + line.rfind(PAYLOAD_CLOSE)?;
            let content = text[..marker].trim_matches('\n').to_string();
            return Some((content, marker + PAYLOAD_CLOSE.len()));
        }
        offset += line.len();
    }
    None
}

/// Content of a fenced block starting at the beginning of `text`.
///
/// Inner fences that carry a language tag open a nested block, so a Markdown
/// document with its own examples survives intact.
fn fenced_block(text: &str) -> Option<(String, usize)> {
    let mut lines = text.split_inclusive('\n');
    let opener = lines.next()?;
    let mut offset = opener.len();
    let body_start = offset;
    let mut depth = 1usize;

    for line in lines {
        let trimmed = line.trim();
        if let Some(tag) = trimmed.strip_prefix("```") {
            if tag.trim().is_empty() {
                depth -= 1;
                if depth == 0 {
                    let content = text[body_start..offset].trim_matches('\n').to_string();
                    return Some((content, offset + line.len()));
                }
            } else {
                depth += 1;
            }
        }
        offset += line.len();
    }
    None
}
