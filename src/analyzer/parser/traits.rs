use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::{Query, QueryCursor, StreamingIterator};

use crate::types::{AutodocError, Parameter, Result, SourceUnit, Visibility};

static RE_AT_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@param\s+(\w+)\s*(.*)$").unwrap());
static RE_COLON_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:param\s+(?:[^:]+\s+)?(\w+):\s*(.*)$").unwrap());
static RE_ARGS_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*{0,2}(\w+)\s*(?:\([^)]*\))?\s*:\s*(.+)$").unwrap());
static RE_BULLET_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[*-]\s+`(\w+)`\s*[-:]\s*(.+)$").unwrap());

/// Extraction capability shared by every language parser.
pub trait SourceParser: Send + Sync {
    /// Parse `content` into a [`SourceUnit`].
    ///
    /// Fails with `AutodocError::Parse` when the top level of the file cannot
    /// be recognized. Broken nested bodies are skipped.
    fn parse(&self, path: &Path, content: &str) -> Result<SourceUnit>;
    fn language(&self) -> super::Language;
}

/// Extract text content from a tree-sitter node.
/// Returns empty string if extraction fails (with debug logging).
#[inline]
pub fn get_node_text<'a>(node: tree_sitter::Node, content: &'a [u8]) -> &'a str {
    node.utf8_text(content).unwrap_or_else(|e| {
        tracing::debug!(
            "UTF-8 extraction failed at {}:{}: {}",
            node.start_position().row + 1,
            node.start_position().column,
            e
        );
        ""
    })
}

/// Text of a named field, if present
pub fn field_text<'a>(node: tree_sitter::Node, field: &str, content: &'a [u8]) -> Option<&'a str> {
    node.child_by_field_name(field)
        .map(|n| get_node_text(n, content))
}

/// Create a tree-sitter parser for the given language.
pub fn create_ts_parser<L: Into<tree_sitter::Language>>(
    language: L,
    lang_name: &str,
) -> Result<tree_sitter::Parser> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&language.into())
        .map_err(|e| AutodocError::Parse {
            message: format!("Failed to set {} language: {}", lang_name, e),
            path: String::new(),
        })?;
    Ok(parser)
}

/// Parse `content` and reject files whose top level is not recognizable.
pub fn parse_tree<L: Into<tree_sitter::Language>>(
    language: L,
    lang_name: &str,
    path: &Path,
    content: &str,
) -> Result<tree_sitter::Tree> {
    let path_str = path.display().to_string();
    let mut parser = create_ts_parser(language, lang_name).map_err(|e| match e {
        AutodocError::Parse { message, .. } => AutodocError::parse(&path_str, message),
        other => other,
    })?;

    let tree = parser.parse(content, None).ok_or_else(|| {
        AutodocError::parse(&path_str, format!("Failed to parse {} file", lang_name))
    })?;

    check_syntax(tree.root_node(), content, &path_str)?;
    Ok(tree)
}

/// Apply the top-level syntax rule.
///
/// An `ERROR` node directly under the root is an unrecognized top-level
/// construct. A missing token or error region that runs into the end of the
/// input is an unterminated block. Anything else is a broken nested body and
/// is tolerated.
pub fn check_syntax(root: tree_sitter::Node, content: &str, path: &str) -> Result<()> {
    if !root.has_error() {
        return Ok(());
    }

    let end = content.trim_end().len();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.is_error() && child.end_byte() < end {
            let snippet: String = get_node_text(child, content.as_bytes())
                .lines()
                .next()
                .unwrap_or_default()
                .chars()
                .take(40)
                .collect();
            return Err(AutodocError::parse(
                path,
                format!(
                    "unrecognized top-level construct at line {}: `{}`",
                    child.start_position().row + 1,
                    snippet.trim()
                ),
            ));
        }
        if child.has_error()
            && let Some(open) = unterminated_at_eof(child, end)
        {
            return Err(AutodocError::parse(
                path,
                format!("unterminated block starting at line {}", open + 1),
            ));
        }
    }

    if root.is_error() {
        return Err(AutodocError::parse(path, "no recognizable declarations"));
    }
    Ok(())
}

/// Start row of `top` if a missing token or error region inside it reaches
/// the end of input.
fn unterminated_at_eof(top: tree_sitter::Node, end: usize) -> Option<usize> {
    let mut stack = vec![top];
    while let Some(node) = stack.pop() {
        if node.is_missing() && node.start_byte() >= end {
            return Some(top.start_position().row);
        }
        if node.is_error() && node.end_byte() >= end {
            return Some(top.start_position().row);
        }
        if node.has_error() {
            let mut cursor = node.walk();
            stack.extend(node.children(&mut cursor));
        }
    }
    None
}

/// Run a query and collect the text of every capture.
pub fn query_texts(
    language: &tree_sitter::Language,
    query_str: &str,
    root: tree_sitter::Node,
    content: &[u8],
) -> Vec<String> {
    let mut results = Vec::new();

    match Query::new(language, query_str) {
        Ok(query) => {
            let mut cursor = QueryCursor::new();
            let mut matches = cursor.matches(&query, root, content);

            while let Some(m) = matches.next() {
                for cap in m.captures.iter() {
                    results.push(get_node_text(cap.node, content).to_string());
                }
            }
        }
        Err(e) => tracing::debug!("Query compilation failed: {}", e),
    }

    results
}

/// Text between a declaration's start and its name: modifiers and keywords.
pub fn declaration_header<'a>(
    node: tree_sitter::Node,
    name: tree_sitter::Node,
    content: &'a [u8],
) -> &'a str {
    std::str::from_utf8(&content[node.start_byte()..name.start_byte()]).unwrap_or_default()
}

/// `private` anywhere in the header makes a declaration private.
pub fn header_visibility(header: &str) -> Visibility {
    if header
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| w == "private")
    {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

/// Type names listed in an inheritance clause.
///
/// Handles `extends A(x) with B[T]`, `implements A<T>, B` and a Python base
/// list. Type and constructor arguments are dropped, keyword arguments such
/// as `metaclass=Meta` are ignored, and dotted names keep their last segment.
pub fn supertype_names(clause: &str) -> Vec<String> {
    let mut items = vec![String::new()];
    let mut depth = 0usize;
    for c in clause.chars() {
        match c {
            '(' | '[' | '<' | '{' => depth += 1,
            ')' | ']' | '>' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => items.push(String::new()),
            _ if depth == 0 => {
                if let Some(item) = items.last_mut() {
                    item.push(c);
                }
            }
            _ => {}
        }
    }

    items
        .iter()
        .filter(|item| !item.contains('='))
        .flat_map(|item| item.split_whitespace())
        .filter(|word| !matches!(*word, "extends" | "with" | "implements"))
        .filter_map(|word| word.rsplit('.').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Find the `/** ... */` block comment directly preceding `node`.
///
/// Comment kinds differ per grammar, so any kind containing `comment` is
/// accepted as long as the text opens with `/**`.
pub fn preceding_block_doc(node: tree_sitter::Node, content: &[u8]) -> String {
    let mut prev = node.prev_sibling();
    while let Some(sibling) = prev {
        if sibling.kind().contains("comment") {
            let text = get_node_text(sibling, content);
            if text.starts_with("/**") && is_adjacent(sibling, node) {
                return clean_doc_comment(text);
            }
            return String::new();
        }
        if sibling.kind() == "annotation" || sibling.kind() == "marker_annotation" {
            prev = sibling.prev_sibling();
            continue;
        }
        break;
    }
    String::new()
}

/// Collect consecutive `///` line comments above `node`, skipping attributes.
pub fn preceding_line_docs(node: tree_sitter::Node, content: &[u8]) -> String {
    let mut lines = Vec::new();
    let mut anchor = node;
    let mut prev = node.prev_sibling();
    while let Some(sibling) = prev {
        match sibling.kind() {
            "attribute_item" => {}
            "line_comment" => {
                let text = get_node_text(sibling, content);
                if !text.starts_with("///") || text.starts_with("////") || !is_adjacent(sibling, anchor) {
                    break;
                }
                lines.push(text.trim_end());
            }
            "block_comment" => {
                let text = get_node_text(sibling, content);
                if text.starts_with("/**") && is_adjacent(sibling, anchor) {
                    lines.push(text);
                }
                break;
            }
            _ => break,
        }
        anchor = sibling;
        prev = sibling.prev_sibling();
    }
    lines.reverse();
    clean_doc_comment(&lines.join("\n"))
}

fn is_adjacent(comment: tree_sitter::Node, node: tree_sitter::Node) -> bool {
    node.start_position().row <= comment.end_position().row + 1
}

/// Strip comment markers and leading asterisks, keeping line structure.
pub fn clean_doc_comment(raw: &str) -> String {
    let lines: Vec<&str> = raw
        .lines()
        .map(|line| {
            let t = line.trim();
            if let Some(rest) = t.strip_prefix("///").or_else(|| t.strip_prefix("//!")) {
                return rest.trim();
            }
            let mut t = t.strip_prefix("/**").unwrap_or(t);
            t = t.strip_suffix("*/").unwrap_or(t);
            t = t.trim_start();
            t = t.strip_prefix('*').unwrap_or(t);
            t.trim()
        })
        .collect();

    lines.join("\n").trim().to_string()
}

/// Parameter descriptions found in a doc comment.
///
/// Understands `@param name text`, `:param [type] name: text`, Google style
/// `Args:` sections and rustdoc `* \`name\` - text` bullets.
pub fn param_descriptions(doc: &str) -> HashMap<String, String> {
    let mut found = HashMap::new();
    let mut in_args = false;

    for line in doc.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(caps) = RE_AT_PARAM
            .captures(trimmed)
            .or_else(|| RE_COLON_PARAM.captures(trimmed))
            .or_else(|| RE_BULLET_ENTRY.captures(trimmed))
        {
            found.insert(caps[1].to_string(), caps[2].trim().to_string());
            continue;
        }

        let lower = trimmed.to_lowercase();
        if matches!(lower.as_str(), "args:" | "arguments:" | "parameters:" | "params:") {
            in_args = true;
            continue;
        }
        if in_args {
            if trimmed.ends_with(':') && !trimmed.contains(' ') {
                in_args = false;
                continue;
            }
            if let Some(caps) = RE_ARGS_ENTRY.captures(trimmed) {
                found.insert(caps[1].to_string(), caps[2].trim().to_string());
            }
        }
    }

    found
}

/// Attach doc-comment descriptions to parameters that lack one.
pub fn describe_parameters(params: &mut [Parameter], doc: &str) {
    if doc.is_empty() {
        return;
    }
    let descriptions = param_descriptions(doc);
    for param in params.iter_mut() {
        if param.description.is_none()
            && let Some(text) = descriptions.get(&param.name)
        {
            param.description = Some(text.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_block_doc_comment() {
        let raw = "/**\n   * Sends data.\n   *\n   * @param data payload\n   */";
        assert_eq!(clean_doc_comment(raw), "Sends data.\n\n@param data payload");
    }

    #[test]
    fn test_clean_line_doc_comment() {
        assert_eq!(clean_doc_comment("/// One\n/// Two"), "One\nTwo");
    }

    #[test]
    fn test_param_descriptions_styles() {
        let scaladoc = "Send.\n@param data the payload\n@param retries how often";
        let found = param_descriptions(scaladoc);
        assert_eq!(found.get("data").map(String::as_str), Some("the payload"));
        assert_eq!(found.get("retries").map(String::as_str), Some("how often"));

        let sphinx = ":param int count: number of items\n:returns: nothing";
        assert_eq!(
            param_descriptions(sphinx).get("count").map(String::as_str),
            Some("number of items")
        );

        let google = "Do it.\n\nArgs:\n    path (str): where to go\n    *args: extras\n\nReturns:\n    bool";
        let found = param_descriptions(google);
        assert_eq!(found.get("path").map(String::as_str), Some("where to go"));
        assert_eq!(found.get("args").map(String::as_str), Some("extras"));
        assert!(!found.contains_key("bool"));

        let rustdoc = "# Arguments\n* `input` - raw bytes";
        assert_eq!(
            param_descriptions(rustdoc).get("input").map(String::as_str),
            Some("raw bytes")
        );
    }

    #[test]
    fn test_supertype_names() {
        assert_eq!(
            supertype_names("extends Base(timeout, 3) with Logging with Ordered[Packet]"),
            vec!["Base", "Logging", "Ordered"]
        );
        assert_eq!(
            supertype_names("implements Comparable<Map<String, Integer>>, java.io.Serializable"),
            vec!["Comparable", "Serializable"]
        );
        assert_eq!(
            supertype_names("abc.ABC, Generic[T], metaclass=Registry"),
            vec!["ABC", "Generic"]
        );
        assert!(supertype_names("").is_empty());
    }

    #[test]
    fn test_header_visibility() {
        assert_eq!(header_visibility("private def "), Visibility::Private);
        assert_eq!(header_visibility("private[net] val "), Visibility::Private);
        assert_eq!(header_visibility("override def "), Visibility::Public);
    }
}
