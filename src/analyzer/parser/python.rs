use std::path::Path;

use super::{
    Language, SourceParser, create_ts_parser, describe_parameters, field_text, get_node_text,
    parse_tree, query_texts, supertype_names,
};
use crate::types::{
    LineSpan, Parameter, Result, SourceUnit, Symbol, SymbolKind, TypeName, Visibility,
};

pub struct PythonParser;

impl PythonParser {
    pub fn new() -> Result<Self> {
        let _ = create_ts_parser(tree_sitter_python::LANGUAGE, "Python")?;
        Ok(Self)
    }
}

impl SourceParser for PythonParser {
    fn parse(&self, path: &Path, content: &str) -> Result<SourceUnit> {
        let tree = parse_tree(tree_sitter_python::LANGUAGE, "Python", path, content)?;
        let root = tree.root_node();
        let mut unit = SourceUnit::new(path, Language::Python, content);

        unit.imports = query_texts(
            &tree_sitter_python::LANGUAGE.into(),
            "(module [(import_statement) (import_from_statement)] @import)",
            root,
            content.as_bytes(),
        );
        collect_block(root, content.as_bytes(), None, &mut unit);
        Ok(unit)
    }

    fn language(&self) -> Language {
        Language::Python
    }
}

/// Leading underscore marks a name private, dunders included.
fn python_visibility(name: &str) -> Visibility {
    if name.starts_with('_') {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

fn collect_block(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    unit: &mut SourceUnit,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_statement(child, content, parent, unit);
    }
}

fn collect_statement(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    unit: &mut SourceUnit,
) {
    match node.kind() {
        "decorated_definition" => {
            if let Some(def) = node.child_by_field_name("definition") {
                collect_statement(def, content, parent, unit);
            }
        }
        "class_definition" => extract_class(node, content, parent, unit),
        "function_definition" => extract_function(node, content, parent, unit),
        "expression_statement" => extract_assignment(node, content, parent, unit),
        _ => {}
    }
}

fn extract_class(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    unit: &mut SourceUnit,
) {
    let Some(name) = field_text(node, "name", content) else {
        return;
    };
    let body = node.child_by_field_name("body");
    let doc = body.map(|b| docstring(b, content)).unwrap_or_default();

    // Constructor parameters live on the class itself.
    let mut params = body
        .and_then(|b| find_init(b, content))
        .map(|init| function_parameters(init, content, true))
        .unwrap_or_default();
    describe_parameters(&mut params, &doc);

    let symbol = Symbol::new(SymbolKind::Class, name, LineSpan::from_node(node))
        .within(parent)
        .declared_as("class")
        .with_visibility(python_visibility(name))
        .with_parameters(params)
        .extending(python_bases(node, content))
        .with_doc(doc);
    let qualified = symbol.qualified_name.clone();
    unit.push_symbol(symbol);

    if let Some(body) = body {
        collect_block(body, content, Some(&qualified), unit);
    }
}

fn python_bases(node: tree_sitter::Node, content: &[u8]) -> Vec<String> {
    let Some(list) = field_text(node, "superclasses", content) else {
        return Vec::new();
    };
    let inner = list
        .trim()
        .strip_prefix('(')
        .and_then(|l| l.strip_suffix(')'))
        .unwrap_or(list);
    supertype_names(inner)
        .into_iter()
        .filter(|base| base != "object")
        .collect()
}

fn find_init<'t>(body: tree_sitter::Node<'t>, content: &[u8]) -> Option<tree_sitter::Node<'t>> {
    let mut cursor = body.walk();
    body.named_children(&mut cursor).find_map(|child| {
        let def = match child.kind() {
            "decorated_definition" => child.child_by_field_name("definition")?,
            _ => child,
        };
        (def.kind() == "function_definition"
            && field_text(def, "name", content) == Some("__init__"))
        .then_some(def)
    })
}

fn extract_function(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    unit: &mut SourceUnit,
) {
    let Some(name) = field_text(node, "name", content) else {
        return;
    };
    let is_method = parent.is_some();
    let doc = node
        .child_by_field_name("body")
        .map(|b| docstring(b, content))
        .unwrap_or_default();
    let mut params = function_parameters(node, content, is_method);
    describe_parameters(&mut params, &doc);

    let mut symbol = Symbol::new(SymbolKind::Function, name, LineSpan::from_node(node))
        .within(parent)
        .declared_as(if is_async(node, content) { "async def" } else { "def" })
        .with_visibility(python_visibility(name))
        .with_parameters(params)
        .with_doc(doc);
    if name != "__init__" {
        symbol = symbol.returning(
            field_text(node, "return_type", content)
                .map(TypeName::from_source)
                .unwrap_or(TypeName::Unknown),
        );
    }
    unit.push_symbol(symbol);
}

fn is_async(node: tree_sitter::Node, content: &[u8]) -> bool {
    get_node_text(node, content).starts_with("async")
}

/// Parameters in declaration order. Star markers are dropped from names and
/// the receiver (`self`/`cls`) is skipped for methods.
fn function_parameters(node: tree_sitter::Node, content: &[u8], is_method: bool) -> Vec<Parameter> {
    let Some(list) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };

    let mut params = Vec::new();
    let mut cursor = list.walk();
    for (index, param) in list.named_children(&mut cursor).enumerate() {
        let (name, type_name) = match param.kind() {
            "identifier" => (get_node_text(param, content), None),
            "typed_parameter" => (
                param
                    .named_child(0)
                    .map(|n| get_node_text(n, content))
                    .unwrap_or_default(),
                field_text(param, "type", content),
            ),
            "default_parameter" | "typed_default_parameter" => (
                field_text(param, "name", content).unwrap_or_default(),
                field_text(param, "type", content),
            ),
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                (get_node_text(param, content), None)
            }
            _ => continue,
        };
        let name = name.trim_start_matches('*');
        if name.is_empty() || (is_method && index == 0 && matches!(name, "self" | "cls")) {
            continue;
        }
        params.push(Parameter::new(
            name,
            type_name
                .map(TypeName::from_source)
                .unwrap_or(TypeName::Unknown),
        ));
    }
    params
}

/// Module constants (UPPERCASE) and class attributes become fields.
fn extract_assignment(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    unit: &mut SourceUnit,
) {
    let Some(assign) = node.named_child(0).filter(|n| n.kind() == "assignment") else {
        return;
    };
    let Some(target) = assign
        .child_by_field_name("left")
        .filter(|n| n.kind() == "identifier")
    else {
        return;
    };
    let name = get_node_text(target, content);

    let is_constant = name
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && name.chars().any(|c| c.is_ascii_uppercase());
    if parent.is_none() && !is_constant {
        return;
    }

    let field_type = field_text(assign, "type", content)
        .map(TypeName::from_source)
        .unwrap_or(TypeName::Unknown);
    unit.push_symbol(
        Symbol::new(SymbolKind::Field, name, LineSpan::from_node(node))
            .within(parent)
            .declared_as(if parent.is_none() { "constant" } else { "attribute" })
            .with_visibility(python_visibility(name))
            .returning(field_type),
    );
}

/// The string literal opening a body, with quotes and indentation removed.
fn docstring(body: tree_sitter::Node, content: &[u8]) -> String {
    let Some(first) = body.named_child(0) else {
        return String::new();
    };
    if first.kind() != "expression_statement" {
        return String::new();
    }
    let Some(string) = first.named_child(0).filter(|n| n.kind() == "string") else {
        return String::new();
    };

    let raw = get_node_text(string, content).trim_start_matches(['r', 'R', 'u', 'U', 'b', 'B']);
    let inner = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find_map(|q| raw.strip_prefix(q).and_then(|s| s.strip_suffix(q)))
        .unwrap_or(raw);

    inner
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
