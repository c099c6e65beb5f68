//! Scala parser
//!
//! Classes, traits and objects with their members. Scaladoc blocks attach to
//! the declaration that follows them.

use std::path::Path;

use super::{
    Language, SourceParser, create_ts_parser, declaration_header, describe_parameters,
    field_text, get_node_text, header_visibility, parse_tree, preceding_block_doc,
    supertype_names,
};
use crate::types::{LineSpan, Parameter, Result, SourceUnit, Symbol, SymbolKind, TypeName};

pub struct ScalaParser;

impl ScalaParser {
    pub fn new() -> Result<Self> {
        let _ = create_ts_parser(tree_sitter_scala::LANGUAGE, "Scala")?;
        Ok(Self)
    }
}

impl SourceParser for ScalaParser {
    fn parse(&self, path: &Path, content: &str) -> Result<SourceUnit> {
        let tree = parse_tree(tree_sitter_scala::LANGUAGE, "Scala", path, content)?;
        let mut unit = SourceUnit::new(path, Language::Scala, content);
        collect_definitions(tree.root_node(), content.as_bytes(), None, &mut unit);
        Ok(unit)
    }

    fn language(&self) -> Language {
        Language::Scala
    }
}

fn collect_definitions(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    unit: &mut SourceUnit,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "package_clause" => {
                if let Some(name) = field_text(child, "name", content) {
                    unit.package = Some(name.to_string());
                }
                // `package a { ... }` form
                if let Some(body) = child.child_by_field_name("body") {
                    collect_definitions(body, content, parent, unit);
                }
            }
            "import_declaration" => {
                let text = get_node_text(child, content);
                unit.imports
                    .push(text.trim_start_matches("import").trim().to_string());
            }
            "class_definition" | "trait_definition" | "object_definition" | "enum_definition" => {
                extract_type(child, content, parent, unit);
            }
            "function_definition" | "function_declaration" => {
                extract_function(child, content, parent, unit);
            }
            "val_definition" | "var_definition" | "val_declaration" | "var_declaration" => {
                extract_field(child, content, parent, unit);
            }
            _ => {}
        }
    }
}

fn extract_type(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    unit: &mut SourceUnit,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = get_node_text(name_node, content);
    let header = declaration_header(node, name_node, content);

    let kind = if node.kind() == "object_definition" {
        SymbolKind::Object
    } else {
        SymbolKind::Class
    };
    let keyword = header
        .split_whitespace()
        .filter(|w| {
            matches!(
                *w,
                "case" | "class" | "object" | "trait" | "enum" | "abstract" | "sealed"
            )
        })
        .collect::<Vec<_>>()
        .join(" ");

    let doc = preceding_block_doc(node, content);
    let mut params = class_parameters(node, content);
    describe_parameters(&mut params, &doc);

    let mut cursor = node.walk();
    let supertypes = node
        .children(&mut cursor)
        .find(|c| c.kind() == "extends_clause")
        .map(|clause| supertype_names(get_node_text(clause, content)))
        .unwrap_or_default();

    let symbol = Symbol::new(kind, name, LineSpan::from_node(node))
        .within(parent)
        .declared_as(keyword)
        .with_visibility(header_visibility(header))
        .with_parameters(params)
        .extending(supertypes)
        .with_doc(doc);
    let qualified = symbol.qualified_name.clone();
    unit.push_symbol(symbol);

    if let Some(body) = node.child_by_field_name("body") {
        collect_definitions(body, content, Some(&qualified), unit);
    }
}

fn extract_function(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    unit: &mut SourceUnit,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let header = declaration_header(node, name_node, content);

    let mut params = Vec::new();
    let mut cursor = node.walk();
    for list in node
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "parameters")
    {
        params.extend(parameter_list(list, content, "parameter"));
    }

    let doc = preceding_block_doc(node, content);
    describe_parameters(&mut params, &doc);

    let return_type = field_text(node, "return_type", content)
        .map(TypeName::from_source)
        .unwrap_or(TypeName::Unknown);

    unit.push_symbol(
        Symbol::new(
            SymbolKind::Function,
            get_node_text(name_node, content),
            LineSpan::from_node(node),
        )
        .within(parent)
        .declared_as("def")
        .with_visibility(header_visibility(header))
        .with_parameters(params)
        .returning(return_type)
        .with_doc(doc),
    );
}

fn extract_field(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    unit: &mut SourceUnit,
) {
    // Definitions bind a pattern; declarations bind a name. Destructuring
    // patterns have no single name and are skipped.
    let Some(name_node) = node
        .child_by_field_name("pattern")
        .or_else(|| node.child_by_field_name("name"))
        .filter(|n| n.kind() == "identifier")
    else {
        return;
    };
    let header = declaration_header(node, name_node, content);
    let keyword = if node.kind().starts_with("var") {
        "var"
    } else {
        "val"
    };
    let field_type = field_text(node, "type", content)
        .map(TypeName::from_source)
        .unwrap_or(TypeName::Unknown);

    unit.push_symbol(
        Symbol::new(
            SymbolKind::Field,
            get_node_text(name_node, content),
            LineSpan::from_node(node),
        )
        .within(parent)
        .declared_as(keyword)
        .with_visibility(header_visibility(header))
        .returning(field_type)
        .with_doc(preceding_block_doc(node, content)),
    );
}

fn class_parameters(node: tree_sitter::Node, content: &[u8]) -> Vec<Parameter> {
    let mut params = Vec::new();
    let mut cursor = node.walk();
    for list in node
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "class_parameters")
    {
        params.extend(parameter_list(list, content, "class_parameter"));
    }
    params
}

fn parameter_list(list: tree_sitter::Node, content: &[u8], kind: &str) -> Vec<Parameter> {
    let mut cursor = list.walk();
    list.named_children(&mut cursor)
        .filter(|p| p.kind() == kind)
        .filter_map(|p| {
            let name = field_text(p, "name", content)?;
            let type_name = field_text(p, "type", content)
                .map(TypeName::from_source)
                .unwrap_or(TypeName::Unknown);
            Some(Parameter::new(name, type_name))
        })
        .collect()
}
