use std::path::Path;

use super::{
    Language, SourceParser, create_ts_parser, describe_parameters, field_text, get_node_text,
    parse_tree, preceding_line_docs,
};
use crate::types::{
    LineSpan, Parameter, Result, SourceUnit, Symbol, SymbolKind, TypeName, Visibility,
};

pub struct RustParser;

impl RustParser {
    pub fn new() -> Result<Self> {
        let _ = create_ts_parser(tree_sitter_rust::LANGUAGE, "Rust")?;
        Ok(Self)
    }
}

impl SourceParser for RustParser {
    fn parse(&self, path: &Path, content: &str) -> Result<SourceUnit> {
        let tree = parse_tree(tree_sitter_rust::LANGUAGE, "Rust", path, content)?;
        let mut unit = SourceUnit::new(path, Language::Rust, content);
        collect_items(tree.root_node(), content.as_bytes(), None, None, &mut unit);
        Ok(unit)
    }

    fn language(&self) -> Language {
        Language::Rust
    }
}

/// Only a bare `pub` exports an item; `pub(crate)` and friends do not.
///
/// `inherited` overrides the item's own modifier (trait members share the
/// trait's visibility).
fn rust_visibility(
    node: tree_sitter::Node,
    content: &[u8],
    inherited: Option<Visibility>,
) -> Visibility {
    if let Some(vis) = inherited {
        return vis;
    }
    let mut cursor = node.walk();
    let is_pub = node
        .children(&mut cursor)
        .any(|c| c.kind() == "visibility_modifier" && get_node_text(c, content) == "pub");
    if is_pub {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

fn collect_items(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    inherited: Option<Visibility>,
    unit: &mut SourceUnit,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "use_declaration" => {
                if parent.is_none() {
                    let text = get_node_text(child, content);
                    unit.imports.push(
                        text.trim_start_matches("pub ")
                            .trim_start_matches("use")
                            .trim_end_matches(';')
                            .trim()
                            .to_string(),
                    );
                }
            }
            "function_item" | "function_signature_item" => {
                extract_function(child, content, parent, inherited, unit);
            }
            "struct_item" | "enum_item" | "union_item" => {
                extract_type(child, content, parent, unit);
            }
            "trait_item" => {
                let Some(symbol) = type_symbol(child, content, parent, "trait") else {
                    continue;
                };
                let vis = symbol.visibility;
                let qualified = symbol.qualified_name.clone();
                unit.push_symbol(symbol);
                if let Some(body) = child.child_by_field_name("body") {
                    collect_items(body, content, Some(&qualified), Some(vis), unit);
                }
            }
            // Trait impls are documented on the trait itself.
            "impl_item" if child.child_by_field_name("trait").is_none() => {
                let Some(self_type) = field_text(child, "type", content) else {
                    continue;
                };
                let owner = self_type.split('<').next().unwrap_or(self_type).trim();
                let owner = match parent {
                    Some(p) => format!("{}.{}", p, owner),
                    None => owner.to_string(),
                };
                if let Some(body) = child.child_by_field_name("body") {
                    collect_items(body, content, Some(&owner), None, unit);
                }
            }
            "mod_item" => {
                let Some(body) = child.child_by_field_name("body") else {
                    continue;
                };
                let Some(symbol) = type_symbol(child, content, parent, "mod") else {
                    continue;
                };
                let symbol = Symbol {
                    kind: SymbolKind::Module,
                    ..symbol
                };
                let qualified = symbol.qualified_name.clone();
                unit.push_symbol(symbol);
                collect_items(body, content, Some(&qualified), None, unit);
            }
            "const_item" | "static_item" => {
                let Some(name) = field_text(child, "name", content) else {
                    continue;
                };
                let keyword = if child.kind() == "const_item" {
                    "const"
                } else {
                    "static"
                };
                unit.push_symbol(
                    Symbol::new(SymbolKind::Field, name, LineSpan::from_node(child))
                        .within(parent)
                        .declared_as(keyword)
                        .with_visibility(rust_visibility(child, content, inherited))
                        .returning(
                            field_text(child, "type", content)
                                .map(TypeName::from_source)
                                .unwrap_or(TypeName::Unknown),
                        )
                        .with_doc(preceding_line_docs(child, content)),
                );
            }
            _ => {}
        }
    }
}

fn type_symbol(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    keyword: &str,
) -> Option<Symbol> {
    let name = field_text(node, "name", content)?;
    Some(
        Symbol::new(SymbolKind::Class, name, LineSpan::from_node(node))
            .within(parent)
            .declared_as(keyword)
            .with_visibility(rust_visibility(node, content, None))
            .with_doc(preceding_line_docs(node, content)),
    )
}

fn extract_type(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    unit: &mut SourceUnit,
) {
    let keyword = match node.kind() {
        "enum_item" => "enum",
        "union_item" => "union",
        _ => "struct",
    };
    let Some(symbol) = type_symbol(node, content, parent, keyword) else {
        return;
    };
    let type_vis = symbol.visibility;
    let qualified = symbol.qualified_name.clone();
    unit.push_symbol(symbol);

    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        match member.kind() {
            "field_declaration" => {
                let Some(name) = field_text(member, "name", content) else {
                    continue;
                };
                unit.push_symbol(
                    Symbol::new(SymbolKind::Field, name, LineSpan::from_node(member))
                        .within(Some(&qualified))
                        .declared_as("field")
                        .with_visibility(rust_visibility(member, content, None))
                        .returning(
                            field_text(member, "type", content)
                                .map(TypeName::from_source)
                                .unwrap_or(TypeName::Unknown),
                        )
                        .with_doc(preceding_line_docs(member, content)),
                );
            }
            "enum_variant" => {
                let Some(name) = field_text(member, "name", content) else {
                    continue;
                };
                unit.push_symbol(
                    Symbol::new(SymbolKind::Field, name, LineSpan::from_node(member))
                        .within(Some(&qualified))
                        .declared_as("variant")
                        .with_visibility(type_vis)
                        .with_doc(preceding_line_docs(member, content)),
                );
            }
            _ => {}
        }
    }
}

fn extract_function(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    inherited: Option<Visibility>,
    unit: &mut SourceUnit,
) {
    let Some(name) = field_text(node, "name", content) else {
        return;
    };
    let doc = preceding_line_docs(node, content);

    let mut params = Vec::new();
    if let Some(list) = node.child_by_field_name("parameters") {
        let mut cursor = list.walk();
        for param in list
            .named_children(&mut cursor)
            .filter(|p| p.kind() == "parameter")
        {
            let Some(pattern) = field_text(param, "pattern", content) else {
                continue;
            };
            let name = pattern.trim_start_matches("mut ").trim();
            params.push(Parameter::new(
                name,
                field_text(param, "type", content)
                    .map(TypeName::from_source)
                    .unwrap_or(TypeName::Unknown),
            ));
        }
    }
    describe_parameters(&mut params, &doc);

    // No `->` means the unit type.
    let return_type = field_text(node, "return_type", content)
        .map(TypeName::from_source)
        .unwrap_or_else(|| TypeName::Known("()".to_string()));

    unit.push_symbol(
        Symbol::new(SymbolKind::Function, name, LineSpan::from_node(node))
            .within(parent)
            .declared_as("fn")
            .with_visibility(rust_visibility(node, content, inherited))
            .with_parameters(params)
            .returning(return_type)
            .with_doc(doc),
    );
}
