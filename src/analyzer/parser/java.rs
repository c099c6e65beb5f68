use std::path::Path;

use super::{
    Language, SourceParser, create_ts_parser, declaration_header, describe_parameters,
    field_text, get_node_text, header_visibility, parse_tree, preceding_block_doc,
    supertype_names,
};
use crate::types::{
    LineSpan, Parameter, Result, SourceUnit, Symbol, SymbolKind, TypeName, Visibility,
};

pub struct JavaParser;

impl JavaParser {
    pub fn new() -> Result<Self> {
        let _ = create_ts_parser(tree_sitter_java::LANGUAGE, "Java")?;
        Ok(Self)
    }
}

impl SourceParser for JavaParser {
    fn parse(&self, path: &Path, content: &str) -> Result<SourceUnit> {
        let tree = parse_tree(tree_sitter_java::LANGUAGE, "Java", path, content)?;
        let mut unit = SourceUnit::new(path, Language::Java, content);
        collect_members(tree.root_node(), content.as_bytes(), None, false, &mut unit);
        Ok(unit)
    }

    fn language(&self) -> Language {
        Language::Java
    }
}

/// Modifiers sit in a `modifiers` child; interface members are implicitly public.
fn member_visibility(node: tree_sitter::Node, content: &[u8], in_interface: bool) -> Visibility {
    if in_interface {
        return Visibility::Public;
    }
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .find(|c| c.kind() == "modifiers")
        .map(|m| header_visibility(get_node_text(m, content)))
        .unwrap_or(Visibility::Public)
}

fn collect_members(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    in_interface: bool,
    unit: &mut SourceUnit,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "package_declaration" => {
                let text = get_node_text(child, content);
                unit.package = Some(
                    text.trim_start_matches("package")
                        .trim_end_matches(';')
                        .trim()
                        .to_string(),
                );
            }
            "import_declaration" => {
                let text = get_node_text(child, content);
                unit.imports.push(
                    text.trim_start_matches("import")
                        .trim_end_matches(';')
                        .trim()
                        .to_string(),
                );
            }
            "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration" => {
                extract_type(child, content, parent, in_interface, unit);
            }
            "method_declaration" | "constructor_declaration" => {
                extract_method(child, content, parent, in_interface, unit);
            }
            "field_declaration" | "constant_declaration" => {
                extract_fields(child, content, parent, in_interface, unit);
            }
            "enum_constant" => {
                if let Some(name) = field_text(child, "name", content) {
                    unit.push_symbol(
                        Symbol::new(SymbolKind::Field, name, LineSpan::from_node(child))
                            .within(parent)
                            .declared_as("enum constant")
                            .with_doc(preceding_block_doc(child, content)),
                    );
                }
            }
            // Methods of an enum follow its constants.
            "enum_body_declarations" => {
                collect_members(child, content, parent, in_interface, unit);
            }
            _ => {}
        }
    }
}

fn extract_type(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    in_interface: bool,
    unit: &mut SourceUnit,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let keyword = match node.kind() {
        "interface_declaration" => "interface",
        "enum_declaration" => "enum",
        "record_declaration" => "record",
        "annotation_type_declaration" => "@interface",
        _ => {
            let header = declaration_header(node, name_node, content);
            if header.split_whitespace().any(|w| w == "abstract") {
                "abstract class"
            } else {
                "class"
            }
        }
    };

    let doc = preceding_block_doc(node, content);
    let mut params = node
        .child_by_field_name("parameters")
        .map(|list| formal_parameters(list, content))
        .unwrap_or_default();
    describe_parameters(&mut params, &doc);

    let symbol = Symbol::new(
        SymbolKind::Class,
        get_node_text(name_node, content),
        LineSpan::from_node(node),
    )
    .within(parent)
    .declared_as(keyword)
    .with_visibility(member_visibility(node, content, in_interface))
    .with_parameters(params)
    .extending(java_supertypes(node, content))
    .with_doc(doc);
    let qualified = symbol.qualified_name.clone();
    unit.push_symbol(symbol);

    if let Some(body) = node.child_by_field_name("body") {
        let members_public = matches!(keyword, "interface" | "@interface");
        collect_members(body, content, Some(&qualified), members_public, unit);
    }
}

/// `extends` and `implements` targets, superclass first
fn java_supertypes(node: tree_sitter::Node, content: &[u8]) -> Vec<String> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|c| {
            matches!(
                c.kind(),
                "superclass" | "super_interfaces" | "extends_interfaces"
            )
        })
        .flat_map(|clause| supertype_names(get_node_text(clause, content)))
        .collect()
}

fn extract_method(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    in_interface: bool,
    unit: &mut SourceUnit,
) {
    let Some(name) = field_text(node, "name", content) else {
        return;
    };
    let doc = preceding_block_doc(node, content);
    let mut params = node
        .child_by_field_name("parameters")
        .map(|list| formal_parameters(list, content))
        .unwrap_or_default();
    describe_parameters(&mut params, &doc);

    let mut symbol = Symbol::new(SymbolKind::Function, name, LineSpan::from_node(node))
        .within(parent)
        .with_visibility(member_visibility(node, content, in_interface))
        .with_parameters(params)
        .with_doc(doc);

    symbol = if node.kind() == "constructor_declaration" {
        symbol.declared_as("constructor")
    } else {
        symbol.declared_as("method").returning(
            field_text(node, "type", content)
                .map(TypeName::from_source)
                .unwrap_or(TypeName::Unknown),
        )
    };
    unit.push_symbol(symbol);
}

fn extract_fields(
    node: tree_sitter::Node,
    content: &[u8],
    parent: Option<&str>,
    in_interface: bool,
    unit: &mut SourceUnit,
) {
    let field_type = field_text(node, "type", content)
        .map(TypeName::from_source)
        .unwrap_or(TypeName::Unknown);
    let visibility = member_visibility(node, content, in_interface);
    let doc = preceding_block_doc(node, content);

    let mut cursor = node.walk();
    for declarator in node
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "variable_declarator")
    {
        if let Some(name) = field_text(declarator, "name", content) {
            unit.push_symbol(
                Symbol::new(SymbolKind::Field, name, LineSpan::from_node(node))
                    .within(parent)
                    .declared_as("field")
                    .with_visibility(visibility)
                    .returning(field_type.clone())
                    .with_doc(doc.clone()),
            );
        }
    }
}

fn formal_parameters(list: tree_sitter::Node, content: &[u8]) -> Vec<Parameter> {
    let mut params = Vec::new();
    let mut cursor = list.walk();
    for param in list.named_children(&mut cursor) {
        match param.kind() {
            "formal_parameter" => {
                if let Some(name) = field_text(param, "name", content) {
                    params.push(Parameter::new(
                        name,
                        field_text(param, "type", content)
                            .map(TypeName::from_source)
                            .unwrap_or(TypeName::Unknown),
                    ));
                }
            }
            // `String... args`: the declarator carries the name.
            "spread_parameter" => {
                let mut inner = param.walk();
                let children: Vec<_> = param.named_children(&mut inner).collect();
                let name = children
                    .iter()
                    .find(|c| c.kind() == "variable_declarator")
                    .and_then(|d| field_text(*d, "name", content));
                let type_text = children
                    .iter()
                    .find(|c| c.kind() != "variable_declarator" && c.kind() != "modifiers")
                    .map(|t| format!("{}...", get_node_text(*t, content)));
                if let Some(name) = name {
                    params.push(Parameter::new(
                        name,
                        type_text
                            .map(|t| TypeName::from_source(&t))
                            .unwrap_or(TypeName::Unknown),
                    ));
                }
            }
            _ => {}
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<SourceUnit> {
        JavaParser::new()?.parse(Path::new("Channel.java"), content)
    }

    #[test]
    fn test_class_members() {
        let src = r#"
package com.example.net;

import java.util.List;

/**
 * A bidirectional channel.
 */
public class Channel {
    private final int capacity;
    public static final String NAME = "chan", ALIAS = "c";

    /**
     * Creates a channel.
     * @param capacity buffer size
     */
    public Channel(int capacity) {
        this.capacity = capacity;
    }

    /**
     * Writes messages.
     * @param messages the batch
     * @param flush whether to flush
     * @return number written
     */
    public int write(List<String> messages, boolean flush) {
        return messages.size();
    }

    void log(String... parts) {}

    private void reset() {}
}
"#;
        let unit = parse(src).unwrap();

        assert_eq!(unit.package.as_deref(), Some("com.example.net"));
        assert_eq!(unit.imports, vec!["java.util.List".to_string()]);

        let names: Vec<_> = unit
            .symbols()
            .iter()
            .map(|s| s.qualified_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "Channel",
                "Channel.capacity",
                "Channel.NAME",
                "Channel.ALIAS",
                "Channel.Channel",
                "Channel.write",
                "Channel.log",
                "Channel.reset",
            ]
        );

        let class = unit.find("Channel").unwrap();
        assert_eq!(class.doc_comment, "A bidirectional channel.");
        assert!(!unit.find("Channel.capacity").unwrap().is_public());

        let ctor = unit.find("Channel.Channel").unwrap();
        assert_eq!(ctor.return_type, None);
        assert_eq!(ctor.parameters[0].description.as_deref(), Some("buffer size"));

        let write = unit.find("Channel.write").unwrap();
        assert_eq!(write.return_type, Some(TypeName::Known("int".into())));
        let params: Vec<_> = write
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.type_name.as_str()))
            .collect();
        assert_eq!(params, vec![("messages", "List<String>"), ("flush", "boolean")]);

        let log = unit.find("Channel.log").unwrap();
        assert_eq!(log.parameters[0].name, "parts");
        assert_eq!(log.parameters[0].type_name.as_str(), "String...");
        assert!(!unit.find("Channel.reset").unwrap().is_public());
    }

    #[test]
    fn test_interface_and_enum() {
        let src = r#"
interface Codec {
    byte[] encode(String value);
}

enum Mode {
    FAST, SAFE;

    boolean isFast() { return this == FAST; }
}
"#;
        let unit = parse(src).unwrap();
        let encode = unit.find("Codec.encode").unwrap();
        assert!(encode.is_public());
        assert_eq!(encode.return_type, Some(TypeName::Known("byte[]".into())));
        assert!(unit.find("Mode.FAST").is_some());
        assert!(unit.find("Mode.SAFE").is_some());
        assert!(unit.find("Mode.isFast").is_some());
    }

    #[test]
    fn test_supertypes_captured() {
        let src = r#"
public class FileChannel extends AbstractChannel<byte[]> implements Closeable, java.io.Flushable {
}

interface Duplex extends Readable, Writable {
}
"#;
        let unit = parse(src).unwrap();
        assert_eq!(
            unit.find("FileChannel").unwrap().supertypes,
            vec!["AbstractChannel", "Closeable", "Flushable"]
        );
        assert_eq!(
            unit.find("Duplex").unwrap().supertypes,
            vec!["Readable", "Writable"]
        );
    }

    #[test]
    fn test_broken_method_body_is_tolerated() {
        let src = r#"
public class Tolerant {
    public void broken() {
        int x = ;
    }

    public int fine(int a) {
        return a;
    }
}
"#;
        let unit = parse(src).unwrap();
        assert!(unit.find("Tolerant").is_some());
        assert!(unit.find("Tolerant.fine").is_some());
    }
}
