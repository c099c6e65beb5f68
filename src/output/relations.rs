//! Class relationship section.
//!
//! Built from the parsed unit alone, never from model output: inheritance
//! edges come from each type's `extends`/`with`/`implements` clause, usage
//! edges from member and constructor types that name another type declared
//! in the same file. Sphinx pages get a `graphviz` directive, Markdown pages a
//! Mermaid class diagram.

use std::collections::BTreeSet;

use crate::types::{DocFormat, SourceUnit, Symbol, SymbolKind, TypeName};

pub const SECTION_TITLE: &str = "Class Relationships";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RelationKind {
    Extends,
    Uses,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Relation {
    pub from: String,
    pub to: String,
    pub kind: RelationKind,
}

/// Edges between the types of `unit`, sorted and without duplicates
pub fn relations(unit: &SourceUnit) -> Vec<Relation> {
    let types: Vec<&Symbol> = unit
        .symbols()
        .iter()
        .filter(|s| matches!(s.kind, SymbolKind::Class | SymbolKind::Object))
        .filter(|s| is_diagram_name(&s.name))
        .collect();

    let mut edges = BTreeSet::new();
    for ty in &types {
        for parent in ty.supertypes.iter().filter(|p| is_diagram_name(p)) {
            edges.insert(Relation {
                from: ty.name.clone(),
                to: parent.clone(),
                kind: RelationKind::Extends,
            });
        }

        let members = unit
            .symbols()
            .iter()
            .filter(|s| s.parent.as_deref() == Some(ty.qualified_name.as_str()));
        let mentioned: Vec<&TypeName> = ty
            .parameters
            .iter()
            .map(|p| &p.type_name)
            .chain(members.flat_map(|m| {
                m.parameters
                    .iter()
                    .map(|p| &p.type_name)
                    .chain(m.return_type.as_ref())
            }))
            .collect();

        for other in types.iter().filter(|o| o.name != ty.name) {
            let used = mentioned.iter().any(|t| names_type(t, &other.name));
            if used && !ty.supertypes.contains(&other.name) {
                edges.insert(Relation {
                    from: ty.name.clone(),
                    to: other.name.clone(),
                    kind: RelationKind::Uses,
                });
            }
        }
    }
    edges.into_iter().collect()
}

/// Section text for `unit`, or `None` when it declares no relationships
pub fn render_section(unit: &SourceUnit, format: DocFormat) -> Option<String> {
    let edges = relations(unit);
    if edges.is_empty() {
        return None;
    }
    Some(match format {
        DocFormat::Sphinx => sphinx_section(&edges),
        DocFormat::Markdown => markdown_section(&edges),
    })
}

fn sphinx_section(edges: &[Relation]) -> String {
    let mut out = format!(
        "{}\n{}\n\n.. graphviz::\n\n   digraph relationships {{\n      rankdir=LR;\n      node [shape=box];\n",
        SECTION_TITLE,
        "-".repeat(SECTION_TITLE.len())
    );
    for edge in edges {
        let style = match edge.kind {
            RelationKind::Extends => "label=\"extends\", arrowhead=empty",
            RelationKind::Uses => "label=\"uses\", style=dashed",
        };
        out.push_str(&format!(
            "      \"{}\" -> \"{}\" [{}];\n",
            edge.from, edge.to, style
        ));
    }
    out.push_str("   }\n");
    out
}

fn markdown_section(edges: &[Relation]) -> String {
    let mut out = format!("## {}\n\n```mermaid\nclassDiagram\n", SECTION_TITLE);
    for edge in edges {
        match edge.kind {
            RelationKind::Extends => {
                out.push_str(&format!("    {} <|-- {}\n", edge.to, edge.from))
            }
            RelationKind::Uses => {
                out.push_str(&format!("    {} ..> {} : uses\n", edge.from, edge.to))
            }
        }
    }
    out.push_str("```\n");
    out
}

fn is_diagram_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn names_type(type_name: &TypeName, name: &str) -> bool {
    type_name
        .as_str()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|word| word == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::parser::{Language, parse_source};
    use std::path::Path;

    const CHANNEL: &str = r#"package net

trait Channel {
  def write(packet: Packet): Int
}

case class Packet(id: Long, payload: String)

class ReliableChannel(inner: Channel) extends BaseChannel with Channel {
  val pending: List[Packet] = Nil
  def resend(limit: Int): Option[Packet] = None
}
"#;

    fn unit(src: &str) -> SourceUnit {
        parse_source(Path::new("net/Channel.scala"), src, Language::Scala).unwrap()
    }

    fn edge(from: &str, to: &str, kind: RelationKind) -> Relation {
        Relation {
            from: from.to_string(),
            to: to.to_string(),
            kind,
        }
    }

    #[test]
    fn test_extends_and_uses_edges() {
        let edges = relations(&unit(CHANNEL));
        assert_eq!(
            edges,
            vec![
                edge("Channel", "Packet", RelationKind::Uses),
                edge("ReliableChannel", "BaseChannel", RelationKind::Extends),
                edge("ReliableChannel", "Channel", RelationKind::Extends),
                edge("ReliableChannel", "Packet", RelationKind::Uses),
            ]
        );
    }

    #[test]
    fn test_sphinx_section_is_graphviz() {
        let section = render_section(&unit(CHANNEL), DocFormat::Sphinx).unwrap();
        assert!(section.starts_with("Class Relationships\n-------------------\n\n.. graphviz::"));
        assert!(section.contains(
            "      \"ReliableChannel\" -> \"BaseChannel\" [label=\"extends\", arrowhead=empty];\n"
        ));
        assert!(section.contains("\"Channel\" -> \"Packet\" [label=\"uses\", style=dashed];"));
        assert!(section.ends_with("   }\n"));
    }

    #[test]
    fn test_markdown_section_is_mermaid() {
        let section = render_section(&unit(CHANNEL), DocFormat::Markdown).unwrap();
        assert!(section.starts_with("## Class Relationships\n\n```mermaid\nclassDiagram\n"));
        assert!(section.contains("    BaseChannel <|-- ReliableChannel\n"));
        assert!(section.contains("    ReliableChannel ..> Packet : uses\n"));
        assert!(section.ends_with("```\n"));
    }

    #[test]
    fn test_lone_type_has_no_section() {
        let src = "object Clock {\n  def now(): Long = 0L\n}\n";
        assert!(render_section(&unit(src), DocFormat::Sphinx).is_none());
    }

    #[test]
    fn test_word_match_not_substring() {
        let src = "case class Id(v: Long)\n\nclass Store {\n  def ids(x: Ident): Int = 0\n}\n";
        assert!(relations(&unit(src)).is_empty());
    }
}
