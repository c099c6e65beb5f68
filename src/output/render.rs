//! Format-specific layout: where each page goes and how the index reads.

use std::path::{Component, Path, PathBuf};

use crate::analyzer::parser::Language;
use crate::types::DocFormat;

/// One page listed in a batch index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub title: String,
    /// Page path relative to the output directory
    pub page: PathBuf,
}

pub trait Renderer: Send + Sync {
    fn format(&self) -> DocFormat;

    /// Output path for the page documenting `unit_path`
    fn target_path(
        &self,
        out_dir: &Path,
        source_root: &Path,
        unit_path: &Path,
        language: Language,
    ) -> PathBuf;

    fn index_file_name(&self) -> &'static str;

    fn render_index(&self, title: &str, entries: &[IndexEntry]) -> String;
}

/// Sphinx tree: `api/<language>/<dir>/<stem>.rst` plus a toctree index
pub struct SphinxRenderer;

impl Renderer for SphinxRenderer {
    fn format(&self) -> DocFormat {
        DocFormat::Sphinx
    }

    fn target_path(
        &self,
        out_dir: &Path,
        source_root: &Path,
        unit_path: &Path,
        language: Language,
    ) -> PathBuf {
        out_dir
            .join("api")
            .join(language.tag())
            .join(page_relative(source_root, unit_path, DocFormat::Sphinx))
    }

    fn index_file_name(&self) -> &'static str {
        "index.rst"
    }

    fn render_index(&self, title: &str, entries: &[IndexEntry]) -> String {
        let mut out = String::new();
        out.push_str(title);
        out.push('\n');
        out.push_str(&"=".repeat(title.chars().count().max(1)));
        out.push_str("\n\n.. toctree::\n   :maxdepth: 2\n");
        if !entries.is_empty() {
            out.push('\n');
        }
        for entry in entries {
            let page = entry.page.with_extension("");
            out.push_str(&format!("   {}\n", slash_path(&page)));
        }
        out
    }
}

/// Plain Markdown tree: `<language>/<dir>/<stem>.md` plus a README link list
pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn format(&self) -> DocFormat {
        DocFormat::Markdown
    }

    fn target_path(
        &self,
        out_dir: &Path,
        source_root: &Path,
        unit_path: &Path,
        language: Language,
    ) -> PathBuf {
        out_dir
            .join(language.tag())
            .join(page_relative(source_root, unit_path, DocFormat::Markdown))
    }

    fn index_file_name(&self) -> &'static str {
        "README.md"
    }

    fn render_index(&self, title: &str, entries: &[IndexEntry]) -> String {
        let mut out = format!("# {}\n\n", title);
        if entries.is_empty() {
            out.push_str("No pages generated.\n");
        }
        for entry in entries {
            out.push_str(&format!(
                "- [{}]({})\n",
                entry.title,
                slash_path(&entry.page)
            ));
        }
        out
    }
}

pub fn renderer_for(format: DocFormat) -> Box<dyn Renderer> {
    match format {
        DocFormat::Sphinx => Box::new(SphinxRenderer),
        DocFormat::Markdown => Box::new(MarkdownRenderer),
    }
}

/// `<dir relative to root>/<stem>.<ext>`, dropping anything that would
/// climb out of the output tree.
fn page_relative(source_root: &Path, unit_path: &Path, format: DocFormat) -> PathBuf {
    let relative = unit_path
        .strip_prefix(source_root)
        .ok()
        .filter(|r| !r.as_os_str().is_empty())
        .unwrap_or_else(|| unit_path.file_name().map(Path::new).unwrap_or(unit_path));

    let mut page: PathBuf = relative
        .parent()
        .map(|dir| {
            dir.components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let stem = unit_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    page.push(format!("{}.{}", stem, format.extension()));
    page
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphinx_target_path() {
        let path = SphinxRenderer.target_path(
            Path::new("docs"),
            Path::new("/repo"),
            Path::new("/repo/net/Transmission.scala"),
            Language::Scala,
        );
        assert_eq!(path, PathBuf::from("docs/api/scala/net/Transmission.rst"));
    }

    #[test]
    fn test_markdown_target_path() {
        let path = MarkdownRenderer.target_path(
            Path::new("out"),
            Path::new("/repo"),
            Path::new("/repo/pkg/util.py"),
            Language::Python,
        );
        assert_eq!(path, PathBuf::from("out/python/pkg/util.md"));
    }

    #[test]
    fn test_single_file_root() {
        let path = SphinxRenderer.target_path(
            Path::new("docs"),
            Path::new("/repo/Transmission.scala"),
            Path::new("/repo/Transmission.scala"),
            Language::Scala,
        );
        assert_eq!(path, PathBuf::from("docs/api/scala/Transmission.rst"));
    }

    #[test]
    fn test_parent_components_dropped() {
        let path = MarkdownRenderer.target_path(
            Path::new("out"),
            Path::new("/elsewhere"),
            Path::new("../lib/Main.java"),
            Language::Java,
        );
        assert_eq!(path, PathBuf::from("out/java/Main.md"));
    }

    #[test]
    fn test_sphinx_index_toctree() {
        let index = SphinxRenderer.render_index(
            "API Reference",
            &[IndexEntry {
                title: "ReliableTransmission".to_string(),
                page: PathBuf::from("api/scala/net/Transmission.rst"),
            }],
        );
        assert!(index.starts_with("API Reference\n=============\n"));
        assert!(index.contains(".. toctree::"));
        assert!(index.contains("   api/scala/net/Transmission\n"));
    }

    #[test]
    fn test_markdown_index_links() {
        let index = MarkdownRenderer.render_index(
            "API Reference",
            &[IndexEntry {
                title: "util".to_string(),
                page: PathBuf::from("python/pkg/util.md"),
            }],
        );
        assert!(index.contains("- [util](python/pkg/util.md)"));
    }
}
