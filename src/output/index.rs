use std::path::Path;
use tracing::info;

use super::render::{IndexEntry, Renderer};
use super::writer::{OutputWriter, WriteResult};
use crate::types::Result;

/// Writes the batch index page listing every generated page.
pub struct IndexGenerator<'a> {
    writer: &'a OutputWriter,
    renderer: &'a dyn Renderer,
    title: String,
}

impl<'a> IndexGenerator<'a> {
    pub fn new(writer: &'a OutputWriter, renderer: &'a dyn Renderer) -> Self {
        Self {
            writer,
            renderer,
            title: "API Reference".to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// `pages` are (title, absolute page path) pairs; pages outside
    /// `output_dir` are left out of the index.
    pub fn generate<P: AsRef<Path>>(
        &self,
        output_dir: P,
        pages: &[(String, std::path::PathBuf)],
    ) -> Result<WriteResult> {
        let output_dir = output_dir.as_ref();

        let mut entries: Vec<IndexEntry> = pages
            .iter()
            .filter_map(|(title, path)| {
                path.strip_prefix(output_dir).ok().map(|page| IndexEntry {
                    title: title.clone(),
                    page: page.to_path_buf(),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.page.cmp(&b.page));
        entries.dedup_by(|a, b| a.page == b.page);

        let content = self.renderer.render_index(&self.title, &entries);
        let target = output_dir.join(self.renderer.index_file_name());
        let result = self.writer.write_page(&target, &content)?;

        info!(
            pages = entries.len(),
            path = %target.display(),
            "Index written"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::render::{MarkdownRenderer, SphinxRenderer};
    use crate::output::writer::WriteOutcome;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_index_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new();
        let pages = vec![(
            "ReliableTransmission".to_string(),
            dir.path().join("api/scala/Transmission.rst"),
        )];

        let generator = IndexGenerator::new(&writer, &SphinxRenderer);
        let first = generator.generate(dir.path(), &pages).unwrap();
        let second = generator.generate(dir.path(), &pages).unwrap();

        assert_eq!(first.outcome, WriteOutcome::Created);
        assert_eq!(second.outcome, WriteOutcome::Unchanged);
        let content = fs::read_to_string(dir.path().join("index.rst")).unwrap();
        assert!(content.contains("api/scala/Transmission"));
    }

    #[test]
    fn test_index_skips_foreign_pages() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new();
        let pages = vec![
            ("util".to_string(), dir.path().join("python/util.md")),
            ("stray".to_string(), std::path::PathBuf::from("/tmp/stray.md")),
        ];

        IndexGenerator::new(&writer, &MarkdownRenderer)
            .with_title("Docs")
            .generate(dir.path(), &pages)
            .unwrap();

        let content = fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert!(content.starts_with("# Docs"));
        assert!(content.contains("[util](python/util.md)"));
        assert!(!content.contains("stray"));
    }
}
