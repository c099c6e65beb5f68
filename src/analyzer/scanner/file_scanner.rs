use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::analyzer::parser::Language;
use crate::constants::scanner::{DEFAULT_MAX_FILE_SIZE, DEFAULT_SKIP_DIRS};
use crate::types::{AutodocError, Result};

/// Collects candidate source files under a root, honoring `.gitignore`.
pub struct FileScanner {
    root: PathBuf,
    include: Vec<String>,
    exclude: Vec<String>,
    max_file_size: u64,
}

impl FileScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let exclude = DEFAULT_SKIP_DIRS
            .iter()
            .flat_map(|d| [format!("{}/**", d), format!("**/{}/**", d)])
            .collect();
        Self {
            root: root.as_ref().to_path_buf(),
            include: Vec::new(),
            exclude,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Only files matching one of these globs (relative to the root) are kept.
    pub fn with_include(mut self, patterns: Vec<String>) -> Self {
        self.include = patterns;
        self
    }

    /// Add exclude globs on top of the default skip directories.
    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude.extend(patterns);
        self
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Scan the root. A root that is itself a file yields just that file.
    ///
    /// Files of every recognized language are returned, including ones
    /// without a parser, so they show up as skipped in the batch report.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        if !self.root.exists() {
            return Err(AutodocError::FileNotFound {
                path: self.root.display().to_string(),
            });
        }
        if self.root.is_file() {
            let size = self.root.metadata()?.len();
            return Ok(vec![ScannedFile::new(self.root.clone(), size)]);
        }

        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false) // Security: prevent symlink traversal attacks
            .build();

        let mut files = Vec::new();
        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();

            if !path.is_file() || !Language::from_path(path).is_known() {
                continue;
            }

            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            if self.should_exclude(relative) || !self.is_included(relative) {
                continue;
            }

            match path.metadata() {
                Ok(metadata) if metadata.len() <= self.max_file_size => {
                    files.push(ScannedFile::new(path.to_path_buf(), metadata.len()));
                }
                Ok(metadata) => {
                    tracing::debug!(
                        path = %path.display(),
                        size = metadata.len(),
                        "Skipping oversized file"
                    );
                }
                Err(e) => tracing::warn!("Cannot stat {}: {}", path.display(), e),
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn should_exclude(&self, relative: &Path) -> bool {
        let path_str = relative.to_string_lossy();
        self.exclude.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches(&path_str))
                .unwrap_or(false)
        })
    }

    fn is_included(&self, relative: &Path) -> bool {
        if self.include.is_empty() {
            return true;
        }
        let path_str = relative.to_string_lossy();
        self.include.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches(&path_str))
                .unwrap_or(false)
        })
    }
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub size: u64,
    pub language: Language,
}

impl ScannedFile {
    fn new(path: PathBuf, size: u64) -> Self {
        let language = Language::from_path(&path);
        Self {
            path,
            size,
            language,
        }
    }
}
