//! Idempotent documentation writer.
//!
//! Every write lands through a sibling temp file and a rename, so a reader
//! never sees a half-written page. Rewriting identical content is detected by
//! digest and leaves the file untouched.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::{AutodocError, DocumentationRecord, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOutcome {
    Created,
    Overwritten,
    /// Target already held byte-identical content
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteResult {
    pub path: PathBuf,
    pub bytes: usize,
    /// SHA-256 of the written content, lowercase hex
    pub digest: String,
    pub outcome: WriteOutcome,
}

#[derive(Debug, Clone)]
struct WriteEntry {
    source: Option<PathBuf>,
    digest: String,
}

/// Persists validated records.
///
/// Shared across workers; the registry remembers which source produced each
/// target so a batch can report what it wrote. A target belongs to the first
/// source that claims it; a second source mapping to the same page is refused.
#[derive(Debug, Default)]
pub struct OutputWriter {
    registry: DashMap<PathBuf, WriteEntry>,
}

impl OutputWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a validated record to `target`, replacing any previous content.
    pub fn write(&self, record: DocumentationRecord, target: &Path) -> Result<WriteResult> {
        if !record.is_validated() {
            return Err(AutodocError::write(target, "record has not been validated"));
        }

        let claimed = self.claim(target, &record.source)?;
        let result = match self.write_text(target, &record.text) {
            Ok(result) => result,
            Err(e) => {
                if claimed {
                    self.registry.remove(target);
                }
                return Err(e);
            }
        };
        info!(
            source = %record.source.display(),
            target = %result.path.display(),
            outcome = ?result.outcome,
            "Documentation written"
        );
        self.registry.insert(
            result.path.clone(),
            WriteEntry {
                source: Some(record.source),
                digest: result.digest.clone(),
            },
        );
        Ok(result)
    }

    /// Reserve `target` for `source`. Returns true when this call made the claim.
    fn claim(&self, target: &Path, source: &Path) -> Result<bool> {
        match self.registry.entry(target.to_path_buf()) {
            Entry::Occupied(entry) => match &entry.get().source {
                Some(owner) if owner != source => Err(AutodocError::write(
                    target,
                    format!("already holds documentation for '{}'", owner.display()),
                )),
                _ => Ok(false),
            },
            Entry::Vacant(entry) => {
                entry.insert(WriteEntry {
                    source: Some(source.to_path_buf()),
                    digest: String::new(),
                });
                Ok(true)
            }
        }
    }

    /// Write a generated page (index, table of contents) that has no source.
    pub fn write_page(&self, target: &Path, content: &str) -> Result<WriteResult> {
        let result = self.write_text(target, content)?;
        self.registry.insert(
            result.path.clone(),
            WriteEntry {
                source: None,
                digest: result.digest.clone(),
            },
        );
        Ok(result)
    }

    fn write_text(&self, target: &Path, content: &str) -> Result<WriteResult> {
        let digest = content_digest(content);

        if target.is_dir() {
            return Err(AutodocError::write(target, "target is a directory"));
        }

        let existed = target.exists();
        if existed
            && let Ok(current) = fs::read(target)
            && content_digest_bytes(&current) == digest
        {
            debug!(target = %target.display(), "Content unchanged, skipping write");
            return Ok(WriteResult {
                path: target.to_path_buf(),
                bytes: content.len(),
                digest,
                outcome: WriteOutcome::Unchanged,
            });
        }

        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                AutodocError::write(
                    target,
                    format!("cannot create directory '{}': {}", parent.display(), e),
                )
            })?;
        }

        let temp = temp_path(target);
        if let Err(e) = fs::write(&temp, content) {
            let _ = fs::remove_file(&temp);
            return Err(AutodocError::write(target, e));
        }
        if let Err(e) = fs::rename(&temp, target) {
            let _ = fs::remove_file(&temp);
            return Err(AutodocError::write(target, e));
        }

        Ok(WriteResult {
            path: target.to_path_buf(),
            bytes: content.len(),
            digest,
            outcome: if existed {
                WriteOutcome::Overwritten
            } else {
                WriteOutcome::Created
            },
        })
    }

    /// Targets written so far with the source each came from, sorted by path.
    pub fn written(&self) -> Vec<(PathBuf, Option<PathBuf>)> {
        let mut entries: Vec<_> = self
            .registry
            .iter()
            .map(|e| (e.key().clone(), e.value().source.clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Digest recorded for `target`, if this writer produced it
    pub fn digest_of(&self, target: &Path) -> Option<String> {
        self.registry.get(target).map(|e| e.digest.clone())
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

fn content_digest(content: &str) -> String {
    content_digest_bytes(content.as_bytes())
}

fn content_digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// `.name.<uuid>.tmp` next to the target, so the rename stays on one filesystem
fn temp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    target.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()))
}
