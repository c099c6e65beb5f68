//! Batch report
//!
//! One entry per input file, in input order. Serialized as JSON with
//! `--report`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ai::MetricsSummary;
use crate::output::WriteOutcome;
use crate::types::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UnitOutcome {
    Succeeded {
        output: PathBuf,
        write: WriteOutcome,
        attempts: u32,
        turns: usize,
        corrections: usize,
    },
    /// Dry run: parsed and prompted, model not contacted
    Planned { output: PathBuf, symbols: usize },
    Skipped { reason: String },
    Failed { reason: String, attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitReport {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub outcome: UnitOutcome,
}

impl UnitReport {
    pub fn skipped(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language: None,
            outcome: UnitOutcome::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn failed(path: impl Into<PathBuf>, reason: impl Into<String>, attempts: u32) -> Self {
        Self {
            path: path.into(),
            language: None,
            outcome: UnitOutcome::Failed {
                reason: reason.into(),
                attempts,
            },
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn output(&self) -> Option<&Path> {
        match &self.outcome {
            UnitOutcome::Succeeded { output, .. } | UnitOutcome::Planned { output, .. } => {
                Some(output)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub units: Vec<UnitReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<PathBuf>,
    /// Why the index page could not be written; unit pages are unaffected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsSummary>,
}

impl BatchReport {
    fn count(&self, pred: impl Fn(&UnitOutcome) -> bool) -> usize {
        self.units.iter().filter(|u| pred(&u.outcome)).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Succeeded { .. }))
    }

    pub fn planned(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Planned { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || self.index_error.is_some()
    }

    pub fn summary_line(&self) -> String {
        if self.dry_run {
            format!(
                "{} planned, {} skipped, {} failed",
                self.planned(),
                self.skipped(),
                self.failed()
            )
        } else {
            format!(
                "{} succeeded, {} skipped, {} failed",
                self.succeeded(),
                self.skipped(),
                self.failed()
            )
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
