//! Generate Command
//!
//! Documents every supported source file under a path.
//!
//! Usage:
//!   autodoc generate <PATH> [-o DIR] [-f sphinx|markdown] [--language TAG]
//!                    [--provider NAME] [--model NAME] [--retry-limit N]
//!                    [--concurrency N] [--report FILE] [--dry-run]

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::ai::TimeoutConfig;
use crate::ai::provider::{ProviderConfig, create_provider};
use crate::analyzer::scanner::FileScanner;
use crate::cli::ui::Output;
use crate::config::{Config, ConfigLoader};
use crate::pipeline::{BatchReport, Orchestrator, PipelineConfig};
use crate::types::{AutodocError, DocFormat, Result};

/// Flags of `autodoc generate`; `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub path: PathBuf,
    pub output: Option<PathBuf>,
    pub format: Option<DocFormat>,
    pub language: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub retry_limit: Option<u32>,
    pub concurrency: Option<usize>,
    pub report: Option<PathBuf>,
    pub dry_run: bool,
}

impl GenerateOptions {
    /// Layer the command-line flags over a loaded config
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(output) = &self.output {
            config.output.dir = output.clone();
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(provider) = &self.provider {
            config.llm.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(limit) = self.retry_limit {
            config.retry.retry_limit = limit;
        }
        if let Some(concurrency) = self.concurrency {
            config.analysis.concurrency = concurrency;
        }
        config.validate()
    }

    /// Directory that `read_file` paths and the output layout are relative to
    fn source_root(&self) -> PathBuf {
        if self.path.is_file() {
            self.path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        } else {
            self.path.clone()
        }
    }
}

pub fn run(options: GenerateOptions) -> Result<BatchReport> {
    let out = Output::new();
    let project_root = std::env::current_dir()?;
    let mut config = ConfigLoader::load(&project_root)?;
    options.apply(&mut config)?;

    let files: Vec<PathBuf> = FileScanner::new(&options.path)
        .with_include(config.analysis.include.clone())
        .with_exclude(config.analysis.exclude.clone())
        .with_max_file_size(config.analysis.max_file_size)
        .scan()?
        .into_iter()
        .map(|f| f.path)
        .collect();

    if files.is_empty() {
        out.warning(&format!(
            "No source files found under {}",
            options.path.display()
        ));
    }

    let mut pipeline = PipelineConfig::from_config(&config, options.source_root());
    pipeline.language = options.language.clone();
    pipeline.dry_run = options.dry_run;

    let provider = create_provider(&ProviderConfig::from(&config.llm))?;
    info!(
        provider = provider.name(),
        model = provider.model(),
        files = files.len(),
        output = %pipeline.output_dir.display(),
        "Generating documentation"
    );

    out.header(if options.dry_run {
        "Documentation plan"
    } else {
        "Generating documentation"
    });
    out.key_value("Source", pipeline.source_root.display());
    out.key_value("Output", pipeline.output_dir.display());
    out.key_value("Format", pipeline.format);
    out.key_value("Provider", format!("{} ({})", provider.name(), provider.model()));

    let orchestrator = Orchestrator::new(provider, pipeline);
    let runtime = Runtime::new()?;
    let report = runtime.block_on(async {
        if !options.dry_run {
            preflight(&orchestrator).await?;
        }
        let cancel = orchestrator.cancel_flag();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling in-flight requests");
                cancel.store(true, Ordering::SeqCst);
            }
        });
        let report = orchestrator.run(files).await;
        watcher.abort();
        report
    })?;

    out.batch(&report);

    if let Some(path) = &options.report {
        report.save_json(path).map_err(|e| match e {
            AutodocError::Io(io) => AutodocError::write(path, io),
            other => other,
        })?;
        out.info(&format!("Report: {}", path.display()));
    }

    Ok(report)
}

/// Fail fast when the provider cannot answer at all
async fn preflight(orchestrator: &Orchestrator) -> Result<()> {
    let provider = orchestrator.provider();
    let wait = TimeoutConfig::default().health_check;
    match tokio::time::timeout(wait, provider.health_check()).await {
        Ok(Ok(true)) => Ok(()),
        Ok(Ok(false)) => Err(AutodocError::Config(format!(
            "Provider {} is not available",
            provider.name()
        ))),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(AutodocError::Config(format!(
            "Provider {} did not answer its health check within {:?}",
            provider.name(),
            wait
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        let options = GenerateOptions {
            output: Some(PathBuf::from("site")),
            format: Some(DocFormat::Markdown),
            model: Some("opus".to_string()),
            retry_limit: Some(5),
            concurrency: Some(2),
            ..GenerateOptions::default()
        };
        options.apply(&mut config).unwrap();

        assert_eq!(config.output.dir, PathBuf::from("site"));
        assert_eq!(config.output.format, DocFormat::Markdown);
        assert_eq!(config.llm.model, "opus");
        assert_eq!(config.llm.provider, "claude-code");
        assert_eq!(config.retry.retry_limit, 5);
        assert_eq!(config.analysis.concurrency, 2);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut config = Config::default();
        let options = GenerateOptions {
            concurrency: Some(0),
            ..GenerateOptions::default()
        };
        assert!(matches!(
            options.apply(&mut config),
            Err(AutodocError::Config(_))
        ));
    }

    #[test]
    fn test_source_root_of_file_is_parent() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("A.scala");
        std::fs::write(&file, "object A").unwrap();

        let options = GenerateOptions {
            path: file,
            ..GenerateOptions::default()
        };
        assert_eq!(options.source_root(), dir.path());

        let options = GenerateOptions {
            path: dir.path().to_path_buf(),
            ..GenerateOptions::default()
        };
        assert_eq!(options.source_root(), dir.path());
    }
}
