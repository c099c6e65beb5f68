//! Orchestrator
//!
//! Drives each source file through parse → prompt → tool-calling request →
//! validation → write, and retries failed requests whole. Files run
//! concurrently; within one file every step is sequential.

use chrono::Utc;
use futures::StreamExt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::report::{BatchReport, UnitOutcome, UnitReport};
use super::retry::{AttemptState, RetryBudget, RetryPolicy};
use crate::ai::prompt::{PromptMessage, PromptOptions, PromptTemplates};
use crate::ai::protocol::{ClientConfig, ToolCallingClient, Workspace};
use crate::ai::provider::SharedProvider;
use crate::ai::validation::ResponseValidator;
use crate::ai::{SharedMetrics, create_shared_metrics};
use crate::analyzer::parser::{parse_source, resolve_language};
use crate::config::Config;
use crate::constants::concurrency::DEFAULT_WORKERS;
use crate::output::{IndexGenerator, OutputWriter, Renderer, renderer_for};
use crate::types::{AutodocError, DocFormat, Result, SourceUnit};

/// Everything one batch needs to know
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// `read_file` paths and output layout are relative to this
    pub source_root: PathBuf,
    pub output_dir: PathBuf,
    pub format: DocFormat,
    /// Explicit language tag; detection by extension when absent
    pub language: Option<String>,
    pub concurrency: usize,
    pub embed_source: bool,
    pub write_index: bool,
    pub dry_run: bool,
    pub client: ClientConfig,
    pub retry: RetryPolicy,
    pub retry_budget: u32,
    pub extra_debug_phrases: Vec<String>,
}

impl PipelineConfig {
    pub fn new(source_root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_dir: output_dir.into(),
            format: DocFormat::default(),
            language: None,
            concurrency: DEFAULT_WORKERS,
            embed_source: false,
            write_index: true,
            dry_run: false,
            client: ClientConfig::default(),
            retry: RetryPolicy::default(),
            retry_budget: crate::constants::retry::DEFAULT_GLOBAL_BUDGET,
            extra_debug_phrases: Vec::new(),
        }
    }

    pub fn from_config(config: &Config, source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_dir: config.output.dir.clone(),
            format: config.output.format,
            language: None,
            concurrency: config.analysis.concurrency,
            embed_source: config.protocol.embed_source,
            write_index: config.output.write_index,
            dry_run: false,
            client: ClientConfig {
                max_turns: config.protocol.max_turns,
                max_read_attempts: config.protocol.max_read_attempts,
                correction_limit: config.protocol.correction_limit,
                turn_timeout: Duration::from_secs(config.llm.timeout_secs),
                max_read_bytes: config.protocol.max_read_bytes,
                relationships: config.output.relationships,
            },
            retry: RetryPolicy {
                limit: config.retry.retry_limit,
                base_delay: Duration::from_millis(config.retry.base_delay_ms),
                max_delay: Duration::from_secs(config.retry.max_delay_secs),
                ..RetryPolicy::default()
            },
            retry_budget: config.retry.budget,
            extra_debug_phrases: config.validation.extra_debug_phrases.clone(),
        }
    }
}

pub struct Orchestrator {
    provider: SharedProvider,
    writer: Arc<OutputWriter>,
    renderer: Box<dyn Renderer>,
    budget: Arc<RetryBudget>,
    metrics: SharedMetrics,
    cancel: Arc<AtomicBool>,
    session_id: String,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(provider: SharedProvider, config: PipelineConfig) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        Self {
            provider,
            writer: Arc::new(OutputWriter::new()),
            renderer: renderer_for(config.format),
            budget: Arc::new(RetryBudget::new(config.retry_budget)),
            metrics: create_shared_metrics(session_id.clone()),
            cancel: Arc::new(AtomicBool::new(false)),
            session_id,
            config,
        }
    }

    /// Share a retry budget with other orchestrators in the process
    pub fn with_budget(mut self, budget: Arc<RetryBudget>) -> Self {
        self.budget = budget;
        self
    }

    pub fn provider(&self) -> &SharedProvider {
        &self.provider
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Document every file; the report lists them in the order given.
    pub async fn run(&self, files: Vec<PathBuf>) -> Result<BatchReport> {
        let started_at = Utc::now();
        info!(
            files = files.len(),
            format = %self.config.format,
            concurrency = self.config.concurrency,
            dry_run = self.config.dry_run,
            "Starting documentation batch"
        );

        let mut indexed: Vec<(usize, UnitReport)> = futures::stream::iter(
            files.into_iter().enumerate(),
        )
        .map(|(i, path)| async move { (i, self.process_file(&path).await) })
        .buffer_unordered(self.config.concurrency.max(1))
        .collect()
        .await;
        indexed.sort_by_key(|(i, _)| *i);
        let units: Vec<UnitReport> = indexed.into_iter().map(|(_, unit)| unit).collect();

        let (index, index_error) = if self.config.write_index && !self.config.dry_run {
            match self.write_index(&units) {
                Ok(index) => (index, None),
                Err(e) => {
                    warn!(error = %e, "Index page not written");
                    (None, Some(e.to_string()))
                }
            }
        } else {
            (None, None)
        };

        let report = BatchReport {
            session_id: self.session_id.clone(),
            started_at,
            finished_at: Utc::now(),
            dry_run: self.config.dry_run,
            units,
            index,
            index_error,
            metrics: (!self.config.dry_run).then(|| self.metrics.summary()),
        };
        info!(summary = %report.summary_line(), "Batch complete");
        Ok(report)
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn process_file(&self, path: &Path) -> UnitReport {
        let unit = match self.prepare(path) {
            Ok(unit) => unit,
            Err(e) if e.is_skip() => {
                info!(reason = %e, "Skipping unit");
                return UnitReport::skipped(path, e.to_string());
            }
            Err(e) => {
                warn!(error = %e, "Cannot load unit");
                return UnitReport::failed(path, e.to_string(), 0);
            }
        };
        let unit = Arc::new(unit);

        let target = self.renderer.target_path(
            &self.config.output_dir,
            &self.config.source_root,
            path,
            unit.language,
        );
        let prompt = PromptTemplates::documentation(&unit, &self.prompt_options(path, &target));

        let outcome = if self.config.dry_run {
            UnitOutcome::Planned {
                output: target,
                symbols: unit.documentable_symbols().count(),
            }
        } else {
            self.document(&unit, &prompt, &target).await
        };

        UnitReport {
            path: path.to_path_buf(),
            language: Some(unit.language.tag().to_string()),
            outcome,
        }
    }

    fn prepare(&self, path: &Path) -> Result<SourceUnit> {
        let language = resolve_language(path, self.config.language.as_deref())?;
        let content = fs::read_to_string(path)?;
        parse_source(path, &content, language)
    }

    fn prompt_options(&self, path: &Path, target: &Path) -> PromptOptions {
        let relative = path.strip_prefix(&self.config.source_root).unwrap_or(path);
        let read_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        PromptOptions {
            format: self.config.format,
            read_path,
            save_path: target.display().to_string(),
            embed_source: self.config.embed_source,
        }
    }

    fn client(&self) -> ToolCallingClient {
        let validator = ResponseValidator::new(self.config.format)
            .with_extra_debug_phrases(self.config.extra_debug_phrases.iter().cloned());
        ToolCallingClient::new(
            Arc::clone(&self.provider),
            validator,
            Arc::clone(&self.writer),
            Workspace::new(&self.config.source_root),
        )
        .with_config(self.config.client.clone())
        .with_cancel_flag(Arc::clone(&self.cancel))
        .with_metrics(Arc::clone(&self.metrics))
    }

    /// Run the request, retrying it whole on retryable failures.
    async fn document(
        &self,
        unit: &SourceUnit,
        prompt: &PromptMessage,
        target: &Path,
    ) -> UnitOutcome {
        let client = self.client();
        let mut attempt = AttemptState::new(self.config.retry.limit);

        loop {
            let error = match client.run(unit, prompt, target).await {
                Ok(outcome) => {
                    return UnitOutcome::Succeeded {
                        output: outcome.write.path,
                        write: outcome.write.outcome,
                        attempts: attempt.attempts(),
                        turns: outcome.turns,
                        corrections: outcome.corrections,
                    };
                }
                Err(e) => e,
            };

            let reason = error.to_string();
            attempt.record_failure(&reason);
            let failed = |reason: String| UnitOutcome::Failed {
                reason,
                attempts: attempt.attempts(),
            };

            if matches!(error, AutodocError::Cancelled) || self.cancel.load(Ordering::SeqCst) {
                return failed(reason);
            }
            if !error.is_unit_retryable() {
                warn!(error = %reason, "Not retryable, unit failed");
                return failed(reason);
            }
            if !attempt.can_retry() {
                warn!(attempts = attempt.attempts(), error = %reason, "Retry limit reached");
                return failed(format!(
                    "{} (gave up after {} attempts)",
                    reason,
                    attempt.attempts()
                ));
            }
            if !self.budget.try_acquire() {
                warn!(error = %reason, "Global retry budget exhausted");
                return failed(format!("{} (retry budget exhausted)", reason));
            }

            attempt.begin_retry();
            self.metrics.record_unit_retry();
            let delay = self
                .config
                .retry
                .delay_for(attempt.retry_count(), error.retry_hint());
            warn!(
                retry = attempt.retry_count(),
                limit = self.config.retry.limit,
                delay_ms = delay.as_millis() as u64,
                error = %reason,
                "Retrying documentation request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn write_index(&self, units: &[UnitReport]) -> Result<Option<PathBuf>> {
        let pages: Vec<(String, PathBuf)> = units
            .iter()
            .filter(|u| matches!(u.outcome, UnitOutcome::Succeeded { .. }))
            .filter_map(|u| {
                let title = u.path.file_stem()?.to_string_lossy().into_owned();
                Some((title, u.output()?.to_path_buf()))
            })
            .collect();
        if pages.is_empty() {
            return Ok(None);
        }

        let result = IndexGenerator::new(&self.writer, self.renderer.as_ref())
            .generate(&self.config.output_dir, &pages)?;
        Ok(Some(result.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::protocol::Conversation;
    use crate::ai::provider::{LlmProvider, LlmResponse};
    use crate::types::{ErrorCategory, LlmError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    const RELIABLE_TRANSMISSION: &str = r#"package services

/**
 * Reliable transmission over an unreliable channel.
 */
object ReliableTransmission {

  /**
   * Sends data to the remote endpoint.
   *
   * @param data the payload to send
   * @param retries maximum number of attempts
   */
  def sendData(data: String, retries: Int): Boolean = {
    true
  }

  def receiveData(timeout: Duration): Option[String] = None

  def handleTransmissionError(error: Throwable): Unit = {
    println(error.getMessage)
  }
}
"#;

    const TRANSMISSION_DOC: &str = "\
.. note:: This documentation was auto-generated from source code and may contain errors.

ReliableTransmission
====================

Reliable transmission over an unreliable channel. Retries sends and reports
failures.

sendData
--------

:param data: (String) the payload to send
:param retries: (Int) maximum number of attempts
:returns: (Boolean) whether the data was acknowledged

receiveData
-----------

:param timeout: (Duration) how long to wait
:returns: (Option[String]) the received data, if any

handleTransmissionError
-----------------------

:param error: (Throwable) the failure that occurred
";

    /// Replies from a shared script regardless of which unit asks
    struct ScriptedProvider {
        replies: Mutex<VecDeque<Result<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, _conversation: &Conversation) -> Result<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.replies.lock().unwrap().pop_front();
            match next {
                Some(reply) => reply.map(LlmResponse::content_only),
                None => Err(AutodocError::LlmApi("script exhausted".to_string())),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn save(body: &str) -> Result<String> {
        Ok(format!(
            "save_documentation(\"ReliableTransmission.rst\") -> <<<\n{}>>>",
            body
        ))
    }

    struct Fixture {
        src: TempDir,
        out: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let src = TempDir::new().unwrap();
            let services = src.path().join("services");
            fs::create_dir_all(&services).unwrap();
            fs::write(
                services.join("ReliableTransmission.scala"),
                RELIABLE_TRANSMISSION,
            )
            .unwrap();
            Self {
                src,
                out: TempDir::new().unwrap(),
            }
        }

        fn unit_path(&self) -> PathBuf {
            self.src.path().join("services/ReliableTransmission.scala")
        }

        fn config(&self) -> PipelineConfig {
            let mut config = PipelineConfig::new(self.src.path(), self.out.path());
            config.concurrency = 1;
            config.retry = RetryPolicy {
                limit: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                ..RetryPolicy::default()
            };
            config
        }
    }

    #[tokio::test]
    async fn test_reliable_transmission_end_to_end() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(vec![
            Ok("read_file(\"services/ReliableTransmission.scala\")".to_string()),
            save(TRANSMISSION_DOC),
        ]);
        let orchestrator = Orchestrator::new(provider.clone(), fx.config());

        let report = orchestrator.run(vec![fx.unit_path()]).await.unwrap();

        assert_eq!(report.succeeded(), 1);
        let output = fx
            .out
            .path()
            .join("api/scala/services/ReliableTransmission.rst");
        let written = fs::read_to_string(&output).unwrap();
        assert!(written.contains("auto-generated"));
        assert!(written.starts_with(".. note::"));
        for method in ["sendData", "receiveData", "handleTransmissionError"] {
            assert!(written.contains(&format!("{}\n{}", method, "-".repeat(method.len()))));
        }
        assert!(written.contains(":param retries: (Int)"));
        assert_eq!(report.index, Some(fx.out.path().join("index.rst")));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_request_retried_whole() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(vec![
            Ok("I am unable to proceed.".to_string()),
            save(TRANSMISSION_DOC),
        ]);
        let orchestrator = Orchestrator::new(provider, fx.config());

        let report = orchestrator.run(vec![fx.unit_path()]).await.unwrap();
        match &report.units[0].outcome {
            UnitOutcome::Succeeded { attempts, .. } => assert_eq!(*attempts, 2),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(orchestrator.metrics().summary().unit_retries, 1);
    }

    #[tokio::test]
    async fn test_retry_limit_marks_unit_failed() {
        let fx = Fixture::new();
        let refusals = (0..5)
            .map(|_| Ok("Cannot proceed.".to_string()))
            .collect();
        let provider = ScriptedProvider::new(refusals);
        let orchestrator = Orchestrator::new(provider.clone(), fx.config());

        let report = orchestrator.run(vec![fx.unit_path()]).await.unwrap();
        match &report.units[0].outcome {
            UnitOutcome::Failed { reason, attempts } => {
                assert_eq!(*attempts, 3);
                assert!(reason.contains("cannot proceed"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        // One request per attempt, never more than limit + 1
        assert_eq!(provider.calls(), 3);
        assert!(report.has_failures());
        assert_eq!(report.index, None);
    }

    #[tokio::test]
    async fn test_auth_failure_not_retried() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(vec![Err(AutodocError::Llm(LlmError::new(
            ErrorCategory::Auth,
            "401 unauthorized",
        )))]);
        let orchestrator = Orchestrator::new(provider.clone(), fx.config());

        let report = orchestrator.run(vec![fx.unit_path()]).await.unwrap();
        assert!(matches!(
            report.units[0].outcome,
            UnitOutcome::Failed { attempts: 1, .. }
        ));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_global_budget_stops_retries() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(vec![
            Ok("cannot proceed".to_string()),
            Ok("cannot proceed".to_string()),
        ]);
        let orchestrator = Orchestrator::new(provider.clone(), fx.config())
            .with_budget(Arc::new(RetryBudget::new(0)));

        let report = orchestrator.run(vec![fx.unit_path()]).await.unwrap();
        match &report.units[0].outcome {
            UnitOutcome::Failed { reason, .. } => assert!(reason.contains("budget")),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_skips_do_not_abort_batch() {
        let fx = Fixture::new();
        let kotlin = fx.src.path().join("Main.kt");
        fs::write(&kotlin, "fun main() {}\n").unwrap();
        let broken = fx.src.path().join("Broken.scala");
        fs::write(
            &broken,
            "object Broken {\n  def f(x: Int): Int = {\n    x + 1\n",
        )
        .unwrap();

        let provider = ScriptedProvider::new(vec![save(TRANSMISSION_DOC)]);
        let orchestrator = Orchestrator::new(provider, fx.config());

        let report = orchestrator
            .run(vec![kotlin.clone(), broken.clone(), fx.unit_path()])
            .await
            .unwrap();

        assert_eq!(report.skipped(), 2);
        assert_eq!(report.succeeded(), 1);
        // Input order preserved
        assert_eq!(report.units[0].path, kotlin);
        assert_eq!(report.units[1].path, broken);
        assert!(matches!(
            &report.units[0].outcome,
            UnitOutcome::Skipped { reason } if reason.contains("kotlin")
        ));
    }

    fn python_doc(function: &str) -> Result<String> {
        Ok(format!(
            "save_documentation(\"model.rst\") -> <<<\n\
             .. note:: This documentation was auto-generated from source code and may contain errors.\n\n\
             model\n=====\n\n{f}\n{u}\n\nComputes {f}.\n\n:returns: (unknown) the computed value\n>>>",
            f = function,
            u = "-".repeat(function.len())
        ))
    }

    #[tokio::test]
    async fn test_same_stem_units_do_not_overwrite() {
        let fx = Fixture::new();
        let module = fx.src.path().join("model.py");
        let stub = fx.src.path().join("model.pyi");
        fs::write(&module, "def alpha():\n    pass\n").unwrap();
        fs::write(&stub, "def beta():\n    ...\n").unwrap();

        let provider = ScriptedProvider::new(vec![python_doc("alpha"), python_doc("beta")]);
        let orchestrator = Orchestrator::new(provider, fx.config());
        let report = orchestrator
            .run(vec![module.clone(), stub.clone()])
            .await
            .unwrap();

        let page = fx.out.path().join("api/python/model.rst");
        assert!(matches!(
            &report.units[0].outcome,
            UnitOutcome::Succeeded { output, .. } if *output == page
        ));
        match &report.units[1].outcome {
            UnitOutcome::Failed { reason, attempts } => {
                assert_eq!(*attempts, 1);
                assert!(reason.contains("model.py'"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        let written = fs::read_to_string(&page).unwrap();
        assert!(written.contains("alpha"));
        assert!(!written.contains("beta"));
    }

    #[tokio::test]
    async fn test_index_failure_keeps_unit_report() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.out.path().join("index.rst")).unwrap();
        let provider = ScriptedProvider::new(vec![save(TRANSMISSION_DOC)]);
        let orchestrator = Orchestrator::new(provider, fx.config());

        let report = orchestrator.run(vec![fx.unit_path()]).await.unwrap();

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.units.len(), 1);
        assert_eq!(report.index, None);
        assert!(report.index_error.as_deref().unwrap().contains("index.rst"));
        assert!(report.has_failures());
        assert!(
            fx.out
                .path()
                .join("api/scala/services/ReliableTransmission.rst")
                .exists()
        );
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_model() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(Vec::new());
        let mut config = fx.config();
        config.dry_run = true;
        let orchestrator = Orchestrator::new(provider.clone(), config);

        let report = orchestrator.run(vec![fx.unit_path()]).await.unwrap();
        assert_eq!(report.planned(), 1);
        assert_eq!(provider.calls(), 0);
        assert!(report.metrics.is_none());
        assert!(!fx.out.path().join("index.rst").exists());
    }

    #[tokio::test]
    async fn test_rerun_overwrites_not_duplicates() {
        let fx = Fixture::new();
        for _ in 0..2 {
            let provider = ScriptedProvider::new(vec![save(TRANSMISSION_DOC)]);
            let report = Orchestrator::new(provider, fx.config())
                .run(vec![fx.unit_path()])
                .await
                .unwrap();
            assert_eq!(report.succeeded(), 1);
        }
        let files: Vec<_> = fs::read_dir(fx.out.path().join("api/scala/services"))
            .unwrap()
            .collect();
        assert_eq!(files.len(), 1);
    }
}
