//! Tool-Calling Client
//!
//! Drives one documentation request through the model:
//!
//! ```text
//! AwaitingResponse ──directive──▶ ToolRequested ──per call──▶ Executing
//!        ▲                                                      │
//!        └────────────── Continuing ◀── tool output ────────────┘
//!
//! save accepted / terminal document ──▶ Completed
//! refusal, exhausted bounds, timeout ──▶ Failed
//! ```
//!
//! Calls are serviced strictly one at a time, in the order they appear in
//! the reply. Read misses and rejected saves are fed back to the model as
//! tool output; only exhausting their bounds fails the request.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::directive::{Reply, parse_reply};
use super::{Conversation, ToolCall};
use crate::ai::metrics::SharedMetrics;
use crate::ai::prompt::{PromptMessage, PromptTemplates};
use crate::ai::provider::SharedProvider;
use crate::ai::timeout::with_timeout;
use crate::ai::validation::ResponseValidator;
use crate::constants::{llm, protocol};
use crate::output::{OutputWriter, WriteResult, relations};
use crate::types::{AutodocError, Result, SourceUnit};

/// Per-request bounds
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub max_turns: usize,
    /// Failed reads fed back before the request fails
    pub max_read_attempts: usize,
    /// Correction turns after rejected saves before the request fails
    pub correction_limit: usize,
    pub turn_timeout: Duration,
    pub max_read_bytes: u64,
    /// Append a class relationship section to every saved page
    pub relationships: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_turns: protocol::DEFAULT_MAX_TURNS,
            max_read_attempts: protocol::DEFAULT_MAX_READ_ATTEMPTS,
            correction_limit: protocol::DEFAULT_CORRECTION_LIMIT,
            turn_timeout: Duration::from_secs(llm::DEFAULT_TURN_TIMEOUT_SECS),
            max_read_bytes: protocol::MAX_READ_BYTES,
            relationships: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientState {
    AwaitingResponse,
    ToolRequested,
    Executing,
    Continuing,
    Completed,
    Failed,
}

/// One entry of the request trace, in the order things happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    Transition {
        from: ClientState,
        to: ClientState,
        turn: usize,
    },
    ReadServiced {
        path: String,
        bytes: usize,
    },
    ReadFailed {
        path: String,
        reason: String,
    },
    SaveRejected {
        kind: String,
        element: String,
    },
    SaveAccepted {
        path: PathBuf,
    },
    /// The model asked to save somewhere other than the configured target
    PathOverridden {
        requested: String,
        target: PathBuf,
    },
    Reminder {
        turn: usize,
    },
}

/// A completed request
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub write: WriteResult,
    pub turns: usize,
    pub corrections: usize,
    pub read_failures: usize,
    pub events: Vec<ClientEvent>,
}

/// Files the model may read through `read_file`: everything under one root.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    max_read_bytes: u64,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_read_bytes: protocol::MAX_READ_BYTES,
        }
    }

    pub fn with_max_read_bytes(mut self, max: u64) -> Self {
        self.max_read_bytes = max;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a file named relative to the root.
    ///
    /// Paths that do not exist or resolve outside the root are reported as
    /// `FileNotFound`.
    pub fn read(&self, requested: &str) -> Result<String> {
        let not_found = || AutodocError::FileNotFound {
            path: requested.to_string(),
        };

        let requested_path = Path::new(requested.trim());
        let candidate = if requested_path.is_absolute() {
            requested_path.to_path_buf()
        } else {
            self.root.join(requested_path)
        };

        let root = self.root.canonicalize().map_err(|_| not_found())?;
        let resolved = candidate.canonicalize().map_err(|_| not_found())?;
        if !resolved.starts_with(&root) || !resolved.is_file() {
            return Err(not_found());
        }

        let size = resolved.metadata()?.len();
        if size > self.max_read_bytes {
            return Err(AutodocError::Io(std::io::Error::other(format!(
                "file is {} bytes, read limit is {}",
                size, self.max_read_bytes
            ))));
        }

        Ok(fs::read_to_string(&resolved)?)
    }
}

/// Current state plus the ordered event trace
struct Trace {
    state: ClientState,
    turn: usize,
    events: Vec<ClientEvent>,
}

impl Trace {
    fn new() -> Self {
        Self {
            state: ClientState::AwaitingResponse,
            turn: 0,
            events: Vec::new(),
        }
    }

    fn transition(&mut self, to: ClientState) {
        if self.state == to {
            return;
        }
        debug!(from = ?self.state, to = ?to, turn = self.turn, "Client transition");
        self.events.push(ClientEvent::Transition {
            from: self.state,
            to,
            turn: self.turn,
        });
        self.state = to;
    }

    fn record(&mut self, event: ClientEvent) {
        self.events.push(event);
    }

    fn fail(&mut self, error: AutodocError) -> AutodocError {
        self.transition(ClientState::Failed);
        warn!(turn = self.turn, error = %error, "Documentation request failed");
        error
    }
}

/// What servicing one save attempt led to
enum SaveStep {
    Done(WriteResult),
    Corrected(String),
}

pub struct ToolCallingClient {
    provider: SharedProvider,
    validator: ResponseValidator,
    writer: Arc<OutputWriter>,
    workspace: Workspace,
    config: ClientConfig,
    cancel: Arc<AtomicBool>,
    metrics: Option<SharedMetrics>,
}

impl ToolCallingClient {
    pub fn new(
        provider: SharedProvider,
        validator: ResponseValidator,
        writer: Arc<OutputWriter>,
        workspace: Workspace,
    ) -> Self {
        Self {
            provider,
            validator,
            writer,
            workspace,
            config: ClientConfig::default(),
            cancel: Arc::new(AtomicBool::new(false)),
            metrics: None,
        }
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.workspace = self.workspace.with_max_read_bytes(config.max_read_bytes);
        self.config = config;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one documentation request for `unit`, saving to `target`.
    #[instrument(skip_all, fields(unit = %unit.path.display(), provider = self.provider.name()))]
    pub async fn run(
        &self,
        unit: &SourceUnit,
        prompt: &PromptMessage,
        target: &Path,
    ) -> Result<RequestOutcome> {
        let mut conversation = Conversation::new(prompt);
        let mut trace = Trace::new();
        let mut corrections = 0;
        let mut read_failures = 0;
        let save_path = target.display().to_string();

        while trace.turn < self.config.max_turns {
            if self.cancel.load(Ordering::SeqCst) {
                return Err(trace.fail(AutodocError::Cancelled));
            }
            trace.turn += 1;
            trace.transition(ClientState::AwaitingResponse);

            let response = match with_timeout(
                self.config.turn_timeout,
                trace.turn,
                self.provider.complete(&conversation),
            )
            .await
            {
                Ok(response) => response,
                Err(e) => return Err(trace.fail(e)),
            };
            if let Some(metrics) = &self.metrics {
                metrics.record_response(&response);
            }
            conversation.push_assistant(&response.content);

            match parse_reply(&response.content, self.validator.format()) {
                Reply::Calls(calls) => {
                    trace.transition(ClientState::ToolRequested);
                    let mut feedback = Vec::new();

                    for call in calls {
                        trace.transition(ClientState::Executing);
                        match call {
                            ToolCall::ReadFile { path } => {
                                let output =
                                    self.service_read(&path, &mut read_failures, &mut trace)?;
                                feedback.push(output);
                            }
                            ToolCall::SaveDocumentation { path, content } => {
                                if !names_target(&path, target) {
                                    warn!(
                                        requested = %path,
                                        target = %save_path,
                                        "Ignoring save path from model, using configured target"
                                    );
                                    trace.record(ClientEvent::PathOverridden {
                                        requested: path,
                                        target: target.to_path_buf(),
                                    });
                                }
                                match self.service_save(
                                    unit,
                                    &content,
                                    target,
                                    &mut corrections,
                                    &mut trace,
                                )? {
                                    SaveStep::Done(write) => {
                                        return Ok(RequestOutcome {
                                            write,
                                            turns: trace.turn,
                                            corrections,
                                            read_failures,
                                            events: trace.events,
                                        });
                                    }
                                    SaveStep::Corrected(message) => {
                                        // Calls after a rejected save would act on stale output
                                        feedback.push(message);
                                        trace.transition(ClientState::Continuing);
                                        break;
                                    }
                                }
                            }
                        }
                        trace.transition(ClientState::Continuing);
                    }

                    conversation.push_user(feedback.join("\n\n"));
                }
                Reply::Document(text) => {
                    debug!("Reply is a bare document, treating it as a save");
                    trace.transition(ClientState::Executing);
                    match self.service_save(unit, &text, target, &mut corrections, &mut trace)? {
                        SaveStep::Done(write) => {
                            return Ok(RequestOutcome {
                                write,
                                turns: trace.turn,
                                corrections,
                                read_failures,
                                events: trace.events,
                            });
                        }
                        SaveStep::Corrected(message) => {
                            trace.transition(ClientState::Continuing);
                            conversation.push_user(message);
                        }
                    }
                }
                Reply::Refusal(text) => {
                    let first_line = text.lines().next().unwrap_or_default();
                    return Err(trace.fail(AutodocError::protocol(format!(
                        "model cannot proceed: {}",
                        first_line
                    ))));
                }
                Reply::Empty => {
                    debug!(turn = trace.turn, "No directive in reply, sending reminder");
                    trace.record(ClientEvent::Reminder { turn: trace.turn });
                    trace.transition(ClientState::Continuing);
                    conversation.push_user(PromptTemplates::reminder(&save_path));
                }
            }
        }

        Err(trace.fail(AutodocError::protocol(format!(
            "no documentation saved after {} turns",
            self.config.max_turns
        ))))
    }

    fn service_read(
        &self,
        path: &str,
        read_failures: &mut usize,
        trace: &mut Trace,
    ) -> Result<String> {
        match self.workspace.read(path) {
            Ok(content) => {
                debug!(path, bytes = content.len(), "Serviced read_file");
                if let Some(metrics) = &self.metrics {
                    metrics.record_read(true);
                }
                trace.record(ClientEvent::ReadServiced {
                    path: path.to_string(),
                    bytes: content.len(),
                });
                Ok(PromptTemplates::read_result(path, &content))
            }
            Err(e) => {
                *read_failures += 1;
                if let Some(metrics) = &self.metrics {
                    metrics.record_read(false);
                }
                let reason = match &e {
                    AutodocError::FileNotFound { .. } => {
                        "no such file under the source root".to_string()
                    }
                    other => other.to_string(),
                };
                info!(path, reason = %reason, attempt = *read_failures, "read_file failed");
                trace.record(ClientEvent::ReadFailed {
                    path: path.to_string(),
                    reason: reason.clone(),
                });

                if *read_failures > self.config.max_read_attempts {
                    return Err(trace.fail(AutodocError::protocol(format!(
                        "read_file failed {} times; last path '{}': {}",
                        read_failures, path, reason
                    ))));
                }
                Ok(PromptTemplates::read_failure(
                    path,
                    &reason,
                    *read_failures,
                    self.config.max_read_attempts,
                ))
            }
        }
    }

    /// Validate then write. A rejected payload becomes a correction message
    /// until the correction limit is spent.
    fn service_save(
        &self,
        unit: &SourceUnit,
        content: &str,
        target: &Path,
        corrections: &mut usize,
        trace: &mut Trace,
    ) -> Result<SaveStep> {
        let record = match self.validator.validate(content, unit) {
            Ok(record) => record,
            Err(error) => {
                *corrections += 1;
                if let Some(metrics) = &self.metrics {
                    metrics.record_correction();
                }
                info!(
                    kind = error.kind.as_str(),
                    element = %error.element,
                    correction = *corrections,
                    "Documentation rejected"
                );
                trace.record(ClientEvent::SaveRejected {
                    kind: error.kind.as_str().to_string(),
                    element: error.element.clone(),
                });

                if *corrections > self.config.correction_limit {
                    return Err(trace.fail(AutodocError::Validation(error)));
                }
                return Ok(SaveStep::Corrected(PromptTemplates::correction(
                    &error,
                    *corrections,
                    self.config.correction_limit,
                )));
            }
        };

        let record = match relations::render_section(unit, self.validator.format()) {
            Some(section) if self.config.relationships => record.with_appendix(&section),
            _ => record,
        };

        match self.writer.write(record, target) {
            Ok(write) => {
                trace.record(ClientEvent::SaveAccepted {
                    path: write.path.clone(),
                });
                trace.transition(ClientState::Continuing);
                trace.transition(ClientState::Completed);
                Ok(SaveStep::Done(write))
            }
            Err(e) => Err(trace.fail(e)),
        }
    }
}

/// Whether a directive path names `target`, either exactly or as a suffix
fn names_target(requested: &str, target: &Path) -> bool {
    let requested = requested.trim();
    !requested.is_empty() && (Path::new(requested) == target || target.ends_with(requested))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{LlmProvider, LlmResponse};
    use crate::analyzer::parser::Language;
    use crate::output::WriteOutcome;
    use crate::types::{
        DocFormat, LineSpan, Parameter, Symbol, SymbolKind, TypeName, ValidationErrorKind,
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Replays canned replies and remembers what it was sent
    struct ScriptedProvider {
        replies: Mutex<VecDeque<String>>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last_user_messages(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, conversation: &Conversation) -> Result<LlmResponse> {
            if let Some(last) = conversation.messages().last() {
                self.seen.lock().unwrap().push(last.content.clone());
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .map(LlmResponse::content_only)
                .ok_or_else(|| AutodocError::LlmApi("script exhausted".to_string()))
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

    struct SlowProvider;

    #[async_trait]
    impl LlmProvider for SlowProvider {
        async fn complete(&self, _conversation: &Conversation) -> Result<LlmResponse> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(LlmResponse::content_only("too late"))
        }

        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "slow"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn span() -> LineSpan {
        LineSpan { start: 1, end: 1 }
    }

    fn unit(dir: &Path) -> SourceUnit {
        let mut unit = SourceUnit::new(dir.join("Link.scala"), Language::Scala, SOURCE);
        unit.push_symbol(Symbol::new(SymbolKind::Object, "Link", span()).declared_as("object"));
        unit.push_symbol(
            Symbol::new(SymbolKind::Function, "open", span())
                .within(Some("Link"))
                .with_parameters(vec![Parameter::new("host", TypeName::from_source("String"))])
                .returning(TypeName::from_source("Boolean")),
        );
        unit
    }

    const SOURCE: &str = "object Link {\n  def open(host: String): Boolean = true\n}\n";

    const DOC: &str = "\
.. note:: This documentation was auto-generated from source code.

Link
====

Opens links.

open
----

:param host: (String) remote host
:returns: (Boolean) whether the link opened
";

    fn save(body: &str) -> String {
        format!("save_documentation(\"docs/Link.rst\") -> <<<\n{}>>>\n", body)
    }

    struct Fixture {
        dir: TempDir,
        writer: Arc<OutputWriter>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join("Link.scala"), SOURCE).unwrap();
            Self {
                dir,
                writer: Arc::new(OutputWriter::new()),
            }
        }

        fn client(&self, provider: SharedProvider) -> ToolCallingClient {
            ToolCallingClient::new(
                provider,
                ResponseValidator::new(DocFormat::Sphinx),
                Arc::clone(&self.writer),
                Workspace::new(self.dir.path()),
            )
        }

        fn target(&self) -> PathBuf {
            self.dir.path().join("docs/Link.rst")
        }

        fn prompt(&self) -> PromptMessage {
            PromptMessage {
                system: "sys".to_string(),
                user: "document Link.scala".to_string(),
            }
        }
    }

    #[tokio::test]
    async fn test_read_then_save_completes() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(&["read_file(\"Link.scala\")", &save(DOC)]);
        let client = fx.client(provider.clone());

        let outcome = client
            .run(&unit(fx.dir.path()), &fx.prompt(), &fx.target())
            .await
            .unwrap();

        assert_eq!(outcome.turns, 2);
        assert_eq!(outcome.corrections, 0);
        assert_eq!(outcome.write.outcome, WriteOutcome::Created);
        assert!(fs::read_to_string(fx.target()).unwrap().contains(":param host:"));
        // The read result was fed back before the second turn
        assert!(provider.last_user_messages()[1].contains("def open"));
        assert!(matches!(
            outcome.events.last(),
            Some(ClientEvent::Transition {
                to: ClientState::Completed,
                ..
            })
        ));
    }

    fn extending_unit(dir: &Path) -> SourceUnit {
        let mut unit = SourceUnit::new(dir.join("Link.scala"), Language::Scala, SOURCE);
        unit.push_symbol(
            Symbol::new(SymbolKind::Object, "Link", span())
                .declared_as("object")
                .extending(vec!["Channel".to_string()]),
        );
        unit.push_symbol(
            Symbol::new(SymbolKind::Function, "open", span())
                .within(Some("Link"))
                .with_parameters(vec![Parameter::new("host", TypeName::from_source("String"))])
                .returning(TypeName::from_source("Boolean")),
        );
        unit
    }

    #[tokio::test]
    async fn test_relationship_section_appended_after_validation() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(&[&save(DOC)]);

        fx.client(provider)
            .run(&extending_unit(fx.dir.path()), &fx.prompt(), &fx.target())
            .await
            .unwrap();

        let written = fs::read_to_string(fx.target()).unwrap();
        assert!(written.starts_with(".. note::"));
        assert!(written.contains(":returns: (Boolean) whether the link opened\n\nClass Relationships\n"));
        assert!(written.contains("\"Link\" -> \"Channel\" [label=\"extends\""));
    }

    #[tokio::test]
    async fn test_relationship_section_can_be_disabled() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(&[&save(DOC)]);
        let client = fx.client(provider).with_config(ClientConfig {
            relationships: false,
            ..ClientConfig::default()
        });

        client
            .run(&extending_unit(fx.dir.path()), &fx.prompt(), &fx.target())
            .await
            .unwrap();

        assert!(!fs::read_to_string(fx.target()).unwrap().contains("Class Relationships"));
    }

    #[tokio::test]
    async fn test_calls_serviced_in_order() {
        let fx = Fixture::new();
        fs::write(fx.dir.path().join("Other.scala"), "object Other\n").unwrap();
        let reply = "read_file(\"Other.scala\")\nread_file(\"Link.scala\")";
        let provider = ScriptedProvider::new(&[reply, &save(DOC)]);

        let outcome = fx
            .client(provider.clone())
            .run(&unit(fx.dir.path()), &fx.prompt(), &fx.target())
            .await
            .unwrap();

        let reads: Vec<_> = outcome
            .events
            .iter()
            .filter_map(|e| match e {
                ClientEvent::ReadServiced { path, .. } => Some(path.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(reads, vec!["Other.scala", "Link.scala"]);

        let feedback = &provider.last_user_messages()[1];
        let other = feedback.find("object Other").unwrap();
        let link = feedback.find("object Link").unwrap();
        assert!(other < link);
    }

    #[tokio::test]
    async fn test_missing_return_gets_one_correction() {
        let fx = Fixture::new();
        let incomplete = DOC.replace(":returns: (Boolean) whether the link opened\n", "");
        let provider = ScriptedProvider::new(&[&save(&incomplete), &save(DOC)]);

        let outcome = fx
            .client(provider.clone())
            .run(&unit(fx.dir.path()), &fx.prompt(), &fx.target())
            .await
            .unwrap();

        assert_eq!(outcome.corrections, 1);
        let correction = &provider.last_user_messages()[1];
        assert!(correction.contains("Link.open"));
        assert!(fs::read_to_string(fx.target()).unwrap().contains(":returns:"));
        assert!(outcome.events.iter().any(|e| matches!(
            e,
            ClientEvent::SaveRejected { kind, .. } if kind == "missing_return"
        )));
    }

    #[tokio::test]
    async fn test_wrong_read_path_is_correctable() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(&[
            "read_file(\"src/Link.scala\")",
            "read_file(\"Link.scala\")",
            &save(DOC),
        ]);

        let outcome = fx
            .client(provider.clone())
            .run(&unit(fx.dir.path()), &fx.prompt(), &fx.target())
            .await
            .unwrap();

        assert_eq!(outcome.read_failures, 1);
        assert!(provider.last_user_messages()[1].contains("FileNotFoundError"));
        assert!(fx.target().exists());
    }

    #[tokio::test]
    async fn test_read_attempts_are_bounded() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(&[
            "read_file(\"a.scala\")",
            "read_file(\"b.scala\")",
            &save(DOC),
        ]);
        let client = fx.client(provider).with_config(ClientConfig {
            max_read_attempts: 1,
            ..ClientConfig::default()
        });

        let err = client
            .run(&unit(fx.dir.path()), &fx.prompt(), &fx.target())
            .await
            .unwrap_err();
        assert!(matches!(err, AutodocError::Protocol { .. }));
        assert!(!fx.target().exists());
    }

    #[tokio::test]
    async fn test_reads_outside_root_rejected() {
        let fx = Fixture::new();
        let outside = TempDir::new().unwrap();
        let secret = outside.path().join("secret.txt");
        fs::write(&secret, "token").unwrap();

        let workspace = Workspace::new(fx.dir.path());
        assert!(workspace.read("Link.scala").is_ok());
        assert!(matches!(
            workspace.read(&secret.display().to_string()),
            Err(AutodocError::FileNotFound { .. })
        ));
        assert!(matches!(
            workspace.read("../secret.txt"),
            Err(AutodocError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_oversized_read_fed_back() {
        let fx = Fixture::new();
        let workspace = Workspace::new(fx.dir.path()).with_max_read_bytes(4);
        assert!(matches!(
            workspace.read("Link.scala"),
            Err(AutodocError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_correction_limit_bounds_turns() {
        let fx = Fixture::new();
        let bad = save("no banner, no heading\n");
        let provider = ScriptedProvider::new(&[&bad, &bad, &bad, &bad, &bad]);
        let client = fx.client(provider.clone()).with_config(ClientConfig {
            correction_limit: 2,
            ..ClientConfig::default()
        });

        let err = client
            .run(&unit(fx.dir.path()), &fx.prompt(), &fx.target())
            .await
            .unwrap_err();

        match err {
            AutodocError::Validation(e) => assert_eq!(e.kind, ValidationErrorKind::MissingBanner),
            other => panic!("unexpected: {other:?}"),
        }
        // Initial save plus two corrections
        assert_eq!(provider.last_user_messages().len(), 3);
        assert!(!fx.target().exists());
    }

    #[tokio::test]
    async fn test_bare_document_is_implicit_save() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(&[DOC]);

        let outcome = fx
            .client(provider)
            .run(&unit(fx.dir.path()), &fx.prompt(), &fx.target())
            .await
            .unwrap();
        assert_eq!(outcome.turns, 1);
        assert!(fx.target().exists());
    }

    #[tokio::test]
    async fn test_refusal_fails() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(&["I cannot proceed without the build files."]);

        let err = fx
            .client(provider)
            .run(&unit(fx.dir.path()), &fx.prompt(), &fx.target())
            .await
            .unwrap_err();
        match err {
            AutodocError::Protocol { reason } => assert!(reason.contains("cannot proceed")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reminders_bounded_by_max_turns() {
        let fx = Fixture::new();
        let provider = ScriptedProvider::new(&["hmm", "let me think", "ok"]);
        let client = fx.client(provider.clone()).with_config(ClientConfig {
            max_turns: 3,
            ..ClientConfig::default()
        });

        let err = client
            .run(&unit(fx.dir.path()), &fx.prompt(), &fx.target())
            .await
            .unwrap_err();
        assert!(matches!(err, AutodocError::Protocol { .. }));
        assert!(provider.last_user_messages()[1].contains("No tool directive"));
    }

    #[tokio::test]
    async fn test_save_path_overridden() {
        let fx = Fixture::new();
        let reply = format!("save_documentation(\"/etc/Link.rst\") -> <<<\n{}>>>\n", DOC);
        let provider = ScriptedProvider::new(&[&reply]);

        let outcome = fx
            .client(provider)
            .run(&unit(fx.dir.path()), &fx.prompt(), &fx.target())
            .await
            .unwrap();
        assert_eq!(outcome.write.path, fx.target());
        assert!(
            outcome
                .events
                .iter()
                .any(|e| matches!(e, ClientEvent::PathOverridden { .. }))
        );
    }

    #[tokio::test]
    async fn test_turn_timeout_fails_request() {
        let fx = Fixture::new();
        let client = fx.client(Arc::new(SlowProvider)).with_config(ClientConfig {
            turn_timeout: Duration::from_millis(20),
            ..ClientConfig::default()
        });

        let err = client
            .run(&unit(fx.dir.path()), &fx.prompt(), &fx.target())
            .await
            .unwrap_err();
        assert!(matches!(err, AutodocError::ProtocolTimeout { turn: 1, .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_turn() {
        let fx = Fixture::new();
        let cancel = Arc::new(AtomicBool::new(true));
        let client = fx
            .client(ScriptedProvider::new(&[DOC]))
            .with_cancel_flag(cancel);

        let err = client
            .run(&unit(fx.dir.path()), &fx.prompt(), &fx.target())
            .await
            .unwrap_err();
        assert!(matches!(err, AutodocError::Cancelled));
    }
}
