//! Claude Code CLI Provider
//!
//! Runs each turn through the local `claude` CLI in print mode. The CLI takes
//! a single prompt, so the conversation is flattened into a transcript and
//! the system part goes through `--append-system-prompt`.

use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use super::{
    ErrorClassifier, LlmProvider, LlmResponse, ProviderConfig, ResponseMetadata, ResponseTiming,
    TokenUsage,
};
use crate::ai::protocol::Conversation;
use crate::constants::llm::DEFAULT_MODEL;
use crate::types::{AutodocError, Result};

const PROVIDER: &str = "claude-code";

pub struct ClaudeCodeProvider {
    model: String,
    timeout_secs: u64,
    temperature: f32,
}

impl ClaudeCodeProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: config.timeout_secs,
            temperature: config.temperature,
        }
    }

    /// Execute a single Claude Code CLI call
    async fn execute(&self, conversation: &Conversation) -> Result<LlmResponse> {
        let start_time = Instant::now();

        debug!(
            "Executing Claude Code CLI (model={}, temperature={})",
            self.model, self.temperature
        );

        let mut cmd = Command::new("claude");
        cmd.arg("-p")
            .arg(conversation.transcript())
            .arg("--output-format")
            .arg("json")
            .arg("--model")
            .arg(&self.model)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(system) = conversation.system() {
            cmd.arg("--append-system-prompt").arg(system);
        }

        cmd.env("CLAUDE_CODE_TEMPERATURE", self.temperature.to_string());

        let child = cmd.spawn().map_err(|e| {
            AutodocError::Llm(ErrorClassifier::classify(
                &format!("Failed to spawn Claude Code CLI: {}. Is it installed?", e),
                PROVIDER,
            ))
        })?;

        let output = timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| {
            AutodocError::Llm(ErrorClassifier::classify(
                &format!("Claude Code timed out after {}s", self.timeout_secs),
                PROVIDER,
            ))
        })?
        .map_err(|e| AutodocError::LlmApi(format!("Claude Code execution failed: {}", e)))?;

        let elapsed = start_time.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);

            if let Ok(response) = serde_json::from_str::<Value>(&stdout)
                && response
                    .get("is_error")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false)
            {
                let error_msg = response
                    .get("result")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Unknown API error");
                return Err(ErrorClassifier::classify(error_msg, PROVIDER).into());
            }

            let error_msg = if stderr.trim().is_empty() {
                "Process exited with non-zero status"
            } else {
                stderr.as_ref()
            };
            return Err(ErrorClassifier::classify(error_msg, PROVIDER).into());
        }

        let response: Value = serde_json::from_str(&stdout).map_err(|e| {
            AutodocError::LlmApi(format!("Failed to parse Claude Code output: {}", e))
        })?;

        let content = self.extract_result(&response)?;
        let api_ms = response.get("duration_api_ms").and_then(|v| v.as_u64());

        Ok(LlmResponse::with_metrics(
            content,
            self.extract_usage(&response),
            self.extract_cost(&response),
            ResponseTiming::with_api_time(elapsed, api_ms),
            ResponseMetadata {
                model: self.model.clone(),
                provider: PROVIDER.to_string(),
            },
        ))
    }

    fn extract_result(&self, response: &Value) -> Result<String> {
        if response
            .get("is_error")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
        {
            let message = response
                .get("result")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown API error");
            return Err(ErrorClassifier::classify(message, PROVIDER).into());
        }
        response
            .get("result")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| AutodocError::LlmApi("No result in Claude Code response".to_string()))
    }

    fn extract_usage(&self, response: &Value) -> TokenUsage {
        let usage = response.get("usage");
        let count = |key: &str| {
            usage
                .and_then(|u| u.get(key))
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32
        };

        TokenUsage {
            input_tokens: count("input_tokens"),
            output_tokens: count("output_tokens"),
        }
    }

    fn extract_cost(&self, response: &Value) -> f64 {
        response
            .get("total_cost_usd")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }
}

#[async_trait]
impl LlmProvider for ClaudeCodeProvider {
    async fn complete(&self, conversation: &Conversation) -> Result<LlmResponse> {
        info!(
            "Requesting turn from Claude Code CLI (model: {}, turn: {})",
            self.model,
            conversation.assistant_turns() + 1
        );
        self.execute(conversation).await
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let output = Command::new("claude")
            .arg("--version")
            .output()
            .await
            .map_err(|e| AutodocError::LlmApi(format!("Claude Code not installed: {}", e)))?;

        if output.status.success() {
            let version = String::from_utf8_lossy(&output.stdout);
            info!("Claude Code CLI available: {}", version.trim());
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
