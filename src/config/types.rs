//! Configuration Types
//!
//! All configuration structures with defaults. Every section is
//! `#[serde(default)]`, so a config file only names what it changes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{concurrency, llm, protocol, retry, scanner};
use crate::types::{AutodocError, DocFormat, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider settings
    pub llm: LlmConfig,

    /// Tool-calling protocol bounds
    pub protocol: ProtocolConfig,

    /// Unit-level retries
    pub retry: RetryConfig,

    /// Documentation output
    pub output: OutputConfig,

    /// Source discovery
    pub analysis: AnalysisConfig,

    pub validation: ValidationConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `AutodocError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AutodocError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(AutodocError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(AutodocError::Config(
                "LLM max_tokens must be greater than 0".to_string(),
            ));
        }

        if let Some(endpoint) = &self.llm.endpoint
            && url::Url::parse(endpoint).is_err()
        {
            return Err(AutodocError::Config(format!(
                "LLM endpoint is not a valid URL: {}",
                endpoint
            )));
        }

        if self.protocol.max_turns == 0 {
            return Err(AutodocError::Config(
                "protocol.max_turns must be greater than 0".to_string(),
            ));
        }

        if self.protocol.max_read_bytes == 0 {
            return Err(AutodocError::Config(
                "protocol.max_read_bytes must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_delay_secs == 0 {
            return Err(AutodocError::Config(
                "retry.max_delay_secs must be greater than 0".to_string(),
            ));
        }

        if self.retry.base_delay_ms > self.retry.max_delay_secs.saturating_mul(1000) {
            return Err(AutodocError::Config(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_secs ({}s)",
                self.retry.base_delay_ms, self.retry.max_delay_secs
            )));
        }

        if self.analysis.concurrency == 0 {
            return Err(AutodocError::Config(
                "analysis.concurrency must be greater than 0".to_string(),
            ));
        }

        for pattern in self.analysis.include.iter().chain(&self.analysis.exclude) {
            glob::Pattern::new(pattern).map_err(|e| {
                AutodocError::Config(format!("Invalid glob pattern '{}': {}", pattern, e))
            })?;
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: claude-code, openai, ollama
    pub provider: String,

    /// Model name or alias
    pub model: String,

    /// Per-turn timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,

    pub max_tokens: u32,

    /// Custom API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: llm::DEFAULT_PROVIDER.to_string(),
            model: llm::DEFAULT_MODEL.to_string(),
            timeout_secs: llm::DEFAULT_TURN_TIMEOUT_SECS,
            temperature: llm::DEFAULT_TEMPERATURE,
            max_tokens: llm::DEFAULT_MAX_TOKENS,
            endpoint: None,
        }
    }
}

// =============================================================================
// Protocol Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Model turns per documentation request
    pub max_turns: usize,

    /// Failed `read_file` calls fed back before the request fails
    pub max_read_attempts: usize,

    /// Correction turns after rejected documentation
    pub correction_limit: usize,

    /// Put the source text in the first prompt instead of waiting for a read
    pub embed_source: bool,

    /// Largest file `read_file` returns
    pub max_read_bytes: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_turns: protocol::DEFAULT_MAX_TURNS,
            max_read_attempts: protocol::DEFAULT_MAX_READ_ATTEMPTS,
            correction_limit: protocol::DEFAULT_CORRECTION_LIMIT,
            embed_source: false,
            max_read_bytes: protocol::MAX_READ_BYTES,
        }
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Whole-request retries per source unit
    pub retry_limit: u32,

    pub base_delay_ms: u64,

    pub max_delay_secs: u64,

    /// Retries shared by every unit of one run
    pub budget: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_limit: retry::DEFAULT_RETRY_LIMIT,
            base_delay_ms: retry::BASE_DELAY_MS,
            max_delay_secs: retry::MAX_DELAY_SECS,
            budget: retry::DEFAULT_GLOBAL_BUDGET,
        }
    }
}

// =============================================================================
// Output Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Documentation root
    pub dir: PathBuf,

    pub format: DocFormat,

    /// Write an index page linking every generated page
    pub write_index: bool,

    /// Append a class relationship section to each page
    pub relationships: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("docs"),
            format: DocFormat::default(),
            write_index: true,
            relationships: true,
        }
    }
}

// =============================================================================
// Analysis Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Include patterns (glob)
    pub include: Vec<String>,

    /// Exclude patterns (glob)
    pub exclude: Vec<String>,

    /// Maximum file size to document (bytes)
    pub max_file_size: u64,

    /// Units documented in parallel
    pub concurrency: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            include: vec!["**/*".to_string()],
            exclude: vec![
                "**/test/**".to_string(),
                "**/tests/**".to_string(),
                "**/*_test.*".to_string(),
            ],
            max_file_size: scanner::DEFAULT_MAX_FILE_SIZE,
            concurrency: concurrency::DEFAULT_WORKERS,
        }
    }
}

// =============================================================================
// Validation Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Debug phrases rejected on top of the built-in list
    pub extra_debug_phrases: Vec<String>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.llm.provider, "claude-code");
        assert_eq!(config.llm.model, "sonnet");
        assert!(config.llm.endpoint.is_none());
        assert_eq!(config.output.format, DocFormat::Sphinx);
        assert_eq!(config.retry.retry_limit, 2);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[llm]
model = "opus"

[output]
format = "markdown"
"#,
        )
        .unwrap();
        assert_eq!(config.llm.model, "opus");
        assert_eq!(config.llm.provider, "claude-code");
        assert_eq!(config.output.format, DocFormat::Markdown);
        assert_eq!(config.output.dir, PathBuf::from("docs"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        assert!(matches!(config.validate(), Err(AutodocError::Config(_))));

        let mut config = Config::default();
        config.analysis.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.endpoint = Some("not a url".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.exclude.push("[".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retry.base_delay_ms = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serializes_to_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(text.contains("[llm]"));
        assert!(text.contains("[protocol]"));
        assert!(!text.contains("endpoint"));
    }
}
