//! Unified Error Type System
//!
//! One error enum for the whole pipeline. Each variant maps onto a handling
//! path: skip the unit, feed the condition back to the model, retry the unit,
//! or fail it outright.
//!
//! ## Error Categories
//!
//! Provider failures are classified into an [`ErrorCategory`] so the
//! orchestrator can tell a rate limit (worth retrying) from a bad API key
//! (not worth retrying).

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Provider error categories used for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// Context/token limit exceeded
    TokenLimit,
    /// Authentication failed - fail fast, don't retry
    Auth,
    /// Network/connectivity issues - retry with backoff
    Network,
    /// Provider unavailable
    Unavailable,
    /// Invalid request - don't retry, fix request
    BadRequest,
    /// Temporary server issues
    Transient,
    /// Unknown error - conservative retry
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::TokenLimit => write!(f, "TOKEN_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Whether another attempt of the same request can plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Network | Self::Transient | Self::Unavailable | Self::Unknown
        )
    }

    /// Recommended wait before the next attempt
    pub fn recommended_delay(&self) -> Duration {
        match self {
            Self::RateLimit => Duration::from_secs(30),
            Self::Network => Duration::from_secs(5),
            Self::Transient => Duration::from_secs(2),
            _ => Duration::from_millis(500),
        }
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Provider error with category, context, and retry hint
#[derive(Debug, Clone)]
pub struct LlmError {
    pub category: ErrorCategory,
    pub message: String,
    pub provider: Option<String>,
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
            retry_after: None,
        }
    }

    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }

    pub fn recommended_delay(&self) -> Duration {
        self.retry_after
            .unwrap_or_else(|| self.category.recommended_delay())
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps raw provider failures onto an [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from any provider
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();

        if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
            || lower.contains("quota exceeded")
        {
            return LlmError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(30));
        }

        if lower.contains("token")
            && (lower.contains("limit") || lower.contains("exceed") || lower.contains("maximum"))
            || lower.contains("context length")
            || lower.contains("too large")
        {
            return LlmError::with_provider(ErrorCategory::TokenLimit, message, provider);
        }

        if lower.contains("auth")
            || lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
        {
            return LlmError::with_provider(ErrorCategory::Auth, message, provider);
        }

        if lower.contains("network")
            || lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("timed out")
            || lower.contains("unreachable")
        {
            return LlmError::with_provider(ErrorCategory::Network, message, provider)
                .retry_after(Duration::from_secs(5));
        }

        if lower.contains("503")
            || lower.contains("502")
            || lower.contains("500")
            || lower.contains("service unavailable")
            || lower.contains("not installed")
        {
            return LlmError::with_provider(ErrorCategory::Unavailable, message, provider);
        }

        if lower.contains("400") || lower.contains("bad request") || lower.contains("malformed") {
            return LlmError::with_provider(ErrorCategory::BadRequest, message, provider);
        }

        if lower.contains("overloaded")
            || lower.contains("temporary")
            || lower.contains("non-zero status")
        {
            return LlmError::with_provider(ErrorCategory::Transient, message, provider)
                .retry_after(Duration::from_secs(2));
        }

        LlmError::with_provider(ErrorCategory::Unknown, message, provider)
    }

    /// Classify an HTTP status code directly (more accurate than string matching)
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(30)),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 422 => LlmError::with_provider(ErrorCategory::BadRequest, message, provider),
            500 | 502 | 503 | 504 => {
                LlmError::with_provider(ErrorCategory::Transient, message, provider)
                    .retry_after(Duration::from_secs(5))
            }
            404 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Which structural check rejected a documentation payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    MissingBanner,
    MissingHeading,
    MissingSymbol,
    DebugText,
    MissingParameter,
    MissingReturn,
}

impl ValidationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingBanner => "missing_banner",
            Self::MissingHeading => "missing_heading",
            Self::MissingSymbol => "missing_symbol",
            Self::DebugText => "debug_text",
            Self::MissingParameter => "missing_parameter",
            Self::MissingReturn => "missing_return",
        }
    }
}

/// A rejected documentation payload, naming exactly one missing element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// The element that is missing or offending (symbol, parameter, phrase)
    pub element: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation failed for '{}': {}", self.element, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(
        kind: ValidationErrorKind,
        element: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            element: element.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum AutodocError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Source Errors
    // -------------------------------------------------------------------------
    #[error("Parse error in {path}: {message}")]
    Parse { message: String, path: String },

    #[error("Unsupported language '{language}' for {path}")]
    UnsupportedLanguage { language: String, path: String },

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("{0}")]
    Validation(ValidationError),

    #[error("Model turn {turn} timed out after {duration:?}")]
    ProtocolTimeout { turn: usize, duration: Duration },

    #[error("Protocol failed: {reason}")]
    Protocol { reason: String },

    #[error("Request cancelled")]
    Cancelled,

    // -------------------------------------------------------------------------
    // LLM Errors
    // -------------------------------------------------------------------------
    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("LLM API error: {0}")]
    LlmApi(String),

    // -------------------------------------------------------------------------
    // Output / Setup Errors
    // -------------------------------------------------------------------------
    #[error("Write error for {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("Config error: {0}")]
    Config(String),
}

impl From<LlmError> for AutodocError {
    fn from(err: LlmError) -> Self {
        AutodocError::Llm(err)
    }
}

impl From<ValidationError> for AutodocError {
    fn from(err: ValidationError) -> Self {
        AutodocError::Validation(err)
    }
}

pub type Result<T> = std::result::Result<T, AutodocError>;

impl AutodocError {
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    pub fn write(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the unit is skipped rather than failed
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::UnsupportedLanguage { .. })
    }

    /// Whether re-running the whole documentation request may succeed.
    ///
    /// Filesystem, configuration and credential problems are not retried.
    pub fn is_unit_retryable(&self) -> bool {
        match self {
            Self::Protocol { .. } | Self::ProtocolTimeout { .. } | Self::Validation(_) => true,
            Self::Llm(err) => err.is_retryable(),
            Self::LlmApi(msg) => ErrorClassifier::classify(msg, "unknown").is_retryable(),
            Self::Json(_) => true,
            _ => false,
        }
    }

    /// Suggested wait before a unit-level retry, when the error carries one
    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            Self::Llm(err) => Some(err.recommended_delay()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rate_limit() {
        let err = ErrorClassifier::classify("Error 429: Too Many Requests", "openai");
        assert_eq!(err.category, ErrorCategory::RateLimit);
        assert!(err.is_retryable());
        assert_eq!(err.recommended_delay(), Duration::from_secs(30));
    }

    #[test]
    fn test_classify_auth_not_retryable() {
        let err = ErrorClassifier::classify("Invalid API key provided", "openai");
        assert_eq!(err.category, ErrorCategory::Auth);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classify_http_status() {
        assert_eq!(
            ErrorClassifier::classify_http_status(503, "down", "ollama").category,
            ErrorCategory::Transient
        );
        assert_eq!(
            ErrorClassifier::classify_http_status(401, "nope", "ollama").category,
            ErrorCategory::Auth
        );
    }

    #[test]
    fn test_unit_retry_decisions() {
        assert!(AutodocError::protocol("no directive").is_unit_retryable());
        assert!(
            AutodocError::ProtocolTimeout {
                turn: 2,
                duration: Duration::from_secs(1)
            }
            .is_unit_retryable()
        );
        assert!(
            !AutodocError::Write {
                path: "/ro/x.rst".into(),
                reason: "permission denied".into()
            }
            .is_unit_retryable()
        );
        assert!(!AutodocError::Config("bad".into()).is_unit_retryable());
        let auth = LlmError::new(ErrorCategory::Auth, "401");
        assert!(!AutodocError::from(auth).is_unit_retryable());
    }

    #[test]
    fn test_skip_errors() {
        assert!(AutodocError::parse("a.scala", "unterminated block").is_skip());
        assert!(
            AutodocError::UnsupportedLanguage {
                language: "cobol".into(),
                path: "a.cob".into()
            }
            .is_skip()
        );
        assert!(!AutodocError::Cancelled.is_skip());
    }

    #[test]
    fn test_validation_error_display_names_element() {
        let err = ValidationError::new(
            ValidationErrorKind::MissingReturn,
            "Transmitter.sendData",
            "no return documentation",
        );
        assert!(err.to_string().contains("Transmitter.sendData"));
    }
}
