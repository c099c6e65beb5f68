//! AI Integration Layer
//!
//! Everything between a parsed source unit and a validated document:
//! prompt rendering, the tool-calling protocol, provider backends and
//! response validation.

pub mod metrics;
pub mod prompt;
pub mod protocol;
pub mod provider;
pub mod timeout;
pub mod validation;

pub use metrics::{MetricsCollector, MetricsSummary, SharedMetrics, create_shared_metrics};
pub use prompt::{PromptBuilder, PromptMessage, PromptOptions, PromptSection, PromptTemplates};
pub use protocol::{
    ClientConfig, ClientEvent, ClientState, Conversation, RequestOutcome, ToolCall,
    ToolCallingClient, Workspace,
};
pub use provider::{
    ClaudeCodeProvider, LlmProvider, LlmResponse, OllamaProvider, OpenAiProvider,
    ProviderConfig, SharedProvider, TokenUsage, create_provider,
};
pub use timeout::{TimeoutConfig, with_timeout};
pub use validation::{ResponseValidator, sanitize};
