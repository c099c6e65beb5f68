//! autodoc - LLM-Driven API Documentation Generator
//!
//! Parses source files into a language-neutral symbol model, asks a language
//! model to document them through a small tool-calling protocol, validates
//! the result structurally and writes it into a Sphinx or Markdown tree.
//!
//! ## Quick Start
//!
//! ```ignore
//! use autodoc::{Orchestrator, PipelineConfig, create_provider, ProviderConfig};
//!
//! let provider = create_provider(&ProviderConfig::default())?;
//! let orchestrator = Orchestrator::new(provider, PipelineConfig::new("src", "docs"));
//! let report = orchestrator.run(files).await?;
//! println!("{}", report.summary_line());
//! ```
//!
//! ## Modules
//!
//! - [`analyzer`]: tree-sitter parsers and file scanning
//! - [`ai`]: prompts, the tool-calling client, providers and validation
//! - [`output`]: atomic writes and documentation layout
//! - [`pipeline`]: per-file orchestration with bounded retries
//! - [`config`]: layered configuration

pub mod ai;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod constants;
pub mod output;
pub mod pipeline;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};

pub use types::{
    AutodocError, DocFormat, DocumentationRecord, ErrorCategory, Result, SourceUnit, Symbol,
    SymbolKind, ValidationError, ValidationErrorKind,
};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{BatchReport, Orchestrator, PipelineConfig, UnitOutcome, UnitReport};

pub use output::{OutputWriter, WriteOutcome, WriteResult};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    ClientConfig, LlmProvider, LlmResponse, MetricsCollector, PromptTemplates, ProviderConfig,
    ResponseValidator, SharedMetrics, SharedProvider, ToolCallingClient, create_provider,
};

// =============================================================================
// Analyzer Re-exports
// =============================================================================

pub use analyzer::{
    parser::{Language, parse_source, resolve_language},
    scanner::FileScanner,
};
