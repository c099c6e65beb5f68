//! Global Constants
//!
//! Defaults and fixed tables. Tunable values here are only defaults; the
//! config layer can override them.

/// Tool-calling protocol defaults
pub mod protocol {
    /// Maximum model turns per documentation request
    pub const DEFAULT_MAX_TURNS: usize = 8;

    /// Failed `read_file` calls tolerated per request
    pub const DEFAULT_MAX_READ_ATTEMPTS: usize = 3;

    /// Correction turns after rejected documentation, per request
    pub const DEFAULT_CORRECTION_LIMIT: usize = 2;

    /// Largest file `read_file` will return (bytes)
    pub const MAX_READ_BYTES: u64 = 512 * 1024;

    /// Tool names as the model writes them
    pub const READ_FILE: &str = "read_file";
    pub const SAVE_DOCUMENTATION: &str = "save_documentation";

    /// Phrases by which a model gives up on the request
    pub const REFUSAL_MARKERS: &[&str] = &[
        "cannot proceed",
        "can't proceed",
        "unable to proceed",
        "unable to complete",
        "i cannot document",
        "i can't document",
    ];
}

/// Unit-level retry defaults
pub mod retry {
    /// Whole-request retries per source unit
    pub const DEFAULT_RETRY_LIMIT: u32 = 2;

    /// Retries shared by every unit in one process
    pub const DEFAULT_GLOBAL_BUDGET: u32 = 50;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f64 = 2.0;
}

/// LLM defaults
pub mod llm {
    pub const DEFAULT_PROVIDER: &str = "claude-code";
    pub const DEFAULT_MODEL: &str = "sonnet";
    pub const DEFAULT_TEMPERATURE: f32 = 0.2;
    pub const DEFAULT_MAX_TOKENS: u32 = 4000;

    /// Per-turn wait (seconds)
    pub const DEFAULT_TURN_TIMEOUT_SECS: u64 = 300;

    pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
    pub const OLLAMA_ENDPOINT: &str = "http://localhost:11434";
}

/// Validation tables
pub mod validation {
    /// Text that marks a document as machine-written. Matched case-insensitively.
    pub const BANNER_MARKERS: &[&str] = &["auto-generated", "automatically generated"];

    /// Banner line the prompt asks for
    pub const BANNER_TEXT: &str =
        "This documentation was auto-generated from source code and may contain errors.";

    /// Debug and log text that must never reach documentation
    pub const DEBUG_PHRASES: &[&str] = &[
        "getWindowArguments",
        "App is installed",
        "Checking for updates",
        "Traceback (most recent call last)",
        "[DEBUG]",
        "DEBUG:",
    ];
}

/// File scanning
pub mod scanner {
    /// Default maximum file size for analysis (1MB)
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

    /// Directories never worth documenting
    pub const DEFAULT_SKIP_DIRS: &[&str] = &[
        "node_modules",
        "target",
        ".git",
        "build",
        "dist",
        "__pycache__",
        "vendor",
        ".venv",
    ];
}

/// Concurrency
pub mod concurrency {
    /// Source units documented in parallel
    pub const DEFAULT_WORKERS: usize = 4;
}
