//! Configuration Management
//!
//! Hierarchical resolution, lowest priority first:
//! 1. Built-in defaults
//! 2. Global config (~/.config/autodoc/config.toml)
//! 3. Project config (.autodoc/config.toml)
//! 4. Environment variables (AUTODOC_*)
//! 5. CLI arguments

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
