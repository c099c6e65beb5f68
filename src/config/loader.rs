//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/autodoc/config.toml)
//! 3. Project config (.autodoc/config.toml)
//! 4. Environment variables (AUTODOC_SECTION__KEY)

use directories::BaseDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{AutodocError, Result};

const APP_DIR: &str = "autodoc";
const PROJECT_DIR: &str = ".autodoc";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "AUTODOC_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the project rooted at `project_root`:
    /// defaults → global → project → env vars
    pub fn load(project_root: &Path) -> Result<Config> {
        let global = Self::global_config_path();
        Self::load_layers(global.as_deref(), &Self::project_config_path(project_root))
    }

    /// Same chain with explicit file locations; missing files are skipped.
    pub fn load_layers(global: Option<&Path>, project: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // AUTODOC_LLM__MODEL -> llm.model
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| AutodocError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| AutodocError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Global config directory (~/.config/autodoc/ on Linux)
    pub fn global_dir() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.config_dir().join(APP_DIR))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    pub fn project_config_path(project_root: &Path) -> PathBuf {
        project_root.join(PROJECT_DIR).join(CONFIG_FILE)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Global and project config locations, and whether each exists
    pub fn config_paths(project_root: &Path) -> Vec<(&'static str, Option<PathBuf>)> {
        vec![
            ("Global", Self::global_config_path()),
            ("Project", Some(Self::project_config_path(project_root))),
        ]
    }

    /// Render a config as TOML, or JSON when `as_json`
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| AutodocError::Config(e.to_string()))
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write the default global config, returning its path
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            AutodocError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::write_template(&global_dir.join(CONFIG_FILE), &Self::default_global_config(), force)
    }

    /// Write the default project config under `project_root`
    pub fn init_project(project_root: &Path, force: bool) -> Result<PathBuf> {
        Self::write_template(
            &Self::project_config_path(project_root),
            &Self::default_project_config(),
            force,
        )
    }

    fn write_template(path: &Path, content: &str, force: bool) -> Result<PathBuf> {
        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(path.to_path_buf());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Created config: {}", path.display());
        Ok(path.to_path_buf())
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn default_global_config() -> String {
        r#"# autodoc Global Configuration
# User-wide defaults. Project settings in .autodoc/config.toml override these.

[llm]
provider = "claude-code"
model = "sonnet"
timeout_secs = 300

[retry]
retry_limit = 2
"#
        .to_string()
    }

    fn default_project_config() -> String {
        r#"# autodoc Project Configuration
# Project-specific settings that override global defaults.

[output]
dir = "docs"
format = "sphinx"
write_index = true
relationships = true

[analysis]
include = ["**/*"]
exclude = ["**/test/**", "**/tests/**"]

[protocol]
max_turns = 8
correction_limit = 2

[validation]
extra_debug_phrases = []
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocFormat;
    use tempfile::TempDir;

    #[test]
    fn test_missing_files_give_defaults() {
        let temp = TempDir::new().unwrap();
        let config =
            ConfigLoader::load_layers(None, &temp.path().join(".autodoc/config.toml")).unwrap();
        assert_eq!(config.llm.provider, "claude-code");
        assert_eq!(config.output.dir, PathBuf::from("docs"));
    }

    #[test]
    fn test_project_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.toml");
        fs::write(
            &global,
            "[llm]\nmodel = \"opus\"\n[output]\nformat = \"markdown\"\n",
        )
        .unwrap();
        let project = temp.path().join("project.toml");
        fs::write(&project, "[llm]\nmodel = \"haiku\"\n").unwrap();

        let config = ConfigLoader::load_layers(Some(&global), &project).unwrap();
        assert_eq!(config.llm.model, "haiku");
        assert_eq!(config.output.format, DocFormat::Markdown);
    }

    #[test]
    fn test_init_project_then_load() {
        let temp = TempDir::new().unwrap();
        let path = ConfigLoader::init_project(temp.path(), false).unwrap();
        assert!(path.ends_with(".autodoc/config.toml"));

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.protocol.max_turns, 8);
        assert!(config.validation.extra_debug_phrases.is_empty());
    }

    #[test]
    fn test_init_does_not_clobber_without_force() {
        let temp = TempDir::new().unwrap();
        let path = ConfigLoader::project_config_path(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[llm]\nmodel = \"mine\"\n").unwrap();

        ConfigLoader::init_project(temp.path(), false).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("mine"));

        ConfigLoader::init_project(temp.path(), true).unwrap();
        assert!(!fs::read_to_string(&path).unwrap().contains("mine"));
    }

    #[test]
    fn test_invalid_file_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "[analysis]\nconcurrency = 0\n").unwrap();
        assert!(matches!(
            ConfigLoader::load_from_file(&path),
            Err(AutodocError::Config(_))
        ));
    }

    #[test]
    fn test_env_override() {
        let temp = TempDir::new().unwrap();
        // SAFETY: no other test reads this variable
        unsafe {
            std::env::set_var("AUTODOC_RETRY__BUDGET", "7");
        }
        let config = ConfigLoader::load_layers(None, &temp.path().join("none.toml"));
        unsafe {
            std::env::remove_var("AUTODOC_RETRY__BUDGET");
        }
        assert_eq!(config.unwrap().retry.budget, 7);
    }

    #[test]
    fn test_render_formats() {
        let config = Config::default();
        assert!(ConfigLoader::render(&config, false).unwrap().contains("[retry]"));
        let json: serde_json::Value =
            serde_json::from_str(&ConfigLoader::render(&config, true).unwrap()).unwrap();
        assert_eq!(json["llm"]["model"], "sonnet");
    }
}
