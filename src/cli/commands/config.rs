//! Config Command
//!
//! Usage:
//!   autodoc config show [--global] [-f toml|json]
//!   autodoc config path
//!   autodoc config init [--global] [--force]

use std::env;

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the effective config, or the raw global file with `global`
pub fn show(global: bool, format: &str) -> Result<()> {
    if global {
        let out = Output::new();
        match ConfigLoader::global_config_path() {
            Some(path) if path.exists() => {
                println!("# Global Config: {}\n", path.display());
                println!("{}", std::fs::read_to_string(&path)?);
            }
            Some(_) => {
                out.warning("No global config found.");
                out.info("Run 'autodoc config init --global' to create one.");
            }
            None => out.error("Cannot determine global config directory."),
        }
        return Ok(());
    }

    let config = ConfigLoader::load(&env::current_dir()?)?;
    println!("{}", ConfigLoader::render(&config, format == "json")?);
    Ok(())
}

pub fn path() -> Result<()> {
    let out = Output::new();
    out.header("Configuration paths");
    for (label, path) in ConfigLoader::config_paths(&env::current_dir()?) {
        match path {
            Some(path) => {
                let mark = if path.exists() { "✓" } else { "✗" };
                out.key_value(label, format!("{} {}", mark, path.display()));
            }
            None => out.key_value(label, "(not available)"),
        }
    }
    Ok(())
}

pub fn init(global: bool, force: bool) -> Result<()> {
    let path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(&env::current_dir()?, force)?
    };
    let scope = if global { "global" } else { "project" };
    Output::new().success(&format!(
        "Initialized {} configuration: {}",
        scope,
        path.display()
    ));
    Ok(())
}
