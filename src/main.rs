use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autodoc::cli::commands;
use autodoc::types::DocFormat;

/// Parse output format from string
fn parse_doc_format(s: &str) -> Result<DocFormat, String> {
    s.parse::<DocFormat>()
}

#[derive(Parser)]
#[command(name = "autodoc")]
#[command(
    version,
    about = "LLM-driven API documentation generator for Scala, Python, Java and Rust"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate documentation for a file or directory
    Generate {
        #[arg(help = "Source file or directory")]
        path: PathBuf,
        #[arg(long, short, help = "Output directory (default: docs)")]
        output: Option<PathBuf>,
        #[arg(long, short, value_parser = parse_doc_format, help = "Output format: sphinx, markdown")]
        format: Option<DocFormat>,
        #[arg(long, help = "Treat every file as this language instead of detecting it")]
        language: Option<String>,
        #[arg(long, help = "LLM provider (claude-code, openai, ollama)")]
        provider: Option<String>,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
        #[arg(long, help = "Whole-request retries per file")]
        retry_limit: Option<u32>,
        #[arg(long, help = "Files documented in parallel")]
        concurrency: Option<usize>,
        #[arg(long, help = "Write a JSON batch report to this file")]
        report: Option<PathBuf>,
        #[arg(long = "dry-run", help = "Parse and plan only, don't contact the model")]
        dry_run: bool,
    },

    /// Print the symbols parsed from a source file
    Symbols {
        #[arg(help = "Source file")]
        file: PathBuf,
        #[arg(long, help = "Language override")]
        language: Option<String>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective configuration
    Show {
        #[arg(long, short, help = "Show the global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Route panics through the log before the default hook prints them
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_default();

        tracing::error!(%location, "autodoc panicked: {}", message);
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", console::style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Generate {
            path,
            output,
            format,
            language,
            provider,
            model,
            retry_limit,
            concurrency,
            report,
            dry_run,
        } => {
            let report = commands::generate::run(commands::GenerateOptions {
                path,
                output,
                format,
                language,
                provider,
                model,
                retry_limit,
                concurrency,
                report,
                dry_run,
            })?;
            if report.has_failures() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Symbols {
            file,
            language,
            format,
        } => {
            commands::symbols::run(&file, language.as_deref(), &format)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => commands::config::show(global, &format)?,
            ConfigAction::Path => commands::config::path()?,
            ConfigAction::Init { global, force } => commands::config::init(global, force)?,
        },
    }

    Ok(ExitCode::SUCCESS)
}
