use console::style;

use crate::pipeline::{BatchReport, UnitOutcome, UnitReport};
use crate::types::{SourceUnit, Symbol};

/// Styled terminal output for commands. Logs go to stderr through tracing;
/// this is what the user reads on stdout.
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    pub fn key_value(&self, key: &str, value: impl std::fmt::Display) {
        println!("  {:<10} {}", style(key).dim(), value);
    }

    /// One line per unit, then the totals
    pub fn batch(&self, report: &BatchReport) {
        self.section("Units");
        for unit in &report.units {
            self.unit(unit);
        }
        if let Some(index) = &report.index {
            self.info(&format!("Index: {}", index.display()));
        }
        if let Some(error) = &report.index_error {
            self.warning(&format!("Index not written: {}", error));
        }
        if let Some(metrics) = &report.metrics {
            self.key_value("API calls", metrics.api_calls);
            self.key_value("Reads", metrics.file_reads);
            self.key_value("Retries", metrics.unit_retries);
        }

        let summary = report.summary_line();
        if report.has_failures() {
            self.error(&summary);
        } else {
            self.success(&summary);
        }
    }

    fn unit(&self, unit: &UnitReport) {
        let path = unit.path.display();
        match &unit.outcome {
            UnitOutcome::Succeeded {
                output,
                write,
                attempts,
                ..
            } => {
                let retried = if *attempts > 1 {
                    format!(" after {} attempts", attempts)
                } else {
                    String::new()
                };
                println!(
                    "  {} {} → {} {}{}",
                    style("✓").green(),
                    path,
                    output.display(),
                    style(format!("({:?})", write).to_lowercase()).dim(),
                    retried
                );
            }
            UnitOutcome::Planned { output, symbols } => println!(
                "  {} {} → {} {}",
                style("•").cyan(),
                path,
                output.display(),
                style(format!("({} symbols)", symbols)).dim()
            ),
            UnitOutcome::Skipped { reason } => println!(
                "  {} {} {}",
                style("-").yellow(),
                path,
                style(reason).dim()
            ),
            UnitOutcome::Failed { reason, .. } => {
                eprintln!("  {} {} {}", style("✗").red(), path, style(reason).red())
            }
        }
    }

    /// Symbol outline of one parsed file, nested by parent
    pub fn outline(&self, unit: &SourceUnit) {
        self.header(&format!("{} ({})", unit.path.display(), unit.language));
        if let Some(package) = &unit.package {
            self.key_value("package", package);
        }
        for symbol in unit.symbols() {
            self.symbol(symbol);
        }
    }

    fn symbol(&self, symbol: &Symbol) {
        let depth = symbol.qualified_name.matches('.').count();
        let line = format!("{}{}", "  ".repeat(depth + 1), symbol.signature());
        let lines = style(format!("L{}-{}", symbol.span.start, symbol.span.end)).dim();
        if symbol.is_public() {
            println!("{}  {}", line, lines);
        } else {
            println!("{}  {} {}", style(line).dim(), lines, style("(private)").dim());
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
