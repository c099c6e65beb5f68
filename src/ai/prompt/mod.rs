//! Prompt Builder System
//!
//! Section-based prompt construction plus the fixed documentation template.
//! Everything here is pure string templating: no I/O, no network.
//!
//! ## Sections
//!
//! 1. **Role**: who the model is
//! 2. **Objectives**: numbered demands on the output
//! 3. **Context**: ordered key/value facts about the unit
//! 4. **Focus**: what to stay on and what to avoid
//! 5. **Tools**: the `read_file` / `save_documentation` directives

use crate::ai::protocol::directive::{PAYLOAD_CLOSE, PAYLOAD_OPEN};
use crate::constants::{protocol, validation};
use crate::types::{DocFormat, SourceUnit, SymbolKind, ValidationError};

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    Role { expertise: String, task: String },
    Objectives(Vec<String>),
    /// Ordered so that identical inputs render identical prompts
    Context(Vec<(String, String)>),
    Text {
        header: Option<String>,
        content: String,
    },
    Code { language: String, content: String },
    Focus {
        target: String,
        restrictions: Vec<String>,
    },
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    pub fn objectives<S: Into<String>>(mut self, objectives: Vec<S>) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Add a context item, appending to the first context section
    pub fn context_item(mut self, key: &str, value: &str) -> Self {
        let entry = (key.to_string(), value.to_string());
        match self
            .sections
            .iter_mut()
            .find_map(|s| match s {
                PromptSection::Context(ctx) => Some(ctx),
                _ => None,
            }) {
            Some(ctx) => ctx.push(entry),
            None => self.sections.push(PromptSection::Context(vec![entry])),
        }
        self
    }

    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    pub fn code(mut self, language: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Code {
            language: language.to_string(),
            content: content.to_string(),
        });
        self
    }

    pub fn focus(mut self, target: &str, restrictions: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Focus {
            target: target.to_string(),
            restrictions: restrictions.into_iter().map(String::from).collect(),
        });
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!(
                        "You are an expert {} specializing in {}.\n",
                        expertise, task
                    ));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Context(ctx) => {
                    prompt.push_str("# Context\n\n");
                    for (key, value) in ctx {
                        prompt.push_str(&format!("**{}**: {}\n", key, value));
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("# {}\n\n", h));
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Code { language, content } => {
                    prompt.push_str(&format!("```{}\n", language));
                    prompt.push_str(&content);
                    prompt.push_str("\n```\n\n");
                }
                PromptSection::Focus {
                    target,
                    restrictions,
                } => {
                    prompt.push_str("<FOCUS>\n");
                    prompt.push_str(&format!("IMPORTANT: Focus EXCLUSIVELY on: {}\n", target));
                    for restriction in restrictions {
                        prompt.push_str(&format!("- {}\n", restriction));
                    }
                    prompt.push_str("</FOCUS>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

/// The opening message of a documentation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub system: String,
    pub user: String,
}

/// Per-request template inputs
#[derive(Debug, Clone)]
pub struct PromptOptions {
    pub format: DocFormat,
    /// Path the model should pass to `read_file`
    pub read_path: String,
    /// Path the model should pass to `save_documentation`
    pub save_path: String,
    /// Inline the source so no `read_file` round trip is needed
    pub embed_source: bool,
}

/// Preset prompt templates
pub struct PromptTemplates;

impl PromptTemplates {
    /// Render the documentation request for one source unit.
    pub fn documentation(unit: &SourceUnit, options: &PromptOptions) -> PromptMessage {
        let language = unit.language.as_str();
        let primary = unit.primary_name();

        let mut builder = PromptBuilder::new()
            .role(
                "technical documentation writer",
                &format!("{} API documentation", language),
            )
            .objectives(Self::objectives(options.format, &primary, unit))
            .context_item("File", &options.read_path)
            .context_item("Language", language);
        if let Some(package) = &unit.package {
            builder = builder.context_item("Package", package);
        }
        builder = builder
            .context_item("Format", options.format.markup_name())
            .context_item("Output", &options.save_path)
            .section("Symbols to document", &Self::outline(unit))
            .section("Tools", &Self::tool_instructions(options));

        if options.embed_source {
            builder = builder.code(unit.language.tag(), &unit.text);
        }

        let user = builder
            .focus(
                &options.read_path,
                vec![
                    "Document every symbol listed above, using exactly those names",
                    "Never include debug output, log lines or tool chatter in the document",
                    "Do NOT invent members that are not in the source",
                ],
            )
            .build();

        PromptMessage {
            system: format!(
                "You are an expert technical documentation writer specializing in {} documentation.",
                language
            ),
            user,
        }
    }

    fn objectives(format: DocFormat, primary: &str, unit: &SourceUnit) -> Vec<String> {
        let has_fields = unit
            .documentable_symbols()
            .any(|s| s.kind == SymbolKind::Field);
        let fields = if has_fields {
            "Document every field with its name, type and purpose"
        } else {
            "Document fields, if any, with their name, type and purpose"
        };

        match format {
            DocFormat::Sphinx => vec![
                format!(
                    "Start with the disclaimer banner as an RST note: `.. note:: {}`",
                    validation::BANNER_TEXT
                ),
                format!(
                    "Add a top-level RST heading `{}` underlined with `=` of the same length",
                    primary
                ),
                "Write a 2-3 sentence description of the purpose".to_string(),
                "Give every method its own subsection heading, a `:param name: (type) description` line for every parameter, and `:returns: (type) description`; add an optional `.. code-block::` usage example".to_string(),
                fields.to_string(),
                "Never include debug or log output".to_string(),
                "Use double backticks for code references, e.g. ``sendData``".to_string(),
            ],
            DocFormat::Markdown => vec![
                format!(
                    "Start with the disclaimer banner as a quote: `> **Note:** {}`",
                    validation::BANNER_TEXT
                ),
                format!("Add a top-level heading `# {}`", primary),
                "Write a 2-3 sentence description of the purpose".to_string(),
                "Give every method its own `##` or `###` heading, a `- `name` (type): description` bullet for every parameter, and a `**Returns:** (type) description` line; add an optional fenced usage example".to_string(),
                fields.to_string(),
                "Never include debug or log output".to_string(),
                "Use backticks for code references, e.g. `sendData`".to_string(),
            ],
        }
    }

    /// Indented symbol outline with signatures
    fn outline(unit: &SourceUnit) -> String {
        let mut lines = Vec::new();
        for symbol in unit.documentable_symbols() {
            let depth = symbol.qualified_name.matches('.').count();
            lines.push(format!("{}- {}", "  ".repeat(depth), symbol.signature()));
        }
        if lines.is_empty() {
            "(no public declarations; document the module as a whole)".to_string()
        } else {
            lines.join("\n")
        }
    }

    fn tool_instructions(options: &PromptOptions) -> String {
        let read = protocol::READ_FILE;
        let save = protocol::SAVE_DOCUMENTATION;
        let first_step = if options.embed_source {
            "The source is included below, so reading it is optional.".to_string()
        } else {
            format!("Begin with: {}(\"{}\")", read, options.read_path)
        };

        format!(
            "Call a tool by writing its directive on its own line.\n\n\
             {read}(\"<path>\")\n  Returns the full text of a source file.\n\n\
             {save}(\"<path>\") -> {open}\n<complete documentation>\n{close}\n  \
             Saves the finished document. Call it exactly once, with the whole document between the markers.\n\n\
             {first_step}\n\
             Finish with: {save}(\"{save_path}\") -> {open} ... {close}",
            read = read,
            save = save,
            open = PAYLOAD_OPEN,
            close = PAYLOAD_CLOSE,
            first_step = first_step,
            save_path = options.save_path,
        )
    }

    /// Tool output for a successful read
    pub fn read_result(path: &str, content: &str) -> String {
        format!(
            "[{} result for \"{}\"]\n{}",
            protocol::READ_FILE,
            path,
            content
        )
    }

    /// Tool output for a failed read
    pub fn read_failure(path: &str, reason: &str, used: usize, limit: usize) -> String {
        format!(
            "[{} error] FileNotFoundError: {} ({}). Check the path and try again ({} of {} read attempts used).",
            protocol::READ_FILE,
            path,
            reason,
            used,
            limit
        )
    }

    /// Correction turn after a rejected save
    pub fn correction(error: &ValidationError, attempt: usize, limit: usize) -> String {
        format!(
            "The documentation was rejected: {}. Fix this and call {} again with the complete document (correction {} of {}).",
            error,
            protocol::SAVE_DOCUMENTATION,
            attempt,
            limit
        )
    }

    /// Reminder when a reply carried neither a directive nor a document
    pub fn reminder(save_path: &str) -> String {
        format!(
            "No tool directive was found in your reply. Use {}(\"<path>\") to read source, or {}(\"{}\") -> {} ... {} to save the documentation.",
            protocol::READ_FILE,
            protocol::SAVE_DOCUMENTATION,
            save_path,
            PAYLOAD_OPEN,
            PAYLOAD_CLOSE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::parser::{Language, parse_source};
    use crate::types::ValidationErrorKind;
    use std::path::Path;

    fn options(format: DocFormat) -> PromptOptions {
        PromptOptions {
            format,
            read_path: "src/Link.scala".to_string(),
            save_path: "docs/api/scala/Link.rst".to_string(),
            embed_source: false,
        }
    }

    fn unit() -> SourceUnit {
        let src = "package net\n\nobject Link {\n  def open(host: String, port: Int): Boolean = true\n  val timeout: Int = 5\n}\n";
        parse_source(Path::new("src/Link.scala"), src, Language::Scala).unwrap()
    }

    #[test]
    fn test_basic_prompt() {
        let prompt = PromptBuilder::new()
            .role("code analyst", "Rust documentation")
            .objectives(vec!["Analyze code", "Generate docs"])
            .build();

        assert!(prompt.contains("<ROLE>"));
        assert!(prompt.contains("<OBJECTIVES>"));
        assert!(prompt.contains("2. Generate docs"));
    }

    #[test]
    fn test_context_items_keep_order() {
        let prompt = PromptBuilder::new()
            .context_item("B", "2")
            .context_item("A", "1")
            .build();

        let b = prompt.find("**B**").unwrap();
        let a = prompt.find("**A**").unwrap();
        assert!(b < a);
    }

    #[test]
    fn test_documentation_prompt_sphinx() {
        let message = PromptTemplates::documentation(&unit(), &options(DocFormat::Sphinx));

        assert!(message.system.contains("specializing in Scala documentation"));
        let user = &message.user;
        assert!(user.contains(".. note::"));
        assert!(user.contains("auto-generated"));
        assert!(user.contains("heading `Link`"));
        assert!(user.contains(":param name:"));
        assert!(user.contains("double backticks"));
        assert!(user.contains("debug"));
        assert!(user.contains("def open(host: String, port: Int) -> Boolean"));
        assert!(user.contains("val timeout: Int"));
        assert!(user.contains("read_file(\"src/Link.scala\")"));
        assert!(user.contains("save_documentation(\"docs/api/scala/Link.rst\") -> <<<"));
        assert!(user.contains("**Package**: net"));
        assert!(!user.contains("```scala"));
    }

    #[test]
    fn test_documentation_prompt_markdown_embeds_source() {
        let mut opts = options(DocFormat::Markdown);
        opts.embed_source = true;
        let message = PromptTemplates::documentation(&unit(), &opts);

        assert!(message.user.contains("`# Link`"));
        assert!(message.user.contains("```scala"));
        assert!(message.user.contains("reading it is optional"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let u = unit();
        let o = options(DocFormat::Sphinx);
        assert_eq!(
            PromptTemplates::documentation(&u, &o),
            PromptTemplates::documentation(&u, &o)
        );
    }

    #[test]
    fn test_correction_names_element() {
        let err = ValidationError::new(
            ValidationErrorKind::MissingReturn,
            "Link.open",
            "no return documentation",
        );
        let text = PromptTemplates::correction(&err, 1, 2);
        assert!(text.contains("Link.open"));
        assert!(text.contains("save_documentation"));
        assert!(text.contains("1 of 2"));
    }
}
