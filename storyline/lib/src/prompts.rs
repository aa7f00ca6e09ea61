//! Prompt templates for the three flows.
//!
//! Templates are Markdown files embedded at compile time with `{{name}}`
//! placeholders. Each [`PromptTemplate`] declares the variables it needs, and
//! [`PromptTemplate::render`] refuses to produce a prompt unless every declared
//! variable is supplied with a non-blank value.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

/// Embedded prompt templates
mod text {
    pub const DISCOVER: &str = include_str!("../prompts/discover.md");
    pub const RESEARCH: &str = include_str!("../prompts/research.md");
    pub const SCRIPT: &str = include_str!("../prompts/script.md");
}

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("Invalid placeholder regex"));

/// Errors produced while rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("Template '{template}' requires variable '{variable}'")]
    MissingVariable {
        template: &'static str,
        variable: &'static str,
    },

    #[error("Template '{template}' requires a non-blank value for '{variable}'")]
    BlankVariable {
        template: &'static str,
        variable: &'static str,
    },

    #[error("Template '{template}' does not declare variable '{variable}'")]
    UnknownVariable {
        template: &'static str,
        variable: String,
    },
}

/// A fixed prompt with statically declared variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub variables: &'static [&'static str],
    text: &'static str,
}

/// Topic discovery: needs the research `field`.
pub const DISCOVER: PromptTemplate = PromptTemplate {
    name: "discover",
    variables: &["field"],
    text: text::DISCOVER,
};

/// Deep research: needs the `topic`.
pub const RESEARCH: PromptTemplate = PromptTemplate {
    name: "research",
    variables: &["topic"],
    text: text::RESEARCH,
};

/// Script writing: needs the `topic` and the full research report as `final_summary`.
pub const SCRIPT: PromptTemplate = PromptTemplate {
    name: "script",
    variables: &["topic", "final_summary"],
    text: text::SCRIPT,
};

impl PromptTemplate {
    /// Raw template text, placeholders included.
    pub fn text(&self) -> &'static str {
        self.text
    }

    /// Substitute every `{{name}}` placeholder in one pass.
    ///
    /// Values are inserted verbatim; placeholder-looking text inside a value is
    /// never expanded.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String, PromptError> {
        if let Some((unknown, _)) = vars.iter().find(|(k, _)| !self.variables.contains(k)) {
            return Err(PromptError::UnknownVariable {
                template: self.name,
                variable: unknown.to_string(),
            });
        }

        let mut values: HashMap<&str, &str> = HashMap::with_capacity(self.variables.len());
        for &variable in self.variables {
            let value = vars
                .iter()
                .find(|(k, _)| *k == variable)
                .map(|(_, v)| *v)
                .ok_or(PromptError::MissingVariable {
                    template: self.name,
                    variable,
                })?;
            if value.trim().is_empty() {
                return Err(PromptError::BlankVariable {
                    template: self.name,
                    variable,
                });
            }
            values.insert(variable, value);
        }

        let rendered = PLACEHOLDER_RE.replace_all(self.text, |caps: &Captures| {
            match values.get(&caps[1]) {
                Some(value) => (*value).to_string(),
                None => caps[0].to_string(),
            }
        });
        Ok(rendered.into_owned())
    }
}

/// Render the discovery prompt for a research field.
pub fn discovery_prompt(field: &str) -> Result<String, PromptError> {
    DISCOVER.render(&[("field", field)])
}

/// Render the deep-research prompt for a topic.
pub fn research_prompt(topic: &str) -> Result<String, PromptError> {
    RESEARCH.render(&[("topic", topic)])
}

/// Render the script prompt for a topic and its research report.
pub fn script_prompt(topic: &str, final_summary: &str) -> Result<String, PromptError> {
    SCRIPT.render(&[("topic", topic), ("final_summary", final_summary)])
}
