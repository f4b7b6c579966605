//! Prompt suggestions from a text model.
//!
//! Runs the `llm` command line tool once per concept and reads one prompt
//! per line from its stdout.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::error::FluxError;
use crate::process::{spawn_process_with, ProcessOptions};

pub const DEFAULT_PROMPT_COUNT: u32 = 5;

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s+").expect("valid list marker regex"));

/// Instruction sent to the model for `concept`.
pub fn instruction(concept: &str, count: u32) -> String {
    format!(
        "Generate {count} creative and detailed image prompts based on the concept: \"{concept}\"\n\
         Each prompt should be unique and explore a different aspect or interpretation of the concept.\n\
         Focus on vivid, visual descriptions that work well for image generation.\n\
         Return only the prompts, one per line."
    )
}

/// Prompts from the model's reply, at most `count`.
///
/// Blank lines, headings, lead-in lines ending in `:` and bullets are
/// skipped. List numbering and surrounding quotes are removed.
pub fn parse_prompts<S: AsRef<str>>(lines: &[S], count: u32) -> Vec<String> {
    lines
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| {
            !line.is_empty() && !line.starts_with(['#', '-', '*']) && !line.ends_with(':')
        })
        .map(|line| {
            let line = LIST_MARKER.replace(line, "");
            line.trim().trim_matches('"').trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .take(count as usize)
        .collect()
}

/// Wraps the text model executable.
#[derive(Debug, Clone)]
pub struct Brainstormer {
    program: String,
    leading_args: Vec<String>,
    model: Option<String>,
}

impl Brainstormer {
    /// `command` may carry leading arguments, e.g. `uvx llm`.
    pub fn new(command: &str, model: Option<String>) -> Self {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts.next().unwrap_or_default();
        Self {
            program,
            leading_args: parts.collect(),
            model,
        }
    }

    pub fn command(&self, concept: &str, count: u32) -> ProcessOptions {
        let mut opts = ProcessOptions::new(&self.program).args(self.leading_args.iter().cloned());
        if let Some(model) = &self.model {
            opts = opts.args(["-m", model.as_str()]);
        }
        opts.arg(instruction(concept, count))
    }

    /// Ask the model for `count` prompts about `concept`.
    pub async fn brainstorm(&self, concept: &str, count: u32) -> Result<Vec<String>> {
        let opts = self.command(concept, count);
        let result = spawn_process_with(opts, |_| {})
            .await
            .with_context(|| {
                format!(
                    "Failed to run '{}'. Install it with 'pip install llm' or set FLUXDECK_LLM",
                    self.program
                )
            })?;

        if !result.success() {
            return Err(FluxError::BrainstormFailed {
                code: result.code(),
                stderr: result.stderr_string(),
            }
            .into());
        }

        let prompts = parse_prompts(&result.stdout, count);
        tracing::info!(
            concept,
            requested = count,
            received = prompts.len(),
            "brainstormed prompts"
        );
        Ok(prompts)
    }
}
