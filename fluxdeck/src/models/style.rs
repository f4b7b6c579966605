//! Named prompt fragments.

use serde::{Deserialize, Serialize};

/// `--style` value that clears the style instead of naming one.
pub const NO_STYLE: &str = "none";

/// A reusable text fragment appended to prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    pub name: String,
    pub description: String,
}

/// Join a prompt and a style description the way every run record stores them.
pub fn apply_description(prompt: &str, description: &str) -> String {
    if description.trim().is_empty() {
        return prompt.to_string();
    }
    format!("{prompt}, {description}")
}
