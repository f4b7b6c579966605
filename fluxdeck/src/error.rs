//! Domain errors.
//!
//! Everything here except [`FluxError::GenerationFailed`],
//! [`FluxError::BrainstormFailed`] and [`FluxError::RecordCompleted`] is a
//! configuration error: it is raised before any session or run directory is
//! created.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FluxError {
    #[error("No prompt specified and no previous run in the current session to take one from")]
    NoPrompt,

    #[error("--vary-steps requires --seed to be specified")]
    StepVariationRequiresSeed,

    #[error("Style '{0}' not found. Use --list-styles to see available styles.")]
    UnknownStyle(String),

    #[error("Style name must not be empty")]
    EmptyStyleName,

    #[error("'{0}' is reserved for --style none and cannot be saved as a style")]
    ReservedStyleName(String),

    #[error("--seed {seed} is too large for {count} variations; the last seed would exceed {}", u64::MAX)]
    SeedOutOfRange { seed: u64, count: u32 },

    #[error("Invalid resolution '{0}', expected WIDTHxHEIGHT (e.g. 1024x768)")]
    InvalidResolution(String),

    #[error("--vary-steps must be a comma-separated list of positive integers (e.g. '1,3,5,9'), got '{0}'")]
    InvalidStepList(String),

    #[error("Brainstorm concept must not be empty")]
    EmptyConcept,

    #[error("No brainstormed prompts in session {0}. Run 'fluxdeck brainstorm CONCEPT' first.")]
    NoBrainstormResults(String),

    #[error("Prompt numbers must be a comma-separated list like '1,3,5', got '{0}'")]
    InvalidPromptIndices(String),

    #[error("Prompt {index} does not exist; the last brainstorm produced {available}")]
    PromptIndexOutOfRange { index: usize, available: usize },

    #[error("Brainstorming failed (exit code {}): {stderr}", exit_label(.code))]
    BrainstormFailed { code: Option<i32>, stderr: String },

    #[error("Variation {index} failed (exit code {}): {stderr}", exit_label(.code))]
    GenerationFailed {
        index: u32,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Run record at {0} is already completed")]
    RecordCompleted(String),
}

#[allow(clippy::ref_option)]
fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

impl FluxError {
    /// Whether the error was detected before anything touched disk.
    pub const fn is_configuration(&self) -> bool {
        !matches!(
            self,
            Self::GenerationFailed { .. } | Self::BrainstormFailed { .. } | Self::RecordCompleted(_)
        )
    }
}
