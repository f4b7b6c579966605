//! Runtime configuration.
//!
//! Built once in `main` from the environment and CLI flags, then passed to
//! each component so nothing reads process-wide state on its own.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::TimeDelta;

/// Directory under the home directory holding user-scoped state.
const HOME_DIR: &str = ".fluxdeck";
const STYLES_FILE: &str = "styles.json";

const DEFAULT_GENERATOR: &str = "mflux-generate";
const DEFAULT_LLM: &str = "llm";
const DEFAULT_SESSION_TIMEOUT_HOURS: i64 = 4;

pub const ENV_OUTPUT_DIR: &str = "FLUXDECK_OUTPUT_DIR";
pub const ENV_STYLES_FILE: &str = "FLUXDECK_STYLES_FILE";
pub const ENV_GENERATOR: &str = "FLUXDECK_GENERATOR";
pub const ENV_LLM: &str = "FLUXDECK_LLM";
pub const ENV_LLM_MODEL: &str = "FLUXDECK_LLM_MODEL";
pub const ENV_SESSION_TIMEOUT_HOURS: &str = "FLUXDECK_SESSION_TIMEOUT_HOURS";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory that holds the session directories.
    pub output_dir: PathBuf,
    /// User-scoped style store.
    pub styles_file: PathBuf,
    /// Image generation executable.
    pub generator: String,
    /// Text model CLI used for brainstorming prompts.
    pub llm: String,
    /// Model passed to `llm -m`; `None` uses the tool's default.
    pub llm_model: Option<String>,
    /// How long a session stays eligible for reuse.
    pub session_timeout: TimeDelta,
}

impl Config {
    /// Load configuration from `FLUXDECK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let output_dir = std::env::var_os(ENV_OUTPUT_DIR)
            .map_or_else(|| PathBuf::from("."), PathBuf::from);

        let styles_file = match std::env::var_os(ENV_STYLES_FILE) {
            Some(path) => PathBuf::from(path),
            None => dirs::home_dir()
                .context("Could not find home directory")?
                .join(HOME_DIR)
                .join(STYLES_FILE),
        };

        let generator =
            std::env::var(ENV_GENERATOR).unwrap_or_else(|_| DEFAULT_GENERATOR.to_string());

        let llm = std::env::var(ENV_LLM).unwrap_or_else(|_| DEFAULT_LLM.to_string());
        let llm_model = std::env::var(ENV_LLM_MODEL)
            .ok()
            .map(|model| model.trim().to_string())
            .filter(|model| !model.is_empty());

        let session_timeout = std::env::var(ENV_SESSION_TIMEOUT_HOURS)
            .ok()
            .map_or(DEFAULT_SESSION_TIMEOUT_HOURS, |raw| {
                parse_timeout_hours(&raw).unwrap_or_else(|| {
                    tracing::warn!(
                        value = %raw,
                        "invalid {ENV_SESSION_TIMEOUT_HOURS}, using default"
                    );
                    DEFAULT_SESSION_TIMEOUT_HOURS
                })
            });

        Ok(Self {
            output_dir,
            styles_file,
            generator,
            llm,
            llm_model,
            session_timeout: TimeDelta::hours(session_timeout),
        })
    }

    /// Override the session base directory (`--output-dir`).
    #[must_use]
    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.output_dir = dir;
        }
        self
    }
}

fn parse_timeout_hours(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|h| (1..=24 * 365).contains(h))
}
