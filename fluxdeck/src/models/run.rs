//! Run record: the persisted description of one invocation's variations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::generation::{Model, Resolution, Steps};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No variations were requested.
    Pending,
    /// Some variations are still missing.
    InProgress,
    /// Every requested variation has a result.
    Completed,
}

impl RunStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One generated image within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    /// 1-based position within the run.
    pub index: u32,
    pub seed: u64,
    pub steps: u32,
    /// Image path relative to the run directory.
    pub file: String,
    /// Sidecar metadata path relative to the run directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_file: Option<String>,
    /// Wall-clock seconds spent in the generator.
    pub generation_time: f64,
}

/// Contents of `run_<n>/run_info.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub created_at: DateTime<Utc>,
    /// Full prompt sent to the generator, style suffix included.
    pub prompt: String,
    /// Prompt without the style suffix.
    #[serde(default)]
    pub base_prompt: Option<String>,
    pub model: Model,
    pub steps: Steps,
    pub resolution: Resolution,
    pub variation_count: u32,
    #[serde(default)]
    pub seed_base: Option<u64>,
    #[serde(default)]
    pub style_name: Option<String>,
    #[serde(default)]
    pub metadata: bool,
    #[serde(default)]
    pub results: Vec<ImageResult>,
    pub status: RunStatus,
}

impl RunRecord {
    /// The prompt to inherit from: the base prompt if recorded, else the full one.
    pub fn inheritable_prompt(&self) -> &str {
        self.base_prompt.as_deref().unwrap_or(&self.prompt)
    }

    /// Status implied by the number of results collected so far.
    pub fn derived_status(&self) -> RunStatus {
        if self.variation_count == 0 {
            RunStatus::Pending
        } else if self.results.len() >= self.variation_count as usize {
            RunStatus::Completed
        } else {
            RunStatus::InProgress
        }
    }

    pub fn total_generation_time(&self) -> f64 {
        self.results.iter().map(|r| r.generation_time).sum()
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}
