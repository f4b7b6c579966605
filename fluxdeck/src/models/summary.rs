//! Session-level aggregate written next to the run directories.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::run::{RunRecord, RunStatus};

/// One line of the aggregate, derived from a run record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: u32,
    pub prompt: String,
    pub style_name: Option<String>,
    pub status: RunStatus,
    pub completed: usize,
    pub total: u32,
    pub total_generation_time: f64,
}

impl RunSummary {
    pub fn from_record(id: u32, record: &RunRecord) -> Self {
        Self {
            id,
            prompt: record.prompt.clone(),
            style_name: record.style_name.clone(),
            status: record.status,
            completed: record.results.len(),
            total: record.variation_count,
            total_generation_time: record.total_generation_time(),
        }
    }
}

/// Contents of `session.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub name: String,
    pub created_at: NaiveDateTime,
    /// Ordered by run id.
    pub runs: Vec<RunSummary>,
}
