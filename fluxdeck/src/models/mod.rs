//! Data models for fluxdeck entities.

mod brainstorm;
mod generation;
mod run;
mod style;
mod summary;

pub use brainstorm::BrainstormResults;
pub use generation::{Model, Preset, Resolution, Steps};
pub use run::{ImageResult, RunRecord, RunStatus};
pub use style::{apply_description, Style, NO_STYLE};
pub use summary::{RunSummary, SessionSummary};
