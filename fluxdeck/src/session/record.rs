//! Run record lifecycle on disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::FluxError;
use crate::models::{ImageResult, RunRecord};
use crate::persist;

pub const RUN_INFO_FILE: &str = "run_info.json";

/// Read `run_info.json` from a run directory; unreadable records are `None`.
pub fn read_record(run_dir: &Path) -> Option<RunRecord> {
    persist::read_json(&run_dir.join(RUN_INFO_FILE))
}

/// A claimed run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    id: u32,
    dir: PathBuf,
}

impl RunHandle {
    pub(super) const fn new(id: u32, dir: PathBuf) -> Self {
        Self { id, dir }
    }

    pub const fn id(&self) -> u32 {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self) -> PathBuf {
        self.dir.join(RUN_INFO_FILE)
    }

    /// Write the initial record: no results, status derived from the count.
    pub fn initialize(&self, mut record: RunRecord) -> Result<RunRecord> {
        record.results.clear();
        record.status = record.derived_status();
        persist::write_json(&self.record_path(), &record)?;
        Ok(record)
    }

    /// Re-read the record from disk.
    pub fn load(&self) -> Result<RunRecord> {
        let path = self.record_path();
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Append one result and persist. Read-modify-write, so external readers
    /// always see a complete record.
    pub fn append(&self, result: ImageResult) -> Result<RunRecord> {
        let mut record = self.load()?;
        if record.is_completed() {
            return Err(FluxError::RecordCompleted(self.record_path().display().to_string()).into());
        }

        record.results.push(result);
        record.status = record.derived_status();
        persist::write_json(&self.record_path(), &record)?;

        tracing::debug!(
            run = self.id,
            completed = record.results.len(),
            total = record.variation_count,
            status = %record.status,
            "updated run record"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Model, Resolution, RunStatus, Steps};
    use crate::session::SessionStore;
    use chrono::{NaiveDate, TimeDelta, Utc};
    use tempfile::TempDir;

    fn record(variation_count: u32) -> RunRecord {
        RunRecord {
            created_at: Utc::now(),
            prompt: "a lighthouse at dusk".to_string(),
            base_prompt: Some("a lighthouse at dusk".to_string()),
            model: Model::Fast,
            steps: Steps::Single(1),
            resolution: Resolution::DEFAULT,
            variation_count,
            seed_base: Some(42),
            style_name: None,
            metadata: false,
            results: Vec::new(),
            status: RunStatus::Pending,
        }
    }

    fn image(index: u32) -> ImageResult {
        ImageResult {
            index,
            seed: 41 + u64::from(index),
            steps: 1,
            file: format!("image_{}.png", 41 + index),
            metadata_file: None,
            generation_time: 2.0,
        }
    }

    fn handle(dir: &TempDir) -> RunHandle {
        let store = SessionStore::new(dir.path(), TimeDelta::hours(4));
        let now = NaiveDate::from_ymd_opt(2025, 3, 8)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        store.resolve(false, now).allocate_run().unwrap()
    }

    #[test]
    fn test_initialize_sets_status() {
        let dir = TempDir::new().unwrap();
        let run = handle(&dir);

        let mut rec = record(2);
        rec.results.push(image(1));
        let written = run.initialize(rec).unwrap();
        assert!(written.results.is_empty());
        assert_eq!(written.status, RunStatus::InProgress);
        assert_eq!(read_record(run.dir()), Some(written));

        let empty = run.initialize(record(0)).unwrap();
        assert_eq!(empty.status, RunStatus::Pending);
    }

    #[test]
    fn test_append_until_completed() {
        let dir = TempDir::new().unwrap();
        let run = handle(&dir);
        run.initialize(record(2)).unwrap();

        let rec = run.append(image(1)).unwrap();
        assert_eq!(rec.status, RunStatus::InProgress);
        let rec = run.append(image(2)).unwrap();
        assert_eq!(rec.status, RunStatus::Completed);
        assert_eq!(run.load().unwrap().results.len(), 2);

        let err = run.append(image(3)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FluxError>(),
            Some(FluxError::RecordCompleted(_))
        ));
        assert_eq!(run.load().unwrap().results.len(), 2);
    }

    #[test]
    fn test_append_preserves_earlier_results() {
        let dir = TempDir::new().unwrap();
        let run = handle(&dir);
        run.initialize(record(4)).unwrap();
        run.append(image(1)).unwrap();
        run.append(image(2)).unwrap();

        let rec = read_record(run.dir()).unwrap();
        assert_eq!(rec.results, vec![image(1), image(2)]);
        assert_eq!(rec.status, RunStatus::InProgress);
    }

    #[test]
    fn test_read_record_tolerates_garbage() {
        let dir = TempDir::new().unwrap();
        let run = handle(&dir);
        std::fs::write(run.record_path(), "{\"prompt\": 3").unwrap();
        assert_eq!(read_record(run.dir()), None);
        assert!(run.load().is_err());
    }
}
