//! Style persistence.
//!
//! All styles live in one JSON object (`{"name": "description", ...}`) at a
//! user-scoped path. Every mutation rewrites the file immediately.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::error::FluxError;
use crate::models::{Style, NO_STYLE};
use crate::persist;

/// Name→description store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct StyleStore {
    path: PathBuf,
}

impl StyleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents; a missing or invalid file reads as empty.
    fn load(&self) -> BTreeMap<String, String> {
        persist::read_json(&self.path).unwrap_or_default()
    }

    /// Insert or replace a style. `none` in any case is refused since
    /// `--style none` could never select it.
    pub fn save(&self, name: &str, description: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FluxError::EmptyStyleName.into());
        }
        if name.eq_ignore_ascii_case(NO_STYLE) {
            return Err(FluxError::ReservedStyleName(name.to_string()).into());
        }

        let mut styles = self.load();
        let replaced = styles
            .insert(name.to_string(), description.to_string())
            .is_some();
        persist::write_json(&self.path, &styles)?;

        tracing::debug!(name, replaced, path = %self.path.display(), "saved style");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.load().remove(name.trim())
    }

    /// All styles, sorted by name.
    pub fn list(&self) -> Vec<Style> {
        self.load()
            .into_iter()
            .map(|(name, description)| Style { name, description })
            .collect()
    }

    /// Remove a style. Returns whether it existed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let mut styles = self.load();
        if styles.remove(name.trim()).is_none() {
            return Ok(false);
        }
        persist::write_json(&self.path, &styles)?;
        Ok(true)
    }
}
