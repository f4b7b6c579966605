//! File persistence helpers.
//!
//! Writes go to a sibling temp file which is then renamed over the target,
//! so an interrupted process leaves either the old or the new contents.
//! Reads are tolerant: a missing or unparseable file is `None`.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "file".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Replace `path` with `contents` via temp file + rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let tmp = temp_path(path);
    {
        let mut file = File::create(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        file.write_all(contents)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync {}", tmp.display()))?;
    }

    fs::rename(&tmp, path).with_context(|| {
        format!("Failed to move {} into place at {}", tmp.display(), path.display())
    })
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    json.push('\n');
    write_atomic(path, json.as_bytes())
}

/// Read and parse a JSON file, treating any failure as absence.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "unreadable file, ignoring");
            }
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "invalid JSON, ignoring");
            None
        }
    }
}
