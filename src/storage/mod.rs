//! Seen-post cursor persisted between runs.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Id of the newest post handled by a previous run, if any.
    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Cursor: Failed to read {:?}", self.path))?;
        let id = raw.trim();
        Ok((!id.is_empty()).then(|| id.to_string()))
    }

    /// Replace the stored id. The file is swapped in whole, never left half-written.
    pub fn save(&self, id: &str) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Cursor: Failed to create temp file in {:?}", dir))?;
        tmp.write_all(id.as_bytes())
            .context("Cursor: Failed to write temp file")?;
        tmp.persist(&self.path)
            .with_context(|| format!("Cursor: Failed to replace {:?}", self.path))?;
        Ok(())
    }
}
