//! Bounded recording history.
//!
//! One JSON file, newest first, capped at `MAX_HISTORY_ENTRIES`. A missing
//! or malformed file reads as an empty history; it is never a fatal error.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::store::StorageTarget;

/// Maximum number of history entries to retain
pub const MAX_HISTORY_ENTRIES: usize = 50;

/// Metadata for one saved recording. Written once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub filename: String,
    pub size_bytes: u64,
    pub duration_secs: u64,
    pub scenario: String,
    pub storage: StorageTarget,
    pub url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// JSON-file-backed history list.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the history, newest first. Missing or unreadable state is an
    /// empty history.
    pub fn list(&self) -> Vec<ArtifactRecord> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str::<Vec<ArtifactRecord>>(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("History: failed to parse {:?}: {}", self.path, e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                log::warn!("History: failed to read {:?}: {}", self.path, e);
                Vec::new()
            }
        }
    }

    /// Prepend an entry, truncate to the cap, persist.
    pub fn record(&self, entry: ArtifactRecord) -> Result<(), String> {
        let mut entries = self.list();
        entries.insert(0, entry);
        entries.truncate(MAX_HISTORY_ENTRIES);
        self.persist(&entries)
    }

    /// Delete the whole history. Idempotent.
    pub fn clear(&self) -> Result<(), String> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!("Failed to clear history {:?}: {}", self.path, e)),
        }
    }

    fn persist(&self, entries: &[ArtifactRecord]) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create history directory {:?}: {}", parent, e))?;
        }

        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| format!("Serialize history: {}", e))?;

        // Same atomic temp-then-rename dance as the settings file.
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &contents)
            .map_err(|e| format!("Write temp history {:?}: {}", tmp_path, e))?;

        if cfg!(windows) && self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(format!("Remove existing history file {:?}: {}", self.path, e));
                }
            }
        }

        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| format!("Rename temp history {:?} to {:?}: {}", tmp_path, self.path, e))?;

        Ok(())
    }
}
