//! Artifact saving.
//!
//! Local save writes the artifact atomically into the output directory.
//! The two remote targets are recognized but unimplemented; both delegate
//! to local save and the outcome reports the target actually used.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::settings::AppSettings;

const DEFAULT_SCENARIO: &str = "general";

/// Where a finished recording should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageTarget {
    #[default]
    Local,
    #[serde(rename = "googledrive")]
    GoogleDrive,
    #[serde(rename = "aws")]
    Aws,
}

impl StorageTarget {
    pub fn label(&self) -> &'static str {
        match self {
            StorageTarget::Local => "local",
            StorageTarget::GoogleDrive => "googledrive",
            StorageTarget::Aws => "aws",
        }
    }
}

impl std::fmt::Display for StorageTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Result of a save, tagged with the target actually used.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub storage: StorageTarget,
    pub url: Option<String>,
    pub path: PathBuf,
}

/// Saves artifacts into one output directory.
pub struct ArtifactStore {
    output_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    /// Save artifact bytes under the given filename, routed by the settings'
    /// storage target. Remote targets always fall back to a local save.
    pub fn save(
        &self,
        settings: &AppSettings,
        bytes: &[u8],
        filename: &str,
    ) -> Result<SaveOutcome, String> {
        match settings.storage_target {
            StorageTarget::GoogleDrive => {
                if !settings.google_drive.is_configured() {
                    log::error!("Google Drive settings are incomplete");
                }
                log::warn!("Google Drive upload is not implemented; saving locally instead");
                self.save_local(bytes, filename)
            }
            StorageTarget::Aws => {
                if !settings.aws.is_configured() {
                    log::error!("AWS settings are incomplete");
                }
                log::warn!("S3 upload is not implemented; saving locally instead");
                self.save_local(bytes, filename)
            }
            StorageTarget::Local => self.save_local(bytes, filename),
        }
    }

    fn save_local(&self, bytes: &[u8], filename: &str) -> Result<SaveOutcome, String> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| format!("Failed to create output directory {:?}: {}", self.output_dir, e))?;

        let path = self.output_dir.join(filename);

        // Write atomically: temp file in the same directory, then rename, so
        // a crash mid-write never leaves a truncated recording behind.
        let tmp_path = self.output_dir.join(format!("{}.tmp", filename));
        std::fs::write(&tmp_path, bytes)
            .map_err(|e| format!("Write temp artifact {:?}: {}", tmp_path, e))?;

        // On Unix, rename will atomically replace the destination. On Windows,
        // rename fails if the destination exists, so we remove it first
        // (ignoring NotFound).
        if cfg!(windows) && path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(format!("Remove existing artifact {:?}: {}", path, e));
                }
            }
        }

        std::fs::rename(&tmp_path, &path)
            .map_err(|e| format!("Rename temp artifact {:?} to {:?}: {}", tmp_path, path, e))?;

        log::info!("Recording saved: {:?} ({} bytes)", path, bytes.len());

        Ok(SaveOutcome {
            storage: StorageTarget::Local,
            url: None,
            path,
        })
    }
}

/// Deterministic artifact filename:
/// `tarot-session-<scenario>-<YYYYMMDD>-<HHMMSS>.<ext>`.
pub fn build_filename(scenario_id: Option<&str>, extension: &str) -> String {
    build_filename_at(scenario_id, extension, chrono::Local::now().naive_local())
}

/// Fixed-clock variant of `build_filename`.
pub fn build_filename_at(
    scenario_id: Option<&str>,
    extension: &str,
    timestamp: NaiveDateTime,
) -> String {
    let scenario = scenario_id
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_SCENARIO);

    format!(
        "tarot-session-{}-{}-{}.{}",
        scenario,
        timestamp.format("%Y%m%d"),
        timestamp.format("%H%M%S"),
        extension
    )
}

/// Human-readable file size with 1024-based units.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    let rounded = (size * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{} {}", rounded as u64, UNITS[unit])
    } else {
        format!("{} {}", rounded, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_filename_pattern_is_deterministic() {
        assert_eq!(
            build_filename_at(Some("love"), "wav", fixed_timestamp()),
            "tarot-session-love-20240305-143000.wav"
        );
    }

    #[test]
    fn test_filename_scenario_defaults_to_general() {
        assert_eq!(
            build_filename_at(None, "wav", fixed_timestamp()),
            "tarot-session-general-20240305-143000.wav"
        );
        assert_eq!(
            build_filename_at(Some(""), "wav", fixed_timestamp()),
            "tarot-session-general-20240305-143000.wav"
        );
    }

    #[test]
    fn test_storage_target_serialization_tags() {
        assert_eq!(
            serde_json::to_string(&StorageTarget::GoogleDrive).unwrap(),
            "\"googledrive\""
        );
        assert_eq!(serde_json::to_string(&StorageTarget::Aws).unwrap(), "\"aws\"");
        assert_eq!(
            serde_json::to_string(&StorageTarget::Local).unwrap(),
            "\"local\""
        );
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1024 * 1024), "1 MB");
    }
}
