//! Application settings.
//!
//! One JSON file, parsed once at startup into a typed struct with explicit
//! defaults per field. A missing or malformed file yields the defaults;
//! saving is atomic so a crash mid-write can't corrupt the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::capture::QualityProfile;
use crate::paths;
use crate::storage::StorageTarget;

const SETTINGS_FILE_NAME: &str = "settings.json";

/// Voice preferences for the synthesized client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Installed voice to use, by name or id. None picks by language.
    pub name: Option<String>,

    /// Language prefix used to pick a voice when none is named.
    pub language: String,

    /// Speaking rate as a multiplier of the voice's normal rate.
    pub rate: f32,

    pub pitch: f32,
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            name: None,
            language: "en".to_string(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleDriveSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl GoogleDriveSettings {
    pub fn is_configured(&self) -> bool {
        fn present(value: &Option<String>) -> bool {
            value.as_deref().map(|v| !v.is_empty()).unwrap_or(false)
        }
        present(&self.client_id) && present(&self.client_secret)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsSettings {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
    pub bucket: Option<String>,
}

impl AwsSettings {
    pub fn is_configured(&self) -> bool {
        fn present(value: &Option<String>) -> bool {
            value.as_deref().map(|v| !v.is_empty()).unwrap_or(false)
        }
        present(&self.access_key)
            && present(&self.secret_key)
            && present(&self.region)
            && present(&self.bucket)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Microphone quality profile requested at acquire time.
    pub capture_quality: QualityProfile,

    /// Where finished recordings go. Remote targets currently fall back to
    /// a local save.
    pub storage_target: StorageTarget,

    /// Directory for saved recordings. None uses the platform default.
    pub output_dir: Option<PathBuf>,

    pub voice: VoiceSettings,

    /// Gemini API key override. The environment variable wins over this,
    /// and the OS keyring is consulted last.
    pub gemini_api_key: Option<String>,

    pub google_drive: GoogleDriveSettings,
    pub aws: AwsSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            capture_quality: QualityProfile::Medium,
            storage_target: StorageTarget::Local,
            output_dir: None,
            voice: VoiceSettings::default(),
            gemini_api_key: None,
            google_drive: GoogleDriveSettings::default(),
            aws: AwsSettings::default(),
        }
    }
}

impl AppSettings {
    pub fn output_dir_or_default(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(paths::default_output_dir)
    }
}

fn settings_path() -> PathBuf {
    paths::app_config_dir().join(SETTINGS_FILE_NAME)
}

pub fn load_settings() -> AppSettings {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &Path) -> AppSettings {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<AppSettings>(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Settings: failed to parse {:?}: {}", path, e);
                AppSettings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppSettings::default(),
        Err(e) => {
            log::warn!("Settings: failed to read {:?}: {}", path, e);
            AppSettings::default()
        }
    }
}

pub fn save_settings(settings: &AppSettings) -> Result<(), String> {
    save_settings_to(&settings_path(), settings)
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory {:?}: {}", parent, e))?;
    }

    let contents =
        serde_json::to_string_pretty(settings).map_err(|e| format!("Serialize settings: {}", e))?;

    // Write atomically: write to a temp file in the same directory, then rename.
    // This prevents partial/corrupt settings.json if the app crashes mid-write.
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &contents)
        .map_err(|e| format!("Write temp settings {:?}: {}", tmp_path, e))?;

    // On Unix, rename will atomically replace the destination. On Windows, rename
    // fails if the destination exists, so we remove it first (ignoring NotFound).
    if cfg!(windows) && path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(format!("Remove existing settings file {:?}: {}", path, e));
            }
        }
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| format!("Rename temp settings {:?} to {:?}: {}", tmp_path, path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.capture_quality, QualityProfile::Medium);
        assert_eq!(settings.storage_target, StorageTarget::Local);
        assert_eq!(settings.voice.language, "en");
        assert!((settings.voice.rate - 1.0).abs() < f32::EPSILON);
        assert!(settings.gemini_api_key.is_none());
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("settings.json"));
        assert_eq!(settings.storage_target, StorageTarget::Local);
    }

    #[test]
    fn test_malformed_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "]]]").unwrap();

        let settings = load_settings_from(&path);
        assert_eq!(settings.capture_quality, QualityProfile::Medium);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"capture_quality":"high"}"#).unwrap();

        let settings = load_settings_from(&path);
        assert_eq!(settings.capture_quality, QualityProfile::High);
        assert_eq!(settings.storage_target, StorageTarget::Local);
        assert_eq!(settings.voice.language, "en");
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = AppSettings::default();
        settings.capture_quality = QualityProfile::Low;
        settings.storage_target = StorageTarget::Aws;
        settings.voice.name = Some("Test Voice".to_string());

        save_settings_to(&path, &settings).unwrap();
        let reloaded = load_settings_from(&path);

        assert_eq!(reloaded.capture_quality, QualityProfile::Low);
        assert_eq!(reloaded.storage_target, StorageTarget::Aws);
        assert_eq!(reloaded.voice.name.as_deref(), Some("Test Voice"));
    }

    #[test]
    fn test_aws_configuration_requires_all_fields() {
        let mut aws = AwsSettings::default();
        assert!(!aws.is_configured());

        aws.access_key = Some("key".to_string());
        aws.secret_key = Some("secret".to_string());
        aws.region = Some("eu-north-1".to_string());
        assert!(!aws.is_configured());

        aws.bucket = Some("recordings".to_string());
        assert!(aws.is_configured());
    }
}
