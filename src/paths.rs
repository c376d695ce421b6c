//! XDG path helpers for settings, history, and session temp files
//!
//! Session audio is staged in: ~/.local/share/tarot-recorder/temp/sessions/

use std::fs;
use std::path::PathBuf;

use uuid::Uuid;

pub const APP_DIR_NAME: &str = "tarot-recorder";

const MAX_SESSION_FILES: usize = 5;

/// Get the app config directory path.
/// Returns: ~/.config/tarot-recorder/
pub fn app_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Get the app data directory path.
/// Returns: ~/.local/share/tarot-recorder/
pub fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Directory where in-progress session audio is staged before saving.
fn session_temp_dir() -> PathBuf {
    app_data_dir().join("temp").join("sessions")
}

/// Default directory for saved recordings when the settings don't override it.
pub fn default_output_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| app_data_dir().join("recordings"))
}

/// Create the session temp directory if it doesn't exist.
pub fn create_session_temp_dir() -> std::io::Result<PathBuf> {
    let dir = session_temp_dir();
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Generate a unique WAV file path for a recording session.
/// Format: <timestamp>_<uuid>.wav
pub fn generate_session_wav_path(session_id: Uuid) -> std::io::Result<PathBuf> {
    let dir = create_session_temp_dir()?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let filename = format!("{}_{}.wav", timestamp, session_id);
    Ok(dir.join(filename))
}

/// Clean up old session files, keeping only the most recent N.
pub fn cleanup_old_sessions() -> std::io::Result<usize> {
    let dir = session_temp_dir();
    if !dir.exists() {
        return Ok(0);
    }

    let mut entries: Vec<_> = fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "wav")
                .unwrap_or(false)
        })
        .collect();

    if entries.len() <= MAX_SESSION_FILES {
        return Ok(0);
    }

    // Sort by modified time (oldest first)
    entries.sort_by(|a, b| {
        let time_a = a.metadata().and_then(|m| m.modified()).ok();
        let time_b = b.metadata().and_then(|m| m.modified()).ok();
        time_a.cmp(&time_b)
    });

    let to_delete = entries.len() - MAX_SESSION_FILES;
    let mut deleted = 0;

    for entry in entries.into_iter().take(to_delete) {
        if fs::remove_file(entry.path()).is_ok() {
            log::debug!("Cleaned up old session file: {:?}", entry.path());
            deleted += 1;
        }
    }

    Ok(deleted)
}
