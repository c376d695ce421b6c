//! Application controller.
//!
//! Owns every component as an explicit instance and enforces the
//! one-active-session invariant. Each user-triggered action catches its
//! errors here and reports them through the blocking `Notifier`; nothing in
//! this layer is fatal to the process.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use crate::capture::{CaptureHandle, SystemCapture};
use crate::conversation::engine::{ConversationEngine, LineGenerator};
use crate::conversation::scenarios::{self, ScenarioDefinition};
use crate::recorder::{format_elapsed, RecorderState, SessionRecorder};
use crate::settings::AppSettings;
use crate::speech::{SpeechBackend, SpeechSynthesizer};
use crate::storage::{self, ArtifactRecord, ArtifactStore, HistoryStore};
use crate::paths;

/// Blocking notification boundary for user-facing reports.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
    fn confirm(&self, message: &str) -> bool;
}

pub struct TarotApp {
    settings: AppSettings,
    capture: Option<CaptureHandle>,
    recorder: SessionRecorder,
    engine: ConversationEngine,
    speech: SpeechSynthesizer,
    store: ArtifactStore,
    history: HistoryStore,
    notifier: Arc<dyn Notifier>,
    selected_scenario: Option<&'static ScenarioDefinition>,
    conversation_active: bool,
}

impl TarotApp {
    pub fn new(
        settings: AppSettings,
        generator: Arc<dyn LineGenerator>,
        speech_backend: Arc<dyn SpeechBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let store = ArtifactStore::new(settings.output_dir_or_default());
        let history = HistoryStore::new(paths::app_data_dir().join("history.json"));
        let speech = SpeechSynthesizer::new(speech_backend);

        if let Err(e) = speech.apply_voice_settings(&settings.voice) {
            log::warn!("Voice preferences not applied: {}", e);
        }

        Self {
            settings,
            capture: None,
            recorder: SessionRecorder::new(),
            engine: ConversationEngine::new(generator),
            speech,
            store,
            history,
            notifier,
            selected_scenario: None,
            conversation_active: false,
        }
    }

    fn report(&self, context: &str, error: &str) {
        log::error!("{}: {}", context, error);
        self.notifier.notify(&format!("{}: {}", context, error));
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn selected_scenario(&self) -> Option<&'static ScenarioDefinition> {
        self.selected_scenario
    }

    pub fn recorder_state(&self) -> RecorderState {
        self.recorder.state()
    }

    pub fn capture_active(&self) -> bool {
        self.capture.as_ref().map(|c| c.is_active()).unwrap_or(false)
    }

    pub fn elapsed_watch(&self) -> watch::Receiver<u64> {
        self.recorder.elapsed_watch()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.recorder.elapsed_seconds()
    }

    /// Pick the client persona for the next session.
    pub fn select_scenario(&mut self, scenario_id: &str) {
        match scenarios::scenario(scenario_id) {
            Some(scenario) => {
                log::info!("Scenario selected: {} ({})", scenario.name, scenario.id);
                self.selected_scenario = Some(scenario);
            }
            None => self.report("Could not select scenario", &format!("unknown id: {}", scenario_id)),
        }
    }

    /// Acquire the microphone at the configured quality profile.
    pub fn start_capture(&mut self) {
        if self.capture_active() {
            self.notifier.notify("The microphone is already active.");
            return;
        }

        match SystemCapture::acquire(self.settings.capture_quality) {
            Ok(handle) => {
                let config = handle.negotiated();
                log::info!(
                    "Capture ready: {} Hz, {} channels",
                    config.sample_rate,
                    config.channels
                );
                self.capture = Some(handle);
            }
            Err(e) => self.report("Could not start the microphone", &e.to_string()),
        }
    }

    /// Release the microphone. Refused while a recording is in progress.
    pub fn stop_capture(&mut self) {
        if self.recorder.is_active() {
            self.notifier
                .notify("Stop the recording before releasing the microphone.");
            return;
        }

        if let Some(mut handle) = self.capture.take() {
            handle.release();
        }
    }

    /// Start recording and open the conversation: the client speaks its
    /// scripted opening line.
    pub async fn start_recording(&mut self) {
        let Some(scenario) = self.selected_scenario else {
            self.notifier.notify("Select a scenario before recording.");
            return;
        };

        let Some(capture) = &self.capture else {
            self.notifier.notify("Start the microphone before recording.");
            return;
        };

        if let Err(e) = self.recorder.start(capture.source()) {
            self.report("Could not start recording", &e.to_string());
            return;
        }

        if let Err(e) = self.engine.start(scenario.id) {
            self.report("Could not start the conversation", &e.to_string());
            return;
        }
        self.conversation_active = true;

        match self.engine.opening() {
            Ok(line) => {
                log::info!("Client: {}", line);
                if let Err(e) = self.speech.speak(&line).await {
                    self.report("Speech synthesis failed", &e.to_string());
                }
            }
            Err(e) => self.report("Could not open the conversation", &e.to_string()),
        }
    }

    /// Toggle pause/resume on the active recording.
    pub fn pause_recording(&mut self) {
        match self.recorder.pause() {
            Ok(true) => log::info!("Paused at {}", format_elapsed(self.recorder.elapsed_seconds())),
            Ok(false) => log::info!("Resumed"),
            Err(e) => self.report("Could not pause", &e.to_string()),
        }
    }

    /// Feed the teacher's spoken line to the engine and voice the client's
    /// reply. The engine guarantees a line on every path, connected or not.
    pub async fn next_turn(&mut self, teacher_line: &str) {
        if !self.conversation_active {
            self.notifier
                .notify("No conversation is active. Start a recording first.");
            return;
        }

        match self.engine.respond(teacher_line).await {
            Ok(line) => {
                log::info!(
                    "Client ({}): {}",
                    self.engine.stage().label(),
                    line
                );
                if let Err(e) = self.speech.speak(&line).await {
                    self.report("Speech synthesis failed", &e.to_string());
                }
            }
            Err(e) => self.report("Could not produce the next line", &e.to_string()),
        }
    }

    /// Cut the current utterance short. Silent success.
    pub fn skip_speech(&self) {
        self.speech.stop();
    }

    /// Stop the recording, save the artifact, record history.
    pub async fn stop_recording(&mut self) {
        self.speech.stop();
        self.conversation_active = false;

        let artifact = match self.recorder.stop().await {
            Ok(artifact) => artifact,
            Err(e) => {
                self.report("Could not stop recording", &e.to_string());
                return;
            }
        };

        let scenario_id = self.selected_scenario.map(|s| s.id);
        let filename = storage::build_filename(scenario_id, artifact.encoding.extension());

        match self.store.save(&self.settings, &artifact.bytes, &filename) {
            Ok(outcome) => {
                let record = ArtifactRecord {
                    filename: filename.clone(),
                    size_bytes: artifact.size_bytes,
                    duration_secs: artifact.duration_secs,
                    scenario: scenario_id.unwrap_or("general").to_string(),
                    storage: outcome.storage,
                    url: outcome.url.clone(),
                    timestamp: Utc::now(),
                };
                if let Err(e) = self.history.record(record) {
                    log::warn!("Failed to record history: {}", e);
                }

                self.notifier.notify(&format!(
                    "Recording saved: {} ({}, {})",
                    outcome.path.display(),
                    storage::format_file_size(artifact.size_bytes),
                    format_elapsed(artifact.duration_secs)
                ));
            }
            Err(e) => self.report("Could not save the recording", &e),
        }
    }

    pub fn history_entries(&self) -> Vec<ArtifactRecord> {
        self.history.list()
    }

    pub fn clear_history(&mut self) {
        if !self.notifier.confirm("Delete all recording history?") {
            return;
        }
        if let Err(e) = self.history.clear() {
            self.report("Could not clear history", &e);
        }
    }
}
