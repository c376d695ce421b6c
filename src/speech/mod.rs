//! Client voice synthesis
//!
//! `SpeechSynthesizer` drives a `SpeechBackend`: it applies the configured
//! voice, speaks a line and resolves once the utterance has finished, and
//! treats interruption as silent success. The platform backend wraps the
//! system synthesizer; `NullSpeech` stands in when none is available so the
//! session never stalls on missing audio output.

mod platform;

pub use platform::PlatformSpeech;

use std::sync::Arc;
use std::time::Duration;

use crate::settings::VoiceSettings;

/// How often speak() polls the backend for utterance completion.
const COMPLETION_POLL: Duration = Duration::from_millis(100);

/// Errors from the speech layer.
#[derive(Debug, Clone)]
pub enum SpeechError {
    Init(String),
    Backend(String),
    UnknownVoice(String),
    Unsupported(&'static str),
}

impl std::fmt::Display for SpeechError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeechError::Init(e) => write!(f, "Failed to initialize speech synthesis: {}", e),
            SpeechError::Backend(e) => write!(f, "Speech synthesis error: {}", e),
            SpeechError::UnknownVoice(name) => write!(f, "No installed voice matches \"{}\"", name),
            SpeechError::Unsupported(op) => {
                write!(f, "The speech backend does not support {}", op)
            }
        }
    }
}

impl std::error::Error for SpeechError {}

/// An installed synthesizer voice.
#[derive(Debug, Clone)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
    pub language: String,
}

/// Synthesis capability behind the synthesizer.
pub trait SpeechBackend: Send + Sync {
    fn voices(&self) -> Result<Vec<VoiceInfo>, SpeechError>;
    fn select_voice(&self, voice_id: &str) -> Result<(), SpeechError>;
    fn configure(&self, rate: f32, pitch: f32, volume: f32) -> Result<(), SpeechError>;

    /// Start speaking; returns once the utterance is queued.
    fn begin(&self, text: &str) -> Result<(), SpeechError>;
    fn is_speaking(&self) -> Result<bool, SpeechError>;
    fn stop(&self) -> Result<(), SpeechError>;
    fn pause(&self) -> Result<(), SpeechError>;
    fn resume(&self) -> Result<(), SpeechError>;
}

/// No-op backend used when the platform synthesizer can't be initialized.
pub struct NullSpeech;

impl SpeechBackend for NullSpeech {
    fn voices(&self) -> Result<Vec<VoiceInfo>, SpeechError> {
        Ok(Vec::new())
    }

    fn select_voice(&self, _voice_id: &str) -> Result<(), SpeechError> {
        Ok(())
    }

    fn configure(&self, _rate: f32, _pitch: f32, _volume: f32) -> Result<(), SpeechError> {
        Ok(())
    }

    fn begin(&self, text: &str) -> Result<(), SpeechError> {
        log::debug!("Speech synthesis unavailable; skipping utterance ({} chars)", text.len());
        Ok(())
    }

    fn is_speaking(&self) -> Result<bool, SpeechError> {
        Ok(false)
    }

    fn stop(&self) -> Result<(), SpeechError> {
        Ok(())
    }

    fn pause(&self) -> Result<(), SpeechError> {
        Ok(())
    }

    fn resume(&self) -> Result<(), SpeechError> {
        Ok(())
    }
}

pub struct SpeechSynthesizer {
    backend: Arc<dyn SpeechBackend>,
}

impl SpeechSynthesizer {
    pub fn new(backend: Arc<dyn SpeechBackend>) -> Self {
        Self { backend }
    }

    pub fn voices(&self) -> Result<Vec<VoiceInfo>, SpeechError> {
        self.backend.voices()
    }

    /// Apply rate/pitch/volume and pick a voice: an explicitly named voice
    /// wins, otherwise the first voice matching the language preference,
    /// otherwise the backend default.
    pub fn apply_voice_settings(&self, voice: &VoiceSettings) -> Result<(), SpeechError> {
        self.backend
            .configure(voice.rate, voice.pitch, voice.volume)?;

        if let Some(name) = &voice.name {
            let voices = self.backend.voices()?;
            let found = voices
                .iter()
                .find(|v| &v.name == name || &v.id == name)
                .ok_or_else(|| SpeechError::UnknownVoice(name.clone()))?;
            self.backend.select_voice(&found.id)?;
            log::info!("Voice selected: {}", found.name);
            return Ok(());
        }

        let voices = self.backend.voices()?;
        if let Some(found) = voices.iter().find(|v| v.language.starts_with(&voice.language)) {
            self.backend.select_voice(&found.id)?;
            log::info!("Voice selected by language ({}): {}", voice.language, found.name);
        } else if let Some(first) = voices.first() {
            log::info!("No {} voice installed; keeping default: {}", voice.language, first.name);
        }

        Ok(())
    }

    /// Speak a line and resolve once the utterance finishes. An interrupted
    /// utterance (stop called mid-line) also resolves as success. Empty text
    /// resolves immediately.
    pub async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        // Cancel whatever is still being spoken.
        self.backend.stop()?;
        self.backend.begin(text)?;

        log::debug!("Speaking: {} chars", text.len());

        loop {
            tokio::time::sleep(COMPLETION_POLL).await;
            if !self.backend.is_speaking()? {
                break;
            }
        }

        Ok(())
    }

    /// Interrupt the current utterance. Failures are logged, not surfaced;
    /// interruption is silent success for the caller.
    pub fn stop(&self) {
        if let Err(e) = self.backend.stop() {
            log::warn!("Failed to stop speech: {}", e);
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.backend.is_speaking().unwrap_or(false)
    }

    pub fn pause(&self) -> Result<(), SpeechError> {
        self.backend.pause()
    }

    pub fn resume(&self) -> Result<(), SpeechError> {
        self.backend.resume()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Backend that "speaks" for a fixed number of polls.
    struct MockSpeech {
        speaking_polls: AtomicUsize,
        stopped: AtomicBool,
    }

    impl MockSpeech {
        fn new(polls: usize) -> Self {
            Self {
                speaking_polls: AtomicUsize::new(polls),
                stopped: AtomicBool::new(false),
            }
        }
    }

    impl SpeechBackend for MockSpeech {
        fn voices(&self) -> Result<Vec<VoiceInfo>, SpeechError> {
            Ok(vec![VoiceInfo {
                id: "v1".to_string(),
                name: "Test Voice".to_string(),
                language: "en-US".to_string(),
            }])
        }

        fn select_voice(&self, _voice_id: &str) -> Result<(), SpeechError> {
            Ok(())
        }

        fn configure(&self, _rate: f32, _pitch: f32, _volume: f32) -> Result<(), SpeechError> {
            Ok(())
        }

        fn begin(&self, _text: &str) -> Result<(), SpeechError> {
            self.stopped.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_speaking(&self) -> Result<bool, SpeechError> {
            if self.stopped.load(Ordering::SeqCst) {
                return Ok(false);
            }
            let left = self.speaking_polls.load(Ordering::SeqCst);
            if left == 0 {
                Ok(false)
            } else {
                self.speaking_polls.store(left - 1, Ordering::SeqCst);
                Ok(true)
            }
        }

        fn stop(&self) -> Result<(), SpeechError> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn pause(&self) -> Result<(), SpeechError> {
            Ok(())
        }

        fn resume(&self) -> Result<(), SpeechError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_speak_resolves_when_utterance_finishes() {
        let synth = SpeechSynthesizer::new(Arc::new(MockSpeech::new(3)));
        synth.speak("Hello there.").await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_text_resolves_immediately() {
        let synth = SpeechSynthesizer::new(Arc::new(MockSpeech::new(100)));
        synth.speak("   ").await.unwrap();
    }

    #[tokio::test]
    async fn test_null_backend_resolves_without_speaking() {
        let synth = SpeechSynthesizer::new(Arc::new(NullSpeech));
        synth.speak("Nothing will be heard.").await.unwrap();
        assert!(!synth.is_speaking());
    }

    #[tokio::test]
    async fn test_voice_selection_by_language_prefix() {
        let synth = SpeechSynthesizer::new(Arc::new(MockSpeech::new(0)));
        let settings = VoiceSettings {
            name: None,
            language: "en".to_string(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        };
        synth.apply_voice_settings(&settings).unwrap();
    }

    #[tokio::test]
    async fn test_unknown_named_voice_is_reported() {
        let synth = SpeechSynthesizer::new(Arc::new(MockSpeech::new(0)));
        let settings = VoiceSettings {
            name: Some("Missing Voice".to_string()),
            language: "en".to_string(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        };
        assert!(matches!(
            synth.apply_voice_settings(&settings),
            Err(SpeechError::UnknownVoice(_))
        ));
    }
}
