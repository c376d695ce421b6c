//! System speech synthesis via the `tts` crate.
//!
//! Wraps the platform synthesizer (speech-dispatcher on Linux,
//! AVSpeechSynthesizer on macOS, SAPI/WinRT on Windows). The crate exposes
//! speak/stop but no pause, so pause/resume report `Unsupported`.

use std::sync::Mutex;

use super::{SpeechBackend, SpeechError, VoiceInfo};

pub struct PlatformSpeech {
    tts: Mutex<tts::Tts>,
}

impl PlatformSpeech {
    pub fn new() -> Result<Self, SpeechError> {
        let tts = tts::Tts::default().map_err(|e| SpeechError::Init(e.to_string()))?;
        Ok(Self {
            tts: Mutex::new(tts),
        })
    }
}

fn backend_err(e: tts::Error) -> SpeechError {
    SpeechError::Backend(e.to_string())
}

impl SpeechBackend for PlatformSpeech {
    fn voices(&self) -> Result<Vec<VoiceInfo>, SpeechError> {
        let tts = self.tts.lock().unwrap();
        let voices = tts.voices().map_err(backend_err)?;
        Ok(voices
            .into_iter()
            .map(|voice| VoiceInfo {
                id: voice.id(),
                name: voice.name(),
                language: voice.language().to_string(),
            })
            .collect())
    }

    fn select_voice(&self, voice_id: &str) -> Result<(), SpeechError> {
        let mut tts = self.tts.lock().unwrap();
        let voices = tts.voices().map_err(backend_err)?;
        let voice = voices
            .iter()
            .find(|v| v.id() == voice_id)
            .ok_or_else(|| SpeechError::UnknownVoice(voice_id.to_string()))?;
        tts.set_voice(voice).map(|_| ()).map_err(backend_err)
    }

    fn configure(&self, rate: f32, pitch: f32, volume: f32) -> Result<(), SpeechError> {
        let mut tts = self.tts.lock().unwrap();

        // The crate's scales are platform-specific; the settings values are
        // multipliers of each scale's normal point.
        let scaled_rate = (tts.normal_rate() * rate).clamp(tts.min_rate(), tts.max_rate());
        tts.set_rate(scaled_rate).map(|_| ()).map_err(backend_err)?;

        let scaled_pitch = (tts.normal_pitch() * pitch).clamp(tts.min_pitch(), tts.max_pitch());
        tts.set_pitch(scaled_pitch).map(|_| ()).map_err(backend_err)?;

        let scaled_volume =
            (tts.normal_volume() * volume).clamp(tts.min_volume(), tts.max_volume());
        tts.set_volume(scaled_volume).map(|_| ()).map_err(backend_err)?;

        Ok(())
    }

    fn begin(&self, text: &str) -> Result<(), SpeechError> {
        let mut tts = self.tts.lock().unwrap();
        tts.speak(text, false).map(|_| ()).map_err(backend_err)
    }

    fn is_speaking(&self) -> Result<bool, SpeechError> {
        let tts = self.tts.lock().unwrap();
        tts.is_speaking().map_err(backend_err)
    }

    fn stop(&self) -> Result<(), SpeechError> {
        let mut tts = self.tts.lock().unwrap();
        tts.stop().map(|_| ()).map_err(backend_err)
    }

    fn pause(&self) -> Result<(), SpeechError> {
        Err(SpeechError::Unsupported("pause"))
    }

    fn resume(&self) -> Result<(), SpeechError> {
        Err(SpeechError::Unsupported("resume"))
    }
}
