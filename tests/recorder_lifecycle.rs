//! Integration tests for the recording lifecycle.
//!
//! A mock capture source stands in for the microphone: it hands out a fixed
//! block of samples per drain while its gate is open. The suites cover the
//! state machine (illegal transitions fail, pause is a toggle), chunk
//! accumulation around pauses, and finalization into a real WAV artifact.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::SampleFormat;

use tarot_recorder::capture::{CaptureSource, NegotiatedConfig};
use tarot_recorder::recorder::{
    RecorderError, RecorderState, RecordingEncoding, SessionRecorder,
};

struct MockCaptureSource {
    config: NegotiatedConfig,
    gate: AtomicBool,
}

impl MockCaptureSource {
    fn new(sample_format: SampleFormat) -> Arc<Self> {
        Arc::new(Self {
            config: NegotiatedConfig {
                sample_rate: 44_100,
                channels: 1,
                sample_format,
            },
            gate: AtomicBool::new(false),
        })
    }
}

impl CaptureSource for MockCaptureSource {
    fn negotiated(&self) -> NegotiatedConfig {
        self.config
    }

    fn set_gate(&self, open: bool) {
        self.gate.store(open, Ordering::SeqCst);
    }

    fn drain(&self) -> Vec<f32> {
        if self.gate.load(Ordering::SeqCst) {
            vec![0.1_f32; 441]
        } else {
            Vec::new()
        }
    }
}

// ============================================================================
// State misuse
// ============================================================================

#[tokio::test]
async fn stop_without_start_is_a_state_misuse_error() {
    let mut recorder = SessionRecorder::new();
    assert!(matches!(
        recorder.stop().await,
        Err(RecorderError::NotRecording)
    ));
    assert_eq!(recorder.state(), RecorderState::Idle);
    assert_eq!(recorder.chunk_count(), 0);
}

#[tokio::test]
async fn pause_without_start_is_a_state_misuse_error() {
    let mut recorder = SessionRecorder::new();
    assert!(matches!(recorder.pause(), Err(RecorderError::NotRecording)));
}

#[tokio::test]
async fn starting_twice_is_refused() {
    let source = MockCaptureSource::new(SampleFormat::F32);
    let mut recorder = SessionRecorder::new();

    recorder.start(source.clone()).unwrap();
    assert!(matches!(
        recorder.start(source),
        Err(RecorderError::AlreadyRecording)
    ));

    recorder.stop().await.unwrap();
}

// ============================================================================
// Pause toggle
// ============================================================================

#[tokio::test]
async fn pause_twice_returns_to_recording() {
    let source = MockCaptureSource::new(SampleFormat::F32);
    let mut recorder = SessionRecorder::new();
    recorder.start(source).unwrap();

    assert_eq!(recorder.state(), RecorderState::Recording);
    assert!(recorder.pause().unwrap());
    assert_eq!(recorder.state(), RecorderState::Paused);
    assert!(!recorder.pause().unwrap());
    assert_eq!(recorder.state(), RecorderState::Recording);

    recorder.stop().await.unwrap();
}

#[tokio::test]
async fn chunks_do_not_accumulate_while_paused() {
    let source = MockCaptureSource::new(SampleFormat::F32);
    let mut recorder = SessionRecorder::new();
    recorder.start(source).unwrap();

    tokio::time::sleep(Duration::from_millis(350)).await;
    let before_pause = recorder.chunk_count();
    assert!(before_pause > 0, "no chunks while recording");

    recorder.pause().unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(recorder.chunk_count(), before_pause);

    recorder.pause().unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(recorder.chunk_count() > before_pause, "no chunks after resume");

    recorder.stop().await.unwrap();
}

// ============================================================================
// Finalization
// ============================================================================

#[tokio::test]
async fn stop_finalizes_a_wav_artifact() {
    let source = MockCaptureSource::new(SampleFormat::F32);
    let mut recorder = SessionRecorder::new();
    recorder.start(source).unwrap();

    tokio::time::sleep(Duration::from_millis(350)).await;
    let artifact = recorder.stop().await.unwrap();

    // Float device negotiates the float WAV encoding.
    assert_eq!(artifact.encoding, RecordingEncoding::Float32);
    assert_eq!(artifact.encoding.extension(), "wav");
    assert!(artifact.chunk_count > 0);
    assert_eq!(artifact.size_bytes, artifact.bytes.len() as u64);
    assert!(
        artifact.bytes.starts_with(b"RIFF"),
        "artifact is not a WAV container"
    );

    // The recorder is idle again; no further chunks exist.
    assert_eq!(recorder.state(), RecorderState::Idle);
    assert_eq!(recorder.chunk_count(), 0);
    assert_eq!(recorder.elapsed_seconds(), 0);
}

#[tokio::test]
async fn integer_devices_negotiate_pcm16() {
    let source = MockCaptureSource::new(SampleFormat::I16);
    let mut recorder = SessionRecorder::new();
    recorder.start(source).unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    let artifact = recorder.stop().await.unwrap();

    assert_eq!(artifact.encoding, RecordingEncoding::Pcm16);
    assert!(artifact.bytes.starts_with(b"RIFF"));
}

#[tokio::test]
async fn stop_works_from_paused() {
    let source = MockCaptureSource::new(SampleFormat::F32);
    let mut recorder = SessionRecorder::new();
    recorder.start(source).unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    recorder.pause().unwrap();

    let artifact = recorder.stop().await.unwrap();
    assert!(artifact.chunk_count > 0);
    assert_eq!(recorder.state(), RecorderState::Idle);
}

// ============================================================================
// Elapsed time
// ============================================================================

#[tokio::test]
async fn elapsed_notifier_reports_whole_seconds() {
    let source = MockCaptureSource::new(SampleFormat::F32);
    let mut recorder = SessionRecorder::new();
    let mut elapsed = recorder.elapsed_watch();

    recorder.start(source).unwrap();
    tokio::time::sleep(Duration::from_millis(1300)).await;

    assert!(recorder.elapsed_seconds() >= 1);
    // The watch channel has seen at least the one-second tick.
    let _ = elapsed.changed().await;
    assert!(*elapsed.borrow() <= recorder.elapsed_seconds());

    recorder.stop().await.unwrap();
}
