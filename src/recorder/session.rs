//! Recording session lifecycle.
//!
//! One session at a time: `start` negotiates an encoding, opens the session
//! WAV writer and spawns two tasks — a 100 ms chunk pump that drains the
//! capture source into the artifact, and a 1 s elapsed notifier published
//! over a watch channel. `pause` toggles both off and on. `stop` closes the
//! gate, waits for the pump's final drain, then finalizes the WAV file, so
//! no chunk can land after the artifact is sealed.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use hound::WavWriter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::capture::CaptureSource;
use crate::paths;

use super::encoding::{negotiate_encoding, RecordingEncoding};

/// Interval at which buffered samples are flushed into a chunk.
const CHUNK_INTERVAL: Duration = Duration::from_millis(100);

/// Interval of the elapsed-time notifier.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Errors from misusing or failing the recording lifecycle.
#[derive(Debug, Clone)]
pub enum RecorderError {
    AlreadyRecording,
    NotRecording,
    Create(String),
    Finalize(String),
}

impl std::fmt::Display for RecorderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderError::AlreadyRecording => {
                write!(f, "A recording is already in progress. Stop it before starting a new one.")
            }
            RecorderError::NotRecording => write!(f, "No recording is in progress."),
            RecorderError::Create(e) => write!(f, "Failed to create the session file: {}", e),
            RecorderError::Finalize(e) => write!(f, "Failed to finalize the recording: {}", e),
        }
    }
}

impl std::error::Error for RecorderError {}

/// Lifecycle state as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Paused,
}

/// One flushed fragment of the session.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub sample_count: usize,
    pub byte_len: usize,
}

/// The finalized recording.
#[derive(Debug)]
pub struct RecordingArtifact {
    pub bytes: Vec<u8>,
    pub encoding: RecordingEncoding,
    pub duration_secs: u64,
    pub size_bytes: u64,
    pub chunk_count: usize,
    pub wav_path: PathBuf,
}

type SharedWriter = Arc<Mutex<Option<WavWriter<std::io::BufWriter<std::fs::File>>>>>;

struct ActiveSession {
    session_id: Uuid,
    source: Arc<dyn CaptureSource>,
    encoding: RecordingEncoding,
    wav_path: PathBuf,
    writer: SharedWriter,
    chunks: Arc<Mutex<Vec<Chunk>>>,
    started_at: Instant,
    paused: Arc<AtomicBool>,
    cancel: CancellationToken,
    pump_task: JoinHandle<()>,
}

/// Owns the single active session and its tasks.
pub struct SessionRecorder {
    session: Option<ActiveSession>,
    elapsed_tx: Arc<watch::Sender<u64>>,
    elapsed_rx: watch::Receiver<u64>,
}

impl SessionRecorder {
    pub fn new() -> Self {
        let (elapsed_tx, elapsed_rx) = watch::channel(0);
        Self {
            session: None,
            elapsed_tx: Arc::new(elapsed_tx),
            elapsed_rx,
        }
    }

    pub fn state(&self) -> RecorderState {
        match &self.session {
            None => RecorderState::Idle,
            Some(session) => {
                if session.paused.load(Ordering::SeqCst) {
                    RecorderState::Paused
                } else {
                    RecorderState::Recording
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Chunks flushed so far in the active session, 0 when idle.
    pub fn chunk_count(&self) -> usize {
        self.session
            .as_ref()
            .map(|s| s.chunks.lock().unwrap().len())
            .unwrap_or(0)
    }

    /// Integer seconds since recording start, 0 if no session is active.
    /// Pauses are not subtracted; this is wall-clock session time.
    pub fn elapsed_seconds(&self) -> u64 {
        self.session
            .as_ref()
            .map(|s| s.started_at.elapsed().as_secs())
            .unwrap_or(0)
    }

    /// Subscription to the one-second elapsed notifier.
    pub fn elapsed_watch(&self) -> watch::Receiver<u64> {
        self.elapsed_rx.clone()
    }

    /// Begin recording from the given capture source.
    pub fn start(&mut self, source: Arc<dyn CaptureSource>) -> Result<(), RecorderError> {
        if self.session.is_some() {
            return Err(RecorderError::AlreadyRecording);
        }

        let config = source.negotiated();
        let encoding = negotiate_encoding(config.sample_format);
        let session_id = Uuid::new_v4();

        let wav_path = paths::generate_session_wav_path(session_id)
            .map_err(|e| RecorderError::Create(e.to_string()))?;

        let spec = encoding.wav_spec(config.sample_rate, config.channels);
        let writer = WavWriter::create(&wav_path, spec)
            .map_err(|e| RecorderError::Create(e.to_string()))?;
        let writer: SharedWriter = Arc::new(Mutex::new(Some(writer)));

        let chunks = Arc::new(Mutex::new(Vec::new()));
        let paused = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();

        // Any samples the source buffers from here on belong to this session.
        source.drain();
        source.set_gate(true);

        let pump_task = spawn_chunk_pump(
            source.clone(),
            writer.clone(),
            chunks.clone(),
            paused.clone(),
            encoding,
            cancel.clone(),
        );

        spawn_elapsed_notifier(
            self.elapsed_tx.clone(),
            paused.clone(),
            cancel.clone(),
        );

        let _ = self.elapsed_tx.send(0);

        log::info!(
            "Recording started: session={}, encoding={}, {:?}",
            session_id,
            encoding,
            wav_path
        );

        self.session = Some(ActiveSession {
            session_id,
            source,
            encoding,
            wav_path,
            writer,
            chunks,
            started_at: Instant::now(),
            paused,
            cancel,
            pump_task,
        });

        Ok(())
    }

    /// Toggle pause on a single call: pauses an active recording, resumes a
    /// paused one. Returns whether the session is now paused.
    pub fn pause(&mut self) -> Result<bool, RecorderError> {
        let session = self.session.as_ref().ok_or(RecorderError::NotRecording)?;

        let now_paused = !session.paused.load(Ordering::SeqCst);
        session.paused.store(now_paused, Ordering::SeqCst);
        session.source.set_gate(!now_paused);

        if now_paused {
            log::info!("Recording paused: session={}", session.session_id);
        } else {
            log::info!("Recording resumed: session={}", session.session_id);
        }

        Ok(now_paused)
    }

    /// Stop the session (recording or paused) and finalize the artifact.
    ///
    /// Completion is only reported once the chunk pump has drained the last
    /// buffered samples and the WAV writer has been sealed, so no chunk
    /// arrives after the returned artifact.
    pub async fn stop(&mut self) -> Result<RecordingArtifact, RecorderError> {
        let session = self.session.take().ok_or(RecorderError::NotRecording)?;

        session.source.set_gate(false);
        session.cancel.cancel();

        if let Err(e) = session.pump_task.await {
            log::warn!("Chunk pump ended abnormally: {}", e);
        }

        let duration_secs = session.started_at.elapsed().as_secs();

        {
            let mut guard = session.writer.lock().unwrap();
            if let Some(writer) = guard.take() {
                writer
                    .finalize()
                    .map_err(|e| RecorderError::Finalize(e.to_string()))?;
            }
        }

        let bytes = tokio::fs::read(&session.wav_path)
            .await
            .map_err(|e| RecorderError::Finalize(e.to_string()))?;

        let size_bytes = bytes.len() as u64;
        let chunk_count = session.chunks.lock().unwrap().len();

        let _ = self.elapsed_tx.send(duration_secs);

        log::info!(
            "Recording stopped: session={}, {}s, {} bytes, {} chunks",
            session.session_id,
            duration_secs,
            size_bytes,
            chunk_count
        );

        match paths::cleanup_old_sessions() {
            Ok(count) if count > 0 => log::info!("Cleaned up {} old session files", count),
            Ok(_) => {}
            Err(e) => log::warn!("Failed to clean up old session files: {}", e),
        }

        Ok(RecordingArtifact {
            bytes,
            encoding: session.encoding,
            duration_secs,
            size_bytes,
            chunk_count,
            wav_path: session.wav_path,
        })
    }
}

impl Default for SessionRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Format elapsed seconds as MM:SS for display.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn spawn_chunk_pump(
    source: Arc<dyn CaptureSource>,
    writer: SharedWriter,
    chunks: Arc<Mutex<Vec<Chunk>>>,
    paused: Arc<AtomicBool>,
    encoding: RecordingEncoding,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHUNK_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    flush_pending(&source, &writer, &chunks, &paused, encoding);
                }
                _ = cancel.cancelled() => {
                    // Final drain: the gate is already closed, this picks up
                    // whatever was buffered before the close.
                    flush_pending(&source, &writer, &chunks, &paused, encoding);
                    break;
                }
            }
        }
        log::debug!("Chunk pump stopped");
    })
}

fn spawn_elapsed_notifier(
    elapsed_tx: Arc<watch::Sender<u64>>,
    paused: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let started_at = Instant::now();
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // The notifier halts while paused; session time keeps
                    // running on the wall clock.
                    if !paused.load(Ordering::SeqCst) {
                        let _ = elapsed_tx.send(started_at.elapsed().as_secs());
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
        log::debug!("Elapsed notifier stopped");
    });
}

fn flush_pending(
    source: &Arc<dyn CaptureSource>,
    writer: &SharedWriter,
    chunks: &Arc<Mutex<Vec<Chunk>>>,
    paused: &Arc<AtomicBool>,
    encoding: RecordingEncoding,
) {
    if paused.load(Ordering::SeqCst) {
        return;
    }

    let samples = source.drain();
    if samples.is_empty() {
        return;
    }

    let mut guard = writer.lock().unwrap();
    if let Some(writer) = guard.as_mut() {
        match encoding {
            RecordingEncoding::Pcm16 => {
                for &sample in &samples {
                    let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                    if writer.write_sample(value).is_err() {
                        log::error!("Failed to write sample");
                        break;
                    }
                }
            }
            RecordingEncoding::Float32 => {
                for &sample in &samples {
                    if writer.write_sample(sample).is_err() {
                        log::error!("Failed to write sample");
                        break;
                    }
                }
            }
        }
    }
    drop(guard);

    let mut chunk_list = chunks.lock().unwrap();
    let index = chunk_list.len();
    chunk_list.push(Chunk {
        index,
        sample_count: samples.len(),
        byte_len: samples.len() * encoding.bytes_per_sample(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(65), "01:05");
        assert_eq!(format_elapsed(600), "10:00");
    }

    #[test]
    fn test_recorder_starts_idle() {
        let recorder = SessionRecorder::new();
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert_eq!(recorder.elapsed_seconds(), 0);
        assert_eq!(recorder.chunk_count(), 0);
    }

    #[test]
    fn test_pause_without_session_is_state_misuse() {
        let mut recorder = SessionRecorder::new();
        assert!(matches!(
            recorder.pause(),
            Err(RecorderError::NotRecording)
        ));
    }
}
