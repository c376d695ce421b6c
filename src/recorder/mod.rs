//! Recording session module
//!
//! Accumulates capture chunks into a WAV artifact with pause/resume and a
//! one-second elapsed notifier. Uses hound for WAV encoding.

mod encoding;
mod session;

pub use encoding::{negotiate_encoding, RecordingEncoding, DEFAULT_ENCODING, ENCODING_PREFERENCE};
pub use session::{
    format_elapsed, Chunk, RecorderError, RecorderState, RecordingArtifact, SessionRecorder,
};
