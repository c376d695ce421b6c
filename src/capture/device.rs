//! Microphone acquisition using CPAL
//!
//! `SystemCapture::acquire` opens the default input device at a quality
//! profile's ideal configuration (or the closest the device permits) and
//! starts the live stream. Samples only accumulate while the recording gate
//! is open, so an acquired handle can sit idle for preview/level checking
//! without buffering anything.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig, SupportedStreamConfig};

use super::quality::QualityProfile;

/// Errors that can occur while acquiring the microphone.
/// Each variant carries a human-readable cause; `Display` adds a remediation
/// hint for the user.
#[derive(Debug, Clone)]
pub enum CaptureError {
    NoInputDevice,
    PermissionDenied(String),
    DeviceBusy(String),
    ConfigUnsupported(String),
    Backend(String),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::NoInputDevice => write!(
                f,
                "No microphone found. Check that an input device is connected and enabled."
            ),
            CaptureError::PermissionDenied(e) => write!(
                f,
                "Microphone access was denied: {}. Allow microphone access for this application in your system settings.",
                e
            ),
            CaptureError::DeviceBusy(e) => write!(
                f,
                "The microphone is unavailable: {}. Close other applications that may be using it and try again.",
                e
            ),
            CaptureError::ConfigUnsupported(e) => write!(
                f,
                "The requested capture configuration is not supported: {}. Try a different quality profile.",
                e
            ),
            CaptureError::Backend(e) => write!(f, "Audio backend error: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Classify a backend-specific error message into the permission bucket when
/// the platform reports an access failure, otherwise keep it generic.
fn classify_backend_message(message: String) -> CaptureError {
    let lowered = message.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") || lowered.contains("access") {
        CaptureError::PermissionDenied(message)
    } else {
        CaptureError::Backend(message)
    }
}

/// The stream configuration actually granted by the device.
#[derive(Debug, Clone, Copy)]
pub struct NegotiatedConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
}

/// Source of captured samples, as seen by the recorder.
///
/// The system implementation buffers samples from the CPAL callback; tests
/// substitute a mock. `drain` hands back everything buffered since the last
/// call, in arrival order.
pub trait CaptureSource: Send + Sync {
    fn negotiated(&self) -> NegotiatedConfig;

    /// Open or close the recording gate. While closed, incoming samples are
    /// discarded.
    fn set_gate(&self, open: bool);

    /// Take all samples buffered since the last drain.
    fn drain(&self) -> Vec<f32>;
}

/// Shared state between the CPAL callback and the recorder's chunk pump.
struct SharedCapture {
    config: NegotiatedConfig,
    gate: AtomicBool,
    pending: Mutex<Vec<f32>>,
}

impl CaptureSource for SharedCapture {
    fn negotiated(&self) -> NegotiatedConfig {
        self.config
    }

    fn set_gate(&self, open: bool) {
        self.gate.store(open, Ordering::SeqCst);
    }

    fn drain(&self) -> Vec<f32> {
        let mut pending = self.pending.lock().unwrap();
        std::mem::take(&mut *pending)
    }
}

/// Handle to an acquired microphone.
/// Holds the live CPAL stream; dropping or releasing the handle stops it.
pub struct CaptureHandle {
    stream: Option<Stream>,
    shared: Arc<SharedCapture>,
}

impl CaptureHandle {
    pub fn negotiated(&self) -> NegotiatedConfig {
        self.shared.config
    }

    /// The sample source the recorder reads from.
    pub fn source(&self) -> Arc<dyn CaptureSource> {
        self.shared.clone()
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Stop the live stream. Idempotent.
    pub fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            self.shared.set_gate(false);
            log::info!("Capture released");
        }
    }
}

/// Microphone acquisition at one of the fixed quality profiles.
pub struct SystemCapture;

impl SystemCapture {
    /// Request the default input device at the profile's ideal configuration.
    /// The device may substitute another configuration it supports; the
    /// granted values are reported on the returned handle.
    pub fn acquire(profile: QualityProfile) -> Result<CaptureHandle, CaptureError> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or(CaptureError::NoInputDevice)?;

        log::info!("Using audio input device: {:?}", device.name());

        let supported = negotiate_config(&device, profile)?;

        log::info!(
            "Capture config: {} Hz, {} channels, {:?} (requested {} Hz, {} ch)",
            supported.sample_rate().0,
            supported.channels(),
            supported.sample_format(),
            profile.ideal_sample_rate(),
            profile.ideal_channels()
        );

        let negotiated = NegotiatedConfig {
            sample_rate: supported.sample_rate().0,
            channels: supported.channels(),
            sample_format: supported.sample_format(),
        };

        let shared = Arc::new(SharedCapture {
            config: negotiated,
            gate: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
        });

        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();

        let stream = build_stream(&device, &config, sample_format, shared.clone())?;

        stream.play().map_err(|e| match e {
            cpal::PlayStreamError::DeviceNotAvailable => {
                CaptureError::DeviceBusy("device not available".to_string())
            }
            cpal::PlayStreamError::BackendSpecific { err } => {
                classify_backend_message(err.description)
            }
        })?;

        log::info!("Capture started");

        Ok(CaptureHandle {
            stream: Some(stream),
            shared,
        })
    }
}

/// Names of the available input devices, for diagnostics.
pub fn list_input_devices() -> Vec<String> {
    let host = cpal::default_host();
    match host.input_devices() {
        Ok(devices) => devices.filter_map(|d| d.name().ok()).collect(),
        Err(e) => {
            log::warn!("Failed to enumerate input devices: {}", e);
            Vec::new()
        }
    }
}

/// Pick the profile's ideal configuration when the device supports it,
/// otherwise fall back to the device default.
fn negotiate_config(
    device: &Device,
    profile: QualityProfile,
) -> Result<SupportedStreamConfig, CaptureError> {
    let ideal_rate = cpal::SampleRate(profile.ideal_sample_rate());

    if let Ok(ranges) = device.supported_input_configs() {
        let ideal = ranges
            .filter(|range| range.channels() == profile.ideal_channels())
            .find(|range| range.min_sample_rate() <= ideal_rate && ideal_rate <= range.max_sample_rate())
            .map(|range| range.with_sample_rate(ideal_rate));
        if let Some(config) = ideal {
            return Ok(config);
        }
        log::warn!(
            "Device does not support {} Hz / {} ch; falling back to its default configuration",
            profile.ideal_sample_rate(),
            profile.ideal_channels()
        );
    }

    device.default_input_config().map_err(|e| match e {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => {
            CaptureError::DeviceBusy("device not available".to_string())
        }
        cpal::DefaultStreamConfigError::StreamTypeNotSupported => {
            CaptureError::ConfigUnsupported("input streams not supported".to_string())
        }
        cpal::DefaultStreamConfigError::BackendSpecific { err } => {
            classify_backend_message(err.description)
        }
    })
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    shared: Arc<SharedCapture>,
) -> Result<Stream, CaptureError> {
    match sample_format {
        SampleFormat::I16 => {
            build_stream_typed::<i16>(device, config, shared, |s| s as f32 / i16::MAX as f32)
        }
        SampleFormat::U16 => {
            build_stream_typed::<u16>(device, config, shared, |s| (s as f32 - 32_768.0) / 32_768.0)
        }
        SampleFormat::F32 => build_stream_typed::<f32>(device, config, shared, |s| s),
        other => Err(CaptureError::ConfigUnsupported(format!(
            "sample format {:?}",
            other
        ))),
    }
}

fn build_stream_typed<T>(
    device: &Device,
    config: &StreamConfig,
    shared: Arc<SharedCapture>,
    convert: fn(T) -> f32,
) -> Result<Stream, CaptureError>
where
    T: cpal::SizedSample + Send + 'static,
{
    let err_fn = |err| log::error!("Audio stream error: {}", err);

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if !shared.gate.load(Ordering::SeqCst) {
                    return;
                }

                let mut pending = shared.pending.lock().unwrap();
                for &sample in data {
                    pending.push(convert(sample));
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => {
                CaptureError::DeviceBusy("device not available".to_string())
            }
            cpal::BuildStreamError::StreamConfigNotSupported => {
                CaptureError::ConfigUnsupported("stream configuration rejected".to_string())
            }
            cpal::BuildStreamError::BackendSpecific { err } => {
                classify_backend_message(err.description)
            }
            other => CaptureError::Backend(other.to_string()),
        })?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_classification() {
        assert!(matches!(
            classify_backend_message("Permission denied by the OS".to_string()),
            CaptureError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_backend_message("ALSA underrun".to_string()),
            CaptureError::Backend(_)
        ));
    }

    #[test]
    fn test_error_display_includes_remediation_hint() {
        let err = CaptureError::DeviceBusy("in use".to_string());
        let display = err.to_string();
        assert!(display.contains("in use"));
        assert!(display.contains("Close other applications"));
    }

    #[test]
    fn test_shared_capture_gate_and_drain() {
        let shared = SharedCapture {
            config: NegotiatedConfig {
                sample_rate: 44_100,
                channels: 1,
                sample_format: SampleFormat::F32,
            },
            gate: AtomicBool::new(false),
            pending: Mutex::new(vec![0.25, -0.5]),
        };

        assert_eq!(shared.drain(), vec![0.25, -0.5]);
        // Drained once, nothing left behind.
        assert!(shared.drain().is_empty());

        shared.set_gate(true);
        assert!(shared.gate.load(Ordering::SeqCst));
    }
}
