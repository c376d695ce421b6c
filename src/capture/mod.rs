//! Microphone capture module
//!
//! This module handles input-device acquisition at a fixed set of quality
//! profiles. Uses CPAL for the audio stream; the recorder consumes samples
//! through the `CaptureSource` trait.

mod device;
mod quality;

pub use device::{
    list_input_devices, CaptureError, CaptureHandle, CaptureSource, NegotiatedConfig,
    SystemCapture,
};
pub use quality::QualityProfile;
