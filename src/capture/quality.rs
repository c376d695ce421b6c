//! Capture quality profiles.
//!
//! Each profile names an ideal sample-rate/channel pair. The device is asked
//! for the ideal values and may substitute the closest configuration it
//! actually supports.

use serde::{Deserialize, Serialize};

/// Capture quality requested when acquiring the microphone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityProfile {
    /// 22.05 kHz mono. Smallest files, speech-grade.
    Low,

    /// 44.1 kHz mono.
    #[default]
    Medium,

    /// 48 kHz stereo.
    High,
}

impl QualityProfile {
    /// Ideal sample rate in Hz.
    pub fn ideal_sample_rate(&self) -> u32 {
        match self {
            QualityProfile::Low => 22_050,
            QualityProfile::Medium => 44_100,
            QualityProfile::High => 48_000,
        }
    }

    /// Ideal channel count.
    pub fn ideal_channels(&self) -> u16 {
        match self {
            QualityProfile::Low => 1,
            QualityProfile::Medium => 1,
            QualityProfile::High => 2,
        }
    }

    /// Get the display label for this profile.
    pub fn label(&self) -> &'static str {
        match self {
            QualityProfile::Low => "Low",
            QualityProfile::Medium => "Medium",
            QualityProfile::High => "High",
        }
    }

    /// Get all available profiles in order.
    pub fn all() -> &'static [QualityProfile] {
        &[
            QualityProfile::Low,
            QualityProfile::Medium,
            QualityProfile::High,
        ]
    }
}

impl std::fmt::Display for QualityProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_medium() {
        assert_eq!(QualityProfile::default(), QualityProfile::Medium);
    }

    #[test]
    fn test_profile_serialization() {
        let profile = QualityProfile::High;
        let json = serde_json::to_string(&profile).unwrap();
        assert_eq!(json, "\"high\"");
    }

    #[test]
    fn test_ideal_values() {
        assert_eq!(QualityProfile::Low.ideal_sample_rate(), 22_050);
        assert_eq!(QualityProfile::Medium.ideal_sample_rate(), 44_100);
        assert_eq!(QualityProfile::High.ideal_sample_rate(), 48_000);
        assert_eq!(QualityProfile::High.ideal_channels(), 2);
    }

    #[test]
    fn test_all_profiles() {
        let profiles = QualityProfile::all();
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0], QualityProfile::Low);
        assert_eq!(profiles[2], QualityProfile::High);
    }
}
