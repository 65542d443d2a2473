//! Pipeline configuration
//!
//! Thresholds and calibration defaults. Every field has a default tuned for a
//! single user a couple of metres from the sensor, and any subset can be
//! overridden from JSON.

use crate::error::TrackingError;
use crate::types::{AngleKind, JointType, Size, TrackingQuality};
use serde::{Deserialize, Serialize};

/// Default contracted threshold for rep counting (degrees)
pub const DEFAULT_CONTRACTED_THRESHOLD: u8 = 55;

/// Default extended threshold for rep counting (degrees)
pub const DEFAULT_EXTENDED_THRESHOLD: u8 = 150;

/// Default directional cue threshold (degrees)
pub const DEFAULT_CUE_THRESHOLD: u8 = 40;

/// Native depth frame the sensor reports joint pixels in
pub const DEFAULT_SENSOR_FRAME: Size = Size::new(640.0, 480.0);

/// Nominal depth camera focal length at 640x480, in pixels
pub const DEFAULT_FOCAL_LENGTH_PX: f64 = 571.26;

/// Rep counter thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepThresholds {
    /// Both monitored angles at or below this arm the counter
    pub contracted_threshold: u8,
    /// Both monitored angles at or above this complete a rep
    pub extended_threshold: u8,
}

impl Default for RepThresholds {
    fn default() -> Self {
        Self {
            contracted_threshold: DEFAULT_CONTRACTED_THRESHOLD,
            extended_threshold: DEFAULT_EXTENDED_THRESHOLD,
        }
    }
}

/// Directional cue settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CueConfig {
    /// Angles strictly above this raise a cue
    pub threshold: u8,
    /// Angles the cue check watches during exercise
    pub angles: Vec<AngleKind>,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CUE_THRESHOLD,
            angles: vec![AngleKind::RightElbow, AngleKind::LeftElbow],
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub rep: RepThresholds,
    pub cue: CueConfig,
    /// Hand joint that drives the on-screen cursor
    pub pointer_hand: JointType,
    /// Joints reported below this quality are treated as missing
    pub min_joint_quality: TrackingQuality,
    /// Native sensor frame size used for screen projection
    pub sensor_frame: Size,
    /// Focal length for the built-in pinhole mapper
    pub focal_length_px: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rep: RepThresholds::default(),
            cue: CueConfig::default(),
            pointer_hand: JointType::HandLeft,
            min_joint_quality: TrackingQuality::Inferred,
            sensor_frame: DEFAULT_SENSOR_FRAME,
            focal_length_px: DEFAULT_FOCAL_LENGTH_PX,
        }
    }
}

impl PipelineConfig {
    /// Check the configuration for internally inconsistent values
    pub fn validate(&self) -> Result<(), TrackingError> {
        let RepThresholds {
            contracted_threshold,
            extended_threshold,
        } = self.rep;

        if extended_threshold > 180 || contracted_threshold > 180 {
            return Err(TrackingError::InvalidConfig(
                "rep thresholds must be within 0-180 degrees".to_string(),
            ));
        }

        if contracted_threshold >= extended_threshold {
            return Err(TrackingError::InvalidConfig(format!(
                "contracted threshold ({contracted_threshold}) must be below extended threshold ({extended_threshold})"
            )));
        }

        if self.cue.threshold > 180 {
            return Err(TrackingError::InvalidConfig(
                "cue threshold must be within 0-180 degrees".to_string(),
            ));
        }

        if !matches!(self.pointer_hand, JointType::HandLeft | JointType::HandRight) {
            return Err(TrackingError::InvalidConfig(format!(
                "pointer hand must be HandLeft or HandRight, got {:?}",
                self.pointer_hand
            )));
        }

        if !self.sensor_frame.is_valid() {
            return Err(TrackingError::InvalidConfig(
                "sensor frame size must be positive".to_string(),
            ));
        }

        if !(self.focal_length_px.is_finite() && self.focal_length_px > 0.0) {
            return Err(TrackingError::InvalidConfig(
                "focal length must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, TrackingError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, TrackingError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
