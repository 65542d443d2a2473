//! pantomime.tick.v1 schema definition
//!
//! One record per sensor tick: every candidate skeleton the sensor reported,
//! the current display size and the bounds of each named region as the UI
//! laid them out for this tick.

use crate::types::{JointType, RegionId, ScreenRegion, Shape, SkeletonFrame, Size};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version
pub const SCHEMA_VERSION: &str = "pantomime.tick.v1";

/// A single tick of sensor and UI input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    /// Schema version (must be "pantomime.tick.v1")
    pub schema_version: String,
    /// When the sensor produced the frame (UTC)
    pub timestamp: DateTime<Utc>,
    /// Optional caller-assigned identifier, echoed in the report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_id: Option<String>,
    /// Candidate skeletons; an empty list means nothing was tracked
    #[serde(default)]
    pub skeletons: Vec<SkeletonFrame>,
    /// Current display surface size
    pub display: Size,
    /// Current region bounds
    #[serde(default)]
    pub regions: Vec<ScreenRegion>,
}

impl TickRecord {
    /// Create an empty tick at `timestamp`
    pub fn new(timestamp: DateTime<Utc>, display: Size) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            timestamp,
            tick_id: None,
            skeletons: Vec::new(),
            display,
            regions: Vec::new(),
        }
    }

    pub fn with_tick_id(mut self, tick_id: impl Into<String>) -> Self {
        self.tick_id = Some(tick_id.into());
        self
    }

    pub fn with_skeleton(mut self, skeleton: SkeletonFrame) -> Self {
        self.skeletons.push(skeleton);
        self
    }

    pub fn with_region(mut self, id: RegionId, bounds: Shape) -> Self {
        self.regions.push(ScreenRegion { id, bounds });
        self
    }

    /// The skeleton this tick is processed against
    pub fn primary_skeleton(&self) -> Option<&SkeletonFrame> {
        select_primary_skeleton(&self.skeletons)
    }

    /// Validate the record
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        if !self.display.is_valid() {
            return Err(ValidationError::InvalidDisplay {
                width: self.display.width,
                height: self.display.height,
            });
        }

        for (index, skeleton) in self.skeletons.iter().enumerate() {
            if !skeleton.position.is_finite() {
                return Err(ValidationError::NonFinitePosition { skeleton: index });
            }
            if let Some(sample) = skeleton.joints.values().find(|s| !s.position.is_finite()) {
                return Err(ValidationError::NonFiniteJoint {
                    skeleton: index,
                    joint: sample.joint,
                });
            }
        }

        if let Some(region) = self.regions.iter().find(|r| !has_valid_extent(&r.bounds)) {
            return Err(ValidationError::InvalidRegion { id: region.id });
        }

        Ok(())
    }
}

fn has_valid_extent(shape: &Shape) -> bool {
    let positive = |v: f64| v.is_finite() && v > 0.0;
    match *shape {
        Shape::Rect {
            x,
            y,
            width,
            height,
        } => x.is_finite() && y.is_finite() && positive(width) && positive(height),
        Shape::Ellipse { cx, cy, rx, ry } => {
            cx.is_finite() && cy.is_finite() && positive(rx) && positive(ry)
        }
    }
}

/// Pick the tracked skeleton nearest the sensor
///
/// Nearest means the smallest positive body-centre depth. Skeletons that are
/// not fully tracked, or sit at or behind the sensor plane, are skipped.
pub fn select_primary_skeleton(candidates: &[SkeletonFrame]) -> Option<&SkeletonFrame> {
    candidates
        .iter()
        .filter(|s| s.is_tracked() && s.position.z.is_finite() && s.position.z > 0.0)
        .min_by(|a, b| a.position.z.total_cmp(&b.position.z))
}

/// Validation errors for tick records
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Invalid display size {width}x{height}: both sides must be positive")]
    InvalidDisplay { width: f64, height: f64 },

    #[error("Skeleton {skeleton} has a non-finite body position")]
    NonFinitePosition { skeleton: usize },

    #[error("Skeleton {skeleton} has a non-finite {joint:?} position")]
    NonFiniteJoint { skeleton: usize, joint: JointType },

    #[error("Region {id:?} must have positive, finite extents")]
    InvalidRegion { id: RegionId },
}
