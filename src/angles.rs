//! Joint angle extraction
//!
//! Derives the four arm angles from a single skeleton frame:
//! - Elbow angles: between elbow→shoulder and elbow→wrist
//! - Shoulder angles: between world-up and elbow→shoulder, so a hanging arm
//!   reads 0 and an arm held straight overhead reads 180
//!
//! Nothing here carries state between frames.

use crate::error::TrackingError;
use crate::types::{AngleKind, AngleSet, JointType, SkeletonFrame, TrackingQuality};
use crate::vector::{angle_between, Vec3, UP};

/// Joints each angle is measured from
struct AngleJoints {
    shoulder: JointType,
    elbow: JointType,
    wrist: JointType,
}

fn joints_for(kind: AngleKind) -> AngleJoints {
    match kind {
        AngleKind::RightElbow | AngleKind::RightShoulder => AngleJoints {
            shoulder: JointType::ShoulderRight,
            elbow: JointType::ElbowRight,
            wrist: JointType::WristRight,
        },
        AngleKind::LeftElbow | AngleKind::LeftShoulder => AngleJoints {
            shoulder: JointType::ShoulderLeft,
            elbow: JointType::ElbowLeft,
            wrist: JointType::WristLeft,
        },
    }
}

/// Angle extractor for computing an [`AngleSet`] from a frame
#[derive(Debug, Clone, Copy)]
pub struct AngleExtractor {
    min_quality: TrackingQuality,
}

impl Default for AngleExtractor {
    fn default() -> Self {
        Self::new(TrackingQuality::Inferred)
    }
}

impl AngleExtractor {
    /// Create an extractor that ignores joints below `min_quality`
    pub fn new(min_quality: TrackingQuality) -> Self {
        Self { min_quality }
    }

    /// Extract all four angles; failures become unknown angles
    pub fn extract(&self, frame: &SkeletonFrame) -> AngleSet {
        let mut angles = AngleSet::UNKNOWN;
        for kind in AngleKind::ALL {
            match self.measure(frame, kind) {
                Ok(degrees) => angles.set(kind, Some(degrees)),
                Err(e) => tracing::trace!(
                    angle = kind.as_str(),
                    recoverable = e.is_recoverable(),
                    error = %e,
                    "angle unknown"
                ),
            }
        }
        tracing::trace!(known = angles.known_count(), "angles extracted");
        angles
    }

    /// Measure a single angle in whole degrees
    pub fn measure(&self, frame: &SkeletonFrame, kind: AngleKind) -> Result<u8, TrackingError> {
        let joints = joints_for(kind);
        let shoulder = self.position(frame, joints.shoulder)?;
        let elbow = self.position(frame, joints.elbow)?;

        let raw = match kind {
            AngleKind::RightElbow | AngleKind::LeftElbow => {
                let wrist = self.position(frame, joints.wrist)?;
                angle_between(shoulder - elbow, wrist - elbow)
            }
            AngleKind::RightShoulder | AngleKind::LeftShoulder => angle_between(UP, shoulder - elbow),
        };

        raw.map(to_whole_degrees)
            .map_err(|_| TrackingError::DegenerateVector(kind))
    }

    fn position(&self, frame: &SkeletonFrame, joint: JointType) -> Result<Vec3, TrackingError> {
        frame
            .position_of(joint, self.min_quality)
            .filter(|p| p.is_finite())
            .ok_or(TrackingError::MissingJoint(joint))
    }
}

/// Round half-to-even and clamp into [0, 180]
fn to_whole_degrees(degrees: f64) -> u8 {
    degrees.round_ties_even().clamp(0.0, 180.0) as u8
}
