//! Error types for Pantomime

use crate::types::{AngleKind, JointType};
use thiserror::Error;

/// Errors that can occur while processing skeleton ticks
///
/// The first three variants are recoverable per-tick conditions: they downgrade
/// a single tick to "no signal" and are never returned from
/// [`TickProcessor::process_tick`](crate::pipeline::TickProcessor::process_tick).
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("Degenerate vector: cannot measure angle {0:?}")]
    DegenerateVector(AngleKind),

    #[error("Missing joint: {0:?}")]
    MissingJoint(JointType),

    #[error("No skeleton tracked this tick")]
    NoSkeletonTracked,

    #[error("Failed to parse tick input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid tick record: {0}")]
    InvalidTick(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl TrackingError {
    /// Whether the error only downgrades one tick instead of failing the call
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TrackingError::DegenerateVector(_)
                | TrackingError::MissingJoint(_)
                | TrackingError::NoSkeletonTracked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(TrackingError::NoSkeletonTracked.is_recoverable());
        assert!(TrackingError::MissingJoint(JointType::WristLeft).is_recoverable());
        assert!(TrackingError::DegenerateVector(AngleKind::RightElbow).is_recoverable());
        assert!(!TrackingError::InvalidConfig("bad".to_string()).is_recoverable());
    }

    #[test]
    fn test_json_error_conversion() {
        let err: TrackingError = serde_json::from_str::<serde_json::Value>("not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, TrackingError::JsonError(_)));
        assert!(err.to_string().starts_with("Invalid JSON"));
    }
}
