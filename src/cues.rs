//! Directional cues
//!
//! A single stateless threshold over the current angle set. It runs beside the
//! rep counter and never touches its state.

use crate::config::CueConfig;
use crate::types::{AngleSet, DirectionalCue};

/// Cues for every watched angle strictly above the threshold
pub fn evaluate(config: &CueConfig, angles: &AngleSet) -> Vec<DirectionalCue> {
    config
        .angles
        .iter()
        .filter_map(|kind| {
            angles
                .get(*kind)
                .filter(|degrees| *degrees > config.threshold)
                .map(|degrees| DirectionalCue {
                    angle: *kind,
                    degrees,
                })
        })
        .collect()
}
