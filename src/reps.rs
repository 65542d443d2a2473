//! Repetition counting
//!
//! A two-threshold hysteresis machine over the pair of angles an exercise
//! monitors. The pair must pass each threshold together: both angles at or
//! below the contracted threshold arm the counter, and both at or above the
//! extended threshold complete one rep and relax it again.

use crate::config::RepThresholds;
use crate::types::{AngleKind, AngleSet, ExerciseKind, ExerciseSession, RepState};

/// Angle pair an exercise is counted on
///
/// Lateral raises have no counting rule yet and return `None`.
pub fn monitored_pair(exercise: ExerciseKind) -> Option<(AngleKind, AngleKind)> {
    match exercise {
        ExerciseKind::BicepCurl => Some((AngleKind::RightElbow, AngleKind::LeftElbow)),
        ExerciseKind::LateralRaise => None,
    }
}

/// Hysteresis rep counter
#[derive(Debug, Clone, Copy, Default)]
pub struct RepCounter {
    thresholds: RepThresholds,
}

impl RepCounter {
    pub fn new(thresholds: RepThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> RepThresholds {
        self.thresholds
    }

    /// Next state for one pair of known angles; `true` when a rep completes
    pub fn step(&self, state: RepState, first: u8, second: u8) -> (RepState, bool) {
        let RepThresholds {
            contracted_threshold,
            extended_threshold,
        } = self.thresholds;

        match state {
            RepState::Relaxed if first <= contracted_threshold && second <= contracted_threshold => {
                (RepState::Armed, false)
            }
            RepState::Armed if first >= extended_threshold && second >= extended_threshold => {
                (RepState::Relaxed, true)
            }
            _ => (state, false),
        }
    }

    /// Feed one tick of angles into the session
    ///
    /// Returns the new rep count when this tick completed a rep. Unknown
    /// angles leave the session untouched.
    pub fn update(&self, session: &mut ExerciseSession, angles: &AngleSet) -> Option<u32> {
        let (first, second) = monitored_pair(session.exercise)?;
        let (first, second) = match (angles.get(first), angles.get(second)) {
            (Some(a), Some(b)) => (a, b),
            _ => return None,
        };

        let (next, completed) = self.step(session.state, first, second);
        session.state = next;

        if completed {
            session.rep_count = session.rep_count.saturating_add(1);
            tracing::debug!(
                exercise = session.exercise.as_str(),
                rep_count = session.rep_count,
                "rep completed"
            );
            Some(session.rep_count)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn elbows(right: Option<u8>, left: Option<u8>) -> AngleSet {
        AngleSet {
            right_elbow: right,
            left_elbow: left,
            ..AngleSet::UNKNOWN
        }
    }

    fn run(session: &mut ExerciseSession, sequence: &[(u8, u8)]) -> Vec<u32> {
        let counter = RepCounter::default();
        sequence
            .iter()
            .filter_map(|(r, l)| counter.update(&mut *session, &elbows(Some(*r), Some(*l))))
            .collect()
    }

    #[test]
    fn test_single_rep() {
        let mut session = ExerciseSession::new(ExerciseKind::BicepCurl);
        let completed = run(&mut session, &[(160, 160), (50, 50), (160, 160)]);

        assert_eq!(completed, vec![1]);
        assert_eq!(session.rep_count, 1);
        assert_eq!(session.state, RepState::Relaxed);
    }

    #[test]
    fn test_asymmetric_motion_never_counts() {
        let mut session = ExerciseSession::new(ExerciseKind::BicepCurl);
        let completed = run(&mut session, &[(50, 160), (160, 160)]);
        assert!(completed.is_empty());
        assert_eq!(session.state, RepState::Relaxed);

        // Only the later symmetric contraction arms the counter
        run(&mut session, &[(50, 50)]);
        assert_eq!(session.state, RepState::Armed);
        assert_eq!(session.rep_count, 0);
    }

    #[test]
    fn test_asymmetric_then_symmetric_sequence() {
        let mut session = ExerciseSession::new(ExerciseKind::BicepCurl);
        let completed = run(&mut session, &[(50, 160), (50, 50), (160, 160)]);
        // The (50, 160) tick contributes nothing; the rep comes from (50, 50)
        assert_eq!(completed, vec![1]);

        let mut lopsided = ExerciseSession::new(ExerciseKind::BicepCurl);
        let completed = run(&mut lopsided, &[(50, 160), (160, 50), (160, 160)]);
        assert!(completed.is_empty());
        assert_eq!(lopsided.rep_count, 0);
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let mut session = ExerciseSession::new(ExerciseKind::BicepCurl);
        let completed = run(&mut session, &[(55, 55), (150, 150)]);
        assert_eq!(completed, vec![1]);

        let mut session = ExerciseSession::new(ExerciseKind::BicepCurl);
        let completed = run(&mut session, &[(56, 55), (150, 150)]);
        assert!(completed.is_empty());
    }

    #[test]
    fn test_hysteresis_band_holds_state() {
        let mut session = ExerciseSession::new(ExerciseKind::BicepCurl);
        run(&mut session, &[(40, 40)]);
        assert!(session.is_armed());

        // Oscillating between the thresholds never fires or disarms
        let completed = run(&mut session, &[(100, 100), (40, 40), (149, 149), (60, 60)]);
        assert!(completed.is_empty());
        assert!(session.is_armed());

        // Staying extended after a rep does not count again
        let completed = run(&mut session, &[(170, 170), (175, 175), (170, 170)]);
        assert_eq!(completed, vec![1]);
    }

    #[test]
    fn test_many_reps_monotonic() {
        let mut session = ExerciseSession::new(ExerciseKind::BicepCurl);
        let mut sequence = Vec::new();
        for _ in 0..5 {
            sequence.extend([(170, 165), (90, 90), (30, 35), (90, 90), (155, 151)]);
        }
        let completed = run(&mut session, &sequence);
        assert_eq!(completed, vec![1, 2, 3, 4, 5]);
        assert_eq!(session.rep_count, 5);
    }

    #[test]
    fn test_unknown_angles_are_noop() {
        let counter = RepCounter::default();
        let mut session = ExerciseSession::new(ExerciseKind::BicepCurl);
        counter.update(&mut session, &elbows(Some(30), Some(30)));
        let before = session;

        assert_eq!(counter.update(&mut session, &elbows(None, Some(170))), None);
        assert_eq!(counter.update(&mut session, &elbows(Some(170), None)), None);
        assert_eq!(counter.update(&mut session, &AngleSet::UNKNOWN), None);
        assert_eq!(session, before);
    }

    #[test]
    fn test_lateral_raise_is_noop() {
        let counter = RepCounter::default();
        let mut session = ExerciseSession::new(ExerciseKind::LateralRaise);
        let all = AngleSet {
            right_elbow: Some(30),
            right_shoulder: Some(30),
            left_elbow: Some(30),
            left_shoulder: Some(30),
        };
        counter.update(&mut session, &all);
        assert_eq!(session, ExerciseSession::new(ExerciseKind::LateralRaise));
        assert!(monitored_pair(ExerciseKind::LateralRaise).is_none());
    }

    #[test]
    fn test_custom_thresholds() {
        let counter = RepCounter::new(RepThresholds {
            contracted_threshold: 70,
            extended_threshold: 120,
        });
        let mut session = ExerciseSession::new(ExerciseKind::BicepCurl);
        assert_eq!(counter.update(&mut session, &elbows(Some(65), Some(70))), None);
        assert_eq!(counter.update(&mut session, &elbows(Some(125), Some(120))), Some(1));
    }

    #[test]
    fn test_step_fires_at_most_once() {
        let counter = RepCounter::default();
        assert_eq!(counter.step(RepState::Relaxed, 170, 170), (RepState::Relaxed, false));
        assert_eq!(counter.step(RepState::Relaxed, 10, 10), (RepState::Armed, false));
        assert_eq!(counter.step(RepState::Armed, 10, 10), (RepState::Armed, false));
        assert_eq!(counter.step(RepState::Armed, 170, 170), (RepState::Relaxed, true));
    }
}
