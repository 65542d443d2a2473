//! Application phase state machine
//!
//! Navigation hits and skeleton loss drive the phase. The transition table is
//! a pure function so each row can be checked on its own; [`SessionState`]
//! applies a transition and owns the counters that live across ticks.
//!
//! | From        | Event                  | To          | Side effect                  |
//! |-------------|------------------------|-------------|------------------------------|
//! | any         | skeleton lost          | LogIn       | reset session                |
//! | LogIn       | hit ScanBarcode        | StartScreen | capture login snapshot       |
//! | StartScreen | hit BicepCurlBox       | Exercise    | new bicep curl session       |
//! | StartScreen | hit LateralRaiseBox    | Exercise    | new lateral raise session    |
//! | StartScreen | hit LaunchDashboard    | StartScreen | open dashboard (first time)  |
//! | Exercise    | hit FinishWorkout      | StartScreen | reset session                |

use crate::types::{Effect, ExerciseKind, ExerciseSession, Phase, RegionId, TickEvent};
use serde::{Deserialize, Serialize};

/// Inputs that can move the phase machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    SkeletonLost,
    RegionHit(RegionId),
}

/// One row of the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub to: Phase,
    /// Exercise to start when `to` is the exercise phase
    pub exercise: Option<ExerciseKind>,
    pub effect: Option<Effect>,
}

impl Transition {
    fn to(phase: Phase) -> Self {
        Self {
            to: phase,
            exercise: None,
            effect: None,
        }
    }

    fn start(exercise: ExerciseKind) -> Self {
        Self {
            to: Phase::Exercise,
            exercise: Some(exercise),
            effect: None,
        }
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// Look up the transition for an event, `None` when the event is ignored
pub fn transition(from: Phase, event: PhaseEvent) -> Option<Transition> {
    match (from, event) {
        (_, PhaseEvent::SkeletonLost) => Some(Transition::to(Phase::LogIn)),
        (Phase::LogIn, PhaseEvent::RegionHit(RegionId::ScanBarcode)) => {
            Some(Transition::to(Phase::StartScreen).with_effect(Effect::CaptureLoginSnapshot))
        }
        (Phase::StartScreen, PhaseEvent::RegionHit(RegionId::BicepCurlBox)) => {
            Some(Transition::start(ExerciseKind::BicepCurl))
        }
        (Phase::StartScreen, PhaseEvent::RegionHit(RegionId::LateralRaiseBox)) => {
            Some(Transition::start(ExerciseKind::LateralRaise))
        }
        (Phase::StartScreen, PhaseEvent::RegionHit(RegionId::LaunchDashboard)) => {
            Some(Transition::to(Phase::StartScreen).with_effect(Effect::OpenDashboard))
        }
        (Phase::Exercise, PhaseEvent::RegionHit(RegionId::FinishWorkout)) => {
            Some(Transition::to(Phase::StartScreen))
        }
        (_, PhaseEvent::RegionHit(_)) => None,
    }
}

/// Regions the UI shows in a phase, in hit-test priority order
pub fn visible_regions(phase: Phase) -> &'static [RegionId] {
    match phase {
        Phase::LogIn => &[RegionId::ScanBarcode],
        Phase::StartScreen => &[
            RegionId::BicepCurlBox,
            RegionId::LateralRaiseBox,
            RegionId::LaunchDashboard,
        ],
        Phase::Exercise => &[RegionId::FinishWorkout],
        Phase::Summary => &[],
    }
}

/// State carried from one tick to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: Phase,
    /// Present only while in the exercise phase
    pub session: Option<ExerciseSession>,
    /// The dashboard effect fires once per controller lifetime
    pub dashboard_launched: bool,
}

impl SessionState {
    pub fn exercise(&self) -> Option<ExerciseKind> {
        self.session.map(|s| s.exercise)
    }

    pub fn rep_count(&self) -> u32 {
        self.session.map_or(0, |s| s.rep_count)
    }

    pub fn set_count(&self) -> u32 {
        self.session.map_or(0, |s| s.set_count)
    }

    /// A session exists exactly while the phase is Exercise
    pub fn is_consistent(&self) -> bool {
        self.session.is_some() == (self.phase == Phase::Exercise)
    }

    /// Apply one event and return the next state with its notifications
    ///
    /// Re-entering the active phase changes nothing; only the once-only
    /// dashboard effect can fire on a self transition.
    pub fn apply(self, event: PhaseEvent) -> (SessionState, Vec<TickEvent>) {
        let Some(row) = transition(self.phase, event) else {
            return (self, Vec::new());
        };

        let mut next = self;
        let mut events = Vec::new();
        let changed = row.to != self.phase;

        if changed {
            tracing::debug!(from = self.phase.as_str(), to = row.to.as_str(), "phase changed");
            next.phase = row.to;
            next.session = match row.to {
                Phase::Exercise => row.exercise.map(ExerciseSession::new),
                _ => None,
            };
            events.push(TickEvent::PhaseChanged {
                from: self.phase,
                to: row.to,
            });
        }

        match row.effect {
            Some(Effect::OpenDashboard) if !next.dashboard_launched => {
                tracing::debug!("dashboard launch requested");
                next.dashboard_launched = true;
                events.push(TickEvent::Effect {
                    effect: Effect::OpenDashboard,
                });
            }
            Some(Effect::CaptureLoginSnapshot) if changed => {
                events.push(TickEvent::Effect {
                    effect: Effect::CaptureLoginSnapshot,
                });
            }
            _ => {}
        }

        (next, events)
    }
}

/// Owner of the session state between ticks
#[derive(Debug, Clone, Default)]
pub struct PhaseController {
    state: SessionState,
}

impl PhaseController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: SessionState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn visible_regions(&self) -> &'static [RegionId] {
        visible_regions(self.state.phase)
    }

    /// Dispatch an event, keeping the resulting state
    pub fn dispatch(&mut self, event: PhaseEvent) -> Vec<TickEvent> {
        let (next, events) = self.state.apply(event);
        self.state = next;
        events
    }

    /// Replace the state wholesale (used after a tick computed on a copy)
    pub fn commit(&mut self, state: SessionState) {
        self.state = state;
    }
}
