//! Pipeline orchestration
//!
//! This module provides the public API for Pantomime. One call per sensor
//! tick runs the full pipeline:
//!
//! 1. Skeleton check - no tracked skeleton sends the phase machine to LogIn
//! 2. AngleExtractor - four arm angles from the frame
//! 3. RepCounter - hysteresis update while an exercise is active
//! 4. Projection - pointer hand to screen space
//! 5. Hit testing - first visible region hit drives navigation
//! 6. Cues - stateless directional hints during exercise

use crate::angles::AngleExtractor;
use crate::config::PipelineConfig;
use crate::cues;
use crate::encoder::{FrameReport, ReportEncoder};
use crate::error::TrackingError;
use crate::phase::{visible_regions, PhaseController, PhaseEvent, SessionState};
use crate::projection::{first_hit, project, Calibration, CoordinateMapper, PinholeMapper};
use crate::reps::RepCounter;
use crate::schema::{TickAdapter, TickRecord};
use crate::types::{
    AngleSet, Phase, ScreenPoint, ScreenRegion, SkeletonFrame, Size, TickEvent, TickReport,
};

/// Run a fresh processor over a batch of NDJSON tick records.
///
/// # Arguments
/// * `ndjson` - Newline-delimited `pantomime.tick.v1` records
/// * `config` - Pipeline configuration
///
/// # Returns
/// One encoded JSON report per input record, in order
///
/// # Example
/// ```ignore
/// let reports = process_ticks(&ndjson, PipelineConfig::default())?;
/// ```
pub fn process_ticks(ndjson: &str, config: PipelineConfig) -> Result<Vec<String>, TrackingError> {
    let records = TickAdapter::parse_ndjson(ndjson)?;
    let mut processor = TickProcessor::with_config(config)?;

    records
        .iter()
        .map(|record| {
            let frame = processor.process_record(record)?;
            serde_json::to_string(&frame).map_err(TrackingError::JsonError)
        })
        .collect()
}

/// Stateful per-tick processor.
///
/// Owns the only state carried between ticks (phase, exercise session and
/// the dashboard flag). Everything else is recomputed every tick.
pub struct TickProcessor {
    config: PipelineConfig,
    extractor: AngleExtractor,
    counter: RepCounter,
    mapper: Box<dyn CoordinateMapper + Send>,
    controller: PhaseController,
    encoder: ReportEncoder,
}

impl Default for TickProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TickProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self::build(PipelineConfig::default())
    }

    /// Create a processor with a validated configuration
    pub fn with_config(config: PipelineConfig) -> Result<Self, TrackingError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create a processor that maps joints through the host's own sensor mapping
    pub fn with_mapper<M>(config: PipelineConfig, mapper: M) -> Result<Self, TrackingError>
    where
        M: CoordinateMapper + Send + 'static,
    {
        let mut processor = Self::with_config(config)?;
        processor.mapper = Box::new(mapper);
        Ok(processor)
    }

    fn build(config: PipelineConfig) -> Self {
        let mapper = PinholeMapper::new(config.sensor_frame, config.focal_length_px);
        Self {
            extractor: AngleExtractor::new(config.min_joint_quality),
            counter: RepCounter::new(config.rep),
            mapper: Box::new(mapper),
            controller: PhaseController::new(),
            encoder: ReportEncoder::new(),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        self.controller.state()
    }

    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    /// Process one tick and keep the resulting state
    ///
    /// `skeleton` is the pre-selected primary skeleton, `None` when nothing
    /// was tracked this tick. A frame whose tracking state is not `Tracked`
    /// (e.g. `PositionOnly`) is treated like `None` and raises skeleton lost.
    pub fn process_tick(
        &mut self,
        skeleton: Option<&SkeletonFrame>,
        display: Size,
        regions: &[ScreenRegion],
    ) -> TickReport {
        let (next, report) = self.step(*self.controller.state(), skeleton, display, regions);
        self.controller.commit(next);
        report
    }

    /// Validate a tick record, process it and wrap the result for output
    pub fn process_record(&mut self, record: &TickRecord) -> Result<FrameReport, TrackingError> {
        record
            .validate()
            .map_err(|e| TrackingError::InvalidTick(e.to_string()))?;

        let report = self.process_tick(record.primary_skeleton(), record.display, &record.regions);
        Ok(self
            .encoder
            .encode(report, record.tick_id.as_deref(), record.timestamp))
    }

    /// Compute one tick against `state` without touching the processor
    pub fn step(
        &self,
        state: SessionState,
        skeleton: Option<&SkeletonFrame>,
        display: Size,
        regions: &[ScreenRegion],
    ) -> (SessionState, TickReport) {
        let Some(frame) = skeleton.filter(|frame| frame.is_tracked()) else {
            tracing::trace!(error = %TrackingError::NoSkeletonTracked, "skeleton lost");
            let (state, events) = state.apply(PhaseEvent::SkeletonLost);
            return (state, self.report(&state, None, None, events));
        };

        let mut state = state;
        let mut events = Vec::new();
        let angles = self.extractor.extract(frame);

        if state.phase == Phase::Exercise {
            if let Some(session) = state.session.as_mut() {
                if let Some(rep_count) = self.counter.update(session, &angles) {
                    events.push(TickEvent::RepCompleted {
                        exercise: session.exercise,
                        rep_count,
                    });
                }
            }
        }

        let cursor = self.cursor(frame, display);
        if let Some(point) = cursor {
            if let Some(region) = first_hit(point, regions, visible_regions(state.phase)) {
                tracing::debug!(region = ?region, phase = state.phase.as_str(), "region hit");
                let (next, phase_events) = state.apply(PhaseEvent::RegionHit(region));
                state = next;
                events.extend(phase_events);
            }
        }

        (state, self.report(&state, Some(angles), cursor, events))
    }

    fn cursor(&self, frame: &SkeletonFrame, display: Size) -> Option<ScreenPoint> {
        let hand = frame.position_of(self.config.pointer_hand, self.config.min_joint_quality)?;
        let calibration = Calibration::new(display, self.config.sensor_frame);
        project(hand, self.mapper.as_ref(), &calibration)
    }

    fn report(
        &self,
        state: &SessionState,
        angles: Option<AngleSet>,
        cursor: Option<ScreenPoint>,
        events: Vec<TickEvent>,
    ) -> TickReport {
        let cues = match (state.phase, &angles) {
            (Phase::Exercise, Some(angles)) => cues::evaluate(&self.config.cue, angles),
            _ => Vec::new(),
        };

        TickReport {
            phase: state.phase,
            exercise: state.exercise(),
            rep_count: state.rep_count(),
            set_count: state.set_count(),
            skeleton_tracked: angles.is_some(),
            angles,
            cursor,
            visible_regions: visible_regions(state.phase).to_vec(),
            cues,
            events,
        }
    }

    /// Load session state from JSON
    ///
    /// States pairing an exercise session with a non-exercise phase (or the
    /// reverse) are rejected and leave the current state untouched.
    pub fn load_state(&mut self, json: &str) -> Result<(), TrackingError> {
        let state: SessionState =
            serde_json::from_str(json).map_err(|e| TrackingError::ParseError(e.to_string()))?;
        if !state.is_consistent() {
            return Err(TrackingError::ParseError(format!(
                "session must be present exactly in the exercise phase (phase: {})",
                state.phase.as_str()
            )));
        }
        self.controller.commit(state);
        Ok(())
    }

    /// Save session state to JSON
    pub fn save_state(&self) -> Result<String, TrackingError> {
        serde_json::to_string_pretty(self.controller.state())
            .map_err(|e| TrackingError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Effect, ExerciseKind, JointType, RegionId, Shape, SkeletonTrackingState, TrackingQuality,
    };
    use crate::vector::Vec3;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;

    const DISPLAY: Size = Size::new(640.0, 480.0);

    /// Hand position that misses every region
    const NOWHERE: (f64, f64) = (600.0, 420.0);

    fn centre(id: RegionId) -> (f64, f64) {
        match id {
            RegionId::ScanBarcode => (50.0, 50.0),
            RegionId::BicepCurlBox => (250.0, 50.0),
            RegionId::LateralRaiseBox => (450.0, 50.0),
            RegionId::LaunchDashboard => (50.0, 250.0),
            RegionId::FinishWorkout => (250.0, 250.0),
        }
    }

    fn regions() -> Vec<ScreenRegion> {
        [
            RegionId::ScanBarcode,
            RegionId::BicepCurlBox,
            RegionId::LateralRaiseBox,
            RegionId::LaunchDashboard,
            RegionId::FinishWorkout,
        ]
        .into_iter()
        .map(|id| {
            let (cx, cy) = centre(id);
            ScreenRegion {
                id,
                bounds: Shape::Rect {
                    x: cx - 50.0,
                    y: cy - 50.0,
                    width: 100.0,
                    height: 100.0,
                },
            }
        })
        .collect()
    }

    /// Passes skeleton x/y straight through as pixels
    fn processor() -> TickProcessor {
        let mapper = |p: Vec3| Some(ScreenPoint::new(p.x, p.y));
        TickProcessor::with_mapper(PipelineConfig::default(), mapper).unwrap()
    }

    /// Both arms hanging (elbows 180) or fully curled (elbows 0), left hand at `hand`
    fn frame(curled: bool, hand: (f64, f64)) -> SkeletonFrame {
        let q = TrackingQuality::Tracked;
        let wrist_y = if curled { 0.45 } else { -0.1 };
        SkeletonFrame::new(SkeletonTrackingState::Tracked, Vec3::new(0.0, 0.0, 2.0))
            .with_joint(JointType::ShoulderRight, Vec3::new(0.2, 0.5, 2.0), q)
            .with_joint(JointType::ElbowRight, Vec3::new(0.2, 0.2, 2.0), q)
            .with_joint(JointType::WristRight, Vec3::new(0.2, wrist_y, 2.0), q)
            .with_joint(JointType::ShoulderLeft, Vec3::new(-0.2, 0.5, 2.0), q)
            .with_joint(JointType::ElbowLeft, Vec3::new(-0.2, 0.2, 2.0), q)
            .with_joint(JointType::WristLeft, Vec3::new(-0.2, wrist_y, 2.0), q)
            .with_joint(JointType::HandLeft, Vec3::new(hand.0, hand.1, 2.0), q)
    }

    fn tick(processor: &mut TickProcessor, frame: &SkeletonFrame) -> TickReport {
        processor.process_tick(Some(frame), DISPLAY, &regions())
    }

    fn point_at(processor: &mut TickProcessor, id: RegionId) -> TickReport {
        tick(processor, &frame(false, centre(id)))
    }

    fn into_exercise(processor: &mut TickProcessor, id: RegionId) {
        point_at(processor, RegionId::ScanBarcode);
        point_at(processor, id);
        assert_eq!(processor.phase(), Phase::Exercise);
    }

    #[test]
    fn test_initial_report() {
        let mut processor = processor();
        let report = tick(&mut processor, &frame(false, NOWHERE));

        assert_eq!(report.phase, Phase::LogIn);
        assert!(report.skeleton_tracked);
        assert_eq!(report.cursor, Some(ScreenPoint::new(600.0, 420.0)));
        assert_eq!(report.visible_regions, vec![RegionId::ScanBarcode]);
        assert_eq!(report.angles.unwrap().right_elbow, Some(180));
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_full_session_flow() {
        let mut processor = processor();

        let report = point_at(&mut processor, RegionId::ScanBarcode);
        assert_eq!(report.phase, Phase::StartScreen);
        assert_eq!(
            report.effects().collect::<Vec<_>>(),
            vec![Effect::CaptureLoginSnapshot]
        );

        let report = point_at(&mut processor, RegionId::BicepCurlBox);
        assert_eq!(report.phase, Phase::Exercise);
        assert_eq!(report.exercise, Some(ExerciseKind::BicepCurl));
        assert_eq!((report.rep_count, report.set_count), (0, 0));

        tick(&mut processor, &frame(false, NOWHERE));
        tick(&mut processor, &frame(true, NOWHERE));
        let report = tick(&mut processor, &frame(false, NOWHERE));
        assert_eq!(report.rep_count, 1);
        assert_eq!(
            report.events,
            vec![TickEvent::RepCompleted {
                exercise: ExerciseKind::BicepCurl,
                rep_count: 1
            }]
        );

        let report = point_at(&mut processor, RegionId::FinishWorkout);
        assert_eq!(report.phase, Phase::StartScreen);
        assert_eq!(report.exercise, None);
        assert_eq!(report.rep_count, 0);
    }

    #[test]
    fn test_skeleton_lost_resets() {
        let mut processor = processor();
        into_exercise(&mut processor, RegionId::BicepCurlBox);
        tick(&mut processor, &frame(true, NOWHERE));
        tick(&mut processor, &frame(false, NOWHERE));
        assert_eq!(processor.state().rep_count(), 1);

        let report = processor.process_tick(None, DISPLAY, &regions());
        assert_eq!(report.phase, Phase::LogIn);
        assert_eq!(report.rep_count, 0);
        assert!(!report.skeleton_tracked);
        assert_eq!(report.angles, None);
        assert_eq!(report.cursor, None);
        assert_eq!(
            report.events,
            vec![TickEvent::PhaseChanged {
                from: Phase::Exercise,
                to: Phase::LogIn
            }]
        );
    }

    #[test]
    fn test_untracked_frame_counts_as_lost() {
        let mut processor = processor();
        point_at(&mut processor, RegionId::ScanBarcode);

        let mut partial = frame(false, NOWHERE);
        partial.tracking_state = SkeletonTrackingState::PositionOnly;
        let report = tick(&mut processor, &partial);
        assert_eq!(report.phase, Phase::LogIn);
    }

    #[test]
    fn test_hidden_regions_ignored() {
        let mut processor = processor();
        let report = point_at(&mut processor, RegionId::BicepCurlBox);
        assert_eq!(report.phase, Phase::LogIn);
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_untracked_hand_hides_cursor() {
        let mut processor = processor();
        let (x, y) = centre(RegionId::ScanBarcode);
        let hidden = frame(false, NOWHERE).with_joint(
            JointType::HandLeft,
            Vec3::new(x, y, 2.0),
            TrackingQuality::NotTracked,
        );

        let report = tick(&mut processor, &hidden);
        assert_eq!(report.cursor, None);
        assert_eq!(report.phase, Phase::LogIn);
        assert!(report.skeleton_tracked);
    }

    #[test]
    fn test_dashboard_launch_once() {
        let mut processor = processor();
        point_at(&mut processor, RegionId::ScanBarcode);

        let launches: usize = (0..5)
            .map(|_| {
                point_at(&mut processor, RegionId::LaunchDashboard)
                    .effects()
                    .filter(|e| *e == Effect::OpenDashboard)
                    .count()
            })
            .sum();
        assert_eq!(launches, 1);
        assert_eq!(processor.phase(), Phase::StartScreen);
    }

    #[test]
    fn test_cues_only_during_exercise() {
        let mut processor = processor();
        let report = tick(&mut processor, &frame(false, NOWHERE));
        assert!(report.cues.is_empty());

        into_exercise(&mut processor, RegionId::BicepCurlBox);
        let report = tick(&mut processor, &frame(false, NOWHERE));
        assert_eq!(report.cues.len(), 2);

        let report = tick(&mut processor, &frame(true, NOWHERE));
        assert!(report.cues.is_empty());
    }

    #[test]
    fn test_lateral_raise_counts_nothing() {
        let mut processor = processor();
        into_exercise(&mut processor, RegionId::LateralRaiseBox);
        for curled in [false, true, false, true, false] {
            let report = tick(&mut processor, &frame(curled, NOWHERE));
            assert_eq!(report.rep_count, 0);
            assert_eq!(report.exercise, Some(ExerciseKind::LateralRaise));
        }
    }

    #[test]
    fn test_step_leaves_processor_untouched() {
        let processor = processor();
        let before = *processor.state();
        let (next, report) = processor.step(
            before,
            Some(&frame(false, centre(RegionId::ScanBarcode))),
            DISPLAY,
            &regions(),
        );

        assert_eq!(next.phase, Phase::StartScreen);
        assert_eq!(report.phase, Phase::StartScreen);
        assert_eq!(*processor.state(), before);
    }

    #[test]
    fn test_state_persistence() {
        let mut processor = processor();
        into_exercise(&mut processor, RegionId::BicepCurlBox);
        tick(&mut processor, &frame(true, NOWHERE));
        let saved = processor.save_state().unwrap();

        let mut resumed = self::processor();
        resumed.load_state(&saved).unwrap();
        assert_eq!(resumed.phase(), Phase::Exercise);

        // The armed state survives the restart
        let report = tick(&mut resumed, &frame(false, NOWHERE));
        assert_eq!(report.rep_count, 1);
    }

    #[test]
    fn test_load_invalid_state() {
        let mut processor = processor();
        assert!(matches!(
            processor.load_state("not json"),
            Err(TrackingError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_inconsistent_state_rejected() {
        let mut processor = processor();
        into_exercise(&mut processor, RegionId::BicepCurlBox);
        let before = *processor.state();

        let session_outside_exercise = r#"{
            "phase": "log_in",
            "session": {"exercise": "bicep_curl", "rep_count": 3, "set_count": 0, "state": "relaxed"},
            "dashboard_launched": false
        }"#;
        assert!(matches!(
            processor.load_state(session_outside_exercise),
            Err(TrackingError::ParseError(_))
        ));

        let exercise_without_session =
            r#"{"phase": "exercise", "session": null, "dashboard_launched": false}"#;
        assert!(matches!(
            processor.load_state(exercise_without_session),
            Err(TrackingError::ParseError(_))
        ));

        assert_eq!(*processor.state(), before);
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let mut config = PipelineConfig::default();
        config.rep.contracted_threshold = 160;
        assert!(matches!(
            TickProcessor::with_config(config),
            Err(TrackingError::InvalidConfig(_))
        ));
    }

    fn record(hand: Vec3, tick_id: &str) -> TickRecord {
        let ts = "2024-03-02T10:15:00Z".parse::<DateTime<Utc>>().unwrap();
        let skeleton = SkeletonFrame::new(SkeletonTrackingState::Tracked, Vec3::new(0.0, 0.0, 2.0))
            .with_joint(JointType::HandLeft, hand, TrackingQuality::Tracked);
        TickRecord::new(ts, DISPLAY)
            .with_tick_id(tick_id)
            .with_skeleton(skeleton)
            .with_region(
                RegionId::ScanBarcode,
                Shape::Rect {
                    x: 300.0,
                    y: 220.0,
                    width: 40.0,
                    height: 40.0,
                },
            )
    }

    #[test]
    fn test_process_record_invalid() {
        let mut processor = TickProcessor::new();
        let mut bad = record(Vec3::new(0.0, 0.0, 2.0), "bad");
        bad.display = Size::new(-1.0, 480.0);
        assert!(matches!(
            processor.process_record(&bad),
            Err(TrackingError::InvalidTick(_))
        ));
    }

    #[test]
    fn test_process_ticks() {
        // Hand straight ahead lands in the centre of the sensor frame
        let ndjson = [
            record(Vec3::new(1.0, 1.0, 2.0), "t-1"),
            record(Vec3::new(0.0, 0.0, 2.0), "t-2"),
        ]
        .iter()
        .map(|r| serde_json::to_string(r).unwrap())
        .collect::<Vec<_>>()
        .join("\n");

        let reports = process_ticks(&ndjson, PipelineConfig::default()).unwrap();
        assert_eq!(reports.len(), 2);

        let first: serde_json::Value = serde_json::from_str(&reports[0]).unwrap();
        assert_eq!(first["producer"]["name"], "pantomime");
        assert_eq!(first["tick_id"], "t-1");
        assert_eq!(first["phase"], "log_in");

        let second: serde_json::Value = serde_json::from_str(&reports[1]).unwrap();
        assert_eq!(second["phase"], "start_screen");
        assert_eq!(second["cursor"]["x"], 320.0);
        assert_eq!(second["events"][1]["effect"], "capture_login_snapshot");
        assert_eq!(
            first["producer"]["instance_id"],
            second["producer"]["instance_id"]
        );
    }
}
