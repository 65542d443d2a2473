//! Core types for the Pantomime pipeline
//!
//! This module defines the data that flows through each tick: skeleton frames
//! in, angle sets and session counters in the middle, tick reports out.

use crate::vector::Vec3;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Skeleton joints reported by the depth sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JointType {
    HipCenter,
    Spine,
    ShoulderCenter,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
}

/// Per-joint tracking confidence, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingQuality {
    NotTracked,
    Inferred,
    Tracked,
}

/// Whole-skeleton tracking state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkeletonTrackingState {
    NotTracked,
    PositionOnly,
    Tracked,
}

/// One labelled joint in one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointSample {
    pub joint: JointType,
    pub position: Vec3,
    pub quality: TrackingQuality,
}

/// One skeleton as delivered by the sensor for a single tick
///
/// Joints are keyed by name; a joint absent from the map is simply missing.
/// On the wire the joints are a plain list of samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonFrame {
    pub tracking_state: SkeletonTrackingState,
    /// Body centre position
    pub position: Vec3,
    #[serde(
        serialize_with = "serialize_joints",
        deserialize_with = "deserialize_joints",
        default
    )]
    pub joints: BTreeMap<JointType, JointSample>,
}

impl SkeletonFrame {
    pub fn new(tracking_state: SkeletonTrackingState, position: Vec3) -> Self {
        Self {
            tracking_state,
            position,
            joints: BTreeMap::new(),
        }
    }

    /// Add or replace a joint sample
    pub fn with_joint(mut self, joint: JointType, position: Vec3, quality: TrackingQuality) -> Self {
        self.insert(JointSample {
            joint,
            position,
            quality,
        });
        self
    }

    pub fn insert(&mut self, sample: JointSample) {
        self.joints.insert(sample.joint, sample);
    }

    pub fn joint(&self, joint: JointType) -> Option<&JointSample> {
        self.joints.get(&joint)
    }

    /// Position of a joint whose tracking quality is at least `min_quality`
    pub fn position_of(&self, joint: JointType, min_quality: TrackingQuality) -> Option<Vec3> {
        self.joint(joint)
            .filter(|sample| sample.quality >= min_quality)
            .map(|sample| sample.position)
    }

    pub fn is_tracked(&self) -> bool {
        self.tracking_state == SkeletonTrackingState::Tracked
    }
}

fn serialize_joints<S>(joints: &BTreeMap<JointType, JointSample>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(joints.values())
}

fn deserialize_joints<'de, D>(deserializer: D) -> Result<BTreeMap<JointType, JointSample>, D::Error>
where
    D: Deserializer<'de>,
{
    let samples: Vec<JointSample> = Vec::deserialize(deserializer)?;
    Ok(samples.into_iter().map(|s| (s.joint, s)).collect())
}

/// The four joint angles the pipeline measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleKind {
    RightElbow,
    RightShoulder,
    LeftElbow,
    LeftShoulder,
}

impl AngleKind {
    pub const ALL: [AngleKind; 4] = [
        AngleKind::RightElbow,
        AngleKind::RightShoulder,
        AngleKind::LeftElbow,
        AngleKind::LeftShoulder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AngleKind::RightElbow => "right_elbow",
            AngleKind::RightShoulder => "right_shoulder",
            AngleKind::LeftElbow => "left_elbow",
            AngleKind::LeftShoulder => "left_shoulder",
        }
    }
}

/// Joint angles for one frame, in whole degrees (0-180)
///
/// `None` means the angle is unknown this tick (missing joint or degenerate
/// geometry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AngleSet {
    pub right_elbow: Option<u8>,
    pub right_shoulder: Option<u8>,
    pub left_elbow: Option<u8>,
    pub left_shoulder: Option<u8>,
}

impl AngleSet {
    /// Every angle unknown
    pub const UNKNOWN: AngleSet = AngleSet {
        right_elbow: None,
        right_shoulder: None,
        left_elbow: None,
        left_shoulder: None,
    };

    pub fn get(&self, kind: AngleKind) -> Option<u8> {
        match kind {
            AngleKind::RightElbow => self.right_elbow,
            AngleKind::RightShoulder => self.right_shoulder,
            AngleKind::LeftElbow => self.left_elbow,
            AngleKind::LeftShoulder => self.left_shoulder,
        }
    }

    pub fn set(&mut self, kind: AngleKind, value: Option<u8>) {
        match kind {
            AngleKind::RightElbow => self.right_elbow = value,
            AngleKind::RightShoulder => self.right_shoulder = value,
            AngleKind::LeftElbow => self.left_elbow = value,
            AngleKind::LeftShoulder => self.left_shoulder = value,
        }
    }

    pub fn known_count(&self) -> usize {
        AngleKind::ALL.iter().filter(|k| self.get(**k).is_some()).count()
    }
}

/// Exercise selected on the start screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    BicepCurl,
    LateralRaise,
}

impl ExerciseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::BicepCurl => "bicep_curl",
            ExerciseKind::LateralRaise => "lateral_raise",
        }
    }
}

/// Hysteresis state of the monitored limb pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepState {
    #[default]
    Relaxed,
    Armed,
}

/// Counters carried across ticks while in the exercise phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseSession {
    pub exercise: ExerciseKind,
    pub rep_count: u32,
    pub set_count: u32,
    pub state: RepState,
}

impl ExerciseSession {
    /// Fresh session with zeroed counters
    pub fn new(exercise: ExerciseKind) -> Self {
        Self {
            exercise,
            rep_count: 0,
            set_count: 0,
            state: RepState::Relaxed,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state == RepState::Armed
    }
}

/// Top-level application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    LogIn,
    StartScreen,
    Exercise,
    Summary,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::LogIn => "log_in",
            Phase::StartScreen => "start_screen",
            Phase::Exercise => "exercise",
            Phase::Summary => "summary",
        }
    }
}

/// Named interactive screen regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionId {
    ScanBarcode,
    BicepCurlBox,
    LateralRaiseBox,
    LaunchDashboard,
    FinishWorkout,
}

/// Point in display (screen) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height of a surface, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Hit-testable region bounds in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Ellipse {
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
    },
}

/// A named region with the bounds the UI reports for this tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenRegion {
    pub id: RegionId,
    pub bounds: Shape,
}

/// Side effect the host must perform after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Capture and dispose the login snapshot
    CaptureLoginSnapshot,
    /// Open the external dashboard
    OpenDashboard,
}

/// Notification produced during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TickEvent {
    PhaseChanged { from: Phase, to: Phase },
    RepCompleted { exercise: ExerciseKind, rep_count: u32 },
    Effect { effect: Effect },
}

/// Hint asking the user to move a limb further
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionalCue {
    pub angle: AngleKind,
    pub degrees: u8,
}

/// Everything the rendering collaborator needs after one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub phase: Phase,
    pub exercise: Option<ExerciseKind>,
    pub rep_count: u32,
    pub set_count: u32,
    pub skeleton_tracked: bool,
    /// Angles for overlay labelling (absent when no skeleton was tracked)
    pub angles: Option<AngleSet>,
    /// Pointer hand in screen space (absent when the hand is not tracked)
    pub cursor: Option<ScreenPoint>,
    pub visible_regions: Vec<RegionId>,
    pub cues: Vec<DirectionalCue>,
    pub events: Vec<TickEvent>,
}

impl TickReport {
    pub fn effects(&self) -> impl Iterator<Item = Effect> + '_ {
        self.events.iter().filter_map(|e| match e {
            TickEvent::Effect { effect } => Some(*effect),
            _ => None,
        })
    }
}
