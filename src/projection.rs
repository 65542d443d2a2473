//! Screen projection and hit testing
//!
//! Maps a skeleton-space joint into display coordinates and tests the result
//! against the region bounds the UI reports for the current tick. The
//! sensor-space → frame-pixel mapping is injected through [`CoordinateMapper`];
//! [`PinholeMapper`] is the stand-in used when the host has no sensor SDK.

use crate::types::{RegionId, ScreenPoint, ScreenRegion, Shape, Size};
use crate::vector::Vec3;

/// Maps skeleton-space points into native sensor frame pixels
pub trait CoordinateMapper {
    /// `None` when the point cannot be mapped (e.g. behind the sensor)
    fn to_sensor_frame(&self, point: Vec3) -> Option<ScreenPoint>;
}

impl<F> CoordinateMapper for F
where
    F: Fn(Vec3) -> Option<ScreenPoint>,
{
    fn to_sensor_frame(&self, point: Vec3) -> Option<ScreenPoint> {
        self(point)
    }
}

/// Pinhole camera model centred in the sensor frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeMapper {
    pub frame: Size,
    pub focal_length_px: f64,
}

impl PinholeMapper {
    pub fn new(frame: Size, focal_length_px: f64) -> Self {
        Self {
            frame,
            focal_length_px,
        }
    }
}

impl CoordinateMapper for PinholeMapper {
    fn to_sensor_frame(&self, point: Vec3) -> Option<ScreenPoint> {
        if !point.is_finite() || point.z <= f64::EPSILON {
            return None;
        }
        let x = self.frame.width / 2.0 + point.x * self.focal_length_px / point.z;
        // Sensor y points up, pixel rows grow downward
        let y = self.frame.height / 2.0 - point.y * self.focal_length_px / point.z;
        Some(ScreenPoint::new(x, y))
    }
}

/// Display and sensor sizes for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub display: Size,
    pub sensor_frame: Size,
}

impl Calibration {
    pub fn new(display: Size, sensor_frame: Size) -> Self {
        Self {
            display,
            sensor_frame,
        }
    }
}

/// Project a joint position onto the display surface
pub fn project(
    position: Vec3,
    mapper: &dyn CoordinateMapper,
    calibration: &Calibration,
) -> Option<ScreenPoint> {
    if !calibration.sensor_frame.is_valid() {
        return None;
    }
    let frame_point = mapper.to_sensor_frame(position)?;
    let scale_x = calibration.display.width / calibration.sensor_frame.width;
    let scale_y = calibration.display.height / calibration.sensor_frame.height;
    Some(ScreenPoint::new(frame_point.x * scale_x, frame_point.y * scale_y))
}

/// Anything that can answer a point-in-shape query
pub trait HitShape {
    fn contains(&self, point: ScreenPoint) -> bool;
}

impl HitShape for Shape {
    fn contains(&self, point: ScreenPoint) -> bool {
        match *self {
            Shape::Rect {
                x,
                y,
                width,
                height,
            } => {
                width >= 0.0
                    && height >= 0.0
                    && point.x >= x
                    && point.x <= x + width
                    && point.y >= y
                    && point.y <= y + height
            }
            Shape::Ellipse { cx, cy, rx, ry } => {
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let dx = (point.x - cx) / rx;
                let dy = (point.y - cy) / ry;
                dx * dx + dy * dy <= 1.0
            }
        }
    }
}

/// Whether the point falls inside the region's current bounds
pub fn hit_test(point: ScreenPoint, region: &ScreenRegion) -> bool {
    region.bounds.contains(point)
}

/// First visible region (in `visible` order) the point falls in
///
/// Regions supplied by the UI but absent from `visible` are never tested.
pub fn first_hit(
    point: ScreenPoint,
    regions: &[ScreenRegion],
    visible: &[RegionId],
) -> Option<RegionId> {
    visible.iter().copied().find(|id| {
        regions
            .iter()
            .filter(|region| region.id == *id)
            .any(|region| hit_test(point, region))
    })
}
