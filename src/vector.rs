//! Joint vector geometry
//!
//! Minimal 3D vector in sensor space plus the angle-between-vectors
//! operation every joint angle is built from.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Neg, Sub};
use thiserror::Error;

/// Vectors shorter than this cannot be normalized
pub const MIN_VECTOR_LENGTH: f64 = 1e-9;

/// World-up direction in sensor space
pub const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// One of the input vectors had (near) zero length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("degenerate vector: zero length")]
pub struct DegenerateVector;

/// 3D position or direction (sensor units, metres for skeleton space)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Unit vector in the same direction
    pub fn normalized(self) -> Result<Self, DegenerateVector> {
        let len = self.length();
        if !len.is_finite() || len < MIN_VECTOR_LENGTH {
            return Err(DegenerateVector);
        }
        Ok(Self::new(self.x / len, self.y / len, self.z / len))
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Angle between two vectors in degrees, in [0, 180]
///
/// Both vectors are normalized first; the dot product is clamped to [-1, 1]
/// so rounding error on (anti)parallel inputs cannot push `acos` out of range.
pub fn angle_between(a: Vec3, b: Vec3) -> Result<f64, DegenerateVector> {
    let a = a.normalized()?;
    let b = b.normalized()?;
    let dot = a.dot(b).clamp(-1.0, 1.0);
    Ok(dot.acos().to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_identical_vectors() {
        let v = Vec3::new(0.3, -0.4, 0.5);
        assert!(approx(angle_between(v, v).unwrap(), 0.0));
        assert!(approx(angle_between(UP, UP).unwrap(), 0.0));
    }

    #[test]
    fn test_opposite_vectors() {
        let v = Vec3::new(1.0, 2.0, -3.0);
        assert!(approx(angle_between(v, -v).unwrap(), 180.0));
    }

    #[test]
    fn test_right_angle() {
        let x = Vec3::new(2.0, 0.0, 0.0);
        assert!(approx(angle_between(x, UP).unwrap(), 90.0));
    }

    #[test]
    fn test_symmetry_and_range() {
        let samples = [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.2, 0.9, -0.1),
            Vec3::new(-0.7, -0.7, 0.1),
            Vec3::new(0.0, 0.0, -3.0),
            Vec3::new(1e-3, 5.0, 2.0),
        ];
        for a in samples {
            for b in samples {
                let ab = angle_between(a, b).unwrap();
                let ba = angle_between(b, a).unwrap();
                assert!((0.0..=180.0).contains(&ab));
                assert!(approx(ab, ba));
            }
        }
    }

    #[test]
    fn test_degenerate_vector() {
        assert_eq!(angle_between(Vec3::ZERO, UP), Err(DegenerateVector));
        assert_eq!(angle_between(UP, Vec3::new(1e-12, 0.0, 0.0)), Err(DegenerateVector));
    }

    #[test]
    fn test_scale_invariance() {
        let a = Vec3::new(0.0, 1.0, 0.0);
        let b = Vec3::new(1.0, 1.0, 0.0);
        let scaled = Vec3::new(100.0, 100.0, 0.0);
        assert!(approx(angle_between(a, b).unwrap(), 45.0));
        assert!(approx(angle_between(a, scaled).unwrap(), 45.0));
    }
}
