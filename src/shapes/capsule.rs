use serde::{Deserialize, Serialize};

use crate::math::scalar::try_invert_positive;
use crate::math::{Transform, Vec2};

/// A thick line segment: every point within `radius` of the segment `p0..p1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Capsule {
    pub p0: Vec2,
    pub p1: Vec2,
    pub radius: f64,
}

impl Capsule {
    pub fn new(p0: Vec2, p1: Vec2, radius: f64) -> Self {
        Self { p0, p1, radius }
    }

    /// A zero-length capsule.
    pub fn circle(center: Vec2, radius: f64) -> Self {
        Self::new(center, center, radius)
    }

    /// Horizontal capsule centred on the local origin.
    pub fn horizontal(half_length: f64, radius: f64) -> Self {
        Self::new(
            Vec2::new(-half_length, 0.0),
            Vec2::new(half_length, 0.0),
            radius,
        )
    }

    /// Both endpoints mapped through `transform`; the radius is unchanged.
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self::new(transform.apply(self.p0), transform.apply(self.p1), self.radius)
    }

    pub fn length(&self) -> f64 {
        self.p0.distance(self.p1)
    }

    /// Uniform scale about the local origin, used to build the heavy demo body.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.p0 * factor, self.p1 * factor, self.radius * factor)
    }
}

/// World-space capsule with the derived quantities the solver needs.
///
/// `normal` is the segment direction rotated by +90 degrees and normalized.
/// For a segment shorter than `EPS` the capsule is flagged as a circle and
/// `normal`/`inv_length` are zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleCache {
    pub capsule: Capsule,
    pub normal: Vec2,
    pub center: Vec2,
    pub length: f64,
    pub inv_length: f64,
    pub is_circle: bool,
}

impl CapsuleCache {
    pub fn new(capsule: Capsule) -> Self {
        let d = capsule.p1 - capsule.p0;
        let length = d.magnitude();
        let (inv_length, is_circle) = try_invert_positive(length);
        Self {
            capsule,
            normal: d.perpendicular() * inv_length,
            center: Vec2::lerp(0.5, capsule.p0, capsule.p1),
            length,
            inv_length,
            is_circle,
        }
    }

    pub fn radius(&self) -> f64 {
        self.capsule.radius
    }

    /// Segment direction `p1 - p0` (not normalized).
    pub fn direction(&self) -> Vec2 {
        self.capsule.p1 - self.capsule.p0
    }
}
