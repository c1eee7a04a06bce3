use std::ops::Mul;

use super::vec2::Vec2;

/// Rigid transform stored as two basis vectors plus a translation.
///
/// Points map as `p.x * x + p.y * y + translation`; directions skip the
/// translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub x: Vec2,
    pub y: Vec2,
    pub translation: Vec2,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        x: Vec2::X,
        y: Vec2::Y,
        translation: Vec2::ZERO,
    };

    /// Creates a new transform from raw basis vectors.
    pub fn new(x: Vec2, y: Vec2, translation: Vec2) -> Self {
        Self { x, y, translation }
    }

    /// Creates an identity transform (no translation, no rotation).
    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn rotation(angle: f64) -> Self {
        Self::rotation_translation(angle, Vec2::ZERO)
    }

    pub fn translation(t: Vec2) -> Self {
        Self::new(Vec2::X, Vec2::Y, t)
    }

    /// Rotation by `angle` followed by translation by `t`.
    pub fn rotation_translation(angle: f64, t: Vec2) -> Self {
        let x = Vec2::from_angle(angle);
        Self::new(x, x.perpendicular(), t)
    }

    /// Applies the transform (rotation then translation) to a point.
    pub fn apply(self, point: Vec2) -> Vec2 {
        self.apply_rotation(point) + self.translation
    }

    /// Applies only the rotational part, for directions.
    pub fn apply_rotation(self, v: Vec2) -> Vec2 {
        self.x * v.x + self.y * v.y
    }

    /// Maps a world point back into local space. Assumes an orthonormal basis.
    pub fn apply_inverse(self, point: Vec2) -> Vec2 {
        let local = point - self.translation;
        Vec2::new(local.dot(self.x), local.dot(self.y))
    }

    /// `self.then(other)` applies `other` first, then `self`.
    pub fn then(self, other: Transform) -> Transform {
        Transform::new(
            self.apply_rotation(other.x),
            self.apply_rotation(other.y),
            self.apply(other.translation),
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        self.then(rhs)
    }
}

impl Mul<Vec2> for Transform {
    type Output = Vec2;

    fn mul(self, rhs: Vec2) -> Vec2 {
        self.apply(rhs)
    }
}
