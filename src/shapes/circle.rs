use crate::math::vec2::Vec2;

/// A disc in world space. Capsules degrade to circles at their endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f64,
}
