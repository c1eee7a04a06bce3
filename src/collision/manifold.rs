use serde::{Deserialize, Serialize};

use crate::math::vec2::Vec2;
use crate::objects::rigid_body::BodyId;

/// Result of the capsule closest-point solver.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClosestPoints {
    /// Witness point on the surface of the first capsule.
    pub point0: Vec2,
    /// Witness point on the surface of the second capsule.
    pub point1: Vec2,
    /// Unit separation normal, pointing from the first body towards the second.
    pub normal: Vec2,
    /// Signed surface distance; negative when penetrating.
    pub distance: f64,
    /// Length of the contact segment when `spreaded` is set.
    pub spread: f64,
    /// The contact is a segment (parallel capsules), not a single point.
    pub spreaded: bool,
    /// The normal is undefined; callers must skip this pair.
    pub degenerate: bool,
}

impl ClosestPoints {
    pub fn new(point0: Vec2, point1: Vec2, normal: Vec2, distance: f64) -> Self {
        Self {
            point0,
            point1,
            normal,
            distance,
            ..Self::default()
        }
    }

    pub fn degenerate() -> Self {
        Self {
            degenerate: true,
            ..Self::default()
        }
    }

    pub fn with_spread(mut self, spread: f64) -> Self {
        self.spreaded = true;
        self.spread = spread;
        self
    }

    pub fn is_penetrating(&self) -> bool {
        self.distance < 0.0
    }
}

/// Which body of the pair a half contact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactSide {
    First = 1,
    Second = 2,
}

/// One body's view of a contact, kept for rendering and diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactHalf {
    pub body: BodyId,
    pub other: BodyId,
    pub position: Vec2,
    /// Points away from `body`, towards `other`.
    pub normal: Vec2,
    pub penetration: f64,
    pub side: ContactSide,
}

impl ContactHalf {
    /// Appends the half contacts for one solver result.
    ///
    /// Every result yields the midpoint pair. A spread result is preceded
    /// by two more pairs shifted by ±spread/2 perpendicular to the normal,
    /// which gives resting capsules a two-point manifold.
    pub fn expand(body0: BodyId, body1: BodyId, cp: &ClosestPoints, out: &mut Vec<ContactHalf>) {
        if cp.spreaded {
            let shift = cp.normal.perpendicular() * (cp.spread * 0.5);
            Self::push_pair(body0, body1, cp, shift, out);
            Self::push_pair(body0, body1, cp, -shift, out);
        }
        Self::push_pair(body0, body1, cp, Vec2::ZERO, out);
    }

    fn push_pair(body0: BodyId, body1: BodyId, cp: &ClosestPoints, shift: Vec2, out: &mut Vec<ContactHalf>) {
        let penetration = -cp.distance;
        out.push(ContactHalf {
            body: body0,
            other: body1,
            position: cp.point0 + shift,
            normal: cp.normal,
            penetration,
            side: ContactSide::First,
        });
        out.push(ContactHalf {
            body: body1,
            other: body0,
            position: cp.point1 + shift,
            normal: -cp.normal,
            penetration,
            side: ContactSide::Second,
        });
    }
}
