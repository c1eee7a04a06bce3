use serde::{Deserialize, Serialize};

use crate::collision::broadphase::Indexable;
use crate::collision::AABB;
use crate::math::{Transform, Vec2};
use crate::shapes::{Capsule, CapsuleCache};

/// Stable identity of a body: its index in the world's body list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never integrated; still pushed by corrections if it has inverse mass.
    Static,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    pub id: BodyId,
    pub kind: BodyKind,

    // Primary state
    pub position: Vec2,
    pub angle: f64, // Radians
    pub linear_velocity: Vec2,
    pub angular_velocity: f64,

    // Verlet history, seeded from the velocities at the start of every step
    pub last_position: Vec2,
    pub last_angle: f64,

    /// Capsule in body-local coordinates.
    pub fixture: Capsule,
    pub inv_mass: f64,    // 0.0 => not moved by corrections
    pub inv_inertia: f64, // 0.0 => not rotated by corrections

    transform: Transform,
    cache: CapsuleCache,
}

impl RigidBody {
    /// Creates a dynamic body at `position` with unit inverse mass.
    ///
    /// The world-space cache is valid right away.
    pub fn new_dynamic(id: BodyId, fixture: Capsule, position: Vec2, angle: f64) -> Self {
        let mut body = Self {
            id,
            kind: BodyKind::Dynamic,
            position,
            angle,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            last_position: position,
            last_angle: angle,
            fixture,
            inv_mass: 1.0,
            inv_inertia: 0.0,
            transform: Transform::IDENTITY,
            cache: CapsuleCache::new(fixture),
        };
        body.refresh_cache();
        body
    }

    /// Creates an immovable body whose fixture is already in world space.
    pub fn new_static(id: BodyId, fixture: Capsule) -> Self {
        let mut body = Self::new_dynamic(id, fixture, Vec2::ZERO, 0.0);
        body.kind = BodyKind::Static;
        body.inv_mass = 0.0;
        body
    }

    pub fn with_inverse_mass(mut self, inv_mass: f64, inv_inertia: f64) -> Self {
        self.inv_mass = inv_mass;
        self.inv_inertia = inv_inertia;
        self
    }

    pub fn with_velocity(mut self, linear: Vec2, angular: f64) -> Self {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
        self
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }

    /// Recomputes the transform and the world-space capsule from
    /// `position` and `angle`. Must be called after either changes.
    pub fn refresh_cache(&mut self) {
        self.transform = Transform::rotation_translation(self.angle, self.position);
        self.cache = CapsuleCache::new(self.fixture.transformed(&self.transform));
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// World-space capsule as of the last `refresh_cache`.
    pub fn capsule(&self) -> &CapsuleCache {
        &self.cache
    }

    /// Tight bound of the cached world-space capsule.
    pub fn fit_rect(&self) -> AABB {
        let c = &self.cache.capsule;
        let r = Vec2::new(c.radius, c.radius);
        AABB::new(c.p0.component_min(c.p1) - r, c.p0.component_max(c.p1) + r)
    }
}

impl Indexable for RigidBody {
    type Key = BodyId;

    fn key(&self) -> BodyId {
        self.id
    }

    fn fit_rect(&self) -> AABB {
        RigidBody::fit_rect(self)
    }

    fn velocity(&self) -> Vec2 {
        self.linear_velocity
    }
}
