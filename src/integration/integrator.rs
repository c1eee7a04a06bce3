use crate::math::scalar::{clamp_symmetric, wrap_offset, TWO_PI};
use crate::math::vec2::Vec2;
use crate::objects::rigid_body::RigidBody;

/// Per-substep constants derived once per world step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerletCoefficients {
    /// Length of one substep in seconds.
    pub dt: f64,
    /// Gravity as a position change per substep, `g * dt^2`.
    pub gravity_dp: Vec2,
    /// Fraction of the Verlet position delta kept per substep, `(1 - d)^dt`.
    pub position_damping: f64,
    pub angular_damping: f64,
}

impl VerletCoefficients {
    /// # Arguments
    /// * `full_dt` - Duration of the whole external step.
    /// * `substeps` - Number of substeps the step is divided into (at least 1).
    /// * `position_damping`, `angular_damping` - Fraction of velocity lost per second.
    pub fn new(full_dt: f64, substeps: u32, gravity: Vec2, position_damping: f64, angular_damping: f64) -> Self {
        let dt = full_dt / f64::from(substeps.max(1));
        Self {
            dt,
            gravity_dp: gravity * (dt * dt),
            position_damping: (1.0 - position_damping).powf(dt),
            angular_damping: (1.0 - angular_damping).powf(dt),
        }
    }
}

/// Clamps the body's velocities and rebuilds the Verlet history from them.
///
/// Returns `true` if either velocity had to be clamped.
pub fn clamp_and_seed_history(body: &mut RigidBody, max_velocity: f64, max_angular_velocity: f64, dt: f64) -> bool {
    let linear = body.linear_velocity.clamp_length(max_velocity);
    let angular = clamp_symmetric(body.angular_velocity, max_angular_velocity);
    let clamped = linear != body.linear_velocity || angular != body.angular_velocity;
    body.linear_velocity = linear;
    body.angular_velocity = angular;
    body.last_position = body.position - body.linear_velocity * dt;
    body.last_angle = body.angle - body.angular_velocity * dt;
    clamped
}

/// Advances one dynamic body by a single substep and refreshes its cache.
/// Static bodies only get their cache refreshed.
pub fn integrate_substep(body: &mut RigidBody, coeffs: &VerletCoefficients) {
    if body.is_dynamic() {
        // --- Linear Motion --- //
        body.position += coeffs.gravity_dp;
        let position_delta = body.position - body.last_position;
        body.last_position = body.position;
        body.position += position_delta * coeffs.position_damping;

        // --- Angular Motion --- //
        let angle_delta = body.angle - body.last_angle;
        body.last_angle = body.angle;
        body.angle += angle_delta * coeffs.angular_damping;

        // Shift both angles together so the implicit angular velocity survives the wrap.
        let offset = wrap_offset(body.angle, TWO_PI);
        body.angle += offset;
        body.last_angle += offset;
    }
    body.refresh_cache();
}

/// Derives the externally visible velocities from the last substep's motion.
pub fn publish_velocities(body: &mut RigidBody, dt: f64) {
    let inv_dt = 1.0 / dt;
    body.linear_velocity = (body.position - body.last_position) * inv_dt;
    body.angular_velocity = (body.angle - body.last_angle) * inv_dt;
}
