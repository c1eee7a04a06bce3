use crate::math::Vec2;
use crate::objects::rigid_body::{BodyId, RigidBody};
use crate::shapes::Capsule;

/// Number of dynamic bodies in the stock demo.
pub const DEMO_BODY_COUNT: usize = 100;

const RAMP_RADIUS: f64 = 10.0;
const COLUMNS: usize = 8;

/// A funnel of two static ramps with `count` capsules dropped above the gap.
///
/// The first two bodies are the ramps. With at least two dynamic bodies the
/// second to last is a heavy double-size capsule; the last one is the paddle,
/// a wide capsule with zero inverse mass that is meant to be teleported
/// around between steps.
pub fn funnel_scene(count: usize) -> Vec<RigidBody> {
    let mut bodies = Vec::with_capacity(count + 2);
    bodies.push(RigidBody::new_static(
        BodyId(0),
        Capsule::new(Vec2::new(-1900.0, -300.0), Vec2::new(0.0, 300.0), RAMP_RADIUS),
    ));
    bodies.push(RigidBody::new_static(
        BodyId(1),
        Capsule::new(Vec2::new(1900.0, -300.0), Vec2::new(0.0, 300.0), RAMP_RADIUS),
    ));

    for i in 0..count {
        let position = Vec2::new(-50.0 + 15.0 * (i % COLUMNS) as f64, -5.0 * i as f64);
        let body = RigidBody::new_dynamic(BodyId(bodies.len()), Capsule::horizontal(8.0, 8.0), position, 1.0)
            .with_inverse_mass(1.0, 0.03);
        bodies.push(body);
    }

    let n = bodies.len();
    if count >= 2 {
        let heavy = &mut bodies[n - 2];
        heavy.inv_mass *= 0.1;
        heavy.inv_inertia *= 0.1;
        heavy.fixture = heavy.fixture.scaled(2.0);
        heavy.refresh_cache();
    }
    if count >= 1 {
        let paddle = &mut bodies[n - 1];
        paddle.inv_mass = 0.0;
        paddle.inv_inertia = 0.0005;
        paddle.fixture = Capsule::horizontal(100.0, 120.0);
        paddle.refresh_cache();
    }
    bodies
}

/// Id of the paddle in a scene built by [`funnel_scene`], if it has one.
pub fn paddle_id(count: usize) -> Option<BodyId> {
    (count >= 1).then(|| BodyId(count + 1))
}
