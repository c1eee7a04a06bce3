use capsule_physics::collision::{BruteForceIndex, SpatialIndex};
use capsule_physics::math::Vec2;
use capsule_physics::objects::{BodyId, RigidBody};
use capsule_physics::shapes::Capsule;
use capsule_physics::world::{funnel_scene, paddle_id, World, WorldConfig};

const EPSILON: f64 = 1e-9;

fn free_capsule(position: Vec2, velocity: Vec2) -> RigidBody {
    RigidBody::new_dynamic(BodyId(0), Capsule::horizontal(2.0, 1.0), position, 0.3).with_velocity(velocity, 0.0)
}

#[test]
fn free_body_moves_in_a_straight_line() {
    let start = Vec2::new(10.0, -20.0);
    let velocity = Vec2::new(120.0, -35.0);
    let mut world = World::new(WorldConfig::frictionless(), vec![free_capsule(start, velocity)]).unwrap();

    let dt = 1.0 / 60.0;
    for _ in 0..30 {
        world.step(dt).unwrap();
    }
    let body = &world.bodies()[0];
    let expected = start + velocity * (30.0 * dt);
    assert!((body.position - expected).magnitude() < 1e-6, "{:?} vs {:?}", body.position, expected);
    assert!((body.linear_velocity - velocity).magnitude() < 1e-6);
    assert!((body.angle - 0.3).abs() < EPSILON);
}

#[test]
fn overlapping_circles_separate_evenly() {
    let p = 0.8;
    let a = RigidBody::new_dynamic(BodyId(0), Capsule::circle(Vec2::ZERO, 2.0), Vec2::new(0.0, 0.0), 0.0);
    let b = RigidBody::new_dynamic(BodyId(1), Capsule::circle(Vec2::ZERO, 2.0), Vec2::new(4.0 - p, 0.0), 0.0);
    let config = WorldConfig { substeps: 1, ..WorldConfig::frictionless() };
    let mut world = World::new(config, vec![a, b]).unwrap();

    // Both start at rest without gravity, so only the correction moves them.
    world.step(1.0 / 60.0).unwrap();
    let a = world.bodies()[0].position;
    let b = world.bodies()[1].position;
    assert!((a.x + p / 2.0).abs() < 1e-6);
    assert!((b.x - (4.0 - p) - p / 2.0).abs() < 1e-6);
    assert!((b.x - a.x - 4.0).abs() < 1e-6);
    assert_eq!(world.contacts().len(), 2);
}

#[test]
fn kd_tree_and_brute_force_worlds_agree() {
    let bodies = funnel_scene(40);
    let mut tree_world = World::new(WorldConfig::default(), bodies.clone()).unwrap();
    let mut flat_world = World::with_index(WorldConfig::default(), bodies, BruteForceIndex::default()).unwrap();

    for _ in 0..20 {
        tree_world.step(1.0 / 60.0).unwrap();
        flat_world.step(1.0 / 60.0).unwrap();
    }
    for (a, b) in tree_world.bodies().iter().zip(flat_world.bodies()) {
        assert!((a.position - b.position).magnitude() < EPSILON);
        assert!((a.angle - b.angle).abs() < EPSILON);
    }
    assert_eq!(tree_world.contacts().len(), flat_world.contacts().len());
}

#[test]
fn funnel_scene_stays_finite_and_consistent() {
    let count = 60;
    let mut world = World::new(WorldConfig::default(), funnel_scene(count)).unwrap();
    let paddle = paddle_id(count).unwrap();

    for frame in 0..120 {
        let x = 300.0 * (frame as f64 * 0.05).sin();
        world.teleport(paddle, Vec2::new(x, 700.0)).unwrap();
        world.step(1.0 / 60.0).unwrap();
    }

    world.index().validate().unwrap();
    assert_eq!(world.index().len(), count + 2);
    for body in world.bodies() {
        assert!(body.position.x.is_finite() && body.position.y.is_finite());
        assert!(body.angle.is_finite());
        assert!(body.linear_velocity.magnitude().is_finite());
    }
    // Ramps never move.
    assert_eq!(world.bodies()[0].position, Vec2::ZERO);
    assert_eq!(world.bodies()[1].position, Vec2::ZERO);
    // The falling capsules have piled into each other by now.
    assert!(!world.contacts().is_empty());
    assert!(!world.notable_points().is_empty());
}

#[test]
fn contact_halves_come_in_pairs() {
    let mut world = World::new(WorldConfig::default(), funnel_scene(30)).unwrap();
    for _ in 0..60 {
        world.step(1.0 / 60.0).unwrap();
    }
    let contacts = world.contacts();
    assert_eq!(contacts.len() % 2, 0);
    for pair in contacts.chunks(2) {
        assert_eq!(pair[0].body, pair[1].other);
        assert_eq!(pair[1].body, pair[0].other);
        assert!(pair[0].body < pair[0].other);
        assert!((pair[0].normal + pair[1].normal).magnitude() < EPSILON);
        assert_eq!(pair[0].penetration, pair[1].penetration);
    }
}
