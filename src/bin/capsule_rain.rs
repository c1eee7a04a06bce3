//! Headless run of the funnel demo.
//!
//! Usage: `capsule_rain [steps] [bodies]`. Set `RUST_LOG=debug` to see the
//! tree rebalancing decisions.

use std::env;
use std::error::Error;

use capsule_physics::math::Vec2;
use capsule_physics::world::{funnel_scene, paddle_id, World, WorldConfig, DEMO_BODY_COUNT};
use tracing::info;
use tracing_subscriber::EnvFilter;

const FRAME_DT: f64 = 1.0 / 60.0;
const REPORT_EVERY: usize = 60;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let steps: usize = match args.get(1) {
        Some(s) => s.parse()?,
        None => 600,
    };
    let count: usize = match args.get(2) {
        Some(s) => s.parse()?,
        None => DEMO_BODY_COUNT,
    };

    let mut world = World::new(WorldConfig::default(), funnel_scene(count))?;
    let paddle = paddle_id(count);

    for frame in 0..steps {
        // The paddle sweeps back and forth under the funnel mouth.
        if let Some(id) = paddle {
            let t = frame as f64 * FRAME_DT;
            world.teleport(id, Vec2::new(400.0 * (t * 0.5).sin(), 700.0))?;
        }
        world.step(FRAME_DT)?;

        if (frame + 1) % REPORT_EVERY == 0 {
            let max_speed = world
                .bodies()
                .iter()
                .map(|b| b.linear_velocity.magnitude())
                .fold(0.0, f64::max);
            let stats = world.index().stats();
            info!(
                frame = frame + 1,
                contacts = world.contacts().len(),
                notable_points = world.notable_points().len(),
                max_speed,
                nodes = world.index().node_count(),
                splits = stats.splits,
                collapses = stats.collapses,
                relocations = stats.relocations,
                "progress"
            );
        }
    }

    world.index().validate()?;
    let snapshot = world.index().snapshot()?;
    info!(
        bodies = world.bodies().len(),
        depth = snapshot.root.depth(),
        leaves = snapshot.root.leaf_count(),
        "done"
    );
    Ok(())
}
