pub mod config;
pub mod physics_world;
pub mod scene;

pub use config::WorldConfig;
pub use physics_world::World;
pub use scene::{funnel_scene, paddle_id, DEMO_BODY_COUNT};
