//! 2D rigid-body simulation of capsules.
//!
//! Bodies are integrated with position Verlet over a fixed number of
//! substeps. After every substep overlapping pairs found by an incremental
//! k-d box tree are pushed apart by positional correction.

pub mod collision;
pub mod error;
pub mod integration;
pub mod math;
pub mod objects;
pub mod shapes;
pub mod world;

// Re-export key types for easier use
pub use collision::{ClosestPoints, ContactHalf, ContactSide, KdTree, SpatialIndex, AABB};
pub use error::{IndexError, PhysicsError};
pub use math::vec2::Vec2;
pub use objects::{BodyId, BodyKind, RigidBody};
pub use shapes::{Capsule, CapsuleCache};
pub use world::{World, WorldConfig};
