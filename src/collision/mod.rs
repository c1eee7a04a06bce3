pub mod aabb;
pub mod broadphase;
pub mod detection;
pub mod manifold;

// Re-export key types
pub use aabb::{Axis, AABB};
pub use broadphase::{BoundingRects, BruteForceIndex, IndexConfig, Indexable, KdTree, SpatialIndex};
pub use detection::{collide, collide_circles};
pub use manifold::{ClosestPoints, ContactHalf, ContactSide};
