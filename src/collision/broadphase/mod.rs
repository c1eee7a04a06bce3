//! Broad phase: spatial indices over fat bounding rectangles.
//!
//! Two implementations share the [`SpatialIndex`] contract: the incremental
//! [`KdTree`] used by the world, and the flat [`BruteForceIndex`] which scans
//! every holder and serves as a reference.

pub mod brute_force;
pub mod kd_tree;

use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::collision::aabb::AABB;
use crate::error::IndexError;
use crate::math::vec2::Vec2;

pub use brute_force::BruteForceIndex;
pub use kd_tree::{IndexStats, KdTree, NodeRef, SnapshotHolder, SnapshotNode, TreeSnapshot};

/// Anything the broad phase can hold.
pub trait Indexable {
    type Key: Copy + Eq + Hash + Debug;

    fn key(&self) -> Self::Key;

    /// Exact world-space bound of the current shape.
    fn fit_rect(&self) -> AABB;

    /// Velocity used to lead the fat rectangle in the direction of motion.
    fn velocity(&self) -> Vec2;
}

/// Capability set shared by every broad-phase index.
pub trait SpatialIndex<K> {
    fn contains(&self, key: K) -> bool;

    /// Inserts the body, or refreshes its rectangles if it is already held.
    ///
    /// Returns `true` when the index was structurally touched (new holder,
    /// or an existing holder re-fattened), `false` when the body still fits
    /// its sticky fat rectangle.
    fn add_or_update<B: Indexable<Key = K>>(&mut self, body: &B) -> Result<bool, IndexError>;

    /// Returns `false` if the key was not held.
    fn remove(&mut self, key: K) -> Result<bool, IndexError>;

    /// Calls `visitor` for every held key whose fat rectangle overlaps `rect`.
    fn traverse_overlapping(&self, rect: &AABB, visitor: &mut dyn FnMut(K)) -> Result<(), IndexError>;

    /// Every held key. Fails only if the index structure is broken.
    fn keys(&self) -> Result<Vec<K>, IndexError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tuning knobs for the broad phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// A leaf holding more than this many holders is considered for a split.
    pub leaf_capacity: usize,
    /// Number of cosmetic updates a holder absorbs before it is re-fattened anyway.
    pub refresh_interval: u32,
    /// One rebalance attempt runs every this many mutations; 1 means after each one.
    pub rebalance_interval: u32,
    /// Each side of the fat rectangle grows by this fraction of the fit size.
    pub fat_size_factor: f64,
    /// The fat rectangle is stretched by velocity times this factor.
    pub fat_velocity_factor: f64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            leaf_capacity: 2,
            refresh_interval: 10_000,
            rebalance_interval: 10,
            fat_size_factor: 0.2,
            fat_velocity_factor: 0.2,
        }
    }
}

/// The tight and inflated rectangles an index stores per holder.
///
/// `fat` always contains `fit` at the moment it is computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRects {
    pub fit: AABB,
    pub fat: AABB,
}

impl BoundingRects {
    pub fn compute(fit: AABB, velocity: Vec2, config: &IndexConfig) -> Self {
        let padded = fit.extend_sides(fit.size() * config.fat_size_factor);
        let fat = padded.merged(&padded.translate(velocity * config.fat_velocity_factor));
        Self { fit, fat }
    }

    /// True if a new tight rectangle is still covered by the stored fat one.
    pub fn still_fits(&self, fit: &AABB) -> bool {
        self.fat.contains(fit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fat_rect_padding_and_lead() {
        let fit = AABB::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 20.0));
        let rects = BoundingRects::compute(fit, Vec2::new(50.0, 0.0), &IndexConfig::default());
        assert_eq!(rects.fit, fit);
        // Padding is 0.2 of the size on each side, then stretched 10 units along +x.
        assert_eq!(rects.fat.min, Vec2::new(-2.0, -4.0));
        assert_eq!(rects.fat.max, Vec2::new(22.0, 24.0));
        assert!(rects.still_fits(&fit));
    }

    #[test]
    fn test_fat_rect_leads_against_negative_velocity() {
        let fit = AABB::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        let rects = BoundingRects::compute(fit, Vec2::new(0.0, -100.0), &IndexConfig::default());
        assert_eq!(rects.fat.min, Vec2::new(-2.0, -22.0));
        assert_eq!(rects.fat.max, Vec2::new(12.0, 12.0));
    }

    #[test]
    fn test_moved_fit_leaves_fat() {
        let fit = AABB::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        let rects = BoundingRects::compute(fit, Vec2::ZERO, &IndexConfig::default());
        assert!(rects.still_fits(&fit.translate(Vec2::new(1.5, -1.5))));
        assert!(!rects.still_fits(&fit.translate(Vec2::new(2.5, 0.0))));
    }
}
