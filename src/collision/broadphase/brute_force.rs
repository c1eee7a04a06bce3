use std::collections::HashMap;
use std::hash::Hash;

use crate::collision::aabb::AABB;
use crate::error::IndexError;

use super::{BoundingRects, IndexConfig, Indexable, SpatialIndex};

#[derive(Debug, Clone)]
struct Entry {
    rects: BoundingRects,
    refresh: u32,
}

/// Flat list of holders scanned linearly on every query.
///
/// Uses the same sticky fat-rectangle rules as [`super::KdTree`], so for the
/// same sequence of operations both report identical overlap sets.
#[derive(Debug, Clone)]
pub struct BruteForceIndex<K> {
    entries: HashMap<K, Entry>,
    // Insertion order, kept so traversal is deterministic.
    order: Vec<K>,
    config: IndexConfig,
}

impl<K: Copy + Eq + Hash> BruteForceIndex<K> {
    pub fn new(config: IndexConfig) -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            config,
        }
    }

    pub fn fat_rect(&self, key: K) -> Option<AABB> {
        self.entries.get(&key).map(|e| e.rects.fat)
    }
}

impl<K: Copy + Eq + Hash> Default for BruteForceIndex<K> {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}

impl<K: Copy + Eq + Hash> SpatialIndex<K> for BruteForceIndex<K> {
    fn contains(&self, key: K) -> bool {
        self.entries.contains_key(&key)
    }

    fn add_or_update<B: Indexable<Key = K>>(&mut self, body: &B) -> Result<bool, IndexError> {
        let key = body.key();
        let fit = body.fit_rect();
        if let Some(entry) = self.entries.get_mut(&key) {
            if entry.rects.still_fits(&fit) && entry.refresh > 0 {
                entry.refresh -= 1;
                entry.rects.fit = fit;
                return Ok(false);
            }
            entry.rects = BoundingRects::compute(fit, body.velocity(), &self.config);
            entry.refresh = self.config.refresh_interval;
            return Ok(true);
        }
        self.entries.insert(
            key,
            Entry {
                rects: BoundingRects::compute(fit, body.velocity(), &self.config),
                refresh: self.config.refresh_interval,
            },
        );
        self.order.push(key);
        Ok(true)
    }

    fn remove(&mut self, key: K) -> Result<bool, IndexError> {
        if self.entries.remove(&key).is_none() {
            return Ok(false);
        }
        self.order.retain(|k| *k != key);
        Ok(true)
    }

    fn traverse_overlapping(&self, rect: &AABB, visitor: &mut dyn FnMut(K)) -> Result<(), IndexError> {
        for key in &self.order {
            if let Some(entry) = self.entries.get(key) {
                if entry.rects.fat.overlaps(rect) {
                    visitor(*key);
                }
            }
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<K>, IndexError> {
        Ok(self.order.clone())
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}
