//! Incremental k-d box tree.
//!
//! Every inner node splits space at a pivot along one axis and owns three
//! children: rectangles entirely below the pivot, entirely above it, and
//! those that straddle it. Leaves keep their holders in an intrusive doubly
//! linked list. Structural changes enqueue possibly unbalanced nodes, and at
//! most one queued node is rebalanced per mutation (see
//! [`IndexConfig::rebalance_interval`]), so maintenance cost stays bounded
//! per operation instead of requiring full rebuilds.

mod arena;
mod split;
mod view;

use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::collision::aabb::AABB;
use crate::error::IndexError;

use self::arena::{Arena, HolderId, NodeId, NodeKind, Side, Split};
use super::{BoundingRects, IndexConfig, Indexable, SpatialIndex};

pub use self::view::{NodeRef, SnapshotHolder, SnapshotNode, TreeSnapshot};

/// Operation counters, used to observe amortization from the outside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub inserts: u64,
    pub removals: u64,
    /// Holders whose fat rectangle had to be recomputed.
    pub refattens: u64,
    /// Refattened holders that ended up in a different leaf.
    pub relocations: u64,
    pub splits: u64,
    pub collapses: u64,
}

impl IndexStats {
    /// Everything that changed the tree's shape or a stored rectangle.
    pub fn structural_changes(&self) -> u64 {
        self.inserts + self.removals + self.refattens + self.splits + self.collapses
    }
}

#[derive(Debug, Clone)]
pub struct KdTree<K> {
    arena: Arena<K>,
    root: NodeId,
    holders: HashMap<K, HolderId>,
    queue: VecDeque<NodeId>,
    config: IndexConfig,
    countdown: u32,
    stats: IndexStats,
}

impl<K: Copy + Eq + Hash + Debug> Default for KdTree<K> {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}

impl<K: Copy + Eq + Hash + Debug> KdTree<K> {
    pub fn new(config: IndexConfig) -> Self {
        let mut arena = Arena::new();
        let root = arena.alloc_leaf(None);
        Self {
            arena,
            root,
            holders: HashMap::new(),
            queue: VecDeque::new(),
            config,
            countdown: 0,
            stats: IndexStats::default(),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    /// The stored fat rectangle of a held key, `None` if the key is not held.
    pub fn fat_rect(&self, key: K) -> Result<Option<AABB>, IndexError> {
        match self.holders.get(&key) {
            Some(id) => Ok(Some(self.arena.holder(*id)?.rects.fat)),
            None => Ok(None),
        }
    }

    /// Number of live tree nodes, leaves included.
    pub fn node_count(&self) -> usize {
        self.arena.live_nodes()
    }

    /// Nodes waiting for a rebalance attempt.
    pub fn pending_rebalances(&self) -> usize {
        self.queue.len()
    }

    /// Runs up to `budget` rebalance attempts right away and returns how
    /// many nodes were actually restructured.
    pub fn rebalance(&mut self, budget: usize) -> Result<usize, IndexError> {
        let mut done = 0;
        for _ in 0..budget {
            if !self.rebalance_one()? {
                break;
            }
            done += 1;
        }
        Ok(done)
    }

    // --- Descent and bookkeeping ---

    fn fitting_leaf(&self, rect: &AABB) -> Result<NodeId, IndexError> {
        let mut id = self.root;
        loop {
            match self.arena.node(id)?.kind {
                NodeKind::Leaf { .. } => return Ok(id),
                NodeKind::Inner(split) => id = split.child(split.route(rect)),
            }
        }
    }

    /// Recomputes count and bounds of one node from its direct contents.
    fn recompute(&mut self, id: NodeId) -> Result<(), IndexError> {
        let mut count = 0;
        let mut bounds = None;
        match self.arena.node(id)?.kind {
            NodeKind::Leaf { .. } => {
                for holder in self.arena.leaf_holders(id)? {
                    count += 1;
                    bounds = AABB::merge_optional(bounds, Some(self.arena.holder(holder)?.rects.fat));
                }
            }
            NodeKind::Inner(split) => {
                for child in split.children() {
                    let child = self.arena.node(child)?;
                    count += child.count;
                    bounds = AABB::merge_optional(bounds, child.bounds);
                }
            }
        }
        let node = self.arena.node_mut(id)?;
        node.count = count;
        node.bounds = bounds;
        Ok(())
    }

    /// Walks from `id` to the root refreshing cached data and queueing
    /// every node that became unbalanced.
    fn refresh_and_mark(&mut self, id: NodeId) -> Result<(), IndexError> {
        let mut cursor = Some(id);
        while let Some(id) = cursor {
            self.recompute(id)?;
            self.mark_if_unbalanced(id)?;
            cursor = self.arena.node(id)?.parent;
        }
        Ok(())
    }

    fn mark_if_unbalanced(&mut self, id: NodeId) -> Result<(), IndexError> {
        if self.arena.node(id)?.queued || !self.is_unbalanced(id)? {
            return Ok(());
        }
        self.arena.node_mut(id)?.queued = true;
        self.queue.push_back(id);
        Ok(())
    }

    fn is_unbalanced(&self, id: NodeId) -> Result<bool, IndexError> {
        let node = self.arena.node(id)?;
        match node.kind {
            NodeKind::Leaf { .. } => Ok(node.count > self.config.leaf_capacity),
            NodeKind::Inner(split) => {
                if node.count <= 1 {
                    return Ok(true);
                }
                let side_limit = node.count * 2 / 3;
                let middle_limit = node.count / 3;
                Ok(self.arena.node(split.less)?.count > side_limit
                    || self.arena.node(split.more)?.count > side_limit
                    || self.arena.node(split.middle)?.count > middle_limit)
            }
        }
    }

    fn release_node(&mut self, id: NodeId) -> Result<(), IndexError> {
        let node = self.arena.free_node(id)?;
        if node.queued {
            self.queue.retain(|queued| *queued != id);
        }
        Ok(())
    }

    fn after_mutation(&mut self) -> Result<(), IndexError> {
        if self.countdown > 0 {
            self.countdown -= 1;
            return Ok(());
        }
        self.countdown = self.config.rebalance_interval.saturating_sub(1);
        self.rebalance_one()?;
        Ok(())
    }

    // --- Rebalancing ---

    /// Pops queued nodes until one is still unbalanced and restructures it.
    fn rebalance_one(&mut self) -> Result<bool, IndexError> {
        while let Some(id) = self.queue.pop_front() {
            self.arena.node_mut(id)?.queued = false;
            if !self.is_unbalanced(id)? {
                continue;
            }
            let was_inner = !self.arena.node(id)?.is_leaf();
            if was_inner {
                self.collapse(id)?;
            }
            if self.arena.node(id)?.count > 1 {
                self.try_split(id)?;
            }
            self.refresh_and_mark(id)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Turns an inner node back into a leaf holding its whole subtree.
    fn collapse(&mut self, id: NodeId) -> Result<(), IndexError> {
        let split = match self.arena.node(id)?.kind {
            NodeKind::Inner(split) => split,
            NodeKind::Leaf { .. } => return Ok(()),
        };
        let mut drained = Vec::new();
        for child in split.children() {
            self.drain_subtree(child, &mut drained)?;
        }
        self.arena.node_mut(id)?.kind = NodeKind::Leaf { head: None };
        for holder in drained.iter().rev() {
            self.arena.link(id, *holder)?;
        }
        self.recompute(id)?;
        self.stats.collapses += 1;
        debug!(node = id.0, holders = drained.len(), "collapsed inner node");
        Ok(())
    }

    fn drain_subtree(&mut self, id: NodeId, out: &mut Vec<HolderId>) -> Result<(), IndexError> {
        match self.arena.node(id)?.kind {
            NodeKind::Leaf { .. } => {
                for holder in self.arena.leaf_holders(id)? {
                    self.arena.unlink(holder)?;
                    out.push(holder);
                }
            }
            NodeKind::Inner(split) => {
                for child in split.children() {
                    self.drain_subtree(child, out)?;
                }
            }
        }
        self.release_node(id)
    }

    /// Splits a leaf if a useful pivot exists. Returns whether it split.
    fn try_split(&mut self, id: NodeId) -> Result<bool, IndexError> {
        let holders = self.arena.leaf_holders(id)?;
        let mut rects = Vec::with_capacity(holders.len());
        for holder in &holders {
            rects.push(self.arena.holder(*holder)?.rects.fat);
        }

        let candidate = match split::choose_split(&rects) {
            Some(candidate) => candidate,
            None => {
                debug!(node = id.0, holders = holders.len(), "no useful split");
                return Ok(false);
            }
        };

        for holder in &holders {
            self.arena.unlink(*holder)?;
        }
        let less = self.arena.alloc_leaf(None);
        let more = self.arena.alloc_leaf(None);
        let middle = self.arena.alloc_leaf(None);
        for child in [less, more, middle] {
            self.arena.attach(id, child)?;
        }
        let split = Split {
            axis: candidate.axis,
            pivot: candidate.pivot,
            less,
            more,
            middle,
        };
        self.arena.node_mut(id)?.kind = NodeKind::Inner(split);

        // Relink in reverse so each child keeps the leaf's original order.
        for (holder, rect) in holders.iter().zip(&rects).rev() {
            self.arena.link(split.child(split.route(rect)), *holder)?;
        }
        for child in split.children() {
            self.recompute(child)?;
            self.mark_if_unbalanced(child)?;
        }
        self.recompute(id)?;
        self.stats.splits += 1;
        debug!(
            node = id.0,
            axis = ?candidate.axis,
            pivot = candidate.pivot,
            straddlers = candidate.straddlers,
            "split leaf"
        );
        Ok(true)
    }

    // --- Queries ---

    fn traverse(&self, id: NodeId, rect: &AABB, visitor: &mut dyn FnMut(K)) -> Result<(), IndexError> {
        let node = self.arena.node(id)?;
        match node.bounds {
            Some(bounds) if bounds.overlaps(rect) => {}
            _ => return Ok(()),
        }
        match node.kind {
            NodeKind::Leaf { head } => {
                let mut cursor = head;
                while let Some(hid) = cursor {
                    let holder = self.arena.holder(hid)?;
                    if holder.rects.fat.overlaps(rect) {
                        visitor(holder.key);
                    }
                    cursor = holder.next;
                }
            }
            NodeKind::Inner(split) => {
                let side = split.route(rect);
                if side != Side::More {
                    self.traverse(split.less, rect, visitor)?;
                }
                if side != Side::Less {
                    self.traverse(split.more, rect, visitor)?;
                }
                self.traverse(split.middle, rect, visitor)?;
            }
        }
        Ok(())
    }

    fn collect_keys(&self, id: NodeId, out: &mut Vec<K>) -> Result<(), IndexError> {
        match self.arena.node(id)?.kind {
            NodeKind::Leaf { .. } => {
                for holder in self.arena.leaf_holders(id)? {
                    out.push(self.arena.holder(holder)?.key);
                }
            }
            NodeKind::Inner(split) => {
                for child in split.children() {
                    self.collect_keys(child, out)?;
                }
            }
        }
        Ok(())
    }
}

impl<K: Copy + Eq + Hash + Debug> SpatialIndex<K> for KdTree<K> {
    fn contains(&self, key: K) -> bool {
        self.holders.contains_key(&key)
    }

    fn add_or_update<B: Indexable<Key = K>>(&mut self, body: &B) -> Result<bool, IndexError> {
        let key = body.key();
        let fit = body.fit_rect();

        let hid = match self.holders.get(&key) {
            Some(hid) => *hid,
            None => {
                let rects = BoundingRects::compute(fit, body.velocity(), &self.config);
                let hid = self.arena.alloc_holder(key, rects, self.config.refresh_interval);
                self.holders.insert(key, hid);
                let leaf = self.fitting_leaf(&rects.fat)?;
                self.arena.link(leaf, hid)?;
                self.refresh_and_mark(leaf)?;
                self.stats.inserts += 1;
                trace!(?key, leaf = leaf.0, "inserted holder");
                self.after_mutation()?;
                return Ok(true);
            }
        };

        let fat = {
            let holder = self.arena.holder_mut(hid)?;
            if holder.rects.still_fits(&fit) && holder.refresh > 0 {
                holder.refresh -= 1;
                holder.rects.fit = fit;
                return Ok(false);
            }
            holder.rects = BoundingRects::compute(fit, body.velocity(), &self.config);
            holder.refresh = self.config.refresh_interval;
            holder.rects.fat
        };
        self.stats.refattens += 1;

        let old_leaf = self.arena.holder(hid)?.leaf.ok_or(IndexError::DetachedHolder(hid.0))?;
        let new_leaf = self.fitting_leaf(&fat)?;
        if old_leaf != new_leaf {
            self.arena.unlink(hid)?;
            self.arena.link(new_leaf, hid)?;
            self.refresh_and_mark(new_leaf)?;
            self.stats.relocations += 1;
            trace!(?key, from = old_leaf.0, to = new_leaf.0, "relocated holder");
        }
        self.refresh_and_mark(old_leaf)?;
        self.after_mutation()?;
        Ok(true)
    }

    fn remove(&mut self, key: K) -> Result<bool, IndexError> {
        let hid = match self.holders.remove(&key) {
            Some(hid) => hid,
            None => return Ok(false),
        };
        let leaf = self.arena.unlink(hid)?;
        self.arena.free_holder(hid)?;
        self.refresh_and_mark(leaf)?;
        self.stats.removals += 1;
        self.after_mutation()?;
        Ok(true)
    }

    fn traverse_overlapping(&self, rect: &AABB, visitor: &mut dyn FnMut(K)) -> Result<(), IndexError> {
        self.traverse(self.root, rect, visitor)
    }

    fn keys(&self) -> Result<Vec<K>, IndexError> {
        let mut out = Vec::with_capacity(self.holders.len());
        self.collect_keys(self.root, &mut out)?;
        Ok(out)
    }

    fn len(&self) -> usize {
        self.holders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::vec2::Vec2;

    #[derive(Debug, Clone, Copy)]
    struct Probe {
        id: u32,
        center: Vec2,
        half: f64,
    }

    impl Indexable for Probe {
        type Key = u32;
        fn key(&self) -> u32 {
            self.id
        }
        fn fit_rect(&self) -> AABB {
            let h = Vec2::new(self.half, self.half);
            AABB::new(self.center - h, self.center + h)
        }
        fn velocity(&self) -> Vec2 {
            Vec2::ZERO
        }
    }

    fn probe(id: u32, x: f64, y: f64) -> Probe {
        Probe {
            id,
            center: Vec2::new(x, y),
            half: 1.0,
        }
    }

    fn eager() -> IndexConfig {
        IndexConfig {
            rebalance_interval: 1,
            ..IndexConfig::default()
        }
    }

    fn query(tree: &KdTree<u32>, rect: AABB) -> Vec<u32> {
        let mut hits = Vec::new();
        tree.traverse_overlapping(&rect, &mut |k| hits.push(k)).unwrap();
        hits.sort_unstable();
        hits
    }

    #[test]
    fn test_insert_splits_crowded_leaf() {
        let mut tree = KdTree::new(eager());
        for i in 0..12 {
            tree.add_or_update(&probe(i, i as f64 * 10.0, 0.0)).unwrap();
        }
        tree.rebalance(100).unwrap();
        tree.validate().unwrap();
        assert_eq!(tree.len(), 12);
        assert!(tree.stats().splits > 0);
        assert!(tree.node_count() > 1);
        let root = tree.root().unwrap();
        assert!(!root.is_leaf());
        assert_eq!(root.count(), 12);
    }

    #[test]
    fn test_query_finds_only_overlapping() {
        let mut tree = KdTree::new(eager());
        for i in 0..20 {
            tree.add_or_update(&probe(i, (i % 5) as f64 * 10.0, (i / 5) as f64 * 10.0)).unwrap();
        }
        tree.rebalance(100).unwrap();
        let rect = AABB::new(Vec2::new(8.0, 8.0), Vec2::new(12.0, 12.0));
        assert_eq!(query(&tree, rect), vec![6]);
        let everything = AABB::new(Vec2::new(-100.0, -100.0), Vec2::new(100.0, 100.0));
        assert_eq!(query(&tree, everything).len(), 20);
    }

    #[test]
    fn test_sticky_update_does_not_touch_tree() {
        let mut tree = KdTree::new(eager());
        tree.add_or_update(&probe(1, 0.0, 0.0)).unwrap();
        let before = tree.stats();
        assert!(!tree.add_or_update(&probe(1, 0.05, 0.0)).unwrap());
        assert!(!tree.add_or_update(&probe(1, 0.05, 0.0)).unwrap());
        assert_eq!(tree.stats(), before);
        assert!(tree.add_or_update(&probe(1, 50.0, 0.0)).unwrap());
        assert_eq!(tree.stats().refattens, before.refattens + 1);
    }

    #[test]
    fn test_refresh_counter_forces_refatten() {
        let config = IndexConfig {
            refresh_interval: 2,
            ..eager()
        };
        let mut tree = KdTree::new(config);
        tree.add_or_update(&probe(1, 0.0, 0.0)).unwrap();
        assert!(!tree.add_or_update(&probe(1, 0.0, 0.0)).unwrap());
        assert!(!tree.add_or_update(&probe(1, 0.0, 0.0)).unwrap());
        assert!(tree.add_or_update(&probe(1, 0.0, 0.0)).unwrap());
        assert_eq!(tree.stats().refattens, 1);
    }

    #[test]
    fn test_remove_collapses_back_to_leaf() {
        let mut tree = KdTree::new(eager());
        for i in 0..10 {
            tree.add_or_update(&probe(i, i as f64 * 10.0, 0.0)).unwrap();
        }
        tree.rebalance(100).unwrap();
        for i in 0..9 {
            assert!(tree.remove(i).unwrap());
        }
        assert!(!tree.remove(3).unwrap());
        tree.rebalance(100).unwrap();
        tree.validate().unwrap();
        assert_eq!(tree.keys().unwrap(), vec![9]);
        assert!(tree.root().unwrap().is_leaf());
        assert_eq!(tree.node_count(), 1);
        assert!(tree.stats().collapses > 0);
    }

    #[test]
    fn test_moving_holder_relocates() {
        let mut tree = KdTree::new(eager());
        for i in 0..8 {
            tree.add_or_update(&probe(i, i as f64 * 10.0, 0.0)).unwrap();
        }
        tree.rebalance(100).unwrap();
        tree.add_or_update(&probe(0, 75.0, 0.0)).unwrap();
        tree.validate().unwrap();
        assert_eq!(tree.stats().relocations, 1);
        let rect = AABB::new(Vec2::new(74.5, -0.5), Vec2::new(75.5, 0.5));
        assert_eq!(query(&tree, rect), vec![0]);
    }

    #[test]
    fn test_empty_tree() {
        let tree: KdTree<u32> = KdTree::default();
        assert!(tree.is_empty());
        assert!(tree.keys().unwrap().is_empty());
        let rect = AABB::new(Vec2::ZERO, Vec2::new(1.0, 1.0));
        assert!(query(&tree, rect).is_empty());
        tree.validate().unwrap();
    }

    #[test]
    fn test_freed_slots_surface_as_errors() {
        let mut tree = KdTree::new(eager());
        tree.add_or_update(&probe(1, 0.0, 0.0)).unwrap();
        tree.add_or_update(&probe(2, 5.0, 0.0)).unwrap();
        assert!(tree.fat_rect(1).unwrap().is_some());
        assert_eq!(tree.fat_rect(3), Ok(None));

        // Drop a holder behind the lookup table's back.
        let hid = tree.holders[&1];
        tree.arena.unlink(hid).unwrap();
        tree.arena.free_holder(hid).unwrap();
        assert_eq!(tree.fat_rect(1), Err(IndexError::StaleHolder(hid.0)));

        // Free the root; every walk from it must fail.
        let root = tree.root;
        tree.arena.free_node(root).unwrap();
        assert_eq!(tree.keys(), Err(IndexError::StaleNode(root.0)));
        assert!(tree.validate().is_err());
    }
}
