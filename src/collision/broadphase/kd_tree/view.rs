// Read-only access to the tree shape: borrowed views for debug drawing,
// owned snapshots for tests, and the full consistency check.

use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::collision::aabb::{Axis, AABB};
use crate::error::IndexError;

use super::arena::{Arena, Node, NodeId, NodeKind, Side, Split};
use super::{IndexStats, KdTree};

/// Borrowed view of one tree node.
pub struct NodeRef<'a, K> {
    arena: &'a Arena<K>,
    id: NodeId,
    node: &'a Node,
}

impl<'a, K: Copy> NodeRef<'a, K> {
    fn new(arena: &'a Arena<K>, id: NodeId) -> Result<Self, IndexError> {
        Ok(Self {
            arena,
            id,
            node: arena.node(id)?,
        })
    }

    /// Arena slot of this node; stable until the node is collapsed away.
    pub fn id(&self) -> usize {
        self.id.0
    }

    pub fn bounds(&self) -> Option<AABB> {
        self.node.bounds
    }

    pub fn count(&self) -> usize {
        self.node.count
    }

    pub fn is_leaf(&self) -> bool {
        self.node.is_leaf()
    }

    /// Split axis and pivot of an inner node.
    pub fn split(&self) -> Option<(Axis, f64)> {
        match self.node.kind {
            NodeKind::Inner(split) => Some((split.axis, split.pivot)),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Children as (less, middle, more); empty for a leaf.
    pub fn children(&self) -> Result<Vec<NodeRef<'a, K>>, IndexError> {
        match self.node.kind {
            NodeKind::Inner(split) => split
                .children()
                .iter()
                .map(|child| NodeRef::new(self.arena, *child))
                .collect(),
            NodeKind::Leaf { .. } => Ok(Vec::new()),
        }
    }

    /// Keys and fat rectangles held by a leaf; empty for an inner node.
    pub fn holders(&self) -> Result<Vec<(K, AABB)>, IndexError> {
        if !self.is_leaf() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for hid in self.arena.leaf_holders(self.id)? {
            let holder = self.arena.holder(hid)?;
            out.push((holder.key, holder.rects.fat));
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotHolder<K> {
    pub key: K,
    pub fit: AABB,
    pub fat: AABB,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapshotNode<K> {
    Leaf {
        bounds: Option<AABB>,
        holders: Vec<SnapshotHolder<K>>,
    },
    Inner {
        bounds: Option<AABB>,
        count: usize,
        axis: Axis,
        pivot: f64,
        less: Box<SnapshotNode<K>>,
        middle: Box<SnapshotNode<K>>,
        more: Box<SnapshotNode<K>>,
    },
}

impl<K> SnapshotNode<K> {
    pub fn count(&self) -> usize {
        match self {
            SnapshotNode::Leaf { holders, .. } => holders.len(),
            SnapshotNode::Inner { count, .. } => *count,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            SnapshotNode::Leaf { .. } => 1,
            SnapshotNode::Inner { less, middle, more, .. } => {
                1 + less.depth().max(middle.depth()).max(more.depth())
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            SnapshotNode::Leaf { .. } => 1,
            SnapshotNode::Inner { less, middle, more, .. } => {
                less.leaf_count() + middle.leaf_count() + more.leaf_count()
            }
        }
    }
}

/// Owned copy of the whole tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot<K> {
    pub root: SnapshotNode<K>,
    pub stats: IndexStats,
}

impl<K: Copy + Eq + Hash + Debug> KdTree<K> {
    pub fn root(&self) -> Result<NodeRef<'_, K>, IndexError> {
        NodeRef::new(&self.arena, self.root)
    }

    pub fn snapshot(&self) -> Result<TreeSnapshot<K>, IndexError> {
        Ok(TreeSnapshot {
            root: self.snapshot_node(self.root)?,
            stats: self.stats,
        })
    }

    fn snapshot_node(&self, id: NodeId) -> Result<SnapshotNode<K>, IndexError> {
        let node = self.arena.node(id)?;
        Ok(match node.kind {
            NodeKind::Leaf { .. } => {
                let mut holders = Vec::new();
                for hid in self.arena.leaf_holders(id)? {
                    let holder = self.arena.holder(hid)?;
                    holders.push(SnapshotHolder {
                        key: holder.key,
                        fit: holder.rects.fit,
                        fat: holder.rects.fat,
                    });
                }
                SnapshotNode::Leaf {
                    bounds: node.bounds,
                    holders,
                }
            }
            NodeKind::Inner(split) => SnapshotNode::Inner {
                bounds: node.bounds,
                count: node.count,
                axis: split.axis,
                pivot: split.pivot,
                less: Box::new(self.snapshot_node(split.less)?),
                middle: Box::new(self.snapshot_node(split.middle)?),
                more: Box::new(self.snapshot_node(split.more)?),
            },
        })
    }

    /// Checks every cached count and bound, every parent and sibling link,
    /// and that each holder sits on the correct side of all its ancestors'
    /// pivots.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.arena.node(self.root)?.parent.is_some() {
            return Err(inconsistent(self.root, "root has a parent"));
        }
        let mut path = Vec::new();
        let held = self.validate_node(self.root, &mut path)?;
        if held != self.holders.len() {
            return Err(inconsistent(
                self.root,
                format!("tree holds {} holders, lookup has {}", held, self.holders.len()),
            ));
        }
        for (key, hid) in &self.holders {
            if self.arena.holder(*hid)?.key != *key {
                return Err(inconsistent(self.root, format!("lookup entry for {:?} is stale", key)));
            }
        }
        for id in &self.queue {
            if !self.arena.node(*id)?.queued {
                return Err(inconsistent(*id, "queued node without queued flag"));
            }
        }
        Ok(())
    }

    fn validate_node(&self, id: NodeId, path: &mut Vec<(Split, Side)>) -> Result<usize, IndexError> {
        let node = self.arena.node(id)?;
        let (count, bounds) = match node.kind {
            NodeKind::Leaf { .. } => {
                let mut count = 0;
                let mut bounds = None;
                let mut prev = None;
                for hid in self.arena.leaf_holders(id)? {
                    let holder = self.arena.holder(hid)?;
                    if holder.leaf != Some(id) {
                        return Err(inconsistent(id, format!("holder {} points at another leaf", hid.0)));
                    }
                    if holder.prev != prev {
                        return Err(inconsistent(id, format!("holder {} has a broken prev link", hid.0)));
                    }
                    if !holder.rects.fat.contains(&holder.rects.fit) {
                        return Err(inconsistent(id, format!("holder {} fat rect misses fit rect", hid.0)));
                    }
                    for (split, side) in path.iter() {
                        if split.route(&holder.rects.fat) != *side {
                            return Err(inconsistent(id, format!("holder {} is on the wrong side of a pivot", hid.0)));
                        }
                    }
                    count += 1;
                    bounds = AABB::merge_optional(bounds, Some(holder.rects.fat));
                    prev = Some(hid);
                }
                (count, bounds)
            }
            NodeKind::Inner(split) => {
                let mut count = 0;
                let mut bounds = None;
                for (child, side) in [
                    (split.less, Side::Less),
                    (split.middle, Side::Middle),
                    (split.more, Side::More),
                ] {
                    if self.arena.node(child)?.parent != Some(id) {
                        return Err(inconsistent(child, format!("parent link does not point at {}", id.0)));
                    }
                    path.push((split, side));
                    count += self.validate_node(child, path)?;
                    path.pop();
                    bounds = AABB::merge_optional(bounds, self.arena.node(child)?.bounds);
                }
                (count, bounds)
            }
        };
        if count != node.count {
            return Err(inconsistent(id, format!("cached count {} but subtree holds {}", node.count, count)));
        }
        if bounds != node.bounds {
            return Err(inconsistent(id, "cached bounds differ from subtree"));
        }
        Ok(count)
    }
}

fn inconsistent(id: NodeId, reason: impl Into<String>) -> IndexError {
    IndexError::Inconsistent {
        node: id.0,
        reason: reason.into(),
    }
}
