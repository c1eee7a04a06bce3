// Slot storage for tree nodes and holders, addressed by stable indices.

use crate::collision::aabb::{Axis, AABB};
use crate::collision::broadphase::BoundingRects;
use crate::error::IndexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct HolderId(pub(crate) usize);

/// Which child of an inner node a rectangle routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Less,
    More,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Split {
    pub axis: Axis,
    pub pivot: f64,
    pub less: NodeId,
    pub more: NodeId,
    pub middle: NodeId,
}

impl Split {
    /// Entirely below the pivot goes less, entirely above goes more,
    /// touching or crossing it goes to the middle.
    pub fn route(&self, rect: &AABB) -> Side {
        if self.axis.of(rect.max) < self.pivot {
            Side::Less
        } else if self.axis.of(rect.min) > self.pivot {
            Side::More
        } else {
            Side::Middle
        }
    }

    pub fn child(&self, side: Side) -> NodeId {
        match side {
            Side::Less => self.less,
            Side::More => self.more,
            Side::Middle => self.middle,
        }
    }

    pub fn children(&self) -> [NodeId; 3] {
        [self.less, self.middle, self.more]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum NodeKind {
    Leaf { head: Option<HolderId> },
    Inner(Split),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Node {
    pub parent: Option<NodeId>,
    /// Merge of the subtree's fat rectangles; `None` when empty.
    pub bounds: Option<AABB>,
    pub count: usize,
    /// Set while the node sits in the rebalance queue.
    pub queued: bool,
    pub kind: NodeKind,
}

impl Node {
    fn empty_leaf(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            bounds: None,
            count: 0,
            queued: false,
            kind: NodeKind::Leaf { head: None },
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Holder<K> {
    pub key: K,
    pub leaf: Option<NodeId>,
    pub prev: Option<HolderId>,
    pub next: Option<HolderId>,
    pub rects: BoundingRects,
    pub refresh: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct Arena<K> {
    nodes: Vec<Option<Node>>,
    free_nodes: Vec<usize>,
    holders: Vec<Option<Holder<K>>>,
    free_holders: Vec<usize>,
}

impl<K: Copy> Arena<K> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free_nodes: Vec::new(),
            holders: Vec::new(),
            free_holders: Vec::new(),
        }
    }

    // --- Nodes ---

    pub fn alloc_leaf(&mut self, parent: Option<NodeId>) -> NodeId {
        let node = Node::empty_leaf(parent);
        match self.free_nodes.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    pub fn free_node(&mut self, id: NodeId) -> Result<Node, IndexError> {
        let node = self
            .nodes
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(IndexError::StaleNode(id.0))?;
        self.free_nodes.push(id.0);
        Ok(node)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, IndexError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(IndexError::StaleNode(id.0))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, IndexError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(IndexError::StaleNode(id.0))
    }

    pub fn live_nodes(&self) -> usize {
        self.nodes.len() - self.free_nodes.len()
    }

    /// Makes `child` a child of `parent`, refusing to close a loop.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), IndexError> {
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(IndexError::CycleDetected {
                    parent: parent.0,
                    child: child.0,
                });
            }
            cursor = self.node(id)?.parent;
        }
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    // --- Holders ---

    pub fn alloc_holder(&mut self, key: K, rects: BoundingRects, refresh: u32) -> HolderId {
        let holder = Holder {
            key,
            leaf: None,
            prev: None,
            next: None,
            rects,
            refresh,
        };
        match self.free_holders.pop() {
            Some(slot) => {
                self.holders[slot] = Some(holder);
                HolderId(slot)
            }
            None => {
                self.holders.push(Some(holder));
                HolderId(self.holders.len() - 1)
            }
        }
    }

    /// Frees a detached holder.
    pub fn free_holder(&mut self, id: HolderId) -> Result<Holder<K>, IndexError> {
        if self.holder(id)?.leaf.is_some() {
            return Err(IndexError::Inconsistent {
                node: id.0,
                reason: "freeing a holder that is still linked".to_string(),
            });
        }
        let holder = self
            .holders
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(IndexError::StaleHolder(id.0))?;
        self.free_holders.push(id.0);
        Ok(holder)
    }

    pub fn holder(&self, id: HolderId) -> Result<&Holder<K>, IndexError> {
        self.holders
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(IndexError::StaleHolder(id.0))
    }

    pub fn holder_mut(&mut self, id: HolderId) -> Result<&mut Holder<K>, IndexError> {
        self.holders
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(IndexError::StaleHolder(id.0))
    }

    /// Pushes a detached holder onto the front of a leaf's list.
    pub fn link(&mut self, leaf: NodeId, id: HolderId) -> Result<(), IndexError> {
        let old_head = match self.node(leaf)?.kind {
            NodeKind::Leaf { head } => head,
            NodeKind::Inner(_) => return Err(IndexError::NotALeaf(leaf.0)),
        };
        if let Some(old) = old_head {
            self.holder_mut(old)?.prev = Some(id);
        }
        let holder = self.holder_mut(id)?;
        if holder.leaf.is_some() {
            return Err(IndexError::Inconsistent {
                node: leaf.0,
                reason: format!("holder {} linked twice", id.0),
            });
        }
        holder.leaf = Some(leaf);
        holder.prev = None;
        holder.next = old_head;
        self.node_mut(leaf)?.kind = NodeKind::Leaf { head: Some(id) };
        Ok(())
    }

    /// Removes a holder from its leaf's list and returns that leaf.
    pub fn unlink(&mut self, id: HolderId) -> Result<NodeId, IndexError> {
        let (leaf, prev, next) = {
            let holder = self.holder_mut(id)?;
            let leaf = holder.leaf.take().ok_or(IndexError::DetachedHolder(id.0))?;
            (leaf, holder.prev.take(), holder.next.take())
        };
        match prev {
            Some(p) => self.holder_mut(p)?.next = next,
            None => match &mut self.node_mut(leaf)?.kind {
                NodeKind::Leaf { head } => *head = next,
                NodeKind::Inner(_) => return Err(IndexError::NotALeaf(leaf.0)),
            },
        }
        if let Some(n) = next {
            self.holder_mut(n)?.prev = prev;
        }
        Ok(leaf)
    }

    /// Holders of one leaf, front to back.
    pub fn leaf_holders(&self, leaf: NodeId) -> Result<Vec<HolderId>, IndexError> {
        let mut cursor = match self.node(leaf)?.kind {
            NodeKind::Leaf { head } => head,
            NodeKind::Inner(_) => return Err(IndexError::NotALeaf(leaf.0)),
        };
        let mut out = Vec::new();
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.holder(id)?.next;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::vec2::Vec2;

    fn rects() -> BoundingRects {
        let r = AABB::new(Vec2::ZERO, Vec2::new(1.0, 1.0));
        BoundingRects { fit: r, fat: r }
    }

    #[test]
    fn test_link_unlink_keeps_list_order() {
        let mut arena: Arena<u32> = Arena::new();
        let leaf = arena.alloc_leaf(None);
        let a = arena.alloc_holder(1, rects(), 5);
        let b = arena.alloc_holder(2, rects(), 5);
        let c = arena.alloc_holder(3, rects(), 5);
        arena.link(leaf, a).unwrap();
        arena.link(leaf, b).unwrap();
        arena.link(leaf, c).unwrap();
        assert_eq!(arena.leaf_holders(leaf).unwrap(), vec![c, b, a]);

        assert_eq!(arena.unlink(b).unwrap(), leaf);
        assert_eq!(arena.leaf_holders(leaf).unwrap(), vec![c, a]);
        assert_eq!(arena.unlink(c).unwrap(), leaf);
        assert_eq!(arena.leaf_holders(leaf).unwrap(), vec![a]);
        assert_eq!(arena.holder(a).unwrap().prev, None);
    }

    #[test]
    fn test_unlink_detached_holder_fails() {
        let mut arena: Arena<u32> = Arena::new();
        let h = arena.alloc_holder(9, rects(), 5);
        assert_eq!(arena.unlink(h), Err(IndexError::DetachedHolder(h.0)));
    }

    #[test]
    fn test_attach_rejects_cycle() {
        let mut arena: Arena<u32> = Arena::new();
        let root = arena.alloc_leaf(None);
        let child = arena.alloc_leaf(None);
        arena.attach(root, child).unwrap();
        let err = arena.attach(child, root).unwrap_err();
        assert_eq!(err, IndexError::CycleDetected { parent: child.0, child: root.0 });
        assert_eq!(
            arena.attach(root, root).unwrap_err(),
            IndexError::CycleDetected { parent: root.0, child: root.0 }
        );
    }

    #[test]
    fn test_freed_slots_are_reused_and_stale_access_fails() {
        let mut arena: Arena<u32> = Arena::new();
        let a = arena.alloc_leaf(None);
        let _b = arena.alloc_leaf(None);
        arena.free_node(a).unwrap();
        assert_eq!(arena.node(a).unwrap_err(), IndexError::StaleNode(a.0));
        assert_eq!(arena.live_nodes(), 1);
        let c = arena.alloc_leaf(None);
        assert_eq!(c, a);
    }

    #[test]
    fn test_route() {
        let split = Split {
            axis: Axis::X,
            pivot: 5.0,
            less: NodeId(1),
            more: NodeId(2),
            middle: NodeId(3),
        };
        let r = |a: f64, b: f64| AABB::new(Vec2::new(a, 0.0), Vec2::new(b, 1.0));
        assert_eq!(split.route(&r(0.0, 4.9)), Side::Less);
        assert_eq!(split.route(&r(5.1, 9.0)), Side::More);
        assert_eq!(split.route(&r(4.0, 6.0)), Side::Middle);
        assert_eq!(split.route(&r(5.0, 6.0)), Side::Middle);
        assert_eq!(split.child(Side::More), NodeId(2));
    }
}
